//! factmap - cross-file fact reconciliation for codebases
//!
//! Ingests per-file static-analysis facts (functions, classes, type
//! declarations, call references) and derives two artifacts: a call and
//! feature dependency graph, and a semantic entity catalog that reconciles
//! differently-named but conceptually-identical types across layers.
//!
//! # Architecture
//!
//! ```text
//! File Discovery → Fact Extraction → Call Resolution → Feature Grouping ┐
//!       ↓               ↓                  ↓                            ├→ Report
//!    ignore          regex            name multimap     path heuristic ┘
//!       └──────→ Declaration Extraction → Entity Reconciliation ───────┘
//!                      regex re-read        synonyms + similarity
//! ```
//!
//! The two extraction passes are independent: function facts feed the
//! resolver and grouper, while the declaration pass re-reads raw text with
//! its own regexes and feeds the reconciler. Both analyses run only after
//! the full fact store is assembled - cross-file resolution needs global
//! visibility.
//!
//! # Determinism
//!
//! Every heuristic tie is broken by a stable order (lexicographic file
//! path, then declaration order), so repeated runs on identical input
//! produce byte-identical artifacts.

pub mod callgraph;
pub mod config;
pub mod discovery;
pub mod entities;
pub mod extraction;
pub mod features;
pub mod normalize;
pub mod report;
pub mod types;

// Re-export core types
pub use callgraph::{CallEdge, CallGraph, CallResolver, EdgeKind, FunctionId, ResolutionStats};
pub use config::Config;
pub use entities::{
    CompatTable, DeclarationExtractor, EntityCatalog, EntityReconciler, LayerKeywords,
    SemanticEntity, SynonymTable, TypeMismatch,
};
pub use extraction::{detect_language, Language, Parser};
pub use features::{feature_key, group_features, Feature};
pub use normalize::normalize;
pub use report::AnalysisReport;
pub use types::{
    ClassFact, FactStore, FieldDecl, FileFacts, FunctionFact, LayerTag, TypeDeclaration, TypeKind,
};
