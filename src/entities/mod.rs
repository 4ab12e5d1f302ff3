//! Entity reconciliation - the semantic type catalog.
//!
//! Three stages, leaves first:
//! - `extract`: re-read raw source text, pull out type declarations, tag
//!   them with layers by path keywords
//! - `similarity`: the two clustering channels (synonym table, direct
//!   name similarity)
//! - `reconciler`: transitive clustering, field merging, drift warnings,
//!   DB->API mismatch detection, recommendations

mod extract;
mod reconciler;
mod similarity;

pub use extract::{layer_tags, DeclarationExtractor, LayerKeywords};
pub use reconciler::{
    CompatRule, CompatTable, EntityCatalog, EntityReconciler, SemanticEntity, TypeMismatch,
};
pub use similarity::{char_overlap, names_similar, SynonymTable};
