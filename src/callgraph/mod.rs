//! Call graph construction from extracted facts.
//!
//! Two pieces, cleanly separated:
//! - the graph itself ([`CallGraph`]), which enforces dedup and the
//!   no-self-edge invariant
//! - the resolver ([`CallResolver`]), which maps raw callee names onto
//!   declarations using the store's stable enumeration order
//!
//! Resolution runs only after the full [`crate::types::FactStore`] is
//! assembled - partial resolution against an incomplete store would silently
//! produce wrong backlinks.

mod graph;
mod resolver;

pub use graph::{CallEdge, CallGraph, EdgeKind, FunctionId};
pub use resolver::{CallResolver, ResolutionContext, ResolutionStats};
