//! Ambiguous-tolerant call resolution.
//!
//! The resolver turns raw callee names into concrete edges:
//! 1. Builds a bare-name index over the store's stable enumeration
//! 2. Resolves each callee name to the first matching declaration
//! 3. Records `called_by` backlinks on the winning declaration
//! 4. Emits deduplicated edges into the [`CallGraph`]
//!
//! When multiple files declare the same bare name, no import analysis is
//! attempted: the first declaration in the stable order (lexicographic file
//! path, then declaration order) wins, and only that declaration receives
//! the backlink. Repeated runs on identical input produce byte-identical
//! output. Unresolved names are expected and common (builtins, external
//! libraries, object methods) and never raise an error.

use std::collections::HashMap;
use std::sync::Arc;

use super::graph::{CallGraph, FunctionId};
use crate::types::FactStore;

/// Bare names never resolved against the corpus.
///
/// These are runtime builtins and ubiquitous container/string methods; a
/// call-shaped reference to one of them is noise, not a cross-file edge.
/// Exact-match by bare name - a project function that shadows one of these
/// names will not receive edges, a known precision trade-off.
const BUILTIN_DENYLIST: &[&str] = &[
    // runtime globals
    "require", "console", "log", "warn", "error", "info", "debug",
    "parseInt", "parseFloat", "isNaN", "String", "Number", "Boolean", "Array", "Object",
    "setTimeout", "setInterval", "clearTimeout", "clearInterval",
    "JSON", "stringify", "parse", "fetch",
    "encodeURIComponent", "decodeURIComponent",
    "Promise", "resolve", "reject", "all", "then", "finally",
    // container / string methods
    "push", "pop", "shift", "unshift", "slice", "splice", "concat", "join", "split",
    "map", "filter", "reduce", "forEach", "find", "findIndex", "some", "every",
    "includes", "indexOf", "keys", "values", "entries", "assign", "freeze",
    "hasOwnProperty", "toString", "toFixed", "toLowerCase", "toUpperCase",
    "trim", "replace", "match", "test", "exec",
    // Math and Date
    "floor", "ceil", "round", "abs", "min", "max", "random", "now",
];

/// Read-only bare-name index over the store.
///
/// Built once per run; each bucket preserves the store's stable enumeration
/// order, so index 0 of a bucket is "the first matching declaration".
pub struct ResolutionContext {
    by_name: HashMap<Arc<str>, Vec<usize>>,
}

impl ResolutionContext {
    pub fn new(store: &FactStore) -> Self {
        let mut by_name: HashMap<Arc<str>, Vec<usize>> = HashMap::new();
        for (idx, fact) in store.functions().iter().enumerate() {
            by_name.entry(fact.name.clone()).or_default().push(idx);
        }
        Self { by_name }
    }

    /// The first declaration of `name` in the stable order, if any.
    pub fn first_declaration(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).and_then(|v| v.first().copied())
    }

    /// Every declaration of `name`, in the stable order.
    pub fn declarations(&self, name: &str) -> &[usize] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Counters for resolution quality, surfaced in verbose output and the
/// report summary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolutionStats {
    pub total_references: usize,
    pub resolved: usize,
    pub denylisted: usize,
    pub unresolved: usize,
}

impl ResolutionStats {
    pub fn resolution_rate(&self) -> f64 {
        if self.total_references == 0 {
            return 1.0;
        }
        self.resolved as f64 / self.total_references as f64
    }
}

/// The call resolver. Stateless apart from its denylist.
pub struct CallResolver {
    denylist: &'static [&'static str],
}

impl CallResolver {
    pub fn new() -> Self {
        Self {
            denylist: BUILTIN_DENYLIST,
        }
    }

    fn is_denylisted(&self, name: &str) -> bool {
        self.denylist.contains(&name)
    }

    /// Resolve every callee reference in the store and build the graph.
    ///
    /// All declared functions become nodes even when uncalled; edges are
    /// added for resolved references only. `called_by` backlinks are
    /// appended to the store for each new edge, in resolution order.
    pub fn resolve(&self, store: &mut FactStore) -> (CallGraph, ResolutionStats) {
        let context = ResolutionContext::new(store);

        let ids: Vec<FunctionId> = store
            .functions()
            .iter()
            .map(|f| FunctionId::new(f.file.clone(), f.name.clone()))
            .collect();
        let callee_lists: Vec<Vec<Arc<str>>> = store
            .functions()
            .iter()
            .map(|f| f.callees.clone())
            .collect();

        let mut graph = CallGraph::new();
        for id in &ids {
            graph.add_function(id.clone());
        }

        let mut stats = ResolutionStats::default();
        let mut backlinks: Vec<(usize, Arc<str>)> = Vec::new();

        for (caller_idx, callees) in callee_lists.iter().enumerate() {
            let caller_key: Arc<str> = ids[caller_idx].composite_key().into();

            for name in callees {
                stats.total_references += 1;

                if self.is_denylisted(name) {
                    stats.denylisted += 1;
                    continue;
                }

                let Some(target_idx) = context.first_declaration(name) else {
                    // No declared match anywhere: expected, no edge
                    stats.unresolved += 1;
                    continue;
                };

                stats.resolved += 1;
                if target_idx == caller_idx {
                    // Recursion resolves but produces no self-edge
                    continue;
                }

                if graph.add_call(ids[caller_idx].clone(), ids[target_idx].clone()) {
                    backlinks.push((target_idx, caller_key.clone()));
                }
            }
        }

        for (target_idx, caller) in backlinks {
            store.append_called_by(target_idx, caller);
        }

        (graph, stats)
    }
}

impl Default for CallResolver {
    fn default() -> Self {
        Self::new()
    }
}
