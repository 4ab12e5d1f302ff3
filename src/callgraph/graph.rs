//! Core call graph data structures.
//!
//! The graph is resolver-agnostic - it just stores resolved edges. The
//! resolver populates it; the feature grouper and report assembler consume
//! it. Two invariants are enforced here rather than in callers:
//! - no self-edges (`from == to` is rejected)
//! - at most one `calls` edge per (from, to) pair, however many times the
//!   textual call appears in source

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::types::arc_str_serde;

/// Unique identifier for a resolved function: `(file, name)`.
///
/// Once a call is resolved, the target is never referenced by bare name
/// alone - the composite `name@file` key is the node identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionId {
    #[serde(with = "arc_str_serde")]
    pub file: Arc<str>,
    #[serde(with = "arc_str_serde")]
    pub name: Arc<str>,
}

impl FunctionId {
    pub fn new(file: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            file: file.into(),
            name: name.into(),
        }
    }

    /// Composite key for display and cross-referencing: `name@file`
    pub fn composite_key(&self) -> String {
        format!("{}@{}", self.name, self.file)
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.file)
    }
}

/// Edge kind. Only calls for now; the enum keeps the wire format explicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    Calls,
}

/// An edge in the call graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEdge {
    pub kind: EdgeKind,
}

impl CallEdge {
    pub fn calls() -> Self {
        Self {
            kind: EdgeKind::Calls,
        }
    }
}

/// The call graph: resolved functions as nodes, deduplicated calls as edges.
///
/// Uses petgraph for the underlying storage and traversal. The side index
/// gives O(1) node lookup; the edge-key set gives O(1) dedup instead of
/// scanning existing edges per insertion.
#[derive(Debug, Default)]
pub struct CallGraph {
    graph: DiGraph<FunctionId, CallEdge>,
    index: HashMap<FunctionId, NodeIndex>,
    edge_keys: HashSet<(NodeIndex, NodeIndex)>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function node. Idempotent - returns the existing index if the
    /// id is already present.
    pub fn add_function(&mut self, id: FunctionId) -> NodeIndex {
        if let Some(&idx) = self.index.get(&id) {
            return idx;
        }
        let idx = self.graph.add_node(id.clone());
        self.index.insert(id, idx);
        idx
    }

    /// Add a call edge between two functions, auto-adding missing nodes.
    ///
    /// Returns false without touching the graph for self-edges and for
    /// duplicate (from, to) pairs.
    pub fn add_call(&mut self, caller: FunctionId, callee: FunctionId) -> bool {
        if caller == callee {
            return false;
        }
        let caller_idx = self.add_function(caller);
        let callee_idx = self.add_function(callee);
        if !self.edge_keys.insert((caller_idx, callee_idx)) {
            return false;
        }
        self.graph.add_edge(caller_idx, callee_idx, CallEdge::calls());
        true
    }

    pub fn function_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn call_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All function nodes
    pub fn functions(&self) -> impl Iterator<Item = &FunctionId> {
        self.graph.node_weights()
    }

    /// All edges as (caller, callee, edge) triples, in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (&FunctionId, &FunctionId, &CallEdge)> {
        self.graph.edge_references().map(|e| {
            let from = &self.graph[e.source()];
            let to = &self.graph[e.target()];
            (from, to, e.weight())
        })
    }

    /// Outgoing call targets of a function.
    pub fn calls_from(&self, id: &FunctionId) -> Vec<&FunctionId> {
        let Some(idx) = self.index.get(id) else {
            return vec![];
        };
        self.graph
            .edges(*idx)
            .map(|e| &self.graph[e.target()])
            .collect()
    }

    /// Incoming callers of a function - "who might call me".
    pub fn calls_to(&self, id: &FunctionId) -> Vec<&FunctionId> {
        let Some(idx) = self.index.get(id) else {
            return vec![];
        };
        self.graph
            .edges_directed(*idx, petgraph::Direction::Incoming)
            .map(|e| &self.graph[e.source()])
            .collect()
    }

    /// Find nodes by bare name (may match multiple files).
    pub fn find_by_name(&self, name: &str) -> Vec<&FunctionId> {
        self.graph
            .node_weights()
            .filter(|f| f.name.as_ref() == name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_function_idempotent() {
        let mut graph = CallGraph::new();
        let id = FunctionId::new("a.ts", "foo");
        let idx1 = graph.add_function(id.clone());
        let idx2 = graph.add_function(id);
        assert_eq!(idx1, idx2);
        assert_eq!(graph.function_count(), 1);
    }

    #[test]
    fn test_edge_dedup() {
        let mut graph = CallGraph::new();
        let caller = FunctionId::new("a.ts", "main");
        let callee = FunctionId::new("b.ts", "helper");

        assert!(graph.add_call(caller.clone(), callee.clone()));
        assert!(!graph.add_call(caller.clone(), callee.clone()));
        assert_eq!(graph.call_count(), 1);
        assert_eq!(graph.calls_from(&caller).len(), 1);
    }

    #[test]
    fn test_self_edge_rejected() {
        let mut graph = CallGraph::new();
        let id = FunctionId::new("a.ts", "recurse");
        assert!(!graph.add_call(id.clone(), id.clone()));
        assert_eq!(graph.call_count(), 0);
        // The node itself is not created by a rejected edge
        assert_eq!(graph.function_count(), 0);
    }

    #[test]
    fn test_calls_to() {
        let mut graph = CallGraph::new();
        let a = FunctionId::new("a.ts", "a");
        let b = FunctionId::new("b.ts", "b");
        let c = FunctionId::new("c.ts", "c");
        graph.add_call(a.clone(), c.clone());
        graph.add_call(b.clone(), c.clone());

        let callers = graph.calls_to(&c);
        assert_eq!(callers.len(), 2);
    }

    #[test]
    fn test_find_by_name_across_files() {
        let mut graph = CallGraph::new();
        graph.add_function(FunctionId::new("a.ts", "getBalance"));
        graph.add_function(FunctionId::new("b.ts", "getBalance"));
        assert_eq!(graph.find_by_name("getBalance").len(), 2);
    }
}
