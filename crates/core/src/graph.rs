//! Graph data structures for type containment
//!
//! Uses `petgraph::StableGraph`; nodes are only ever appended, so a node's
//! index doubles as its id and matches insertion order.

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

/// A node: one occurrence of a type in the unrolled structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Creation-order id, also the node's index in the graph
    pub id: usize,
    /// Canonical type name, already double-quoted
    pub label: String,
}

/// An edge from a struct to one of its fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    /// Struct → field type
    Contains,
    /// Field → an ancestor of the same type; only drawn when cycles are cut
    Cycle,
}

/// The type graph
#[derive(Debug)]
pub struct TypeGraph {
    inner: StableGraph<Node, Edge>,
}

impl TypeGraph {
    /// Create a new empty graph
    pub fn new() -> Self {
        Self {
            inner: StableGraph::new(),
        }
    }

    /// Append a node with the next id
    pub fn add_node(&mut self, label: String) -> NodeIndex {
        let id = self.inner.node_count();
        self.inner.add_node(Node { id, label })
    }

    /// Add a directed edge
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, kind: EdgeKind) -> EdgeIndex {
        self.inner.add_edge(from, to, Edge { kind })
    }

    /// Get a node by index
    pub fn node_weight(&self, index: NodeIndex) -> Option<&Node> {
        self.inner.node_weight(index)
    }

    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.inner.node_weights()
    }

    /// Edges as `(from_id, to_id, kind)` in insertion order
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, EdgeKind)> + '_ {
        self.inner
            .edge_references()
            .map(|e| (e.source().index(), e.target().index(), e.weight().kind))
    }

    /// Number of incoming edges of the given kind
    pub fn in_degree(&self, index: NodeIndex, kind: EdgeKind) -> usize {
        self.inner
            .edges_directed(index, Direction::Incoming)
            .filter(|e| e.weight().kind == kind)
            .count()
    }

    /// Nodes without incoming `Contains` edges
    pub fn roots(&self) -> Vec<NodeIndex> {
        self.inner
            .node_indices()
            .filter(|&idx| self.in_degree(idx, EdgeKind::Contains) == 0)
            .collect()
    }
}

impl Default for TypeGraph {
    fn default() -> Self {
        Self::new()
    }
}
