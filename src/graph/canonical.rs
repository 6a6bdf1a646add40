//! Canonical dependency graph: source path -> set of edges (§3).
//!
//! Shaped after the teacher's `debt::circular::DependencyGraph` — a plain
//! adjacency map rather than a `petgraph` wrapper — but carries the edge
//! metadata (`kind`, `weight`, `line_number`, `is_system_header`) the
//! compressed projection needs to round-trip through.

use crate::model::{DependencyEdge, DependencyKind};
use std::collections::HashMap;

/// The full, metadata-carrying dependency graph. Reports read this form;
/// `CompressedGraph` is what the suggesters traverse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyGraph {
    adjacency: HashMap<String, Vec<DependencyEdge>>,
    /// Insertion order of node paths, preserved so compression assigns ids
    /// deterministically.
    order: Vec<String>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures `path` is a node in the graph; idempotent.
    pub fn add_node(&mut self, path: impl Into<String>) {
        let path = path.into();
        if !self.adjacency.contains_key(&path) {
            self.order.push(path.clone());
            self.adjacency.insert(path, Vec::new());
        }
    }

    pub fn add_edge(&mut self, from: impl Into<String>, edge: DependencyEdge) {
        let from = from.into();
        self.add_node(from.clone());
        self.add_node(edge.target.clone());
        self.adjacency.entry(from).or_default().push(edge);
    }

    pub fn has_node(&self, path: &str) -> bool {
        self.adjacency.contains_key(path)
    }

    pub fn edges_from(&self, path: &str) -> &[DependencyEdge] {
        self.adjacency
            .get(path)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// All node paths, in insertion order.
    pub fn nodes(&self) -> &[String] {
        &self.order
    }

    pub fn node_count(&self) -> usize {
        self.order.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(Vec::len).sum()
    }
}

/// Convenience constructor used by the `CompressedGraph -> DependencyGraph`
/// round-trip (§4.2): every recovered edge has kind `DirectInclude`,
/// `line_number == 0`, `is_system_header == false` — precise edge metadata
/// is lost by design when going through the compressed form.
pub fn direct_include_edge(target: impl Into<String>, weight: f64) -> DependencyEdge {
    DependencyEdge {
        target: target.into(),
        kind: DependencyKind::DirectInclude,
        weight,
        line_number: 0,
        is_system_header: false,
    }
}
