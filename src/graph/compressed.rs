//! Compressed dependency graph: a dense-index projection of the canonical
//! graph (§3/§4.2), arena-plus-indices, ids stable and never reused.

use super::canonical::{direct_include_edge, DependencyGraph};
use std::collections::HashMap;

/// Sentinel returned by `get_id` when the path is not in the graph.
pub const NO_ID: i64 = -1;

/// Compact, index-addressed projection of a `DependencyGraph`.
///
/// Paths are owned once by the arena (`id_to_path`); adjacency lists hold
/// ids, not references, so no borrow of the arena escapes past a lookup.
#[derive(Debug, Clone, Default)]
pub struct CompressedGraph {
    forward: Vec<Vec<i64>>,
    reverse: Vec<Vec<i64>>,
    weights: Vec<Vec<f64>>,
    id_to_path: Vec<String>,
    path_to_id: HashMap<String, i64>,
}

impl CompressedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a compressed graph from the canonical one, assigning ids in
    /// the canonical graph's node insertion order.
    pub fn from_canonical(graph: &DependencyGraph) -> Self {
        let mut compressed = Self::new();
        for path in graph.nodes() {
            compressed.add_node(path);
        }
        for path in graph.nodes() {
            for edge in graph.edges_from(path) {
                let from_id = compressed.get_id(path);
                let to_id = compressed.get_id(&edge.target);
                compressed.add_edge(from_id, to_id, edge.weight);
            }
        }
        compressed
    }

    /// Idempotent in `path`: returns the existing id if already present.
    pub fn add_node(&mut self, path: &str) -> i64 {
        if let Some(&id) = self.path_to_id.get(path) {
            return id;
        }
        let id = self.id_to_path.len() as i64;
        self.id_to_path.push(path.to_string());
        self.path_to_id.insert(path.to_string(), id);
        self.forward.push(Vec::new());
        self.reverse.push(Vec::new());
        self.weights.push(Vec::new());
        id
    }

    /// Silently a no-op if `from` or `to` is out of range (§3 invariant,
    /// preserved from the original per the Open Questions in spec.md §9).
    pub fn add_edge(&mut self, from: i64, to: i64, weight: f64) {
        if !self.has_node(from) || !self.has_node(to) {
            return;
        }
        self.forward[from as usize].push(to);
        self.weights[from as usize].push(weight);
        self.reverse[to as usize].push(from);
    }

    pub fn has_node(&self, id: i64) -> bool {
        id >= 0 && (id as usize) < self.id_to_path.len()
    }

    pub fn has_edge(&self, from: i64, to: i64) -> bool {
        if !self.has_node(from) {
            return false;
        }
        self.forward[from as usize].contains(&to)
    }

    pub fn get_neighbors(&self, id: i64) -> &[i64] {
        if self.has_node(id) {
            &self.forward[id as usize]
        } else {
            &[]
        }
    }

    pub fn get_reverse_neighbors(&self, id: i64) -> &[i64] {
        if self.has_node(id) {
            &self.reverse[id as usize]
        } else {
            &[]
        }
    }

    /// Returns `NO_ID` (-1) if `path` is absent.
    pub fn get_id(&self, path: &str) -> i64 {
        self.path_to_id.get(path).copied().unwrap_or(NO_ID)
    }

    /// Returns an empty string if `id` is absent.
    pub fn get_path(&self, id: i64) -> &str {
        if self.has_node(id) {
            &self.id_to_path[id as usize]
        } else {
            ""
        }
    }

    pub fn node_count(&self) -> usize {
        self.id_to_path.len()
    }

    pub fn edge_count(&self) -> usize {
        self.forward.iter().map(Vec::len).sum()
    }

    /// Rough byte estimate of the arena + adjacency storage, used to compare
    /// against the canonical representation's footprint.
    pub fn memory_usage_bytes(&self) -> usize {
        let path_bytes: usize = self.id_to_path.iter().map(|p| p.len() + 24).sum();
        let adjacency_bytes: usize = (self.forward.iter().map(Vec::len).sum::<usize>()
            + self.reverse.iter().map(Vec::len).sum::<usize>())
            * std::mem::size_of::<i64>();
        let weight_bytes = self.weights.iter().map(Vec::len).sum::<usize>() * std::mem::size_of::<f64>();
        path_bytes + adjacency_bytes + weight_bytes
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.reverse.clear();
        self.weights.clear();
        self.id_to_path.clear();
        self.path_to_id.clear();
    }

    /// Round-trip back to a canonical graph. Edge kind collapses to
    /// `DirectInclude`, `line_number` to 0, `is_system_header` to false —
    /// precise edge metadata does not survive compression, by design.
    pub fn to_canonical(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for path in &self.id_to_path {
            graph.add_node(path.clone());
        }
        for (from_id, targets) in self.forward.iter().enumerate() {
            let from_path = &self.id_to_path[from_id];
            let weights = &self.weights[from_id];
            for (i, &to_id) in targets.iter().enumerate() {
                let weight = weights.get(i).copied().unwrap_or(0.0);
                let to_path = self.get_path(to_id);
                graph.add_edge(from_path.clone(), direct_include_edge(to_path, weight));
            }
        }
        graph
    }
}

/// Estimated byte savings of the compressed form over the canonical one —
/// the canonical graph's per-edge metadata (strings, enums) dwarfs the
/// compressed form's plain integer adjacency.
pub fn estimate_memory_savings(original: &DependencyGraph, compressed: &CompressedGraph) -> usize {
    let original_estimate: usize = original
        .nodes()
        .iter()
        .map(|p| p.len() + 24)
        .sum::<usize>()
        + original
            .nodes()
            .iter()
            .flat_map(|p| original.edges_from(p))
            .map(|e| e.target.len() + 48)
            .sum::<usize>();
    original_estimate.saturating_sub(compressed.memory_usage_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::canonical::direct_include_edge;

    fn sample_canonical() -> DependencyGraph {
        let mut g = DependencyGraph::new();
        g.add_edge("main.cpp", direct_include_edge("utils.h", 1.0));
        g.add_edge("utils.h", direct_include_edge("types.h", 1.0));
        g.add_edge("main.cpp", direct_include_edge("config.h", 1.0));
        g.add_edge("config.h", direct_include_edge("types.h", 1.0));
        g
    }

    #[test]
    fn round_trip_preserves_node_and_edge_counts() {
        let canonical = sample_canonical();
        let compressed = CompressedGraph::from_canonical(&canonical);
        assert_eq!(compressed.node_count(), canonical.node_count());
        assert_eq!(compressed.edge_count(), canonical.edge_count());

        let round_tripped = compressed.to_canonical();
        assert_eq!(round_tripped.node_count(), canonical.node_count());
        assert_eq!(round_tripped.edge_count(), canonical.edge_count());
    }

    #[test]
    fn end_to_end_scenario_four_nodes_four_edges() {
        let canonical = sample_canonical();
        let compressed = CompressedGraph::from_canonical(&canonical);
        let back = compressed.to_canonical();
        assert_eq!(back.node_count(), 4);
        assert_eq!(back.edge_count(), 4);
    }

    #[test]
    fn add_node_idempotent_in_path() {
        let mut g = CompressedGraph::new();
        let a = g.add_node("a.h");
        let b = g.add_node("a.h");
        assert_eq!(a, b);
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn add_edge_out_of_range_is_noop() {
        let mut g = CompressedGraph::new();
        g.add_node("a.h");
        let before = g.edge_count();
        g.add_edge(0, 99, 1.0);
        g.add_edge(99, 0, 1.0);
        assert_eq!(g.edge_count(), before);
    }

    #[test]
    fn has_edge_and_neighbors_consistent() {
        let mut g = CompressedGraph::new();
        let u = g.add_node("u");
        let v = g.add_node("v");
        g.add_edge(u, v, 2.5);
        assert!(g.has_edge(u, v));
        assert!(g.get_neighbors(u).contains(&v));
        assert!(g.get_reverse_neighbors(v).contains(&u));
    }

    #[test]
    fn get_id_sentinel_for_absent_path() {
        let g = CompressedGraph::new();
        assert_eq!(g.get_id("missing"), NO_ID);
        assert_eq!(g.get_path(42), "");
    }

    #[test]
    fn multi_edges_between_same_pair_are_separate_entries() {
        let mut g = CompressedGraph::new();
        let u = g.add_node("u");
        let v = g.add_node("v");
        g.add_edge(u, v, 1.0);
        g.add_edge(u, v, 2.0);
        assert_eq!(g.edge_count(), 2);
    }
}
