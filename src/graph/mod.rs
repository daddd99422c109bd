//! Vertex adjacency graphs of triangulated surfaces.
//!
//! This module derives the edge graph (1-skeleton) of a triangle mesh: one
//! node per vertex referenced by a face, one undirected edge per pair of
//! vertices sharing a face. The weighted variant attaches the Euclidean
//! length of each edge.
//!
//! # Overview
//!
//! The container type is [`MeshGraph`], generic over the per-edge payload:
//! - `MeshGraph` (`MeshGraph<()>`) - plain adjacency
//! - [`WeightedMeshGraph`] (`MeshGraph<f64>`) - adjacency with edge lengths
//!
//! Both are built from a vertex list and a face list:
//!
//! ```
//! use cortigraph::graph::{build_unweighted_graph, build_weighted_graph};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2]];
//!
//! let graph = build_unweighted_graph(&vertices, &faces).unwrap();
//! assert_eq!(graph.num_nodes(), 3);
//! assert_eq!(graph.num_edges(), 3);
//!
//! let weighted = build_weighted_graph(&vertices, &faces).unwrap();
//! assert_eq!(weighted.weight(0, 1), Some(1.0));
//! assert_eq!(weighted.weight(1, 2), weighted.weight(2, 1));
//! ```

mod builder;
pub mod shortest_path;

use std::collections::BTreeMap;

pub use builder::{
    build_unweighted_graph, build_weighted_graph, build_weighted_graph_with, edge_length,
    GraphOptions,
};

/// Undirected graph over mesh vertex indices.
///
/// Adjacency is kept in ordered maps, so node, neighbor and edge iteration
/// is deterministic (ascending vertex index) and independent of the order
/// in which faces were processed.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshGraph<W = ()> {
    adjacency: BTreeMap<usize, BTreeMap<usize, W>>,
    num_edges: usize,
}

/// Mesh graph whose edges carry their Euclidean length.
pub type WeightedMeshGraph = MeshGraph<f64>;

impl<W> Default for MeshGraph<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> MeshGraph<W> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            adjacency: BTreeMap::new(),
            num_edges: 0,
        }
    }

    /// Number of nodes.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of undirected edges.
    #[inline]
    pub fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Check if the graph has no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Iterate over node ids in ascending order.
    pub fn nodes(&self) -> impl Iterator<Item = usize> + '_ {
        self.adjacency.keys().copied()
    }

    /// Check whether `v` is a node of the graph.
    #[inline]
    pub fn contains_node(&self, v: usize) -> bool {
        self.adjacency.contains_key(&v)
    }

    /// Check whether the undirected edge `{a, b}` exists.
    pub fn contains_edge(&self, a: usize, b: usize) -> bool {
        self.adjacency
            .get(&a)
            .is_some_and(|neighbors| neighbors.contains_key(&b))
    }

    /// Iterate over the neighbors of `v` in ascending order.
    ///
    /// Yields nothing if `v` is not a node.
    pub fn neighbors(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency
            .get(&v)
            .into_iter()
            .flat_map(|neighbors| neighbors.keys().copied())
    }

    /// Number of edges incident to `v` (0 if `v` is not a node).
    pub fn degree(&self, v: usize) -> usize {
        self.adjacency.get(&v).map_or(0, BTreeMap::len)
    }

    /// Iterate over every edge once as `(a, b, payload)` with `a < b`.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, &W)> + '_ {
        self.adjacency.iter().flat_map(|(&a, neighbors)| {
            neighbors
                .range(a + 1..)
                .map(move |(&b, payload)| (a, b, payload))
        })
    }

    /// Iterate over every edge once as an `(a, b)` pair with `a < b`.
    pub fn edge_pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.edges().map(|(a, b, _)| (a, b))
    }

    /// Largest node id, if any.
    pub fn max_node(&self) -> Option<usize> {
        self.adjacency.keys().next_back().copied()
    }

    /// Drop edge payloads, keeping the topology.
    pub fn to_unweighted(&self) -> MeshGraph {
        MeshGraph {
            adjacency: self
                .adjacency
                .iter()
                .map(|(&v, neighbors)| (v, neighbors.keys().map(|&n| (n, ())).collect()))
                .collect(),
            num_edges: self.num_edges,
        }
    }
}

impl<W: Clone> MeshGraph<W> {
    /// Insert the undirected edge `{a, b}`, overwriting any existing payload.
    ///
    /// Returns `true` if the edge was not present before.
    pub(crate) fn insert_edge(&mut self, a: usize, b: usize, payload: W) -> bool {
        debug_assert_ne!(a, b, "self-loops are rejected before insertion");
        let is_new = self
            .adjacency
            .entry(a)
            .or_default()
            .insert(b, payload.clone())
            .is_none();
        self.adjacency.entry(b).or_default().insert(a, payload);
        if is_new {
            self.num_edges += 1;
        }
        is_new
    }
}

impl MeshGraph<f64> {
    /// Length of the edge `{a, b}`, or `None` if there is no such edge.
    ///
    /// `weight(a, b) == weight(b, a)` for every pair.
    pub fn weight(&self, a: usize, b: usize) -> Option<f64> {
        self.adjacency.get(&a)?.get(&b).copied()
    }

    /// Iterate over `(neighbor, edge length)` pairs of `v`.
    pub fn weighted_neighbors(&self, v: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.adjacency
            .get(&v)
            .into_iter()
            .flat_map(|neighbors| neighbors.iter().map(|(&n, &w)| (n, w)))
    }

    /// Sum of all edge lengths.
    pub fn total_weight(&self) -> f64 {
        self.edges().map(|(_, _, &w)| w).sum()
    }

    /// Average edge length, or 0.0 for a graph without edges.
    pub fn mean_edge_length(&self) -> f64 {
        if self.num_edges == 0 {
            return 0.0;
        }
        self.total_weight() / self.num_edges as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_graph() -> MeshGraph<f64> {
        let mut graph = MeshGraph::new();
        graph.insert_edge(2, 0, 1.5);
        graph.insert_edge(0, 1, 0.5);
        graph
    }

    #[test]
    fn test_empty_graph() {
        let graph: MeshGraph = MeshGraph::new();
        assert!(graph.is_empty());
        assert_eq!(graph.num_nodes(), 0);
        assert_eq!(graph.num_edges(), 0);
        assert_eq!(graph.edges().count(), 0);
        assert_eq!(graph.max_node(), None);
    }

    #[test]
    fn test_insert_edge_is_idempotent() {
        let mut graph: MeshGraph = MeshGraph::new();
        assert!(graph.insert_edge(0, 1, ()));
        assert!(!graph.insert_edge(1, 0, ()));
        assert!(!graph.insert_edge(0, 1, ()));

        assert_eq!(graph.num_nodes(), 2);
        assert_eq!(graph.num_edges(), 1);
        assert_eq!(graph.degree(0), 1);
        assert_eq!(graph.degree(1), 1);
    }

    #[test]
    fn test_edges_listed_once_in_order() {
        let graph = path_graph();
        let edges: Vec<_> = graph.edge_pairs().collect();
        assert_eq!(edges, vec![(0, 1), (0, 2)]);
    }

    #[test]
    fn test_neighbors_of_missing_node() {
        let graph = path_graph();
        assert_eq!(graph.neighbors(7).count(), 0);
        assert_eq!(graph.degree(7), 0);
        assert!(!graph.contains_node(7));
    }

    #[test]
    fn test_weight_lookup() {
        let graph = path_graph();
        assert_eq!(graph.weight(0, 2), Some(1.5));
        assert_eq!(graph.weight(2, 0), Some(1.5));
        assert_eq!(graph.weight(1, 2), None);
        assert_eq!(graph.total_weight(), 2.0);
        assert_eq!(graph.mean_edge_length(), 1.0);

        let neighbors: Vec<_> = graph.weighted_neighbors(0).collect();
        assert_eq!(neighbors, vec![(1, 0.5), (2, 1.5)]);
    }

    #[test]
    fn test_to_unweighted_keeps_topology() {
        let weighted = path_graph();
        let plain = weighted.to_unweighted();

        assert_eq!(plain.num_edges(), weighted.num_edges());
        assert_eq!(
            plain.edge_pairs().collect::<Vec<_>>(),
            weighted.edge_pairs().collect::<Vec<_>>()
        );
    }
}
