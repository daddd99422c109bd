//! Shortest-path distances over a weighted surface graph.
//!
//! Runs Dijkstra's algorithm on a [`WeightedMeshGraph`]. Since edge weights
//! are Euclidean edge lengths, the result is the edge-graph approximation of
//! geodesic distance along the surface.
//!
//! # Example
//!
//! ```
//! use cortigraph::graph::build_weighted_graph;
//! use cortigraph::graph::shortest_path::{dijkstra, DijkstraOptions};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let graph = build_weighted_graph(&vertices, &[[0, 1, 2]]).unwrap();
//!
//! let result = dijkstra(&graph, 0, &DijkstraOptions::default());
//! assert_eq!(result.distance(1), 1.0);
//! ```

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::WeightedMeshGraph;

/// Options for Dijkstra's algorithm.
#[derive(Debug, Clone, Default)]
pub struct DijkstraOptions {
    /// Whether to store predecessor information for path reconstruction.
    pub store_predecessors: bool,

    /// Maximum distance to explore. Vertices beyond this distance won't be visited.
    /// Set to `None` for no limit.
    pub max_distance: Option<f64>,

    /// Target vertex for early termination.
    /// If set, the algorithm stops once this vertex is settled.
    pub target: Option<usize>,
}

impl DijkstraOptions {
    /// Enable predecessor storage for path reconstruction.
    pub fn with_predecessors(mut self, store: bool) -> Self {
        self.store_predecessors = store;
        self
    }

    /// Set maximum distance to explore.
    pub fn with_max_distance(mut self, max_dist: f64) -> Self {
        self.max_distance = Some(max_dist);
        self
    }

    /// Set target vertex for early termination.
    pub fn with_target(mut self, target: usize) -> Self {
        self.target = Some(target);
        self
    }
}

/// Distances from one or more sources to every vertex id.
///
/// Indexed by vertex id up to the largest node of the graph. Ids that are
/// not nodes, or are not reachable, have distance `f64::INFINITY`.
#[derive(Debug, Clone)]
pub struct Distances {
    distances: Vec<f64>,
    predecessors: Option<Vec<Option<usize>>>,
}

impl Distances {
    /// Distance to `v`, `f64::INFINITY` if unreachable or out of range.
    #[inline]
    pub fn distance(&self, v: usize) -> f64 {
        self.distances.get(v).copied().unwrap_or(f64::INFINITY)
    }

    /// All distances as a slice.
    #[inline]
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    /// Number of vertex slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Check if `v` is reachable from the source(s).
    #[inline]
    pub fn is_reachable(&self, v: usize) -> bool {
        self.distance(v).is_finite()
    }

    /// Count the reachable vertices.
    pub fn reachable_count(&self) -> usize {
        self.distances.iter().filter(|d| d.is_finite()).count()
    }

    /// The vertex with the largest finite distance.
    pub fn farthest_vertex(&self) -> Option<(usize, f64)> {
        self.reachable_iter()
            .fold(None, |best: Option<(usize, f64)>, (v, d)| match best {
                Some((_, best_d)) if best_d >= d => best,
                _ => Some((v, d)),
            })
    }

    /// Reconstruct the shortest path from a source to `target`.
    ///
    /// Returns `None` if predecessors were not stored or `target` is
    /// unreachable. The path includes both endpoints.
    pub fn path_to(&self, target: usize) -> Option<Vec<usize>> {
        let predecessors = self.predecessors.as_ref()?;
        if !self.is_reachable(target) {
            return None;
        }

        let mut path = vec![target];
        let mut current = target;
        while let Some(pred) = predecessors[current] {
            path.push(pred);
            current = pred;
            if path.len() > self.distances.len() {
                return None;
            }
        }

        path.reverse();
        Some(path)
    }

    /// Iterate over `(vertex, distance)` for every slot.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.distances.iter().copied().enumerate()
    }

    /// Iterate over reachable vertices only.
    pub fn reachable_iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.iter().filter(|(_, d)| d.is_finite())
    }
}

#[derive(Debug, Clone)]
struct QueueEntry {
    vertex: usize,
    distance: f64,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.distance == other.distance
    }
}

impl Eq for QueueEntry {}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap
        other.distance.total_cmp(&self.distance)
    }
}

/// Distances from a single source vertex.
pub fn dijkstra(graph: &WeightedMeshGraph, source: usize, options: &DijkstraOptions) -> Distances {
    dijkstra_multiple(graph, &[source], options)
}

/// Distances from the nearest of several source vertices.
///
/// Sources that are not nodes of the graph are ignored.
pub fn dijkstra_multiple(
    graph: &WeightedMeshGraph,
    sources: &[usize],
    options: &DijkstraOptions,
) -> Distances {
    let n = graph.max_node().map_or(0, |v| v + 1);
    let mut distances = vec![f64::INFINITY; n];
    let mut predecessors = options.store_predecessors.then(|| vec![None; n]);
    let mut heap = BinaryHeap::new();

    for &source in sources {
        if graph.contains_node(source) {
            distances[source] = 0.0;
            heap.push(QueueEntry {
                vertex: source,
                distance: 0.0,
            });
        }
    }

    while let Some(QueueEntry { vertex: u, distance: dist_u }) = heap.pop() {
        if dist_u > distances[u] {
            continue;
        }
        if options.target == Some(u) {
            break;
        }
        if options.max_distance.is_some_and(|max| dist_u > max) {
            continue;
        }

        for (v, length) in graph.weighted_neighbors(u) {
            let candidate = dist_u + length;
            if candidate < distances[v] {
                distances[v] = candidate;
                if let Some(preds) = predecessors.as_mut() {
                    preds[v] = Some(u);
                }
                heap.push(QueueEntry {
                    vertex: v,
                    distance: candidate,
                });
            }
        }
    }

    if let Some(max) = options.max_distance {
        for d in distances.iter_mut().filter(|d| **d > max) {
            *d = f64::INFINITY;
        }
    }

    Distances {
        distances,
        predecessors,
    }
}
