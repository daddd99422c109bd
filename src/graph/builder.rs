//! Graph construction from face-vertex lists.

use nalgebra::Point3;
use rayon::prelude::*;
use tracing::debug;

use super::{MeshGraph, WeightedMeshGraph};
use crate::error::{MeshError, Result};

/// Options for weighted graph construction.
#[derive(Debug, Clone)]
pub struct GraphOptions {
    /// Whether to evaluate edge lengths in parallel (default: true).
    pub parallel: bool,

    /// Minimum number of edges before parallel evaluation kicks in.
    pub parallel_threshold: usize,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            parallel: true,
            parallel_threshold: 10_000,
        }
    }
}

impl GraphOptions {
    /// Set whether to use parallel execution.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set the minimum edge count for parallel evaluation.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }
}

/// Euclidean distance between two vertex positions.
#[inline]
pub fn edge_length(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    (a - b).norm()
}

/// Build the unweighted vertex adjacency graph of a triangle mesh.
///
/// Every face `[i, j, k]` contributes the edges `{i, j}`, `{i, k}` and
/// `{j, k}`; edges shared between faces are stored once. Only vertices
/// referenced by at least one face become nodes.
///
/// Faces are validated in order and construction stops at the first bad
/// one:
/// - a face with other than three indices gives [`MeshError::MalformedFace`]
/// - an index `>= vertices.len()` gives [`MeshError::InvalidVertexIndex`]
/// - a repeated index gives [`MeshError::DegenerateFace`]
///
/// Empty inputs produce an empty graph.
///
/// # Example
/// ```
/// use cortigraph::graph::build_unweighted_graph;
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
/// ];
/// let faces = vec![[0, 1, 2], [1, 2, 3]];
///
/// let graph = build_unweighted_graph(&vertices, &faces).unwrap();
/// assert_eq!(graph.num_nodes(), 4);
/// assert_eq!(graph.num_edges(), 5);
/// ```
pub fn build_unweighted_graph<F: AsRef<[usize]>>(
    vertices: &[Point3<f64>],
    faces: &[F],
) -> Result<MeshGraph> {
    let mut graph = MeshGraph::new();

    for (fi, face) in faces.iter().enumerate() {
        let [i, j, k] = validate_face(fi, face.as_ref(), vertices.len())?;
        graph.insert_edge(i, j, ());
        graph.insert_edge(i, k, ());
        graph.insert_edge(j, k, ());
    }

    debug!(
        vertices = vertices.len(),
        faces = faces.len(),
        nodes = graph.num_nodes(),
        edges = graph.num_edges(),
        "built surface graph"
    );

    Ok(graph)
}

/// Build the vertex adjacency graph with Euclidean edge lengths as weights.
///
/// Same traversal and validation as [`build_unweighted_graph`]. The weight of
/// `{a, b}` is `‖vertices[a] - vertices[b]‖`, computed once per unique edge,
/// so an edge shared by two triangles has the same weight whichever face
/// produced it first.
///
/// # Example
/// ```
/// use cortigraph::graph::build_weighted_graph;
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let graph = build_weighted_graph(&vertices, &[[0, 1, 2]]).unwrap();
///
/// assert_eq!(graph.weight(0, 2), Some(1.0));
/// assert!((graph.weight(1, 2).unwrap() - 2.0_f64.sqrt()).abs() < 1e-12);
/// ```
pub fn build_weighted_graph<F: AsRef<[usize]>>(
    vertices: &[Point3<f64>],
    faces: &[F],
) -> Result<WeightedMeshGraph> {
    build_weighted_graph_with(vertices, faces, &GraphOptions::default())
}

/// Build the weighted graph with explicit options.
///
/// See [`build_weighted_graph`]. The result does not depend on
/// `options.parallel`.
pub fn build_weighted_graph_with<F: AsRef<[usize]>>(
    vertices: &[Point3<f64>],
    faces: &[F],
    options: &GraphOptions,
) -> Result<WeightedMeshGraph> {
    let topology = build_unweighted_graph(vertices, faces)?;
    let pairs: Vec<(usize, usize)> = topology.edge_pairs().collect();

    let weights: Vec<f64> = if options.parallel && pairs.len() >= options.parallel_threshold {
        pairs
            .par_iter()
            .map(|&(a, b)| edge_length(&vertices[a], &vertices[b]))
            .collect()
    } else {
        pairs
            .iter()
            .map(|&(a, b)| edge_length(&vertices[a], &vertices[b]))
            .collect()
    };

    let mut graph = MeshGraph::new();
    for (&(a, b), weight) in pairs.iter().zip(weights) {
        graph.insert_edge(a, b, weight);
    }

    debug!(
        edges = graph.num_edges(),
        mean_length = graph.mean_edge_length(),
        "computed edge lengths"
    );

    Ok(graph)
}

/// Check one face and return its three indices.
fn validate_face(fi: usize, face: &[usize], num_vertices: usize) -> Result<[usize; 3]> {
    let &[i, j, k] = face else {
        return Err(MeshError::MalformedFace {
            face: fi,
            len: face.len(),
        });
    };

    for vi in [i, j, k] {
        if vi >= num_vertices {
            return Err(MeshError::InvalidVertexIndex { face: fi, vertex: vi });
        }
    }

    if i == j || j == k || i == k {
        return Err(MeshError::DegenerateFace { face: fi });
    }

    Ok([i, j, k])
}
