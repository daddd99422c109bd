//! # cortigraph
//!
//! Vertex adjacency graphs of cortical surfaces, plus the small amount of
//! FreeSurfer glue needed to get surfaces in and resampled overlays out.
//!
//! ## Features
//!
//! - **Surface graphs**: the edge graph of a triangulated surface, plain or
//!   weighted by Euclidean edge length, with strict input validation
//! - **Edge-graph geodesics**: Dijkstra distances over the weighted graph
//! - **Surface I/O**: FreeSurfer geometry files and PLY
//! - **Directory layout**: explicit subjects/sessions configuration
//! - **External tools**: `mri_vol2surf`, `mri_surf2surf`, `mri_surf2vol`
//!   behind an injectable command runner
//!
//! ## Quick Start
//!
//! ```no_run
//! use cortigraph::prelude::*;
//!
//! let layout = Layout::from_env().unwrap();
//! let graph = layout
//!     .weighted_surface_graph("bert", Hemisphere::Left, "white")
//!     .unwrap();
//!
//! println!("Nodes: {}", graph.num_nodes());
//! println!("Edges: {}", graph.num_edges());
//! println!("Mean edge length: {:.3} mm", graph.mean_edge_length());
//! ```
//!
//! ## Building Graphs Programmatically
//!
//! ```
//! use cortigraph::prelude::*;
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2], [1, 2, 3]];
//!
//! let graph = build_weighted_graph(&vertices, &faces).unwrap();
//! assert_eq!(graph.num_nodes(), 4);
//! assert_eq!(graph.num_edges(), 5);
//! assert_eq!(graph.weight(1, 2), graph.weight(2, 1));
//!
//! for neighbor in graph.neighbors(1) {
//!     println!("1 -> {}", neighbor);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod deps;
pub mod env;
pub mod error;
pub mod graph;
pub mod io;
pub mod layout;
pub mod tools;

/// Prelude module for convenient imports.
///
/// ```
/// use cortigraph::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{MeshError, Result};
    pub use crate::graph::{
        build_unweighted_graph, build_weighted_graph, build_weighted_graph_with, GraphOptions,
        MeshGraph, WeightedMeshGraph,
    };
    pub use crate::io::SurfaceMesh;
    pub use crate::layout::{Hemisphere, Layout};
    pub use crate::tools::{CommandRunner, SystemRunner};
}

// Re-export nalgebra types for convenience
pub use nalgebra;
