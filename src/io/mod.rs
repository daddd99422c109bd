//! Surface file I/O.
//!
//! This module reads triangulated surfaces into a plain [`SurfaceMesh`]
//! (vertex positions plus triangle indices), the input of the graph builders.
//!
//! # Supported Formats
//!
//! | Format | Detected by | Load | Save |
//! |--------|-------------|------|------|
//! | FreeSurfer geometry | `lh.*` / `rh.*` names, no extension, magic bytes | ✓ | ✓ |
//! | PLY | `.ply` | ✓ | ✓ |
//!
//! # Usage
//!
//! ```no_run
//! use cortigraph::io;
//!
//! let surface = io::load("subjects/bert/surf/lh.white").unwrap();
//! let graph = surface.weighted_graph().unwrap();
//! println!("{} edges", graph.num_edges());
//! ```

pub mod freesurfer;
pub mod ply;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use nalgebra::Point3;

use crate::error::{MeshError, Result};
use crate::graph::{build_unweighted_graph, build_weighted_graph, MeshGraph, WeightedMeshGraph};

/// A triangulated surface as read from disk.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SurfaceMesh {
    /// Vertex positions; the index is the vertex id.
    pub vertices: Vec<Point3<f64>>,
    /// Triangles as vertex indices.
    pub faces: Vec<[usize; 3]>,
}

impl SurfaceMesh {
    /// Create a surface from vertex positions and triangles.
    pub fn new(vertices: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> Self {
        Self { vertices, faces }
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Axis-aligned bounding box, `None` for a surface without vertices.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = *self.vertices.first()?;
        Some(self.vertices.iter().fold((first, first), |(min, max), p| {
            (min.inf(p), max.sup(p))
        }))
    }

    /// Vertex adjacency graph of this surface.
    pub fn unweighted_graph(&self) -> Result<MeshGraph> {
        build_unweighted_graph(&self.vertices, &self.faces)
    }

    /// Vertex adjacency graph weighted by edge length.
    pub fn weighted_graph(&self) -> Result<WeightedMeshGraph> {
        build_weighted_graph(&self.vertices, &self.faces)
    }
}

/// Supported surface file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// FreeSurfer binary surface geometry.
    FreeSurfer,
    /// PLY (Stanford polygon) format.
    Ply,
}

impl Format {
    /// Detect format from a file name.
    ///
    /// FreeSurfer surfaces are named `<hemi>.<surface>` (`lh.white`,
    /// `rh.sphere.reg`), so their "extension" is the surface name.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        let path = path.as_ref();
        let name = path.file_name()?.to_str()?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("ply") => Some(Format::Ply),
            None => Some(Format::FreeSurfer),
            Some(_) if name.starts_with("lh.") || name.starts_with("rh.") => {
                Some(Format::FreeSurfer)
            }
            Some(_) => None,
        }
    }

    /// Detect format from the first bytes of a file.
    pub fn from_magic(bytes: &[u8]) -> Option<Format> {
        if freesurfer::has_magic(bytes) {
            Some(Format::FreeSurfer)
        } else if bytes.starts_with(b"ply") {
            Some(Format::Ply)
        } else {
            None
        }
    }
}

/// Load a surface with automatic format detection.
///
/// The file name decides first; files with an unrecognised extension are
/// sniffed for a known magic number.
pub fn load<P: AsRef<Path>>(path: P) -> Result<SurfaceMesh> {
    let path = path.as_ref();
    let format = match Format::from_path(path) {
        Some(format) => format,
        None => sniff(path)?,
    };

    match format {
        Format::FreeSurfer => freesurfer::read_geometry(path),
        Format::Ply => ply::load(path),
    }
}

/// Save a surface with automatic format detection.
pub fn save<P: AsRef<Path>>(surface: &SurfaceMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    match Format::from_path(path) {
        Some(Format::FreeSurfer) => {
            freesurfer::write_geometry(surface, path, "created by cortigraph")
        }
        Some(Format::Ply) => ply::save(surface, path),
        None => Err(unsupported(path)),
    }
}

fn sniff(path: &Path) -> Result<Format> {
    let mut magic = Vec::with_capacity(3);
    File::open(path)?.take(3).read_to_end(&mut magic)?;
    Format::from_magic(&magic).ok_or_else(|| unsupported(path))
}

fn unsupported(path: &Path) -> MeshError {
    MeshError::UnsupportedFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    }
}
