//! FreeSurfer surface geometry format support.
//!
//! FreeSurfer stores cortical surfaces (`lh.white`, `rh.pial`, ...) in a
//! big-endian binary format. Two variants are read:
//!
//! - **Triangle** files (magic `FF FF FE`): a "created by" comment line
//!   followed by a blank line, vertex and face counts as `i32`, then `f32`
//!   coordinates and `i32` vertex indices. Read and written with
//!   [`neuroformats`].
//! - **Quad** files (magic `FF FF FF`): 3-byte counts, coordinates stored as
//!   `i16` hundredths of a millimetre and 3-byte quad indices. Each quad is
//!   split into two triangles.
//!
//! Only triangle files are written.

use std::path::Path;

use nalgebra::Point3;
use neuroformats::{BrainMesh, FsSurface, FsSurfaceHeader};

use super::SurfaceMesh;
use crate::error::{MeshError, Result};

/// Magic number of triangle surface files.
pub const TRIANGLE_MAGIC: [u8; 3] = [0xFF, 0xFF, 0xFE];

/// Magic number of quad surface files.
pub const QUAD_MAGIC: [u8; 3] = [0xFF, 0xFF, 0xFF];

/// Check whether `bytes` start with a FreeSurfer surface magic number.
pub fn has_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(&TRIANGLE_MAGIC) || bytes.starts_with(&QUAD_MAGIC)
}

/// Read a FreeSurfer surface file.
///
/// Header counts are checked against the file length before any data is
/// read, so truncated files fail with [`MeshError::LoadError`].
///
/// # Example
///
/// ```no_run
/// use cortigraph::io::freesurfer;
///
/// let surface = freesurfer::read_geometry("subjects/bert/surf/lh.white").unwrap();
/// println!("{} vertices", surface.num_vertices());
/// ```
pub fn read_geometry<P: AsRef<Path>>(path: P) -> Result<SurfaceMesh> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;

    match data.get(..3) {
        Some(magic) if magic == TRIANGLE_MAGIC => {
            check_triangle_header(&data[3..], path)?;
            let surf = neuroformats::read_surf(path)
                .map_err(|e| MeshError::load(path, e.to_string()))?;
            from_brain_mesh(&surf.mesh, path)
        }
        Some(magic) if magic == QUAD_MAGIC => parse_quads(&data[3..], path),
        Some(magic) => Err(MeshError::load(
            path,
            format!("not a FreeSurfer surface (magic {:02X?})", magic),
        )),
        None => Err(MeshError::load(path, "file too short for a magic number")),
    }
}

/// Write a surface as a FreeSurfer triangle file.
///
/// `comment` becomes the "created by" line and must not contain newlines.
pub fn write_geometry<P: AsRef<Path>>(
    surface: &SurfaceMesh,
    path: P,
    comment: &str,
) -> Result<()> {
    let path = path.as_ref();
    if comment.contains('\n') {
        return Err(MeshError::invalid_param(
            "comment",
            comment.escape_debug(),
            "must be a single line",
        ));
    }

    let num_vertices = i32::try_from(surface.vertices.len()).map_err(|_| {
        MeshError::invalid_param("vertices", surface.vertices.len(), "too many for i32")
    })?;
    let num_faces = i32::try_from(surface.faces.len())
        .map_err(|_| MeshError::invalid_param("faces", surface.faces.len(), "too many for i32"))?;

    let faces = surface
        .faces
        .iter()
        .flatten()
        .map(|&vi| {
            i32::try_from(vi)
                .map_err(|_| MeshError::invalid_param("face index", vi, "too large for i32"))
        })
        .collect::<Result<Vec<i32>>>()?;

    let surf = FsSurface {
        header: FsSurfaceHeader {
            surf_magic: TRIANGLE_MAGIC,
            info_line: comment.to_string(),
            num_vertices,
            num_faces,
        },
        mesh: BrainMesh {
            vertices: surface
                .vertices
                .iter()
                .flat_map(|v| [v.x as f32, v.y as f32, v.z as f32])
                .collect(),
            faces,
        },
    };

    neuroformats::write_surf(path, &surf).map_err(|e| MeshError::load(path, e.to_string()))
}

fn from_brain_mesh(mesh: &BrainMesh, path: &Path) -> Result<SurfaceMesh> {
    let vertices = mesh
        .vertices
        .chunks_exact(3)
        .map(|c| Point3::new(c[0] as f64, c[1] as f64, c[2] as f64))
        .collect();

    let index = |vi: i32| {
        usize::try_from(vi)
            .map_err(|_| MeshError::load(path, format!("negative vertex index {vi}")))
    };
    let faces = mesh
        .faces
        .chunks_exact(3)
        .map(|c| Ok([index(c[0])?, index(c[1])?, index(c[2])?]))
        .collect::<Result<Vec<_>>>()?;

    Ok(SurfaceMesh::new(vertices, faces))
}

/// Reject triangle headers whose counts the rest of the file cannot hold.
///
/// `data` starts after the magic number.
fn check_triangle_header(data: &[u8], path: &Path) -> Result<()> {
    // Comment line, then the blank line that follows it
    let mut offset = 0;
    for _ in 0..2 {
        let newline = data[offset..]
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| MeshError::load(path, "unterminated header comment"))?;
        offset += newline + 1;
    }

    let counts = &data[offset..];
    let (Some(num_vertices), Some(num_faces)) = (be_i32(counts, 0), be_i32(counts, 4)) else {
        return Err(MeshError::load(path, "unexpected end of file in header"));
    };
    if num_vertices < 0 {
        return Err(MeshError::load(path, format!("negative vertex count {num_vertices}")));
    }
    if num_faces < 0 {
        return Err(MeshError::load(path, format!("negative face count {num_faces}")));
    }

    // Three f32 coordinates per vertex, three i32 indices per face
    let needed = 12 * (num_vertices as u64 + num_faces as u64);
    let available = (counts.len() - 8) as u64;
    if needed > available {
        return Err(MeshError::load(
            path,
            format!(
                "unexpected end of file: {num_vertices} vertices and {num_faces} faces \
                 need {needed} bytes, {available} present"
            ),
        ));
    }
    Ok(())
}

fn be_i32(bytes: &[u8], at: usize) -> Option<i32> {
    let word: [u8; 4] = bytes.get(at..at + 4)?.try_into().ok()?;
    Some(i32::from_be_bytes(word))
}

fn u24(bytes: &[u8]) -> usize {
    (usize::from(bytes[0]) << 16) | (usize::from(bytes[1]) << 8) | usize::from(bytes[2])
}

/// Parse a quad file; `data` starts after the magic number.
fn parse_quads(data: &[u8], path: &Path) -> Result<SurfaceMesh> {
    let (Some(num_vertices), Some(num_quads)) = (data.get(0..3), data.get(3..6)) else {
        return Err(MeshError::load(path, "unexpected end of file in header"));
    };
    let (num_vertices, num_quads) = (u24(num_vertices), u24(num_quads));

    // Three i16 coordinates per vertex, four u24 indices per quad
    let body = &data[6..];
    let vertex_bytes = 6 * num_vertices;
    let needed = vertex_bytes + 12 * num_quads;
    if body.len() < needed {
        return Err(MeshError::load(
            path,
            format!(
                "unexpected end of file: {num_vertices} vertices and {num_quads} quads \
                 need {needed} bytes, {} present",
                body.len()
            ),
        ));
    }

    let vertices = body[..vertex_bytes]
        .chunks_exact(6)
        .map(|c| {
            let coord = |i: usize| i16::from_be_bytes([c[i], c[i + 1]]) as f64 / 100.0;
            Point3::new(coord(0), coord(2), coord(4))
        })
        .collect();

    let mut faces = Vec::with_capacity(2 * num_quads);
    for quad in body[vertex_bytes..needed].chunks_exact(12) {
        let q = [0, 3, 6, 9].map(|at| u24(&quad[at..at + 3]));
        faces.extend(split_quad(q));
    }

    Ok(SurfaceMesh::new(vertices, faces))
}

/// Split a quad along the diagonal FreeSurfer picks from its first vertex's parity.
fn split_quad(q: [usize; 4]) -> [[usize; 3]; 2] {
    if q[0] % 2 == 0 {
        [[q[0], q[1], q[3]], [q[2], q[3], q[1]]]
    } else {
        [[q[0], q[1], q[2]], [q[0], q[2], q[3]]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tetrahedron() -> SurfaceMesh {
        SurfaceMesh::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.5, 1.0, 0.0),
                Point3::new(0.5, 0.5, 1.0),
            ],
            vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]],
        )
    }

    fn triangle_header(num_vertices: i32, num_faces: i32) -> Vec<u8> {
        let mut data = TRIANGLE_MAGIC.to_vec();
        data.extend_from_slice(b"created\n\n");
        data.extend_from_slice(&num_vertices.to_be_bytes());
        data.extend_from_slice(&num_faces.to_be_bytes());
        data
    }

    /// Unit square as a quad file with the given vertex order.
    fn square_quad_file(quad: [u8; 4]) -> Vec<u8> {
        let mut data = QUAD_MAGIC.to_vec();
        data.extend_from_slice(&[0, 0, 4]);
        data.extend_from_slice(&[0, 0, 1]);
        for (x, y) in [(0i16, 0i16), (100, 0), (100, 100), (0, 100)] {
            data.extend_from_slice(&x.to_be_bytes());
            data.extend_from_slice(&y.to_be_bytes());
            data.extend_from_slice(&0i16.to_be_bytes());
        }
        for vi in quad {
            data.extend_from_slice(&[0, 0, vi]);
        }
        data
    }

    fn read_bytes(name: &str, data: &[u8]) -> Result<SurfaceMesh> {
        let dir = tempdir().unwrap();
        let path = dir.path().join(name);
        std::fs::write(&path, data).unwrap();
        read_geometry(&path)
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lh.white");
        let surface = tetrahedron();

        write_geometry(&surface, &path, "created by cortigraph").unwrap();
        let loaded = read_geometry(&path).unwrap();

        assert_eq!(loaded.faces, surface.faces);
        assert_eq!(loaded.vertices, surface.vertices);
    }

    #[test]
    fn test_written_file_is_triangle_format() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rh.pial");
        write_geometry(&tetrahedron(), &path, "created by test").unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(&TRIANGLE_MAGIC));
        assert!(bytes.windows(15).any(|w| w == b"created by test"));
    }

    #[test]
    fn test_bad_magic() {
        let err = read_bytes("lh.white", b"ply\nformat ascii 1.0\n").unwrap_err();
        assert!(matches!(err, MeshError::LoadError { .. }));
        assert!(err.to_string().contains("not a FreeSurfer surface"));
    }

    #[test]
    fn test_empty_file() {
        let err = read_bytes("lh.white", b"").unwrap_err();
        assert!(matches!(err, MeshError::LoadError { .. }));
    }

    #[test]
    fn test_truncated_file() {
        let mut data = triangle_header(3, 1);
        data.extend_from_slice(&1.0f32.to_be_bytes());

        let err = read_bytes("lh.white", &data).unwrap_err();
        assert!(err.to_string().contains("unexpected end of file"));
    }

    #[test]
    fn test_huge_counts_in_short_file() {
        let data = triangle_header(i32::MAX, i32::MAX);
        assert_eq!(data.len(), 20);

        let err = read_bytes("lh.white", &data).unwrap_err();
        assert!(matches!(err, MeshError::LoadError { .. }));
        assert!(err.to_string().contains("unexpected end of file"));
    }

    #[test]
    fn test_negative_count() {
        let err = read_bytes("lh.white", &triangle_header(-1, 0)).unwrap_err();
        assert!(err.to_string().contains("negative vertex count"));
    }

    #[test]
    fn test_unterminated_comment() {
        let mut data = TRIANGLE_MAGIC.to_vec();
        data.extend_from_slice(b"created by nothing");

        let err = read_bytes("lh.white", &data).unwrap_err();
        assert!(err.to_string().contains("unterminated header comment"));
    }

    #[test]
    fn test_quad_file_even_first_vertex() {
        let surface = read_bytes("lh.orig", &square_quad_file([0, 1, 2, 3])).unwrap();

        assert_eq!(surface.num_vertices(), 4);
        assert_eq!(surface.vertices[2], Point3::new(1.0, 1.0, 0.0));
        assert_eq!(surface.faces, vec![[0, 1, 3], [2, 3, 1]]);
    }

    #[test]
    fn test_quad_file_odd_first_vertex() {
        let surface = read_bytes("lh.orig", &square_quad_file([1, 2, 3, 0])).unwrap();

        assert_eq!(surface.faces, vec![[1, 2, 3], [1, 3, 0]]);
        // Both triangles together cover the square exactly once
        let graph = surface.unweighted_graph().unwrap();
        assert_eq!(graph.num_edges(), 5);
        assert!(graph.contains_edge(1, 3));
        assert!(!graph.contains_edge(0, 2));
    }

    #[test]
    fn test_truncated_quad_file() {
        let mut data = QUAD_MAGIC.to_vec();
        data.extend_from_slice(&[0xFF, 0xFF, 0xFF]);
        data.extend_from_slice(&[0xFF, 0xFF, 0xFF]);

        let err = read_bytes("lh.orig", &data).unwrap_err();
        assert!(err.to_string().contains("unexpected end of file"));
    }

    #[test]
    fn test_multiline_comment_rejected() {
        let dir = tempdir().unwrap();
        let err = write_geometry(&tetrahedron(), dir.path().join("lh.x"), "a\nb").unwrap_err();
        assert!(matches!(err, MeshError::InvalidParameter { name: "comment", .. }));
    }
}
