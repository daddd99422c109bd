//! PLY (Stanford polygon) format support.
//!
//! Surfaces exported from other toolkits are commonly exchanged as PLY.
//! Polygons with more than three vertices are fan-triangulated on load.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};
use tracing::warn;

use super::SurfaceMesh;
use crate::error::{MeshError, Result};

/// Load a surface from a PLY file.
///
/// # Example
///
/// ```no_run
/// use cortigraph::io::ply;
///
/// let surface = ply::load("lh.white.ply").unwrap();
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<SurfaceMesh> {
    let path = path.as_ref();
    let mut reader = BufReader::new(File::open(path)?);

    let parser = Parser::<DefaultElement>::new();
    let ply = parser
        .read_ply(&mut reader)
        .map_err(|e| MeshError::load(path, e.to_string()))?;

    let vertex_element = ply
        .payload
        .get("vertex")
        .ok_or_else(|| MeshError::load(path, "PLY file has no vertex element"))?;

    let mut vertices: Vec<Point3<f64>> = Vec::with_capacity(vertex_element.len());
    for vertex in vertex_element {
        let coord = |name: &str| {
            get_float_property(vertex, name)
                .ok_or_else(|| MeshError::load(path, format!("vertex missing {name} coordinate")))
        };
        vertices.push(Point3::new(coord("x")?, coord("y")?, coord("z")?));
    }

    let mut faces: Vec<[usize; 3]> = Vec::new();
    let mut polygons = 0usize;
    if let Some(face_element) = ply.payload.get("face") {
        faces.reserve(face_element.len());
        for face in face_element {
            let indices = get_list_property(face, "vertex_indices")
                .or_else(|| get_list_property(face, "vertex_index"))
                .ok_or_else(|| MeshError::load(path, "face missing vertex_indices property"))?;

            if indices.len() < 3 {
                return Err(MeshError::load(
                    path,
                    format!("face with {} vertices", indices.len()),
                ));
            }
            if indices.len() > 3 {
                polygons += 1;
            }
            for i in 1..indices.len() - 1 {
                faces.push([indices[0], indices[i], indices[i + 1]]);
            }
        }
    } else {
        warn!(path = %path.display(), "PLY file has no face element");
    }

    if polygons > 0 {
        warn!(polygons, "fan-triangulated non-triangular PLY faces");
    }

    Ok(SurfaceMesh::new(vertices, faces))
}

fn get_float_property(element: &DefaultElement, name: &str) -> Option<f64> {
    match element.get(name)? {
        Property::Float(v) => Some(*v as f64),
        Property::Double(v) => Some(*v),
        Property::Int(v) => Some(*v as f64),
        Property::UInt(v) => Some(*v as f64),
        Property::Short(v) => Some(*v as f64),
        Property::UShort(v) => Some(*v as f64),
        Property::Char(v) => Some(*v as f64),
        Property::UChar(v) => Some(*v as f64),
        _ => None,
    }
}

fn get_list_property(element: &DefaultElement, name: &str) -> Option<Vec<usize>> {
    match element.get(name)? {
        Property::ListInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUInt(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUShort(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        Property::ListUChar(v) => Some(v.iter().map(|&x| x as usize).collect()),
        _ => None,
    }
}

/// Save a surface to a PLY file (ASCII format).
pub fn save<P: AsRef<Path>>(surface: &SurfaceMesh, path: P) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);

    writeln!(writer, "ply")?;
    writeln!(writer, "format ascii 1.0")?;
    writeln!(writer, "comment Generated by cortigraph")?;
    writeln!(writer, "element vertex {}", surface.vertices.len())?;
    writeln!(writer, "property double x")?;
    writeln!(writer, "property double y")?;
    writeln!(writer, "property double z")?;
    writeln!(writer, "element face {}", surface.faces.len())?;
    writeln!(writer, "property list uchar int vertex_indices")?;
    writeln!(writer, "end_header")?;

    for v in &surface.vertices {
        writeln!(writer, "{} {} {}", v.x, v.y, v.z)?;
    }
    for f in &surface.faces {
        writeln!(writer, "3 {} {} {}", f[0], f[1], f[2])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_quad_is_fan_triangulated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quad.ply");
        std::fs::write(
            &path,
            "ply\nformat ascii 1.0\nelement vertex 4\nproperty float x\nproperty float y\n\
             property float z\nelement face 1\nproperty list uchar int vertex_indices\n\
             end_header\n0 0 0\n1 0 0\n1 1 0\n0 1 0\n4 0 1 2 3\n",
        )
        .unwrap();

        let surface = load(&path).unwrap();
        assert_eq!(surface.num_vertices(), 4);
        assert_eq!(surface.faces, vec![[0, 1, 2], [0, 2, 3]]);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tri.ply");
        let surface = SurfaceMesh::new(
            vec![
                Point3::new(0.25, 0.0, 0.0),
                Point3::new(1.0, 0.5, 0.0),
                Point3::new(0.0, 1.0, 2.0),
            ],
            vec![[0, 1, 2]],
        );

        save(&surface, &path).unwrap();
        assert_eq!(load(&path).unwrap(), surface);
    }

    #[test]
    fn test_missing_vertex_element() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.ply");
        std::fs::write(&path, "ply\nformat ascii 1.0\nend_header\n").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, MeshError::LoadError { .. }));
    }
}
