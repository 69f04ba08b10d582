//! PLY format support
//!
//! Parsing of the PLY grammar itself (ascii, binary little and big endian) is
//! done by `ply-rs`; this module maps the `vertex` element onto a point cloud.

use crate::PointCloudReader;
use cloudview_core::{unit_to_u8, Error, Point3f, PointCloudData, Result, Vector3f};
use log::debug;
use ply_rs::{
    parser::Parser,
    ply::{DefaultElement, ElementDef, Property},
};
use std::io::BufRead;

/// Names a color channel may go by, in lookup order
const RED: [&str; 2] = ["red", "diffuse_red"];
const GREEN: [&str; 2] = ["green", "diffuse_green"];
const BLUE: [&str; 2] = ["blue", "diffuse_blue"];

pub struct PlyReader;

impl PointCloudReader for PlyReader {
    fn read_from<R: BufRead>(&self, reader: &mut R) -> Result<PointCloudData> {
        let parser = Parser::<DefaultElement>::new();
        let ply = parser.read_ply(reader).map_err(crate::decode_error)?;

        debug!(
            "PLY {:?} with elements [{}]",
            ply.header.encoding,
            ply.header.elements.keys().cloned().collect::<Vec<_>>().join(", ")
        );

        let vertex_def = ply
            .header
            .elements
            .get("vertex")
            .ok_or_else(|| Error::parse("PLY file has no vertex element"))?;
        for axis in ["x", "y", "z"] {
            if !vertex_def.properties.contains_key(axis) {
                return Err(Error::parse(format!(
                    "PLY vertex element has no '{}' property",
                    axis
                )));
            }
        }
        let layout = VertexLayout::from_def(vertex_def);

        let vertices: &[DefaultElement] = ply
            .payload
            .get("vertex")
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        if vertices.len() != vertex_def.count {
            return Err(Error::parse(format!(
                "PLY header declares {} vertices but {} were read",
                vertex_def.count,
                vertices.len()
            )));
        }

        let mut positions = Vec::with_capacity(vertices.len());
        let mut colors = layout.has_colors.then(|| Vec::with_capacity(vertices.len()));
        let mut normals = layout.has_normals.then(|| Vec::with_capacity(vertices.len()));

        for vertex in vertices {
            positions.push(Point3f::new(
                scalar(vertex, "x")?,
                scalar(vertex, "y")?,
                scalar(vertex, "z")?,
            ));
            if let Some(colors) = colors.as_mut() {
                colors.push([
                    color_channel(vertex, &RED)?,
                    color_channel(vertex, &GREEN)?,
                    color_channel(vertex, &BLUE)?,
                ]);
            }
            if let Some(normals) = normals.as_mut() {
                normals.push(Vector3f::new(
                    scalar(vertex, "nx")?,
                    scalar(vertex, "ny")?,
                    scalar(vertex, "nz")?,
                ));
            }
        }

        PointCloudData::from_columns(positions, colors, normals)
    }
}

/// Which optional attributes the vertex element declares
struct VertexLayout {
    has_colors: bool,
    has_normals: bool,
}

impl VertexLayout {
    fn from_def(def: &ElementDef) -> Self {
        let has = |names: &[&str]| names.iter().any(|n| def.properties.contains_key(*n));
        Self {
            has_colors: has(&RED) && has(&GREEN) && has(&BLUE),
            has_normals: ["nx", "ny", "nz"]
                .iter()
                .all(|n| def.properties.contains_key(*n)),
        }
    }
}

/// Extract a scalar property value as f32
fn scalar(element: &DefaultElement, name: &str) -> Result<f32> {
    match element.get(name) {
        Some(Property::Float(val)) => Ok(*val),
        Some(Property::Double(val)) => Ok(*val as f32),
        Some(Property::Char(val)) => Ok(*val as f32),
        Some(Property::UChar(val)) => Ok(*val as f32),
        Some(Property::Short(val)) => Ok(*val as f32),
        Some(Property::UShort(val)) => Ok(*val as f32),
        Some(Property::Int(val)) => Ok(*val as f32),
        Some(Property::UInt(val)) => Ok(*val as f32),
        Some(_) => Err(Error::parse(format!("PLY property '{}' is a list, expected a scalar", name))),
        None => Err(Error::parse(format!("PLY property '{}' missing from vertex", name))),
    }
}

/// Extract a color channel as a byte.
///
/// Integer channels are taken as 0-255; float channels as 0.0-1.0.
fn color_channel(element: &DefaultElement, names: &[&str]) -> Result<u8> {
    let value = names
        .iter()
        .find_map(|n| element.get(*n))
        .ok_or_else(|| Error::parse(format!("PLY color property '{}' missing from vertex", names[0])))?;

    match value {
        Property::UChar(val) => Ok(*val),
        Property::Char(val) => Ok((*val).max(0) as u8),
        Property::Short(val) => Ok((*val).clamp(0, 255) as u8),
        Property::UShort(val) => Ok((*val).min(255) as u8),
        Property::Int(val) => Ok((*val).clamp(0, 255) as u8),
        Property::UInt(val) => Ok((*val).min(255) as u8),
        Property::Float(val) => Ok(unit_to_u8(*val)),
        Property::Double(val) => Ok(unit_to_u8(*val as f32)),
        _ => Err(Error::parse(format!("PLY color property '{}' is a list", names[0]))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudview_core::ErrorKind;
    use std::io::Cursor;

    fn read(bytes: &[u8]) -> Result<PointCloudData> {
        PlyReader.read_from(&mut Cursor::new(bytes.to_vec()))
    }

    #[test]
    fn test_ascii_positions_only() {
        let cloud = read(
            b"ply\nformat ascii 1.0\nelement vertex 3\nproperty float x\nproperty float y\nproperty float z\nend_header\n0 0 0\n1 0 0\n0 1 0\n",
        )
        .unwrap();

        assert!(matches!(cloud, PointCloudData::Plain(_)));
        assert_eq!(
            cloud.positions(),
            vec![
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ]
        );
    }

    #[test]
    fn test_ascii_colors_normals_and_faces() {
        let cloud = read(
            b"ply
format ascii 1.0
comment made by hand
element vertex 2
property double x
property double y
property double z
property float nx
property float ny
property float nz
property uchar red
property uchar green
property uchar blue
element face 1
property list uchar int vertex_indices
end_header
0.5 1.5 2.5 0 0 1 255 128 0
-1 -2 -3 1 0 0 0 0 255
3 0 1 1
",
        )
        .unwrap();

        assert!(cloud.has_colors());
        assert!(cloud.has_normals());
        assert_eq!(cloud.len(), 2);
        assert_eq!(cloud.position(0), Some(Point3f::new(0.5, 1.5, 2.5)));
        assert_eq!(cloud.color(0), Some([255, 128, 0]));
        assert_eq!(cloud.normal(1), Some(Vector3f::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_float_colors_are_scaled() {
        let cloud = read(
            b"ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\nproperty float diffuse_red\nproperty float diffuse_green\nproperty float diffuse_blue\nend_header\n0 0 0 1.0 0.0 0.5\n",
        )
        .unwrap();
        assert_eq!(cloud.color(0), Some([255, 0, 128]));
    }

    #[test]
    fn test_binary_big_endian() {
        let mut bytes = b"ply\nformat binary_big_endian 1.0\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nend_header\n".to_vec();
        for v in [1.0f32, 2.0, 3.0, -4.0, 5.5, 6.25] {
            bytes.extend_from_slice(&v.to_be_bytes());
        }

        let cloud = read(&bytes).unwrap();
        assert_eq!(
            cloud.positions(),
            vec![Point3f::new(1.0, 2.0, 3.0), Point3f::new(-4.0, 5.5, 6.25)]
        );
    }

    #[test]
    fn test_zero_vertices_is_empty_cloud() {
        let cloud = read(
            b"ply\nformat ascii 1.0\nelement vertex 0\nproperty float x\nproperty float y\nproperty float z\nend_header\n",
        )
        .unwrap();
        assert!(cloud.is_empty());
    }

    #[test]
    fn test_missing_coordinate_property() {
        let err = read(
            b"ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nend_header\n0 0\n",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
        assert!(err.to_string().contains("'z'"));
    }

    #[test]
    fn test_no_vertex_element() {
        let err = read(
            b"ply\nformat ascii 1.0\nelement face 0\nproperty list uchar int vertex_indices\nend_header\n",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_garbage_and_empty_input() {
        assert_eq!(read(b"this is not a ply file\n").unwrap_err().kind(), ErrorKind::Parse);
        assert_eq!(read(b"").unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_truncated_binary_payload() {
        let mut bytes = b"ply\nformat binary_little_endian 1.0\nelement vertex 2\nproperty float x\nproperty float y\nproperty float z\nend_header\n".to_vec();
        for v in [1.0f32, 2.0, 3.0, 4.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(read(&bytes).unwrap_err().kind(), ErrorKind::Parse);
    }
}
