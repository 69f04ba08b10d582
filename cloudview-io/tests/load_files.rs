//! File-level loading tests for cloudview-io
//!
//! These go through `read_point_cloud` exactly as the viewer binary does:
//! open, detect the format, parse, then apply the load filters.

use approx::assert_relative_eq;
use cloudview_core::{ErrorKind, Point3f, PointCloudData, Vector3f};
use cloudview_io::{read_point_cloud, read_point_cloud_with, FileFormat, ReadOptions};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const TRIANGLE_PLY: &str = "ply
format ascii 1.0
element vertex 3
property float x
property float y
property float z
end_header
0 0 0
1 0 0
0 1 0
";

fn write_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_three_point_ply_loads_in_order() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "bottle.ply", TRIANGLE_PLY.as_bytes());

    let cloud = read_point_cloud(&path).unwrap();

    assert_eq!(cloud.len(), 3);
    assert!(!cloud.has_colors());
    assert!(!cloud.has_normals());
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
fn test_loading_twice_gives_identical_clouds() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "bottle.ply", TRIANGLE_PLY.as_bytes());

    let first = read_point_cloud(&path).unwrap();
    let second = read_point_cloud(&path).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = read_point_cloud(dir.path().join("nope.ply")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileNotFound);
}

#[test]
fn test_malformed_file() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "broken.ply", b"ply\nformat ascii 1.0\nelement vertex 2\nproperty float x\n");
    let err = read_point_cloud(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.to_string().contains("broken.ply"));
}

#[test]
fn test_zero_byte_file_is_parse_error() {
    let dir = TempDir::new().unwrap();
    for name in ["empty.ply", "empty.xyz", "empty.pcd"] {
        let path = write_file(&dir, name, b"");
        let err = read_point_cloud(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse, "{}", name);
    }
}

#[test]
fn test_valid_file_without_points_is_empty_cloud() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "none.ply",
        b"ply\nformat ascii 1.0\nelement vertex 0\nproperty float x\nproperty float y\nproperty float z\nend_header\n",
    );
    let cloud = read_point_cloud(&path).unwrap();
    assert!(cloud.is_empty());
}

#[test]
fn test_binary_little_endian_with_colors() {
    let dir = TempDir::new().unwrap();
    let mut bytes = b"ply
format binary_little_endian 1.0
element vertex 2
property float x
property float y
property float z
property uchar red
property uchar green
property uchar blue
end_header
"
    .to_vec();
    bytes.extend_from_slice(&1.0f32.to_le_bytes());
    bytes.extend_from_slice(&2.0f32.to_le_bytes());
    bytes.extend_from_slice(&3.0f32.to_le_bytes());
    bytes.extend_from_slice(&[10, 20, 30]);
    bytes.extend_from_slice(&4.0f32.to_le_bytes());
    bytes.extend_from_slice(&5.0f32.to_le_bytes());
    bytes.extend_from_slice(&6.0f32.to_le_bytes());
    bytes.extend_from_slice(&[40, 50, 60]);
    let path = write_file(&dir, "colored.ply", &bytes);

    let cloud = read_point_cloud(&path).unwrap();
    assert!(matches!(cloud, PointCloudData::Colored(_)));
    assert_eq!(cloud.position(1), Some(Point3f::new(4.0, 5.0, 6.0)));
    assert_eq!(cloud.color(0), Some([10, 20, 30]));
    assert_eq!(cloud.color(1), Some([40, 50, 60]));
}

#[test]
fn test_unknown_extension_sniffs_header() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "scan.bin", TRIANGLE_PLY.as_bytes());
    assert_eq!(read_point_cloud(&path).unwrap().len(), 3);

    let path = write_file(&dir, "scan.dat", b"0 0 0\n1 1 1\n");
    assert_eq!(read_point_cloud(&path).unwrap_err().kind(), ErrorKind::Parse);
}

#[test]
fn test_format_override() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "scan.txt", b"0 0 0\n1 1 1\n");

    let options = ReadOptions {
        format: Some(FileFormat::Xyz),
        ..Default::default()
    };
    let cloud = read_point_cloud_with(&path, &options).unwrap();
    assert_eq!(cloud.len(), 2);
}

#[test]
fn test_nan_and_infinite_filters() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "noisy.xyz", b"0 0 0\nnan 0 0\n1 inf 1\n2 2 2\n");

    let raw = read_point_cloud(&path).unwrap();
    assert_eq!(raw.len(), 4);

    let options = ReadOptions {
        remove_nan_points: true,
        remove_infinite_points: true,
        ..Default::default()
    };
    let cleaned = read_point_cloud_with(&path, &options).unwrap();
    assert_eq!(
        cleaned.positions(),
        vec![Point3f::new(0.0, 0.0, 0.0), Point3f::new(2.0, 2.0, 2.0)]
    );
}

#[test]
fn test_pcd_file() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "scan.pcd",
        b"# .PCD v0.7 - Point Cloud Data file format
VERSION 0.7
FIELDS x y z
SIZE 4 4 4
TYPE F F F
COUNT 1 1 1
WIDTH 3
HEIGHT 1
VIEWPOINT 0 0 0 1 0 0 0
POINTS 3
DATA ascii
0 0 0
1 0 0
0 1 0
",
    );

    let from_pcd = read_point_cloud(&path).unwrap();
    let ply_path = write_file(&dir, "scan.ply", TRIANGLE_PLY.as_bytes());
    let from_ply = read_point_cloud(&ply_path).unwrap();
    assert_eq!(from_pcd, from_ply);
}

#[test]
fn test_double_precision_pcd_matches_text_file() {
    let dir = TempDir::new().unwrap();
    let mut bytes =
        b"FIELDS x y z normal_x normal_y normal_z\nSIZE 8 8 8 4 4 4\nTYPE F F F F F F\nWIDTH 1\nDATA binary\n"
            .to_vec();
    for v in [0.1f64, -2.7, 1e3] {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    for v in [0.6f32, 0.8, 0.0] {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    let from_pcd = read_point_cloud(write_file(&dir, "scan.pcd", &bytes)).unwrap();
    let from_xyzn = read_point_cloud(write_file(&dir, "scan.xyzn", b"0.1 -2.7 1000 0.6 0.8 0\n")).unwrap();

    let (a, b) = (from_pcd.position(0).unwrap(), from_xyzn.position(0).unwrap());
    assert_relative_eq!(a, b, epsilon = 1e-6);
    assert_relative_eq!(a, Point3f::new(0.1, -2.7, 1000.0), epsilon = 1e-4);
    assert_relative_eq!(from_pcd.normal(0).unwrap(), Vector3f::new(0.6, 0.8, 0.0));
    assert_relative_eq!(from_pcd.normal(0).unwrap().norm(), 1.0, epsilon = 1e-6);
}
