//! Point cloud loading for cloudview
//!
//! This crate reads a single point cloud file into a [`PointCloudData`],
//! keeping whichever per-point attributes (colors, normals) the file carried.
//! Supported formats are PLY (ascii and binary), PCD (ascii and binary) and
//! the plain-text XYZ family (`.xyz`, `.xyzn`, `.xyzrgb`, `.pts`).
//!
//! ```rust,no_run
//! let cloud = cloudview_io::read_point_cloud("/tmp/bottle.ply")?;
//! println!("{} points", cloud.len());
//! # Ok::<(), cloudview_core::Error>(())
//! ```

pub mod format;
pub mod ply;
pub mod pcd;
pub mod xyz;

pub use format::FileFormat;

use cloudview_core::{Error, PointCloudData, Result};
use log::{debug, info, warn};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A reader for one on-disk point cloud format
pub trait PointCloudReader {
    /// Parse a complete point cloud from `reader`
    fn read_from<R: BufRead>(&self, reader: &mut R) -> Result<PointCloudData>;
}

/// Options controlling how a point cloud file is read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadOptions {
    /// Force a format instead of detecting it from the extension or header
    pub format: Option<FileFormat>,
    /// Drop points with a NaN coordinate after reading
    pub remove_nan_points: bool,
    /// Drop points with an infinite coordinate after reading
    pub remove_infinite_points: bool,
}

/// Read a point cloud, detecting the format from the extension or file header
pub fn read_point_cloud<P: AsRef<Path>>(path: P) -> Result<PointCloudData> {
    read_point_cloud_with(path, &ReadOptions::default())
}

/// Read a point cloud with explicit options
pub fn read_point_cloud_with<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<PointCloudData> {
    let path = path.as_ref();
    let mut reader = open_file(path)?;
    if reader.fill_buf().map_err(decode_error)?.is_empty() {
        return Err(Error::parse(format!("{}: file is empty", path.display())));
    }

    let format = match options.format {
        Some(format) => format,
        None => FileFormat::detect(path, &mut reader)?,
    };
    debug!("Reading {} as {}", path.display(), format);

    let mut cloud = match format {
        FileFormat::Ply => ply::PlyReader.read_from(&mut reader),
        FileFormat::Pcd => pcd::PcdReader.read_from(&mut reader),
        FileFormat::Xyz => xyz::XyzReader::new(xyz::XyzLayout::Xyz).read_from(&mut reader),
        FileFormat::Xyzn => xyz::XyzReader::new(xyz::XyzLayout::Xyzn).read_from(&mut reader),
        FileFormat::Xyzrgb => xyz::XyzReader::new(xyz::XyzLayout::Xyzrgb).read_from(&mut reader),
        FileFormat::Pts => xyz::XyzReader::new(xyz::XyzLayout::Pts).read_from(&mut reader),
    }
    .map_err(|e| with_path(e, path))?;

    if options.remove_nan_points {
        let removed = cloud.remove_nan_points();
        if removed > 0 {
            debug!("Removed {} points with NaN coordinates", removed);
        }
    }
    if options.remove_infinite_points {
        let removed = cloud.remove_infinite_points();
        if removed > 0 {
            debug!("Removed {} points with infinite coordinates", removed);
        }
    }

    if cloud.is_empty() {
        warn!("{} contains no points", path.display());
    }
    info!(
        "Loaded {} points ({}) from {}",
        cloud.len(),
        cloud.attribute_summary(),
        path.display()
    );

    Ok(cloud)
}

/// Open `path` for buffered reading, reporting a missing file as `FileNotFound`
fn open_file(path: &Path) -> Result<BufReader<File>> {
    match File::open(path) {
        Ok(file) => Ok(BufReader::new(file)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::file_not_found(path)),
        Err(e) => Err(Error::Io(e)),
    }
}

/// Prefix parse failures with the offending path
fn with_path(err: Error, path: &Path) -> Error {
    match err {
        Error::Parse(message) => Error::Parse(format!("{}: {}", path.display(), message)),
        other => other,
    }
}

/// Map an I/O error raised while decoding file content.
///
/// Truncated or syntactically invalid content is a parse failure; anything
/// else is a genuine I/O failure.
pub(crate) fn decode_error(err: std::io::Error) -> Error {
    use std::io::ErrorKind;
    match err.kind() {
        ErrorKind::InvalidInput | ErrorKind::InvalidData | ErrorKind::UnexpectedEof => {
            Error::parse(err.to_string())
        }
        _ => Error::Io(err),
    }
}
