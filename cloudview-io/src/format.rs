//! File format identification

use cloudview_core::{Error, Result};
use std::fmt;
use std::io::BufRead;
use std::path::Path;
use std::str::FromStr;

/// On-disk point cloud formats understood by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Ply,
    Pcd,
    Xyz,
    Xyzn,
    Xyzrgb,
    Pts,
}

impl FileFormat {
    pub const ALL: [FileFormat; 6] = [
        FileFormat::Ply,
        FileFormat::Pcd,
        FileFormat::Xyz,
        FileFormat::Xyzn,
        FileFormat::Xyzrgb,
        FileFormat::Pts,
    ];

    /// Canonical lowercase name, which is also the file extension
    pub fn name(&self) -> &'static str {
        match self {
            FileFormat::Ply => "ply",
            FileFormat::Pcd => "pcd",
            FileFormat::Xyz => "xyz",
            FileFormat::Xyzn => "xyzn",
            FileFormat::Xyzrgb => "xyzrgb",
            FileFormat::Pts => "pts",
        }
    }

    /// Format implied by the extension of `path`, compared case-insensitively
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.name() == ext)
    }

    /// Format implied by the leading bytes of a file.
    ///
    /// Only the self-describing formats can be recognized this way.
    pub fn from_magic(head: &[u8]) -> Option<Self> {
        if head.starts_with(b"ply\n") || head.starts_with(b"ply\r\n") {
            return Some(FileFormat::Ply);
        }
        let text = String::from_utf8_lossy(&head[..head.len().min(64)]);
        let first = text.trim_start();
        if first.starts_with("# .PCD") || first.starts_with("VERSION") {
            return Some(FileFormat::Pcd);
        }
        None
    }

    /// Pick a format from the extension, falling back to the file header.
    ///
    /// Peeks at the buffered header without consuming it.
    pub fn detect<R: BufRead>(path: &Path, reader: &mut R) -> Result<Self> {
        if let Some(format) = Self::from_extension(path) {
            return Ok(format);
        }

        let head = reader.fill_buf().map_err(crate::decode_error)?;
        Self::from_magic(head).ok_or_else(|| {
            Error::UnsupportedFormat(format!(
                "cannot determine point cloud format of {} (extension {:?})",
                path.display(),
                path.extension().unwrap_or_default()
            ))
        })
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FileFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.name() == lower)
            .ok_or_else(|| Error::UnsupportedFormat(format!("unknown format name: {}", s)))
    }
}
