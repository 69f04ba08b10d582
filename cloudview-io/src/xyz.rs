//! Plain-text XYZ family formats
//!
//! One point per line, whitespace or comma separated:
//! - `.xyz`    : `x y z`
//! - `.xyzn`   : `x y z nx ny nz`
//! - `.xyzrgb` : `x y z r g b` with color channels in 0.0-1.0
//! - `.pts`    : optional leading point count, then `x y z [intensity] [r g b]`
//!   with color channels in 0-255
//!
//! Blank lines and lines starting with `#` are skipped.

use crate::PointCloudReader;
use cloudview_core::{unit_to_u8, Error, Point3f, PointCloudData, Result, Vector3f};
use std::io::BufRead;

/// Column layout of an XYZ family file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XyzLayout {
    Xyz,
    Xyzn,
    Xyzrgb,
    Pts,
}

pub struct XyzReader {
    layout: XyzLayout,
}

impl XyzReader {
    pub fn new(layout: XyzLayout) -> Self {
        Self { layout }
    }
}

/// Split a data line on whitespace and/or commas
fn fields(line: &str) -> Vec<&str> {
    line.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_values(parts: &[&str], line_no: usize) -> Result<Vec<f32>> {
    parts
        .iter()
        .map(|s| {
            s.parse::<f32>()
                .map_err(|_| Error::parse(format!("line {}: invalid number '{}'", line_no, s)))
        })
        .collect()
}

impl PointCloudReader for XyzReader {
    fn read_from<R: BufRead>(&self, reader: &mut R) -> Result<PointCloudData> {
        let mut positions = Vec::new();
        let mut colors: Option<Vec<[u8; 3]>> = None;
        let mut normals: Option<Vec<Vector3f>> = None;
        let mut pts_columns: Option<usize> = None;
        let mut declared_count: Option<usize> = None;

        let mut line = String::new();
        let mut line_no = 0;
        loop {
            line.clear();
            if reader.read_line(&mut line).map_err(crate::decode_error)? == 0 {
                break;
            }
            line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let parts = fields(trimmed);

            // a .pts file may open with the number of points on its own line
            if self.layout == XyzLayout::Pts && positions.is_empty() && declared_count.is_none() && parts.len() == 1 {
                let count = parts[0]
                    .parse::<usize>()
                    .map_err(|_| Error::parse(format!("line {}: invalid point count '{}'", line_no, parts[0])))?;
                declared_count = Some(count);
                continue;
            }

            let values = parse_values(&parts, line_no)?;
            let required = match self.layout {
                XyzLayout::Xyz => 3,
                XyzLayout::Xyzn | XyzLayout::Xyzrgb => 6,
                XyzLayout::Pts => {
                    // column count is fixed by the first data row
                    let columns = *pts_columns.get_or_insert(values.len());
                    if !matches!(columns, 3 | 4 | 6 | 7) {
                        return Err(Error::parse(format!(
                            "line {}: .pts rows need 3, 4, 6 or 7 columns, found {}",
                            line_no, columns
                        )));
                    }
                    columns
                }
            };
            if values.len() < required {
                return Err(Error::parse(format!(
                    "line {}: expected {} columns, found {}",
                    line_no,
                    required,
                    values.len()
                )));
            }

            positions.push(Point3f::new(values[0], values[1], values[2]));
            match self.layout {
                XyzLayout::Xyz => {}
                XyzLayout::Xyzn => normals
                    .get_or_insert_with(Vec::new)
                    .push(Vector3f::new(values[3], values[4], values[5])),
                XyzLayout::Xyzrgb => colors.get_or_insert_with(Vec::new).push([
                    unit_to_u8(values[3]),
                    unit_to_u8(values[4]),
                    unit_to_u8(values[5]),
                ]),
                XyzLayout::Pts => {
                    let first = match required {
                        6 => Some(3),
                        7 => Some(4),
                        _ => None,
                    };
                    if let Some(first) = first {
                        let channel = |v: f32| v.clamp(0.0, 255.0).round() as u8;
                        colors.get_or_insert_with(Vec::new).push([
                            channel(values[first]),
                            channel(values[first + 1]),
                            channel(values[first + 2]),
                        ]);
                    }
                }
            }
        }

        if let Some(count) = declared_count {
            if count != positions.len() {
                return Err(Error::parse(format!(
                    ".pts header declares {} points but {} were read",
                    count,
                    positions.len()
                )));
            }
        }

        PointCloudData::from_columns(positions, colors, normals)
    }
}
