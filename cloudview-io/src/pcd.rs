//! PCD (Point Cloud Data) format support
//!
//! Reads the PCL header (`VERSION`, `FIELDS`, `SIZE`, `TYPE`, `COUNT`,
//! `WIDTH`, `HEIGHT`, `VIEWPOINT`, `POINTS`, `DATA`) followed by `ascii` or
//! `binary` data. Positions come from `x y z`, normals from
//! `normal_x normal_y normal_z`, and colors from a packed `rgb`/`rgba` field.

use crate::PointCloudReader;
use cloudview_core::{Error, Point3f, PointCloudData, Result, Vector3f};
use log::debug;
use std::io::BufRead;

/// Largest binary point record accepted, in bytes
const MAX_POINT_RECORD: usize = 1 << 20;
/// Upper bound on points reserved up front; columns grow past it as data is read
const MAX_PREALLOCATED_POINTS: usize = 1 << 20;

/// PCD data format variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcdDataFormat {
    Ascii,
    Binary,
    BinaryCompressed,
}

/// PCD field data types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcdFieldType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl PcdFieldType {
    fn from_type_and_size(type_str: &str, size: usize) -> Result<Self> {
        match (type_str, size) {
            ("I", 1) => Ok(PcdFieldType::I8),
            ("I", 2) => Ok(PcdFieldType::I16),
            ("I", 4) => Ok(PcdFieldType::I32),
            ("U", 1) => Ok(PcdFieldType::U8),
            ("U", 2) => Ok(PcdFieldType::U16),
            ("U", 4) => Ok(PcdFieldType::U32),
            ("F", 4) => Ok(PcdFieldType::F32),
            ("F", 8) => Ok(PcdFieldType::F64),
            _ => Err(Error::parse(format!(
                "unknown PCD field type/size combination: {}/{}",
                type_str, size
            ))),
        }
    }

    /// Size in bytes of one value
    pub fn size(&self) -> usize {
        match self {
            PcdFieldType::I8 | PcdFieldType::U8 => 1,
            PcdFieldType::I16 | PcdFieldType::U16 => 2,
            PcdFieldType::I32 | PcdFieldType::U32 | PcdFieldType::F32 => 4,
            PcdFieldType::F64 => 8,
        }
    }

    /// Decode one little-endian value as f64
    fn decode(&self, bytes: &[u8]) -> f64 {
        match self {
            PcdFieldType::I8 => bytes[0] as i8 as f64,
            PcdFieldType::U8 => bytes[0] as f64,
            PcdFieldType::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            PcdFieldType::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as f64,
            PcdFieldType::I32 => i32::from_le_bytes(le4(bytes)) as f64,
            PcdFieldType::U32 => u32::from_le_bytes(le4(bytes)) as f64,
            PcdFieldType::F32 => f32::from_le_bytes(le4(bytes)) as f64,
            PcdFieldType::F64 => f64::from_le_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ]),
        }
    }

    /// Raw 32 bits of a packed color value
    fn decode_bits(&self, bytes: &[u8]) -> u32 {
        match self {
            PcdFieldType::F32 | PcdFieldType::U32 | PcdFieldType::I32 => u32::from_le_bytes(le4(bytes)),
            other => other.decode(bytes) as u32,
        }
    }
}

fn le4(bytes: &[u8]) -> [u8; 4] {
    [bytes[0], bytes[1], bytes[2], bytes[3]]
}

/// PCD field definition
#[derive(Debug, Clone)]
pub struct PcdField {
    pub name: String,
    pub field_type: PcdFieldType,
    pub count: usize,
}

/// PCD header information
#[derive(Debug, Clone)]
pub struct PcdHeader {
    pub version: String,
    pub fields: Vec<PcdField>,
    pub width: usize,
    pub height: usize,
    pub viewpoint: [f64; 7], // tx, ty, tz, qw, qx, qy, qz
    pub data_format: PcdDataFormat,
    point_count: usize,
    point_size: usize,
    values_per_point: usize,
}

impl PcdHeader {
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    /// Bytes per point in the binary layout
    pub fn point_size(&self) -> usize {
        self.point_size
    }

    /// Numbers per row in the ascii layout
    pub fn values_per_point(&self) -> usize {
        self.values_per_point
    }

    /// Locate a field: (index of first value in an ascii row, byte offset in a binary row, field)
    fn locate(&self, name: &str) -> Option<(usize, usize, &PcdField)> {
        let mut value_index = 0;
        let mut byte_offset = 0;
        for field in &self.fields {
            if field.name == name {
                return Some((value_index, byte_offset, field));
            }
            value_index += field.count;
            byte_offset += field.field_type.size() * field.count;
        }
        None
    }

    /// Parse the header, consuming everything up to and including the `DATA` line
    pub fn read<R: BufRead>(reader: &mut R) -> Result<Self> {
        let mut version = None;
        let mut names: Vec<String> = Vec::new();
        let mut sizes: Vec<usize> = Vec::new();
        let mut types: Vec<String> = Vec::new();
        let mut counts: Vec<usize> = Vec::new();
        let mut width = None;
        let mut height = None;
        let mut viewpoint = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        let mut points = None;
        let mut data_format = None;

        let mut line = String::new();
        while data_format.is_none() {
            line.clear();
            let bytes_read = reader.read_line(&mut line).map_err(crate::decode_error)?;
            if bytes_read == 0 {
                return Err(Error::parse("unexpected end of file in PCD header"));
            }

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            let values = &parts[1..];
            match parts[0] {
                "VERSION" => version = values.first().map(|v| v.to_string()),
                "FIELDS" => names = values.iter().map(|v| v.to_string()).collect(),
                "SIZE" => sizes = parse_all(values, "SIZE")?,
                "TYPE" => types = values.iter().map(|v| v.to_string()).collect(),
                "COUNT" => counts = parse_all(values, "COUNT")?,
                "WIDTH" => width = Some(parse_one(values, "WIDTH")?),
                "HEIGHT" => height = Some(parse_one(values, "HEIGHT")?),
                "POINTS" => points = Some(parse_one(values, "POINTS")?),
                "VIEWPOINT" => {
                    if values.len() != 7 {
                        return Err(Error::parse("VIEWPOINT needs 7 values"));
                    }
                    for (slot, v) in viewpoint.iter_mut().zip(values) {
                        *slot = v
                            .parse::<f64>()
                            .map_err(|_| Error::parse(format!("invalid VIEWPOINT value: {}", v)))?;
                    }
                }
                "DATA" => {
                    data_format = Some(match values.first().copied() {
                        Some("ascii") => PcdDataFormat::Ascii,
                        Some("binary") => PcdDataFormat::Binary,
                        Some("binary_compressed") => PcdDataFormat::BinaryCompressed,
                        other => {
                            return Err(Error::parse(format!("unknown PCD DATA format: {:?}", other)))
                        }
                    })
                }
                other => {
                    return Err(Error::parse(format!("unexpected PCD header line: {}", other)));
                }
            }
        }

        let version = version.unwrap_or_else(|| "0.7".to_string());
        let data_format = data_format.ok_or_else(|| Error::parse("missing DATA in PCD header"))?;

        if names.is_empty() {
            return Err(Error::parse("missing FIELDS in PCD header"));
        }
        if counts.is_empty() {
            counts = vec![1; names.len()];
        }
        if sizes.len() != names.len() || types.len() != names.len() || counts.len() != names.len() {
            return Err(Error::parse(
                "mismatch between FIELDS, SIZE, TYPE, and COUNT declarations",
            ));
        }

        let fields = names
            .into_iter()
            .zip(sizes)
            .zip(types)
            .zip(counts)
            .map(|(((name, size), type_str), count)| {
                if count == 0 {
                    return Err(Error::parse(format!("PCD field '{}' has COUNT 0", name)));
                }
                Ok(PcdField {
                    name,
                    field_type: PcdFieldType::from_type_and_size(&type_str, size)?,
                    count,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        // POINTS alone is enough for unorganized clouds
        let (width, height) = match (width, height, points) {
            (Some(w), Some(h), _) => (w, h),
            (Some(w), None, _) => (w, 1),
            (None, _, Some(p)) => (p, 1),
            (None, _, None) => return Err(Error::parse("missing WIDTH in PCD header")),
        };
        let point_count = width.checked_mul(height).ok_or_else(|| {
            Error::parse(format!("WIDTH * HEIGHT ({} * {}) overflows", width, height))
        })?;
        if let Some(points) = points {
            if points != point_count {
                return Err(Error::parse(format!(
                    "POINTS ({}) doesn't match WIDTH * HEIGHT ({})",
                    points, point_count
                )));
            }
        }

        let mut point_size = 0usize;
        let mut values_per_point = 0usize;
        for field in &fields {
            point_size = field
                .field_type
                .size()
                .checked_mul(field.count)
                .and_then(|bytes| point_size.checked_add(bytes))
                .filter(|&total| total <= MAX_POINT_RECORD)
                .ok_or_else(|| {
                    Error::parse(format!("PCD point record exceeds {} bytes", MAX_POINT_RECORD))
                })?;
            values_per_point += field.count;
        }

        Ok(PcdHeader {
            version,
            fields,
            width,
            height,
            viewpoint,
            data_format,
            point_count,
            point_size,
            values_per_point,
        })
    }
}

fn parse_one(values: &[&str], key: &str) -> Result<usize> {
    let value = values
        .first()
        .ok_or_else(|| Error::parse(format!("{} has no value", key)))?;
    value
        .parse::<usize>()
        .map_err(|_| Error::parse(format!("invalid {} value: {}", key, value)))
}

fn parse_all(values: &[&str], key: &str) -> Result<Vec<usize>> {
    values
        .iter()
        .map(|v| {
            v.parse::<usize>()
                .map_err(|_| Error::parse(format!("invalid {} value: {}", key, v)))
        })
        .collect()
}

/// Where each attribute lives in a point record
struct FieldMap<'h> {
    xyz: [(usize, usize, &'h PcdField); 3],
    normal: Option<[(usize, usize, &'h PcdField); 3]>,
    color: Option<(usize, usize, &'h PcdField)>,
}

impl<'h> FieldMap<'h> {
    fn new(header: &'h PcdHeader) -> Result<Self> {
        let get = |name: &str| {
            header
                .locate(name)
                .ok_or_else(|| Error::parse(format!("PCD file has no '{}' field", name)))
        };
        let xyz = [get("x")?, get("y")?, get("z")?];

        let normal = match (
            header.locate("normal_x"),
            header.locate("normal_y"),
            header.locate("normal_z"),
        ) {
            (Some(nx), Some(ny), Some(nz)) => Some([nx, ny, nz]),
            _ => None,
        };
        let color = header.locate("rgb").or_else(|| header.locate("rgba"));

        Ok(Self { xyz, normal, color })
    }
}

/// Unpack a PCL packed color (0x00RRGGBB in the low 24 bits)
pub fn unpack_rgb(bits: u32) -> [u8; 3] {
    [
        ((bits >> 16) & 0xff) as u8,
        ((bits >> 8) & 0xff) as u8,
        (bits & 0xff) as u8,
    ]
}

struct Columns {
    positions: Vec<Point3f>,
    colors: Option<Vec<[u8; 3]>>,
    normals: Option<Vec<Vector3f>>,
}

impl Columns {
    fn new(map: &FieldMap<'_>, declared_points: usize) -> Self {
        let capacity = declared_points.min(MAX_PREALLOCATED_POINTS);
        Self {
            positions: Vec::with_capacity(capacity),
            colors: map.color.map(|_| Vec::with_capacity(capacity)),
            normals: map.normal.map(|_| Vec::with_capacity(capacity)),
        }
    }

    fn finish(self) -> Result<PointCloudData> {
        PointCloudData::from_columns(self.positions, self.colors, self.normals)
    }
}

pub struct PcdReader;

impl PcdReader {
    fn read_ascii<R: BufRead>(reader: &mut R, header: &PcdHeader, map: &FieldMap<'_>) -> Result<PointCloudData> {
        let expected_values = header.values_per_point();
        let mut columns = Columns::new(map, header.point_count());
        let mut line = String::new();
        let mut row = 0;

        while row < header.point_count() {
            line.clear();
            if reader.read_line(&mut line).map_err(crate::decode_error)? == 0 {
                return Err(Error::parse(format!(
                    "PCD declares {} points but data ended after {}",
                    header.point_count(),
                    row
                )));
            }
            let values: Vec<&str> = line.split_whitespace().collect();
            if values.is_empty() {
                continue;
            }
            if values.len() < expected_values {
                return Err(Error::parse(format!(
                    "PCD row {} has {} values, expected {}",
                    row,
                    values.len(),
                    expected_values
                )));
            }

            let number = |index: usize| -> Result<f64> {
                values[index]
                    .parse::<f64>()
                    .map_err(|_| Error::parse(format!("invalid number in PCD row {}: {}", row, values[index])))
            };

            let [x, y, z] = map.xyz;
            columns
                .positions
                .push(Point3f::new(number(x.0)? as f32, number(y.0)? as f32, number(z.0)? as f32));

            if let (Some([nx, ny, nz]), Some(normals)) = (map.normal, columns.normals.as_mut()) {
                normals.push(Vector3f::new(number(nx.0)? as f32, number(ny.0)? as f32, number(nz.0)? as f32));
            }
            if let (Some((index, _, field)), Some(colors)) = (map.color, columns.colors.as_mut()) {
                let bits = match field.field_type {
                    // packed floats are written as their decimal value; reinterpret the bits
                    PcdFieldType::F32 => (number(index)? as f32).to_bits(),
                    _ => number(index)? as u32,
                };
                colors.push(unpack_rgb(bits));
            }
            row += 1;
        }

        columns.finish()
    }

    fn read_binary<R: BufRead>(reader: &mut R, header: &PcdHeader, map: &FieldMap<'_>) -> Result<PointCloudData> {
        let point_size = header.point_size();
        let mut columns = Columns::new(map, header.point_count());
        let mut record = vec![0u8; point_size];

        for _ in 0..header.point_count() {
            reader.read_exact(&mut record).map_err(crate::decode_error)?;

            let value = |(_, offset, field): (usize, usize, &PcdField)| {
                field.field_type.decode(&record[offset..offset + field.field_type.size()]) as f32
            };

            let [x, y, z] = map.xyz;
            columns.positions.push(Point3f::new(value(x), value(y), value(z)));

            if let (Some([nx, ny, nz]), Some(normals)) = (map.normal, columns.normals.as_mut()) {
                normals.push(Vector3f::new(value(nx), value(ny), value(nz)));
            }
            if let (Some((_, offset, field)), Some(colors)) = (map.color, columns.colors.as_mut()) {
                let bits = field
                    .field_type
                    .decode_bits(&record[offset..offset + field.field_type.size()]);
                colors.push(unpack_rgb(bits));
            }
        }

        columns.finish()
    }
}

impl PointCloudReader for PcdReader {
    fn read_from<R: BufRead>(&self, reader: &mut R) -> Result<PointCloudData> {
        let header = PcdHeader::read(reader)?;
        debug!(
            "PCD v{} {:?}, {}x{} points, fields [{}]",
            header.version,
            header.data_format,
            header.width,
            header.height,
            header
                .fields
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let map = FieldMap::new(&header)?;
        match header.data_format {
            PcdDataFormat::Ascii => Self::read_ascii(reader, &header, &map),
            PcdDataFormat::Binary => Self::read_binary(reader, &header, &map),
            PcdDataFormat::BinaryCompressed => Err(Error::UnsupportedFormat(
                "binary_compressed PCD data is not supported".to_string(),
            )),
        }
    }
}
