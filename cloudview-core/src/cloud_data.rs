//! A loaded point cloud together with whichever per-point attributes its file carried

use crate::bounds::Aabb;
use crate::point::*;
use crate::point_cloud::*;

/// Point cloud as read from disk.
///
/// Attribute presence is uniform: either every point has a color (normal) or none does.
#[derive(Debug, Clone, PartialEq)]
pub enum PointCloudData {
    Plain(PointCloud3f),
    Colored(ColoredPointCloud3f),
    WithNormals(NormalPointCloud3f),
    ColoredWithNormals(ColoredNormalPointCloud3f),
}

impl PointCloudData {
    /// Assemble a cloud from parallel attribute columns.
    ///
    /// `colors` and `normals`, when present, must have one entry per position.
    pub fn from_columns(
        positions: Vec<Point3f>,
        colors: Option<Vec<[u8; 3]>>,
        normals: Option<Vec<Vector3f>>,
    ) -> crate::Result<Self> {
        let n = positions.len();
        if let Some(c) = &colors {
            if c.len() != n {
                return Err(crate::Error::parse(format!(
                    "color count {} does not match point count {}",
                    c.len(),
                    n
                )));
            }
        }
        if let Some(nr) = &normals {
            if nr.len() != n {
                return Err(crate::Error::parse(format!(
                    "normal count {} does not match point count {}",
                    nr.len(),
                    n
                )));
            }
        }

        Ok(match (colors, normals) {
            (None, None) => PointCloudData::Plain(PointCloud::from_points(positions)),
            (Some(colors), None) => PointCloudData::Colored(
                positions
                    .into_iter()
                    .zip(colors)
                    .map(|(position, color)| ColoredPoint3f { position, color })
                    .collect(),
            ),
            (None, Some(normals)) => PointCloudData::WithNormals(
                positions
                    .into_iter()
                    .zip(normals)
                    .map(|(position, normal)| NormalPoint3f { position, normal })
                    .collect(),
            ),
            (Some(colors), Some(normals)) => PointCloudData::ColoredWithNormals(
                positions
                    .into_iter()
                    .zip(colors)
                    .zip(normals)
                    .map(|((position, color), normal)| ColoredNormalPoint3f {
                        position,
                        normal,
                        color,
                    })
                    .collect(),
            ),
        })
    }

    pub fn len(&self) -> usize {
        match self {
            PointCloudData::Plain(c) => c.len(),
            PointCloudData::Colored(c) => c.len(),
            PointCloudData::WithNormals(c) => c.len(),
            PointCloudData::ColoredWithNormals(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_colors(&self) -> bool {
        matches!(
            self,
            PointCloudData::Colored(_) | PointCloudData::ColoredWithNormals(_)
        )
    }

    pub fn has_normals(&self) -> bool {
        matches!(
            self,
            PointCloudData::WithNormals(_) | PointCloudData::ColoredWithNormals(_)
        )
    }

    /// Position of point `index`
    pub fn position(&self, index: usize) -> Option<Point3f> {
        match self {
            PointCloudData::Plain(c) => c.points.get(index).copied(),
            PointCloudData::Colored(c) => c.points.get(index).map(|p| p.position),
            PointCloudData::WithNormals(c) => c.points.get(index).map(|p| p.position),
            PointCloudData::ColoredWithNormals(c) => c.points.get(index).map(|p| p.position),
        }
    }

    /// Color of point `index`, if the cloud carries colors
    pub fn color(&self, index: usize) -> Option<[u8; 3]> {
        match self {
            PointCloudData::Colored(c) => c.points.get(index).map(|p| p.color),
            PointCloudData::ColoredWithNormals(c) => c.points.get(index).map(|p| p.color),
            _ => None,
        }
    }

    /// Normal of point `index`, if the cloud carries normals
    pub fn normal(&self, index: usize) -> Option<Vector3f> {
        match self {
            PointCloudData::WithNormals(c) => c.points.get(index).map(|p| p.normal),
            PointCloudData::ColoredWithNormals(c) => c.points.get(index).map(|p| p.normal),
            _ => None,
        }
    }

    /// All positions, in file order
    pub fn positions(&self) -> Vec<Point3f> {
        match self {
            PointCloudData::Plain(c) => c.positions(),
            PointCloudData::Colored(c) => c.positions(),
            PointCloudData::WithNormals(c) => c.positions(),
            PointCloudData::ColoredWithNormals(c) => c.positions(),
        }
    }

    pub fn bounding_box(&self) -> Aabb {
        match self {
            PointCloudData::Plain(c) => c.bounding_box(),
            PointCloudData::Colored(c) => c.bounding_box(),
            PointCloudData::WithNormals(c) => c.bounding_box(),
            PointCloudData::ColoredWithNormals(c) => c.bounding_box(),
        }
    }

    /// Remove points with NaN coordinates; returns the number removed
    pub fn remove_nan_points(&mut self) -> usize {
        match self {
            PointCloudData::Plain(c) => c.remove_nan_points(),
            PointCloudData::Colored(c) => c.remove_nan_points(),
            PointCloudData::WithNormals(c) => c.remove_nan_points(),
            PointCloudData::ColoredWithNormals(c) => c.remove_nan_points(),
        }
    }

    /// Remove points with infinite coordinates; returns the number removed
    pub fn remove_infinite_points(&mut self) -> usize {
        match self {
            PointCloudData::Plain(c) => c.remove_infinite_points(),
            PointCloudData::Colored(c) => c.remove_infinite_points(),
            PointCloudData::WithNormals(c) => c.remove_infinite_points(),
            PointCloudData::ColoredWithNormals(c) => c.remove_infinite_points(),
        }
    }

    /// Short human-readable description of the attributes carried
    pub fn attribute_summary(&self) -> &'static str {
        match self {
            PointCloudData::Plain(_) => "positions",
            PointCloudData::Colored(_) => "positions, colors",
            PointCloudData::WithNormals(_) => "positions, normals",
            PointCloudData::ColoredWithNormals(_) => "positions, colors, normals",
        }
    }
}

impl Default for PointCloudData {
    fn default() -> Self {
        PointCloudData::Plain(PointCloud::new())
    }
}

impl From<PointCloud3f> for PointCloudData {
    fn from(cloud: PointCloud3f) -> Self {
        PointCloudData::Plain(cloud)
    }
}

impl From<ColoredPointCloud3f> for PointCloudData {
    fn from(cloud: ColoredPointCloud3f) -> Self {
        PointCloudData::Colored(cloud)
    }
}
