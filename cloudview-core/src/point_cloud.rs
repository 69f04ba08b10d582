//! Point cloud data structures and functionality

use crate::bounds::Aabb;
use crate::point::*;
use std::ops::Index;

/// A generic point cloud container. Point order is the order points were read in.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloud<T> {
    pub points: Vec<T>,
}

/// A point cloud with 3D points
pub type PointCloud3f = PointCloud<Point3f>;

/// A point cloud with colored points
pub type ColoredPointCloud3f = PointCloud<ColoredPoint3f>;

/// A point cloud with normal vectors
pub type NormalPointCloud3f = PointCloud<NormalPoint3f>;

/// A point cloud with colors and normals
pub type ColoredNormalPointCloud3f = PointCloud<ColoredNormalPoint3f>;

impl<T> PointCloud<T> {
    /// Create a new empty point cloud
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create a new point cloud with specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Create a point cloud from a vector of points
    pub fn from_points(points: Vec<T>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn push(&mut self, point: T) {
        self.points.push(point);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.points.iter()
    }

    /// Keep only the points for which `keep` returns true, preserving order
    pub fn retain<F: FnMut(&T) -> bool>(&mut self, keep: F) {
        self.points.retain(keep);
    }
}

impl<T: HasPosition> PointCloud<T> {
    /// Positions of all points, in order
    pub fn positions(&self) -> Vec<Point3f> {
        self.points.iter().map(HasPosition::position).collect()
    }

    /// Axis-aligned bounds of all positions
    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_points(self.points.iter().map(HasPosition::position))
    }

    /// Drop points whose position has a NaN coordinate.
    ///
    /// Returns how many points were removed.
    pub fn remove_nan_points(&mut self) -> usize {
        let before = self.len();
        self.retain(|p| {
            let pos = p.position();
            !(pos.x.is_nan() || pos.y.is_nan() || pos.z.is_nan())
        });
        before - self.len()
    }

    /// Drop points whose position has an infinite coordinate.
    ///
    /// Returns how many points were removed.
    pub fn remove_infinite_points(&mut self) -> usize {
        let before = self.len();
        self.retain(|p| {
            let pos = p.position();
            !(pos.x.is_infinite() || pos.y.is_infinite() || pos.z.is_infinite())
        });
        before - self.len()
    }
}

impl<T> Default for PointCloud<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<usize> for PointCloud<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}

impl<T> IntoIterator for PointCloud<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a PointCloud<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl<T> FromIterator<T> for PointCloud<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            points: Vec::from_iter(iter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_is_preserved() {
        let cloud: PointCloud3f = vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(1.0, 0.0, 0.0),
            Point3f::new(0.0, 1.0, 0.0),
        ]
        .into_iter()
        .collect();

        assert_eq!(cloud.len(), 3);
        assert_eq!(cloud[1], Point3f::new(1.0, 0.0, 0.0));
        assert_eq!(cloud.positions()[2], Point3f::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_remove_nan_and_infinite_points() {
        let mut cloud = PointCloud::from_points(vec![
            Point3f::new(0.0, 0.0, 0.0),
            Point3f::new(f32::NAN, 0.0, 0.0),
            Point3f::new(1.0, f32::INFINITY, 0.0),
            Point3f::new(2.0, 2.0, f32::NEG_INFINITY),
            Point3f::new(3.0, 3.0, 3.0),
        ]);

        assert_eq!(cloud.remove_nan_points(), 1);
        assert_eq!(cloud.len(), 4);
        assert_eq!(cloud.remove_infinite_points(), 2);
        assert_eq!(
            cloud.points,
            vec![Point3f::new(0.0, 0.0, 0.0), Point3f::new(3.0, 3.0, 3.0)]
        );
    }

    #[test]
    fn test_colored_bounding_box() {
        let cloud = PointCloud::from_points(vec![
            ColoredPoint3f {
                position: Point3f::new(-1.0, 2.0, 0.5),
                color: [255, 0, 0],
            },
            ColoredPoint3f {
                position: Point3f::new(3.0, -2.0, 1.5),
                color: [0, 255, 0],
            },
        ]);

        let bounds = cloud.bounding_box();
        assert_eq!(bounds.min, Point3f::new(-1.0, -2.0, 0.5));
        assert_eq!(bounds.max, Point3f::new(3.0, 2.0, 1.5));
    }
}
