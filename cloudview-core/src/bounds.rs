//! Axis-aligned bounding boxes

use crate::point::{Point3f, Vector3f};

/// Axis-aligned bounding box over a set of positions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3f,
    pub max: Point3f,
}

impl Aabb {
    /// Bounds of `points`. An empty input yields a degenerate box at the origin.
    /// Non-finite coordinates are skipped.
    pub fn from_points<I: IntoIterator<Item = Point3f>>(points: I) -> Self {
        let mut iter = points
            .into_iter()
            .filter(|p| p.x.is_finite() && p.y.is_finite() && p.z.is_finite());

        let first = match iter.next() {
            Some(p) => p,
            None => {
                return Self {
                    min: Point3f::origin(),
                    max: Point3f::origin(),
                }
            }
        };

        let mut min = first;
        let mut max = first;
        for p in iter {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            min.z = min.z.min(p.z);

            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
            max.z = max.z.max(p.z);
        }

        Self { min, max }
    }

    pub fn center(&self) -> Point3f {
        nalgebra::center(&self.min, &self.max)
    }

    pub fn extent(&self) -> Vector3f {
        self.max - self.min
    }

    /// Length of the box diagonal
    pub fn diagonal(&self) -> f32 {
        self.extent().norm()
    }

    /// Fraction of the way `z` lies between `min.z` and `max.z`, in [0, 1].
    /// A flat box maps everything to 0.5.
    pub fn z_fraction(&self, z: f32) -> f32 {
        let range = self.max.z - self.min.z;
        if range <= f32::EPSILON {
            return 0.5;
        }
        ((z - self.min.z) / range).clamp(0.0, 1.0)
    }
}
