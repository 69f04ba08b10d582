//! Point types and related functionality

use nalgebra::{Point3, Vector3};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A point with color information
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoredPoint3f {
    pub position: Point3f,
    pub color: [u8; 3],
}

/// A point with normal vector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalPoint3f {
    pub position: Point3f,
    pub normal: Vector3f,
}

/// A point with color and normal information
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoredNormalPoint3f {
    pub position: Point3f,
    pub normal: Vector3f,
    pub color: [u8; 3],
}

impl Default for ColoredPoint3f {
    fn default() -> Self {
        Self {
            position: Point3f::origin(),
            color: [255, 255, 255],
        }
    }
}

impl Default for NormalPoint3f {
    fn default() -> Self {
        Self {
            position: Point3f::origin(),
            normal: Vector3f::new(0.0, 0.0, 1.0),
        }
    }
}

impl Default for ColoredNormalPoint3f {
    fn default() -> Self {
        Self {
            position: Point3f::origin(),
            normal: Vector3f::new(0.0, 0.0, 1.0),
            color: [255, 255, 255],
        }
    }
}

/// Access to the position every point type carries
pub trait HasPosition {
    fn position(&self) -> Point3f;
}

impl HasPosition for Point3f {
    fn position(&self) -> Point3f {
        *self
    }
}

impl HasPosition for ColoredPoint3f {
    fn position(&self) -> Point3f {
        self.position
    }
}

impl HasPosition for NormalPoint3f {
    fn position(&self) -> Point3f {
        self.position
    }
}

impl HasPosition for ColoredNormalPoint3f {
    fn position(&self) -> Point3f {
        self.position
    }
}

/// Convert a unit-range float color channel to a byte, clamping out-of-range input
pub fn unit_to_u8(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(ColoredPoint3f::default().color, [255, 255, 255]);
        assert_eq!(NormalPoint3f::default().normal, Vector3f::z());
    }

    #[test]
    fn test_unit_to_u8() {
        assert_eq!(unit_to_u8(0.0), 0);
        assert_eq!(unit_to_u8(1.0), 255);
        assert_eq!(unit_to_u8(0.5), 128);
        assert_eq!(unit_to_u8(-3.0), 0);
        assert_eq!(unit_to_u8(7.0), 255);
        assert_eq!(unit_to_u8(f32::NAN), 0);
    }
}
