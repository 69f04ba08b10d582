//! Core data structures for cloudview
//!
//! This crate provides the point and point cloud types shared by the loader
//! and the viewer, the bounding box used to frame a cloud, and the error
//! taxonomy every other crate reports through.

pub mod point;
pub mod point_cloud;
pub mod cloud_data;
pub mod bounds;
pub mod error;

pub use point::*;
pub use point_cloud::*;
pub use cloud_data::*;
pub use bounds::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector3};
