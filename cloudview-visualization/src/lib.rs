//! Visualization and rendering for point clouds
//!
//! This crate shows a loaded [`PointCloudData`](cloudview_core::PointCloudData)
//! in a window, using wgpu and winit:
//! - Display session check before any window is created
//! - Instanced point rendering with per-point or height colors
//! - Orbit camera controls

pub mod camera;
pub mod device;
pub mod environment;
pub mod renderer;
pub mod shaders;
pub mod viewer;

pub use camera::*;
pub use device::*;
pub use environment::*;
pub use renderer::*;
pub use viewer::*;
