//! Orbit camera for 3D visualization

use cloudview_core::Aabb;
use nalgebra::{Matrix4, Perspective3, Point3, Vector3};
use std::f32::consts::FRAC_PI_2;

/// Maps OpenGL clip depth (-1..1) to wgpu clip depth (0..1)
#[rustfmt::skip]
fn opengl_to_wgpu() -> Matrix4<f32> {
    Matrix4::new(
        1.0, 0.0, 0.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        0.0, 0.0, 0.5, 0.5,
        0.0, 0.0, 0.0, 1.0,
    )
}

/// Keeps the camera off the poles, where the view basis degenerates
const PITCH_LIMIT: f32 = FRAC_PI_2 - 0.01;

/// Where the camera sits relative to its target
#[derive(Debug, Clone, Copy, PartialEq)]
struct Pose {
    target: Point3<f32>,
    distance: f32,
    yaw: f32,
    pitch: f32,
}

/// A camera orbiting a target point, Y up.
///
/// With zero yaw and pitch the camera looks down -Z.
#[derive(Debug, Clone)]
pub struct Camera {
    pose: Pose,
    home: Pose,
    /// Radius of the framed scene, used for zoom limits and clip planes
    scene_radius: f32,
    pub fov_y: f32,
    pub aspect_ratio: f32,
}

impl Camera {
    pub fn new(target: Point3<f32>, distance: f32, fov_y: f32, aspect_ratio: f32) -> Self {
        let pose = Pose {
            target,
            distance,
            yaw: 0.0,
            pitch: 0.0,
        };
        Self {
            pose,
            home: pose,
            scene_radius: distance * 0.5,
            fov_y,
            aspect_ratio,
        }
    }

    /// Frame `bounds` so the whole box is visible, and make that the reset view
    pub fn fit_to_bounds(&mut self, bounds: &Aabb) {
        let radius = (bounds.diagonal() * 0.5).max(1e-3);
        let distance = radius / (self.fov_y * 0.5).sin();
        self.scene_radius = radius;
        self.pose = Pose {
            target: bounds.center(),
            distance,
            yaw: 0.0,
            pitch: 0.0,
        };
        self.home = self.pose;
    }

    pub fn target(&self) -> Point3<f32> {
        self.pose.target
    }

    pub fn distance(&self) -> f32 {
        self.pose.distance
    }

    pub fn pitch(&self) -> f32 {
        self.pose.pitch
    }

    /// Eye position in world space
    pub fn position(&self) -> Point3<f32> {
        let Pose {
            target,
            distance,
            yaw,
            pitch,
        } = self.pose;
        let offset = Vector3::new(pitch.cos() * yaw.sin(), pitch.sin(), pitch.cos() * yaw.cos());
        target + offset * distance
    }

    /// Unit vector from the eye to the target
    pub fn forward(&self) -> Vector3<f32> {
        (self.pose.target - self.position()).normalize()
    }

    /// Unit vector pointing right on screen
    pub fn right(&self) -> Vector3<f32> {
        self.forward().cross(&Vector3::y()).normalize()
    }

    /// Unit vector pointing up on screen
    pub fn up(&self) -> Vector3<f32> {
        self.right().cross(&self.forward())
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position(), &self.pose.target, &Vector3::y())
    }

    /// Get the projection matrix, with clip planes following the zoom level
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        let near = (self.pose.distance - self.scene_radius * 2.0).max(self.pose.distance * 1e-3).max(1e-4);
        let far = self.pose.distance + self.scene_radius * 4.0;
        let perspective = Perspective3::new(self.aspect_ratio, self.fov_y, near, far);
        opengl_to_wgpu() * perspective.into_inner()
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    /// Rotate around the target by the given yaw and pitch angles in radians
    pub fn orbit(&mut self, yaw: f32, pitch: f32) {
        self.pose.yaw -= yaw;
        self.pose.pitch = (self.pose.pitch + pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Slide camera and target across the view plane.
    ///
    /// `dx`/`dy` are fractions of the visible height at the target.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let visible_height = 2.0 * self.pose.distance * (self.fov_y * 0.5).tan();
        let shift = self.right() * (-dx * visible_height) + self.up() * (dy * visible_height);
        self.pose.target += shift;
    }

    /// Move toward (positive) or away from (negative) the target
    pub fn zoom(&mut self, amount: f32) {
        let min = self.scene_radius * 1e-3;
        let max = self.scene_radius * 100.0;
        self.pose.distance = (self.pose.distance * (-amount).exp()).clamp(min, max);
    }

    /// Return to the last framed view
    pub fn reset(&mut self) {
        self.pose = self.home;
    }

    pub fn set_viewport(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.aspect_ratio = width as f32 / height as f32;
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(
            Point3::origin(),
            5.0,
            std::f32::consts::FRAC_PI_4,
            16.0 / 9.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use cloudview_core::Point3f;
    use nalgebra::Vector4;

    fn unit_cube() -> Aabb {
        Aabb::from_points(vec![Point3f::new(-1.0, -1.0, -1.0), Point3f::new(1.0, 1.0, 1.0)])
    }

    #[test]
    fn test_default_looks_down_negative_z() {
        let camera = Camera::default();
        assert_relative_eq!(camera.position(), Point3::new(0.0, 0.0, 5.0));
        assert_relative_eq!(camera.forward(), -Vector3::z());
        assert_relative_eq!(camera.right(), Vector3::x());
        assert_relative_eq!(camera.up(), Vector3::y(), epsilon = 1e-6);
    }

    #[test]
    fn test_fit_to_bounds_centers_and_contains_scene() {
        let mut camera = Camera::default();
        let bounds = Aabb::from_points(vec![Point3f::new(10.0, 0.0, 0.0), Point3f::new(12.0, 2.0, 2.0)]);
        camera.fit_to_bounds(&bounds);

        assert_relative_eq!(camera.target(), Point3::new(11.0, 1.0, 1.0));
        // the bounding sphere fits inside the vertical field of view
        let radius = bounds.diagonal() * 0.5;
        assert!(camera.distance() * (camera.fov_y * 0.5).sin() >= radius - 1e-4);
    }

    #[test]
    fn test_fitted_corners_project_inside_clip_volume() {
        let mut camera = Camera::new(Point3::origin(), 1.0, std::f32::consts::FRAC_PI_4, 1.0);
        camera.fit_to_bounds(&unit_cube());
        let view_proj = camera.view_projection();

        for x in [-1.0, 1.0] {
            for y in [-1.0, 1.0] {
                for z in [-1.0, 1.0] {
                    let clip = view_proj * Vector4::new(x, y, z, 1.0);
                    let ndc = clip.xyz() / clip.w;
                    assert!(ndc.x.abs() <= 1.0 && ndc.y.abs() <= 1.0, "{:?}", ndc);
                    assert!((0.0..=1.0).contains(&ndc.z), "{:?}", ndc);
                }
            }
        }
    }

    #[test]
    fn test_orbit_keeps_distance_and_clamps_pitch() {
        let mut camera = Camera::default();
        camera.orbit(0.7, 0.3);
        assert_relative_eq!((camera.position() - camera.target()).norm(), 5.0, epsilon = 1e-5);

        camera.orbit(0.0, 10.0);
        assert_relative_eq!(camera.pitch(), PITCH_LIMIT);
        camera.orbit(0.0, -20.0);
        assert_relative_eq!(camera.pitch(), -PITCH_LIMIT);
    }

    #[test]
    fn test_pan_moves_target_in_view_plane() {
        let mut camera = Camera::default();
        let before = camera.position() - camera.target();
        camera.pan(0.1, 0.0);

        assert!(camera.target().x < 0.0);
        assert_relative_eq!(camera.target().y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(camera.position() - camera.target(), before, epsilon = 1e-5);
    }

    #[test]
    fn test_zoom_is_bounded_and_reset_restores() {
        let mut camera = Camera::default();
        camera.fit_to_bounds(&unit_cube());
        let home = camera.distance();

        camera.zoom(1.0);
        assert!(camera.distance() < home);
        camera.zoom(-100.0);
        assert_relative_eq!(camera.distance(), 3.0_f32.sqrt() * 100.0, epsilon = 1e-3);
        camera.zoom(100.0);
        assert!(camera.distance() > 0.0);

        camera.orbit(1.0, 0.5);
        camera.reset();
        assert_relative_eq!(camera.distance(), home);
        assert_relative_eq!(camera.pitch(), 0.0);
    }

    #[test]
    fn test_set_viewport_ignores_zero_sizes() {
        let mut camera = Camera::default();
        camera.set_viewport(800, 400);
        assert_relative_eq!(camera.aspect_ratio, 2.0);
        camera.set_viewport(0, 400);
        assert_relative_eq!(camera.aspect_ratio, 2.0);
    }
}
