//! Interactive point cloud viewer
//!
//! [`Viewer::display`] checks the display session, opens a window, draws the
//! cloud and blocks until the window is closed. Input handling is split into
//! plain state ([`InputState`], [`action_for_key`]) so it can be tested
//! without a window.

use std::sync::Arc;
use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, MouseButton, MouseScrollDelta, WindowEvent},
    event_loop::{ControlFlow, EventLoop, EventLoopBuilder},
    keyboard::{Key, NamedKey},
    window::WindowBuilder,
};

use cloudview_core::{Error, PointCloudData, Result};
use log::{debug, error, info, warn};

use crate::camera::Camera;
use crate::environment::{DisplayBackend, DisplayEnvironment};
use crate::renderer::{PointCloudRenderer, RenderConfig};

/// Radians of orbit per pixel dragged
const ORBIT_SPEED: f32 = 0.01;
/// Zoom amount per wheel line
const ZOOM_PER_LINE: f32 = 0.1;
/// Pixels per wheel line for touchpads reporting pixel deltas
const PIXELS_PER_LINE: f64 = 100.0;

pub const MIN_POINT_SIZE: f32 = 1.0;
pub const MAX_POINT_SIZE: f32 = 64.0;

const HELP: &[&str] = &[
    "left drag         orbit",
    "right drag        pan (also ctrl + left drag)",
    "wheel             zoom",
    "r                 reset view",
    "+ / -             grow / shrink points",
    "h                 show this help",
    "esc / q           close",
];

/// Anything that can show a loaded cloud.
///
/// The window-backed [`Viewer`] is the real implementation; tests substitute
/// their own to check what would have been shown.
pub trait PointCloudDisplay {
    /// Show `cloud`, returning once the user is done with it
    fn display(&mut self, cloud: &PointCloudData) -> Result<()>;
}

/// Window and rendering settings
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub point_size: f32,
    pub background_color: [f64; 3],
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "cloudview".to_string(),
            width: 1280,
            height: 720,
            point_size: 3.0,
            background_color: [1.0, 1.0, 1.0],
        }
    }
}

/// What a key press asks the viewer to do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewerAction {
    Close,
    ResetView,
    GrowPoints,
    ShrinkPoints,
    ShowHelp,
}

/// Map a pressed key to its viewer action
pub fn action_for_key(key: &Key) -> Option<ViewerAction> {
    match key {
        Key::Named(NamedKey::Escape) => Some(ViewerAction::Close),
        Key::Character(c) => match c.as_str() {
            "q" | "Q" => Some(ViewerAction::Close),
            "r" | "R" => Some(ViewerAction::ResetView),
            "+" | "=" => Some(ViewerAction::GrowPoints),
            "-" | "_" => Some(ViewerAction::ShrinkPoints),
            "h" | "H" => Some(ViewerAction::ShowHelp),
            _ => None,
        },
        _ => None,
    }
}

/// Step the point size by `step` pixels within the allowed range
pub fn adjust_point_size(current: f32, step: f32) -> f32 {
    (current + step).clamp(MIN_POINT_SIZE, MAX_POINT_SIZE)
}

/// Convert a wheel event to a zoom amount; positive zooms in
pub fn scroll_amount(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y * ZOOM_PER_LINE,
        MouseScrollDelta::PixelDelta(pos) => (pos.y / PIXELS_PER_LINE) as f32 * ZOOM_PER_LINE,
    }
}

/// Camera motion produced by dragging, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Drag {
    Orbit { dx: f32, dy: f32 },
    Pan { dx: f32, dy: f32 },
}

impl Drag {
    /// Apply to `camera`, given the window height in pixels
    pub fn apply(self, camera: &mut Camera, viewport_height: u32) {
        match self {
            Drag::Orbit { dx, dy } => camera.orbit(dx * ORBIT_SPEED, dy * ORBIT_SPEED),
            Drag::Pan { dx, dy } => {
                let height = viewport_height.max(1) as f32;
                camera.pan(dx / height, dy / height);
            }
        }
    }
}

/// Mouse buttons, modifiers and cursor position between events
#[derive(Debug, Default, Clone)]
pub struct InputState {
    left: bool,
    right: bool,
    ctrl: bool,
    cursor: Option<(f64, f64)>,
}

impl InputState {
    pub fn set_button(&mut self, button: MouseButton, pressed: bool) {
        match button {
            MouseButton::Left => self.left = pressed,
            MouseButton::Right => self.right = pressed,
            _ => {}
        }
    }

    pub fn set_ctrl(&mut self, ctrl: bool) {
        self.ctrl = ctrl;
    }

    /// Record the new cursor position and report the drag it made, if any
    pub fn cursor_moved(&mut self, x: f64, y: f64) -> Option<Drag> {
        let last = self.cursor.replace((x, y))?;
        let dx = (x - last.0) as f32;
        let dy = (y - last.1) as f32;

        if self.right || (self.left && self.ctrl) {
            Some(Drag::Pan { dx, dy })
        } else if self.left {
            Some(Drag::Orbit { dx, dy })
        } else {
            None
        }
    }

    /// Forget the cursor so re-entering the window does not jump
    pub fn cursor_left(&mut self) {
        self.cursor = None;
    }
}

/// Window-backed point cloud viewer
pub struct Viewer {
    config: ViewerConfig,
    environment: DisplayEnvironment,
}

impl Viewer {
    /// Create a viewer that checks the process environment for a display
    pub fn new(config: ViewerConfig) -> Self {
        Self::with_environment(config, DisplayEnvironment::from_env())
    }

    pub fn with_environment(config: ViewerConfig, environment: DisplayEnvironment) -> Self {
        Self { config, environment }
    }

    /// Show `cloud` in a window and block until the window is closed
    pub fn display(&self, cloud: &PointCloudData) -> Result<()> {
        let backend = self.environment.check()?;
        info!("Opening viewer on {} display", backend);

        if cloud.is_empty() {
            warn!("Point cloud is empty; showing an empty scene");
        }

        let event_loop = build_event_loop(backend)?;
        let window = Arc::new(
            WindowBuilder::new()
                .with_title(self.config.title.as_str())
                .with_inner_size(LogicalSize::new(self.config.width, self.config.height))
                .build(&event_loop)
                .map_err(|e| Error::environment(format!("Failed to create window: {}", e)))?,
        );

        let render_config = RenderConfig {
            point_size: self.config.point_size,
            background_color: self.config.background_color,
        };
        let mut renderer = pollster::block_on(PointCloudRenderer::new(window.clone(), render_config))?;
        renderer.set_point_cloud(cloud)?;

        let size = window.inner_size();
        let mut camera = Camera::default();
        camera.set_viewport(size.width, size.height);
        camera.fit_to_bounds(&cloud.bounding_box());

        info!("Showing {} points ({}); press h for controls", cloud.len(), cloud.attribute_summary());

        let mut input = InputState::default();
        let mut failure: Option<Error> = None;

        window.request_redraw();
        event_loop
            .run(|event, target| {
                target.set_control_flow(ControlFlow::Wait);

                let Event::WindowEvent { event, window_id } = event else {
                    return;
                };
                if window_id != window.id() {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => target.exit(),
                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                        camera.set_viewport(new_size.width, new_size.height);
                        window.request_redraw();
                    }
                    WindowEvent::ModifiersChanged(modifiers) => {
                        input.set_ctrl(modifiers.state().control_key());
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        input.set_button(button, state == ElementState::Pressed);
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        if let Some(drag) = input.cursor_moved(position.x, position.y) {
                            drag.apply(&mut camera, window.inner_size().height);
                            window.request_redraw();
                        }
                    }
                    WindowEvent::CursorLeft { .. } => input.cursor_left(),
                    WindowEvent::MouseWheel { delta, .. } => {
                        camera.zoom(scroll_amount(delta));
                        window.request_redraw();
                    }
                    WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                        match action_for_key(&event.logical_key) {
                            Some(ViewerAction::Close) => target.exit(),
                            Some(ViewerAction::ResetView) => {
                                camera.reset();
                                debug!("View reset");
                            }
                            Some(ViewerAction::GrowPoints) => {
                                renderer.config.point_size = adjust_point_size(renderer.config.point_size, 1.0);
                                debug!("Point size {}", renderer.config.point_size);
                            }
                            Some(ViewerAction::ShrinkPoints) => {
                                renderer.config.point_size = adjust_point_size(renderer.config.point_size, -1.0);
                                debug!("Point size {}", renderer.config.point_size);
                            }
                            Some(ViewerAction::ShowHelp) => {
                                for line in HELP {
                                    info!("{}", line);
                                }
                            }
                            None => return,
                        }
                        window.request_redraw();
                    }
                    WindowEvent::RedrawRequested => {
                        if let Err(e) = renderer.render(&camera) {
                            error!("Render error: {}", e);
                            failure = Some(e);
                            target.exit();
                        }
                    }
                    _ => {}
                }
            })
            .map_err(|e| Error::environment(format!("Event loop error: {}", e)))?;

        match failure {
            Some(e) => Err(e),
            None => {
                info!("Viewer closed");
                Ok(())
            }
        }
    }
}

impl PointCloudDisplay for Viewer {
    fn display(&mut self, cloud: &PointCloudData) -> Result<()> {
        Viewer::display(self, cloud)
    }
}

#[cfg(any(
    target_os = "linux",
    target_os = "dragonfly",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd"
))]
fn build_event_loop(backend: DisplayBackend) -> Result<EventLoop<()>> {
    use winit::platform::wayland::EventLoopBuilderExtWayland;
    use winit::platform::x11::EventLoopBuilderExtX11;

    let mut builder = EventLoopBuilder::new();
    match backend {
        DisplayBackend::X11 => {
            builder.with_x11();
        }
        DisplayBackend::Wayland => {
            builder.with_wayland();
        }
        DisplayBackend::Native => {}
    }
    builder
        .build()
        .map_err(|e| Error::environment(format!("Failed to create event loop on {}: {}", backend, e)))
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "dragonfly",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd"
)))]
fn build_event_loop(backend: DisplayBackend) -> Result<EventLoop<()>> {
    EventLoopBuilder::new()
        .build()
        .map_err(|e| Error::environment(format!("Failed to create event loop on {}: {}", backend, e)))
}
