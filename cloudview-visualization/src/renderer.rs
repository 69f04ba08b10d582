//! Rendering engine
//!
//! Points are uploaded once as an instance buffer and drawn as screen-aligned
//! squares; only the small uniform block changes from frame to frame.

use crate::camera::Camera;
use crate::device::GpuContext;
use crate::shaders::{FRAGMENT_ENTRY, POINT_SHADER, VERTEX_ENTRY, VERTICES_PER_POINT};
use bytemuck::{Pod, Zeroable};
use cloudview_core::{Error, PointCloudData, Result};
use log::{debug, warn};
use std::sync::Arc;
use wgpu::util::DeviceExt;
use winit::window::Window;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Per-point instance data
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct PointInstance {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl PointInstance {
    /// Instance buffer layout descriptor
    pub fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<PointInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                // Position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                // Color
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Uniform block shared by every point; matches `Uniforms` in the shader
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct PointUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub viewport: [f32; 2],
    pub point_size: f32,
    pub _padding: f32,
}

/// Jet colormap: dark blue at 0, through cyan, yellow, to dark red at 1
pub fn jet(t: f32) -> [f32; 3] {
    let t = t.clamp(0.0, 1.0);
    let channel = |center: f32| (1.5 - (4.0 * t - center).abs()).clamp(0.0, 1.0);
    [channel(3.0), channel(2.0), channel(1.0)]
}

/// Convert an sRGB-encoded channel in 0.0-1.0 to linear light
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Build one instance per point.
///
/// Stored colors are used when the cloud has them; otherwise points are
/// colored by height (Z) across the cloud's bounds. `linear_output` converts
/// colors for an sRGB render target, which expects linear values.
pub fn build_instances(cloud: &PointCloudData, linear_output: bool) -> Vec<PointInstance> {
    let bounds = cloud.bounding_box();
    let encode = |c: [f32; 3]| {
        if linear_output {
            c.map(srgb_to_linear)
        } else {
            c
        }
    };

    cloud
        .positions()
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            let color = match cloud.color(i) {
                Some(rgb) => rgb.map(|c| c as f32 / 255.0),
                None => jet(bounds.z_fraction(p.z)),
            };
            PointInstance {
                position: [p.x, p.y, p.z],
                color: encode(color),
            }
        })
        .collect()
}

/// Byte size of the instance buffer for `points` points.
///
/// Fails when the buffer would exceed `max_buffer_size` or the instance
/// count does not fit a draw call.
pub fn instance_buffer_size(points: usize, max_buffer_size: u64) -> Result<u64> {
    let stride = std::mem::size_of::<PointInstance>() as u64;
    let size = u32::try_from(points)
        .ok()
        .and_then(|count| u64::from(count).checked_mul(stride))
        .filter(|&size| size <= max_buffer_size)
        .ok_or_else(|| {
            Error::Gpu(format!(
                "{} points need more than the device's {} byte buffer limit",
                points, max_buffer_size
            ))
        })?;
    Ok(size)
}

/// Rendering configuration
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Edge length of each point square, in pixels
    pub point_size: f32,
    pub background_color: [f64; 3],
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            point_size: 3.0,
            background_color: [1.0, 1.0, 1.0],
        }
    }
}

/// GPU point cloud renderer bound to one window
pub struct PointCloudRenderer {
    gpu: GpuContext,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    depth_view: wgpu::TextureView,
    instances: Option<(wgpu::Buffer, u32)>,
    pub config: RenderConfig,
}

impl PointCloudRenderer {
    /// Create the surface, device and pipeline for `window`
    pub async fn new(window: Arc<Window>, config: RenderConfig) -> Result<Self> {
        let instance = GpuContext::instance();
        let size = window.inner_size();

        let surface = instance
            .create_surface(window)
            .map_err(|e| Error::environment(format!("Failed to create surface: {}", e)))?;
        let gpu = GpuContext::new(&instance, &surface).await?;

        let surface_caps = surface.get_capabilities(&gpu.adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| Error::Gpu("Surface reports no supported formats".to_string()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&gpu.device, &surface_config);
        debug!("Surface configured as {:?} {}x{}", surface_format, surface_config.width, surface_config.height);

        let uniform_buffer = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Point Uniform Buffer"),
            size: std::mem::size_of::<PointUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group_layout = gpu.device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("point_uniform_bind_group_layout"),
        });

        let uniform_bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
            label: Some("point_uniform_bind_group"),
        });

        let shader = gpu.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Point Shader"),
            source: wgpu::ShaderSource::Wgsl(POINT_SHADER.into()),
        });

        let pipeline_layout = gpu.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Point Render Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = gpu.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Point Render Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: VERTEX_ENTRY,
                buffers: &[PointInstance::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: FRAGMENT_ENTRY,
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        let depth_view = create_depth_view(&gpu.device, &surface_config);

        Ok(Self {
            gpu,
            surface,
            surface_config,
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            depth_view,
            instances: None,
            config,
        })
    }

    /// Whether stored colors must be linearized before upload
    pub fn needs_linear_colors(&self) -> bool {
        self.surface_config.format.is_srgb()
    }

    /// Upload the cloud to the GPU, replacing anything shown before
    pub fn set_point_cloud(&mut self, cloud: &PointCloudData) -> Result<()> {
        instance_buffer_size(cloud.len(), self.gpu.device.limits().max_buffer_size)?;
        let instances = build_instances(cloud, self.needs_linear_colors());
        if instances.is_empty() {
            self.instances = None;
            return Ok(());
        }

        let buffer = self.gpu.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Point Instance Buffer"),
            contents: bytemuck::cast_slice(&instances),
            usage: wgpu::BufferUsages::VERTEX,
        });
        self.instances = Some((buffer, instances.len() as u32));
        Ok(())
    }

    /// Resize renderer surface
    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.surface_config.width = new_size.width;
            self.surface_config.height = new_size.height;
            self.surface.configure(&self.gpu.device, &self.surface_config);
            self.depth_view = create_depth_view(&self.gpu.device, &self.surface_config);
        }
    }

    /// Draw one frame from `camera`'s point of view
    pub fn render(&mut self, camera: &Camera) -> Result<()> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                // skip this frame; the next one draws into the reconfigured surface
                self.surface.configure(&self.gpu.device, &self.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("Timed out acquiring the next frame");
                return Ok(());
            }
            Err(e) => return Err(Error::Gpu(format!("Failed to get surface texture: {}", e))),
        };

        let uniforms = PointUniforms {
            view_proj: camera.view_projection().into(),
            viewport: [self.surface_config.width as f32, self.surface_config.height as f32],
            point_size: self.config.point_size,
            _padding: 0.0,
        };
        self.gpu
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.gpu.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Point Render Encoder"),
        });

        {
            let [r, g, b] = if self.needs_linear_colors() {
                self.config.background_color.map(|c| srgb_to_linear(c as f32) as f64)
            } else {
                self.config.background_color
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Point Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a: 1.0 }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some((buffer, count)) = &self.instances {
                render_pass.set_pipeline(&self.pipeline);
                render_pass.set_bind_group(0, &self.uniform_bind_group, &[]);
                render_pass.set_vertex_buffer(0, buffer.slice(..));
                render_pass.draw(0..VERTICES_PER_POINT, 0..*count);
            }
        }

        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

fn create_depth_view(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}
