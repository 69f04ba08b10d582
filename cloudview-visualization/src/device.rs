//! GPU device management

use cloudview_core::{Error, Result};
use log::info;

/// Adapter, device and queue for rendering into one surface
pub struct GpuContext {
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Request an adapter able to present to `surface`, and a device on it
    pub async fn new(instance: &wgpu::Instance, surface: &wgpu::Surface<'_>) -> Result<Self> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| Error::Gpu("Failed to find a graphics adapter for the window".to_string()))?;

        let adapter_info = adapter.get_info();
        info!("Using {} ({:?})", adapter_info.name, adapter_info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("cloudview device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: required_limits(&adapter.limits()),
                },
                None,
            )
            .await
            .map_err(|e| Error::Gpu(format!("Failed to create device: {}", e)))?;

        Ok(Self {
            adapter,
            device,
            queue,
        })
    }

    /// Instance over every backend the platform offers
    pub fn instance() -> wgpu::Instance {
        wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            ..Default::default()
        })
    }
}

/// Portable baseline limits, raised to the adapter's texture and buffer sizes
/// so large windows and large clouds fit
pub fn required_limits(adapter_limits: &wgpu::Limits) -> wgpu::Limits {
    wgpu::Limits {
        max_buffer_size: adapter_limits.max_buffer_size,
        ..wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter_limits.clone())
    }
}
