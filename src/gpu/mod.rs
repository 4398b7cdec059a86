//! wgpu backend.
//!
//! [`GpuContext`] owns the device and the window surface; [`GpuBackend`]
//! compiles one render pipeline per stage and records every stage of a
//! frame into a single command encoder that is submitted on present.

mod backend;
mod output;
mod shader_pass;
mod texture;
mod uniforms;

use std::sync::Arc;

use glam::UVec2;
use winit::window::Window;

use crate::error::GpuError;

pub use backend::GpuBackend;
pub use shader_pass::{Draw, StageDesc, StagePipeline};
pub use texture::{FieldTexture, GpuFields, SCALAR_FORMAT, VECTOR_FORMAT};
pub use uniforms::*;

pub struct GpuContext {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
}

impl GpuContext {
    pub async fn new(window: Arc<Window>) -> Result<Self, GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        log::info!("using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(GpuError::UnsupportedSurface)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        Ok(Self {
            surface,
            device,
            queue,
            config,
        })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Resize the surface. Zero-sized viewports (minimized windows) are ignored.
    pub fn resize(&mut self, viewport: UVec2) {
        if viewport.x == 0 || viewport.y == 0 {
            return;
        }
        self.config.width = viewport.x;
        self.config.height = viewport.y;
        self.surface.configure(&self.device, &self.config);
    }

    /// Reconfigure at the current size after the surface was lost or outdated.
    pub fn reconfigure(&self) {
        self.surface.configure(&self.device, &self.config);
    }
}
