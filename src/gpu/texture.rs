//! Field textures.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::grid::{GridSize, PingPong};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Two-channel velocity and four-channel colour fields.
pub const VECTOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Pressure, divergence and curl.
pub const SCALAR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R32Float;

/// A grid-sized texture that stages render into and read from.
///
/// Each texture carries a unique id so a pass can refuse to bind its own
/// render target as an input.
#[derive(Debug)]
pub struct FieldTexture {
    id: u64,
    size: GridSize,
    format: wgpu::TextureFormat,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl FieldTexture {
    /// Allocate a zero-initialized field texture.
    pub fn new(device: &wgpu::Device, label: &str, size: GridSize, format: wgpu::TextureFormat) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            size,
            format,
            texture,
            view,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn size(&self) -> GridSize {
        self.size
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }
}

impl PingPong<FieldTexture> {
    pub fn textures(device: &wgpu::Device, label: &str, size: GridSize, format: wgpu::TextureFormat) -> Self {
        PingPong::new(
            FieldTexture::new(device, &format!("{label} A"), size, format),
            FieldTexture::new(device, &format!("{label} B"), size, format),
        )
    }
}

/// Every field texture the solver uses, recreated on resize.
#[derive(Debug)]
pub struct GpuFields {
    pub velocity: PingPong<FieldTexture>,
    pub viscous: PingPong<FieldTexture>,
    pub pressure: PingPong<FieldTexture>,
    pub density: PingPong<FieldTexture>,
    pub divergence: FieldTexture,
    pub curl: FieldTexture,
    pub gradient: FieldTexture,
}

impl GpuFields {
    pub fn new(device: &wgpu::Device, grid: GridSize) -> Self {
        Self {
            velocity: PingPong::textures(device, "Velocity", grid, VECTOR_FORMAT),
            viscous: PingPong::textures(device, "Viscous", grid, VECTOR_FORMAT),
            pressure: PingPong::textures(device, "Pressure", grid, SCALAR_FORMAT),
            density: PingPong::textures(device, "Density", grid, VECTOR_FORMAT),
            divergence: FieldTexture::new(device, "Divergence", grid, SCALAR_FORMAT),
            curl: FieldTexture::new(device, "Curl", grid, SCALAR_FORMAT),
            gradient: FieldTexture::new(device, "Gradient", grid, VECTOR_FORMAT),
        }
    }

    pub fn grid(&self) -> GridSize {
        self.velocity.read().size()
    }
}
