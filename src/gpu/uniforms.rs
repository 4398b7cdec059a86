//! Uniform blocks for every stage, laid out to match the WGSL `Params` structs.
//!
//! Each block starts with a [`PassHeader`]. Padding fields keep the Rust
//! layout identical to WGSL's uniform address space rules (vec2 aligned to
//! 8, vec4 and arrays of vec4 aligned to 16, struct size rounded to 16).

use bytemuck::{Pod, Zeroable};

use crate::body::MAX_SOURCES;
use crate::source::{LineSource, PointSource};
use crate::stages::output::OutputStyle;
use crate::stages::StageContext;

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct PassHeader {
    pub cell_scale: [f32; 2],
    pub boundary_space: [f32; 2],
}

impl PassHeader {
    pub fn new(ctx: &StageContext) -> Self {
        Self {
            cell_scale: ctx.cell_scale.0.to_array(),
            boundary_space: ctx.boundary.0.to_array(),
        }
    }
}

/// Stages whose only parameter is the header: curl, poisson, gradient.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct HeaderParams {
    pub header: PassHeader,
}

impl HeaderParams {
    pub fn new(ctx: &StageContext) -> Self {
        Self { header: PassHeader::new(ctx) }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct AdvectionParams {
    pub header: PassHeader,
    pub ratio: [f32; 2],
    pub dt: f32,
    pub is_bfecc: u32,
}

impl AdvectionParams {
    pub fn new(ctx: &StageContext, is_bfecc: bool) -> Self {
        Self {
            header: PassHeader::new(ctx),
            ratio: ctx.grid.advection_ratio().to_array(),
            dt: ctx.dt,
            is_bfecc: is_bfecc as u32,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct ForceParams {
    pub header: PassHeader,
    pub center: [f32; 2],
    pub extent: [f32; 2],
    pub force: [f32; 2],
    pub _pad: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct SwirlParams {
    pub header: PassHeader,
    pub center: [f32; 2],
    pub extent: [f32; 2],
    pub strength: f32,
    pub _pad0: f32,
    pub _pad1: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct VortexParams {
    pub header: PassHeader,
    pub dt: f32,
    pub strength: f32,
    pub _pad: [f32; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct ViscousParams {
    pub header: PassHeader,
    pub viscosity: f32,
    pub dt: f32,
    pub _pad: [f32; 2],
}

/// Divergence and pressure both take the header and `dt`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct StepParams {
    pub header: PassHeader,
    pub dt: f32,
    pub _pad0: f32,
    pub _pad1: [f32; 2],
}

impl StepParams {
    pub fn new(ctx: &StageContext) -> Self {
        Self {
            header: PassHeader::new(ctx),
            dt: ctx.dt,
            ..Default::default()
        }
    }
}

const SOURCES: usize = MAX_SOURCES;

/// Density transport plus every injected point and line for the frame.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct DensityParams {
    pub header: PassHeader,
    pub ratio: [f32; 2],
    pub dt: f32,
    pub dissipation: f32,
    /// Point count, line count, unused, unused.
    pub counts: [u32; 4],
    pub points: [[f32; 4]; SOURCES],
    pub point_colors: [[f32; 4]; SOURCES],
    pub lines: [[f32; 4]; SOURCES],
    pub line_params: [[f32; 4]; SOURCES],
    pub line_colors: [[f32; 4]; SOURCES],
}

impl DensityParams {
    pub fn new(ctx: &StageContext, dissipation: f32, points: &[PointSource], lines: &[LineSource]) -> Self {
        let mut params = Self::zeroed();
        params.header = PassHeader::new(ctx);
        params.ratio = ctx.grid.advection_ratio().to_array();
        params.dt = ctx.dt;
        params.dissipation = dissipation;

        let points = &points[..points.len().min(SOURCES)];
        let lines = &lines[..lines.len().min(SOURCES)];
        params.counts = [points.len() as u32, lines.len() as u32, 0, 0];

        for (i, p) in points.iter().enumerate() {
            params.points[i] = [p.uv.x, p.uv.y, p.radius, p.strength];
            params.point_colors[i] = p.color.extend(1.0).to_array();
        }
        for (i, l) in lines.iter().enumerate() {
            params.lines[i] = [l.a.x, l.a.y, l.b.x, l.b.y];
            params.line_params[i] = [l.radius, l.strength, 0.0, 0.0];
            params.line_colors[i] = l.color.extend(1.0).to_array();
        }
        params
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct OutputParams {
    pub background: [f32; 4],
    pub highlight: [f32; 4],
    pub speed_tint: [f32; 4],
}

impl From<&OutputStyle> for OutputParams {
    fn from(style: &OutputStyle) -> Self {
        Self {
            background: style.background.extend(1.0).to_array(),
            highlight: style.highlight.extend(style.highlight_gain).to_array(),
            speed_tint: style.speed_tint.extend(style.speed_gain).to_array(),
        }
    }
}
