//! WGSL assembly.
//!
//! Every stage module is `COMMON + vertex variant(s) + stage fragment`. The
//! stage fragment declares its own `Params` uniform at `@group(0) @binding(0)`
//! whose first member is a `PassHeader`; the vertex variants only read
//! `params.header` (and `params.center`/`params.extent` for quads), so one
//! set of vertex shaders serves every stage.

use crate::stages;

/// Shared declarations: the pass header, vertex output, bounds and field reads.
pub const COMMON: &str = r#"
struct PassHeader {
    cell_scale: vec2<f32>,
    boundary_space: vec2<f32>,
};

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) local: vec2<f32>,
};

struct Bounds {
    lo: vec2<i32>,
    hi: vec2<i32>,
};

fn grid_size(h: PassHeader) -> vec2<i32> {
    return vec2<i32>(round(vec2<f32>(1.0) / h.cell_scale));
}

fn inset_bounds(size: vec2<i32>, inset: vec2<i32>) -> Bounds {
    let last = size - vec2<i32>(1);
    let hi = min(max(last - inset, inset), last);
    return Bounds(min(inset, last), hi);
}

fn active_bounds(h: PassHeader) -> Bounds {
    let inset = vec2<i32>(round(h.boundary_space / h.cell_scale));
    return inset_bounds(grid_size(h), inset);
}

// Ring cells take their inward neighbour's value with the wall-normal component negated.
fn mirror_wall(cell: vec2<i32>, size: vec2<i32>, v: vec2<f32>) -> vec2<f32> {
    let flip_x = cell.x == 0 || cell.x == size.x - 1;
    let flip_y = cell.y == 0 || cell.y == size.y - 1;
    return v * vec2<f32>(select(1.0, -1.0, flip_x), select(1.0, -1.0, flip_y));
}

fn frag_cell(position: vec4<f32>) -> vec2<i32> {
    return vec2<i32>(floor(position.xy));
}

fn cell_uv(cell: vec2<i32>, h: PassHeader) -> vec2<f32> {
    return (vec2<f32>(cell) + vec2<f32>(0.5)) * h.cell_scale;
}

fn load_cell(t: texture_2d<f32>, cell: vec2<i32>, b: Bounds) -> vec4<f32> {
    return textureLoad(t, clamp(cell, b.lo, b.hi), 0);
}

// Manual bilinear so unfilterable formats and clamped bounds behave alike.
fn sample_field(t: texture_2d<f32>, uv: vec2<f32>, b: Bounds, h: PassHeader) -> vec4<f32> {
    let size = vec2<f32>(grid_size(h));
    let p = clamp(uv * size - vec2<f32>(0.5), vec2<f32>(-1.0), size);
    let base = floor(p);
    let f = p - base;
    let c = vec2<i32>(base);
    let a = load_cell(t, c, b);
    let r = load_cell(t, c + vec2<i32>(1, 0), b);
    let d = load_cell(t, c + vec2<i32>(0, 1), b);
    let e = load_cell(t, c + vec2<i32>(1, 1), b);
    return mix(mix(a, r, f.x), mix(d, e, f.x), f.y);
}

fn quad_corner(index: u32) -> vec2<f32> {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    return corners[index];
}
"#;

/// Full face, shrunk by the boundary space on each side.
pub const VERTEX_FACE: &str = r#"
@vertex
fn vs_face(@builtin(vertex_index) index: u32) -> VertexOutput {
    let corner = quad_corner(index);
    let scale = vec2<f32>(1.0) - 2.0 * params.header.boundary_space;
    var out: VertexOutput;
    out.position = vec4<f32>(corner * scale, 0.0, 1.0);
    out.local = vec2<f32>(0.0);
    return out;
}
"#;

/// A quad of half-extent `params.extent` around `params.center`.
pub const VERTEX_QUAD: &str = r#"
@vertex
fn vs_quad(@builtin(vertex_index) index: u32) -> VertexOutput {
    let corner = quad_corner(index);
    var out: VertexOutput;
    out.position = vec4<f32>(params.center + corner * params.extent, 0.0, 1.0);
    out.local = corner;
    return out;
}
"#;

/// Four lines through the centers of the outermost cells. Drawn as a line list.
pub const VERTEX_BOUNDARY: &str = r#"
@vertex
fn vs_boundary(@builtin(vertex_index) index: u32) -> VertexOutput {
    let e = vec2<f32>(1.0) - params.header.cell_scale;
    var points = array<vec2<f32>, 8>(
        vec2<f32>(-1.0, e.y),
        vec2<f32>(1.0, e.y),
        vec2<f32>(-1.0, -e.y),
        vec2<f32>(1.0, -e.y),
        vec2<f32>(-e.x, -1.0),
        vec2<f32>(-e.x, 1.0),
        vec2<f32>(e.x, -1.0),
        vec2<f32>(e.x, 1.0),
    );
    var out: VertexOutput;
    out.position = vec4<f32>(points[index], 0.0, 1.0);
    out.local = vec2<f32>(0.0);
    return out;
}
"#;

/// The output pass: one oversized triangle covering the surface.
pub const VERTEX_FULLSCREEN: &str = r#"
struct FullscreenOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_fullscreen(@builtin(vertex_index) index: u32) -> FullscreenOutput {
    var out: FullscreenOutput;
    let x = f32(i32(index & 1u) * 4 - 1);
    let y = f32(i32(index >> 1u) * 4 - 1);
    out.position = vec4<f32>(x, y, 0.0, 1.0);
    out.uv = vec2<f32>((x + 1.0) * 0.5, (1.0 - y) * 0.5);
    return out;
}
"#;

fn compose(parts: &[&str]) -> String {
    parts.concat()
}

pub fn advection() -> String {
    compose(&[COMMON, VERTEX_FACE, VERTEX_BOUNDARY, stages::advection::FRAGMENT])
}

pub fn external_force() -> String {
    compose(&[COMMON, VERTEX_QUAD, stages::external_force::FRAGMENT])
}

pub fn swirl() -> String {
    compose(&[COMMON, VERTEX_QUAD, stages::swirl::FRAGMENT])
}

pub fn curl() -> String {
    compose(&[COMMON, VERTEX_FACE, stages::vortex::CURL_FRAGMENT])
}

pub fn vortex() -> String {
    compose(&[COMMON, VERTEX_FACE, stages::vortex::FRAGMENT])
}

pub fn viscous() -> String {
    compose(&[COMMON, VERTEX_FACE, stages::viscous::FRAGMENT])
}

pub fn divergence() -> String {
    compose(&[COMMON, VERTEX_FACE, stages::divergence::FRAGMENT])
}

pub fn poisson() -> String {
    compose(&[COMMON, VERTEX_FACE, stages::poisson::FRAGMENT])
}

pub fn pressure() -> String {
    compose(&[COMMON, VERTEX_FACE, VERTEX_BOUNDARY, stages::pressure::FRAGMENT])
}

pub fn density() -> String {
    compose(&[COMMON, VERTEX_FACE, stages::density::FRAGMENT])
}

pub fn gradient() -> String {
    compose(&[COMMON, VERTEX_FACE, stages::gradient::FRAGMENT])
}

pub fn output() -> String {
    compose(&[VERTEX_FULLSCREEN, stages::output::FRAGMENT])
}

/// Every composed module with a label, for validation and pipeline setup.
pub fn all() -> Vec<(&'static str, String)> {
    vec![
        ("advection", advection()),
        ("external_force", external_force()),
        ("swirl", swirl()),
        ("curl", curl()),
        ("vortex", vortex()),
        ("viscous", viscous()),
        ("divergence", divergence()),
        ("poisson", poisson()),
        ("pressure", pressure()),
        ("density", density()),
        ("gradient", gradient()),
        ("output", output()),
    ]
}
