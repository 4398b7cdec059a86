//! Pressure gradient subtraction.

use glam::{IVec2, UVec2, Vec2};

use super::{mirror_wall, StageContext, DOWN, LEFT, RIGHT, UP};
use crate::grid::{Bounds, Field};
use crate::pass::ShaderPass;

pub const FRAGMENT: &str = r#"
struct Params {
    header: PassHeader,
    dt: f32,
    _pad0: f32,
    _pad1: vec2<f32>,
};

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var pressure: texture_2d<f32>;
@group(0) @binding(2) var velocity: texture_2d<f32>;

fn projected(cell: vec2<i32>, b: Bounds) -> vec2<f32> {
    let gx = load_cell(pressure, cell + vec2<i32>(1, 0), b).x - load_cell(pressure, cell - vec2<i32>(1, 0), b).x;
    let gy = load_cell(pressure, cell + vec2<i32>(0, 1), b).x - load_cell(pressure, cell - vec2<i32>(0, 1), b).x;
    return load_cell(velocity, cell, b).xy - params.dt * vec2<f32>(gx, gy) * 0.5;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let cell = frag_cell(in.position);
    return vec4<f32>(projected(cell, active_bounds(params.header)), 0.0, 1.0);
}

// Walled frames: the ring mirrors the projected inward neighbour.
@fragment
fn fs_boundary(in: VertexOutput) -> @location(0) vec4<f32> {
    let cell = frag_cell(in.position);
    let size = grid_size(params.header);
    let inner = inset_bounds(size, vec2<i32>(1));
    let neighbour = projected(clamp(cell, inner.lo, inner.hi), active_bounds(params.header));
    return vec4<f32>(mirror_wall(cell, size, neighbour), 0.0, 1.0);
}
"#;

/// Project `velocity` with `pressure`, writing the result to `out`.
///
/// With walls, the one-cell ring of `out` is rewritten as the reflection of
/// the projected interior, so no stale ring survives into the next frame.
pub fn subtract_gradient(ctx: &StageContext, pressure: &Field<f32>, velocity: &Field<Vec2>, out: &mut Field<Vec2>) {
    let bounds = ctx.bounds();
    let dt = ctx.dt;
    let projected = |c: IVec2| {
        let gradient = Vec2::new(
            pressure.load(c + RIGHT, bounds) - pressure.load(c + LEFT, bounds),
            pressure.load(c + DOWN, bounds) - pressure.load(c + UP, bounds),
        ) * 0.5;
        velocity.load(c, bounds) - gradient * dt
    };

    ctx.face("pressure").render(ctx.grid, out, |frag| projected(frag.cell));

    if ctx.boundary.is_walled() {
        let inner = Bounds::inset(ctx.grid, UVec2::ONE);
        ShaderPass::boundary("pressure boundary").render(ctx.grid, out, |frag| {
            mirror_wall(ctx.grid, frag.cell, projected(inner.clamp(frag.cell)))
        });
    }
}
