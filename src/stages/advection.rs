//! Semi-Lagrangian velocity advection.
//!
//! Each cell traces its center backwards along the velocity field and takes
//! the velocity found there. With BFECC the backtrace is corrected by half
//! the round-trip error, which keeps small swirls alive much longer at the
//! same resolution.

use glam::{UVec2, Vec2};

use super::{mirror_wall, StageContext};
use crate::grid::{Bounds, Field};
use crate::pass::ShaderPass;

pub const FRAGMENT: &str = r#"
struct Params {
    header: PassHeader,
    ratio: vec2<f32>,
    dt: f32,
    is_bfecc: u32,
};

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var velocity: texture_2d<f32>;

fn velocity_at(uv: vec2<f32>, b: Bounds) -> vec2<f32> {
    return sample_field(velocity, uv, b, params.header).xy;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let cell = frag_cell(in.position);
    let b = active_bounds(params.header);
    let uv = cell_uv(cell, params.header);
    let trace = params.ratio * params.dt;
    let here = load_cell(velocity, cell, b).xy;

    var result: vec2<f32>;
    if (params.is_bfecc == 0u) {
        result = velocity_at(uv - here * trace, b);
    } else {
        let back = uv - here * trace;
        let forward = back + velocity_at(back, b) * trace;
        let corrected = uv - (forward - uv) * 0.5;
        let departure = corrected - velocity_at(corrected, b) * trace;
        result = velocity_at(departure, b);
    }
    return vec4<f32>(result, 0.0, 1.0);
}

// Ring cells mirror their inward neighbour with the normal component negated.
@fragment
fn fs_boundary(in: VertexOutput) -> @location(0) vec4<f32> {
    let cell = frag_cell(in.position);
    let size = grid_size(params.header);
    let inner = inset_bounds(size, vec2<i32>(1));
    let neighbour = load_cell(velocity, cell, inner).xy;
    return vec4<f32>(mirror_wall(cell, size, neighbour), 0.0, 1.0);
}
"#;

/// Advect `velocity` by itself into `out`.
pub fn advect(ctx: &StageContext, is_bfecc: bool, velocity: &Field<Vec2>, out: &mut Field<Vec2>) {
    let bounds = ctx.bounds();
    let step = ctx.backtrace_step();
    let at = |uv: Vec2| velocity.sample(uv, bounds);

    ctx.face("advection").render(ctx.grid, out, |frag| {
        let here = velocity.load(frag.cell, bounds);
        if !is_bfecc {
            return at(frag.uv - here * step);
        }
        let back = frag.uv - here * step;
        let forward = back + at(back) * step;
        let corrected = frag.uv - (forward - frag.uv) * 0.5;
        let departure = corrected - at(corrected) * step;
        at(departure)
    });

    if ctx.boundary.is_walled() {
        reflect_walls(ctx, velocity, out);
    }
}

/// Write the one-cell ring of `out` as the reflection of the interior of `velocity`.
pub fn reflect_walls(ctx: &StageContext, velocity: &Field<Vec2>, out: &mut Field<Vec2>) {
    let inner = Bounds::inset(ctx.grid, UVec2::ONE);
    ShaderPass::boundary("advection boundary").render(ctx.grid, out, |frag| {
        mirror_wall(ctx.grid, frag.cell, velocity.load(frag.cell, inner))
    });
}
