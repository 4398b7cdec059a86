//! Implicit viscous diffusion by Jacobi relaxation.

use glam::Vec2;

use super::{StageContext, DOWN, LEFT, RIGHT, UP};
use crate::grid::{Field, PingPong};
use crate::pass::ShaderPass;

pub const FRAGMENT: &str = r#"
struct Params {
    header: PassHeader,
    viscosity: f32,
    dt: f32,
    _pad: vec2<f32>,
};

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var velocity: texture_2d<f32>;
@group(0) @binding(2) var previous: texture_2d<f32>;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let cell = frag_cell(in.position);
    let b = active_bounds(params.header);
    let old = load_cell(velocity, cell, b).xy;
    let neighbours = load_cell(previous, cell + vec2<i32>(1, 0), b).xy
        + load_cell(previous, cell - vec2<i32>(1, 0), b).xy
        + load_cell(previous, cell + vec2<i32>(0, 1), b).xy
        + load_cell(previous, cell - vec2<i32>(0, 1), b).xy;
    let a = params.viscosity * params.dt;
    return vec4<f32>((old + a * neighbours) / (1.0 + 4.0 * a), 0.0, 1.0);
}
"#;

fn relax(pass: &ShaderPass, ctx: &StageContext, a: f32, velocity: &Field<Vec2>, previous: &Field<Vec2>, out: &mut Field<Vec2>) {
    let bounds = ctx.bounds();
    pass.render(ctx.grid, out, |frag| {
        let c = frag.cell;
        let old = velocity.load(c, bounds);
        let neighbours = previous.load(c + RIGHT, bounds)
            + previous.load(c + LEFT, bounds)
            + previous.load(c + DOWN, bounds)
            + previous.load(c + UP, bounds);
        (old + neighbours * a) / (1.0 + 4.0 * a)
    });
}

/// Diffuse `velocity` for `iterations` Jacobi steps.
///
/// The first step relaxes against `velocity` itself; later steps ping-pong
/// through `viscous`. Returns `false` without touching `viscous` when
/// `iterations` is zero, in which case `velocity` is the result.
pub fn diffuse(
    ctx: &StageContext,
    viscosity: f32,
    iterations: u32,
    velocity: &Field<Vec2>,
    viscous: &mut PingPong<Field<Vec2>>,
) -> bool {
    if iterations == 0 {
        return false;
    }
    let a = viscosity * ctx.dt;
    let pass = ctx.face("viscous");

    relax(&pass, ctx, a, velocity, velocity, viscous.write_mut());
    viscous.swap();
    for _ in 1..iterations {
        let (previous, next) = viscous.split();
        relax(&pass, ctx, a, velocity, previous, next);
        viscous.swap();
    }
    true
}
