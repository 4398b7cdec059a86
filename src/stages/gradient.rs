//! Density gradient and speed, packed for the output pass.

use glam::{Vec2, Vec4};

use super::{StageContext, DOWN, LEFT, RIGHT, UP};
use crate::grid::Field;

pub const FRAGMENT: &str = r#"
struct Params {
    header: PassHeader,
};

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var density: texture_2d<f32>;
@group(0) @binding(2) var velocity: texture_2d<f32>;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let cell = frag_cell(in.position);
    let b = active_bounds(params.header);
    let gx = load_cell(density, cell + vec2<i32>(1, 0), b).a - load_cell(density, cell - vec2<i32>(1, 0), b).a;
    let gy = load_cell(density, cell + vec2<i32>(0, 1), b).a - load_cell(density, cell - vec2<i32>(0, 1), b).a;
    let g = vec2<f32>(gx, gy) * 0.5;
    let speed = length(load_cell(velocity, cell, b).xy);
    return vec4<f32>(g, length(g), speed);
}
"#;

/// `(∂a/∂x, ∂a/∂y, |∇a|, |v|)` per cell.
pub fn compute(ctx: &StageContext, density: &Field<Vec4>, velocity: &Field<Vec2>, out: &mut Field<Vec4>) {
    let bounds = ctx.bounds();
    ctx.face("gradient").render(ctx.grid, out, |frag| {
        let c = frag.cell;
        let g = Vec2::new(
            density.load(c + RIGHT, bounds).w - density.load(c + LEFT, bounds).w,
            density.load(c + DOWN, bounds).w - density.load(c + UP, bounds).w,
        ) * 0.5;
        Vec4::new(g.x, g.y, g.length(), velocity.load(c, bounds).length())
    });
}
