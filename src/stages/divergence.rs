//! Velocity divergence.

use glam::Vec2;

use super::{StageContext, DOWN, LEFT, RIGHT, UP};
use crate::grid::Field;

pub const FRAGMENT: &str = r#"
struct Params {
    header: PassHeader,
    dt: f32,
    _pad0: f32,
    _pad1: vec2<f32>,
};

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var velocity: texture_2d<f32>;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let cell = frag_cell(in.position);
    let b = active_bounds(params.header);
    let dx = load_cell(velocity, cell + vec2<i32>(1, 0), b).x - load_cell(velocity, cell - vec2<i32>(1, 0), b).x;
    let dy = load_cell(velocity, cell + vec2<i32>(0, 1), b).y - load_cell(velocity, cell - vec2<i32>(0, 1), b).y;
    return vec4<f32>((dx + dy) * 0.5 / params.dt, 0.0, 0.0, 1.0);
}
"#;

/// Central-difference divergence of `velocity`, divided by `dt`.
pub fn divergence(ctx: &StageContext, velocity: &Field<Vec2>, out: &mut Field<f32>) {
    let bounds = ctx.bounds();
    let dt = ctx.dt;
    ctx.face("divergence").render(ctx.grid, out, |frag| {
        let c = frag.cell;
        let dx = velocity.load(c + RIGHT, bounds).x - velocity.load(c + LEFT, bounds).x;
        let dy = velocity.load(c + DOWN, bounds).y - velocity.load(c + UP, bounds).y;
        (dx + dy) * 0.5 / dt
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridSize;

    #[test]
    fn test_expanding_field() {
        let grid = GridSize::new(12, 12);
        let ctx = StageContext::new(grid, false, 0.5);
        let velocity = Field::from_fn(grid, |x, y| Vec2::new(x as f32, y as f32) * 0.1);
        let mut out = Field::new(grid);
        divergence(&ctx, &velocity, &mut out);
        // (0.2 + 0.2) / 2 / 0.5
        assert!((out.get(5, 6) - 0.4).abs() < 1e-5);
    }

    #[test]
    fn test_rotation_is_divergence_free() {
        let grid = GridSize::new(12, 12);
        let ctx = StageContext::new(grid, false, 0.016);
        let velocity = Field::from_fn(grid, |x, y| Vec2::new(-(y as f32 - 6.0), x as f32 - 6.0));
        let mut out = Field::new(grid);
        divergence(&ctx, &velocity, &mut out);
        assert!(out.data().iter().all(|d| d.abs() < 1e-4));
    }
}
