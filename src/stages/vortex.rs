//! Vorticity confinement.
//!
//! A curl pass measures the local rotation, then a confinement pass pushes
//! velocity along `N × ω` where `N` points up the gradient of `|ω|`. This
//! feeds back the small-scale rotation numerical diffusion removes.

use glam::Vec2;

use super::{StageContext, DOWN, LEFT, RIGHT, UP};
use crate::grid::Field;

pub const CURL_FRAGMENT: &str = r#"
struct Params {
    header: PassHeader,
};

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var velocity: texture_2d<f32>;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let cell = frag_cell(in.position);
    let b = active_bounds(params.header);
    let right = load_cell(velocity, cell + vec2<i32>(1, 0), b).y;
    let left = load_cell(velocity, cell - vec2<i32>(1, 0), b).y;
    let down = load_cell(velocity, cell + vec2<i32>(0, 1), b).x;
    let up = load_cell(velocity, cell - vec2<i32>(0, 1), b).x;
    return vec4<f32>(((right - left) - (down - up)) * 0.5, 0.0, 0.0, 1.0);
}
"#;

pub const FRAGMENT: &str = r#"
struct Params {
    header: PassHeader,
    dt: f32,
    strength: f32,
    _pad: vec2<f32>,
};

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var velocity: texture_2d<f32>;
@group(0) @binding(2) var curl: texture_2d<f32>;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let cell = frag_cell(in.position);
    let b = active_bounds(params.header);
    let w = load_cell(curl, cell, b).x;
    let gx = abs(load_cell(curl, cell + vec2<i32>(1, 0), b).x) - abs(load_cell(curl, cell - vec2<i32>(1, 0), b).x);
    let gy = abs(load_cell(curl, cell + vec2<i32>(0, 1), b).x) - abs(load_cell(curl, cell - vec2<i32>(0, 1), b).x);
    let g = vec2<f32>(gx, gy) * 0.5;
    var n = vec2<f32>(0.0);
    if (length(g) > 1e-6) {
        n = normalize(g);
    }
    let v = load_cell(velocity, cell, b).xy + params.dt * params.strength * vec2<f32>(n.y * w, -n.x * w);
    return vec4<f32>(v, 0.0, 1.0);
}
"#;

/// Scalar curl of `velocity` into `out`.
pub fn curl(ctx: &StageContext, velocity: &Field<Vec2>, out: &mut Field<f32>) {
    let bounds = ctx.bounds();
    ctx.face("curl").render(ctx.grid, out, |frag| {
        let c = frag.cell;
        let right = velocity.load(c + RIGHT, bounds).y;
        let left = velocity.load(c + LEFT, bounds).y;
        let down = velocity.load(c + DOWN, bounds).x;
        let up = velocity.load(c + UP, bounds).x;
        ((right - left) - (down - up)) * 0.5
    });
}

/// Add the confinement force for `curl` to `velocity`, writing `out`.
pub fn confine(ctx: &StageContext, strength: f32, velocity: &Field<Vec2>, curl: &Field<f32>, out: &mut Field<Vec2>) {
    let bounds = ctx.bounds();
    let dt = ctx.dt;
    ctx.face("vortex").render(ctx.grid, out, |frag| {
        let c = frag.cell;
        let w = curl.load(c, bounds);
        let g = Vec2::new(
            curl.load(c + RIGHT, bounds).abs() - curl.load(c + LEFT, bounds).abs(),
            curl.load(c + DOWN, bounds).abs() - curl.load(c + UP, bounds).abs(),
        ) * 0.5;
        let n = if g.length() > 1e-6 { g.normalize() } else { Vec2::ZERO };
        velocity.load(c, bounds) + Vec2::new(n.y * w, -n.x * w) * (dt * strength)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridSize;

    fn rotation(grid: GridSize, omega: f32) -> Field<Vec2> {
        let center = grid.as_vec2() * 0.5;
        Field::from_fn(grid, |x, y| {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5) - center;
            p.perp() * omega
        })
    }

    #[test]
    fn test_rigid_rotation_has_constant_curl() {
        let grid = GridSize::new(16, 16);
        let ctx = StageContext::new(grid, false, 0.016);
        let mut out = Field::new(grid);
        curl(&ctx, &rotation(grid, 0.01), &mut out);
        // d(vy)/dx - d(vx)/dy = 2 * omega for v = omega * perp(p)
        assert!((out.get(8, 8) - 0.02).abs() < 1e-6);
        assert!((out.get(4, 11) - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_uniform_curl_adds_nothing() {
        let grid = GridSize::new(16, 16);
        let ctx = StageContext::new(grid, false, 0.016);
        let velocity = rotation(grid, 0.01);
        let w = Field::from_fn(grid, |_, _| 0.02f32);
        let mut out = Field::new(grid);
        confine(&ctx, 5.0, &velocity, &w, &mut out);
        for (a, b) in velocity.data().iter().zip(out.data()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_confinement_is_perpendicular_to_gradient() {
        let grid = GridSize::new(16, 16);
        let ctx = StageContext::new(grid, false, 1.0);
        let velocity = Field::new(grid);
        // |w| grows to the right.
        let w = Field::from_fn(grid, |x, _| x as f32 * 0.1);
        let mut out = Field::new(grid);
        confine(&ctx, 1.0, &velocity, &w, &mut out);
        let v = out.get(8, 8);
        assert!(v.x.abs() < 1e-6);
        // N = +x, force = (0, -w)
        assert!((v.y + 0.8).abs() < 1e-5);
    }
}
