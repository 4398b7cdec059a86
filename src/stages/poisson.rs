//! Pressure Poisson solve.
//!
//! Jacobi relaxation on the two-cell stencil, which is exactly the
//! composition of the central-difference divergence and gradient used on
//! either side of it. Pressure is warm-started from the previous frame.

use glam::IVec2;

use super::StageContext;
use crate::grid::{Field, PingPong};

pub const FRAGMENT: &str = r#"
struct Params {
    header: PassHeader,
};

@group(0) @binding(0) var<uniform> params: Params;
@group(0) @binding(1) var pressure: texture_2d<f32>;
@group(0) @binding(2) var divergence: texture_2d<f32>;

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let cell = frag_cell(in.position);
    let b = active_bounds(params.header);
    let sum = load_cell(pressure, cell + vec2<i32>(2, 0), b).x
        + load_cell(pressure, cell - vec2<i32>(2, 0), b).x
        + load_cell(pressure, cell + vec2<i32>(0, 2), b).x
        + load_cell(pressure, cell - vec2<i32>(0, 2), b).x;
    let div = load_cell(divergence, cell, b).x;
    return vec4<f32>(sum * 0.25 - div, 0.0, 0.0, 1.0);
}
"#;

const STRIDE_X: IVec2 = IVec2::new(2, 0);
const STRIDE_Y: IVec2 = IVec2::new(0, 2);

/// Run `iterations` Jacobi steps; the result is `pressure.read()`.
pub fn solve(ctx: &StageContext, iterations: u32, divergence: &Field<f32>, pressure: &mut PingPong<Field<f32>>) {
    let bounds = ctx.bounds();
    let pass = ctx.face("poisson");
    for _ in 0..iterations {
        let (previous, next) = pressure.split();
        pass.render(ctx.grid, next, |frag| {
            let c = frag.cell;
            let sum = previous.load(c + STRIDE_X, bounds)
                + previous.load(c - STRIDE_X, bounds)
                + previous.load(c + STRIDE_Y, bounds)
                + previous.load(c - STRIDE_Y, bounds);
            sum * 0.25 - divergence.load(c, bounds)
        });
        pressure.swap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridSize;

    #[test]
    fn test_zero_divergence_keeps_zero_pressure() {
        let grid = GridSize::new(10, 10);
        let ctx = StageContext::new(grid, false, 0.016);
        let div = Field::new(grid);
        let mut pressure = PingPong::zeroed(grid);
        solve(&ctx, 8, &div, &mut pressure);
        assert_eq!(pressure.read().max_magnitude(), 0.0);
    }

    #[test]
    fn test_zero_iterations_keeps_previous_pressure() {
        let grid = GridSize::new(4, 4);
        let ctx = StageContext::new(grid, false, 0.016);
        let div = Field::from_fn(grid, |_, _| 1.0);
        let mut pressure = PingPong::zeroed(grid);
        pressure.read_mut().fill(0.5);
        solve(&ctx, 0, &div, &mut pressure);
        assert_eq!(pressure.read().get(1, 1), 0.5);
    }

    #[test]
    fn test_source_produces_pressure_peak() {
        let grid = GridSize::new(41, 41);
        let ctx = StageContext::new(grid, false, 0.016);
        let mut div = Field::new(grid);
        div.set(20, 20, -1.0);
        let mut pressure = PingPong::zeroed(grid);
        solve(&ctx, 8, &div, &mut pressure);
        let p = pressure.read();
        assert!(p.get(20, 20) > p.get(22, 20));
        assert!(p.get(22, 20) > 0.0);
        // The two-cell stencil never reaches odd offsets away from the edges.
        assert_eq!(p.get(21, 20), 0.0);
    }
}
