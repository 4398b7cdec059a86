//! Solver stages.
//!
//! Each stage is a fragment program run through a [`ShaderPass`]. The CPU
//! functions here are the reference implementation; every module also
//! carries the WGSL fragment the GPU backend compiles for the same stage, and
//! both read the same uniforms in the same order.
//!
//! | Stage | Reads | Writes |
//! |-------|-------|--------|
//! | [`advection`] | velocity | velocity (next) |
//! | [`external_force`] | - | velocity (additive) |
//! | [`swirl`] | - | velocity (additive) |
//! | [`vortex`] | velocity, curl | curl, velocity (next) |
//! | [`viscous`] | velocity, viscous | viscous (next) |
//! | [`divergence`] | velocity | divergence |
//! | [`poisson`] | pressure, divergence | pressure (next) |
//! | [`pressure`] | pressure, velocity | velocity (next) |
//! | [`density`] | velocity, density | density (next) |
//! | [`gradient`] | density, velocity | gradient |
//! | [`output`] | density, gradient | image |

pub mod advection;
pub mod density;
pub mod divergence;
pub mod external_force;
pub mod gradient;
pub mod output;
pub mod poisson;
pub mod pressure;
pub mod swirl;
pub mod viscous;
pub mod vortex;

use glam::{IVec2, Vec2};

use crate::grid::{BoundarySpace, Bounds, CellScale, GridSize};
use crate::pass::ShaderPass;

/// Per-frame constants shared by every stage.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StageContext {
    pub grid: GridSize,
    pub cell_scale: CellScale,
    pub boundary: BoundarySpace,
    pub dt: f32,
}

impl StageContext {
    pub fn new(grid: GridSize, is_bounce: bool, dt: f32) -> Self {
        let cell_scale = grid.cell_scale();
        Self {
            grid,
            cell_scale,
            boundary: BoundarySpace::select(is_bounce, cell_scale),
            dt,
        }
    }

    /// Cells that face passes cover and reads clamp to.
    pub fn bounds(&self) -> Bounds {
        Bounds::inset(self.grid, self.boundary.inset_cells(self.cell_scale))
    }

    /// A full-face pass over the active bounds.
    pub fn face(&self, label: &'static str) -> ShaderPass {
        ShaderPass::face(label, self.bounds())
    }

    /// Backtrace step `dt * ratio` used by advection and density transport.
    pub fn backtrace_step(&self) -> Vec2 {
        self.grid.advection_ratio() * self.dt
    }
}

/// `v` written to ring cell `cell`: the wall-normal component is negated.
pub(crate) fn mirror_wall(grid: GridSize, cell: IVec2, v: Vec2) -> Vec2 {
    let last = grid.as_ivec2() - IVec2::ONE;
    let flip = |c: i32, last: i32| if c == 0 || c == last { -1.0 } else { 1.0 };
    v * Vec2::new(flip(cell.x, last.x), flip(cell.y, last.y))
}

pub(crate) const RIGHT: IVec2 = IVec2::new(1, 0);
pub(crate) const LEFT: IVec2 = IVec2::new(-1, 0);
pub(crate) const DOWN: IVec2 = IVec2::new(0, 1);
pub(crate) const UP: IVec2 = IVec2::new(0, -1);

#[cfg(test)]
mod tests {
    use super::*;
    use glam::UVec2;

    #[test]
    fn test_open_context_covers_grid() {
        let ctx = StageContext::new(GridSize::new(10, 8), false, 0.01);
        assert_eq!(ctx.bounds(), Bounds::full(ctx.grid));
    }

    #[test]
    fn test_walled_context_insets_one_cell() {
        let ctx = StageContext::new(GridSize::new(10, 8), true, 0.01);
        assert_eq!(ctx.bounds(), Bounds::inset(ctx.grid, UVec2::ONE));
        assert!(ctx.boundary.is_walled());
    }

    #[test]
    fn test_mirror_wall_flips_normal_only() {
        let grid = GridSize::new(6, 4);
        let v = Vec2::new(0.3, 0.4);
        assert_eq!(mirror_wall(grid, IVec2::new(0, 2), v), Vec2::new(-0.3, 0.4));
        assert_eq!(mirror_wall(grid, IVec2::new(2, 3), v), Vec2::new(0.3, -0.4));
        assert_eq!(mirror_wall(grid, IVec2::new(5, 0), v), Vec2::new(-0.3, -0.4));
        assert_eq!(mirror_wall(grid, IVec2::new(2, 2), v), v);
    }

    #[test]
    fn test_backtrace_step_is_isotropic_in_cells() {
        let ctx = StageContext::new(GridSize::new(200, 100), false, 0.5);
        let step = ctx.backtrace_step();
        assert_eq!(step, Vec2::new(0.5, 1.0));
    }
}
