//! The seam between the frame orchestrator and a field store.
//!
//! A backend owns the field buffers and runs stages on them. The
//! [`Simulation`](crate::Simulation) decides which stages run and in which
//! order; the backend only knows how to run one. Every stage returns
//! [`FluidError::Uninitialized`] until [`resize`](FluidBackend::resize) has
//! allocated the fields.

use glam::UVec2;

use crate::error::FluidError;
use crate::grid::GridSize;
use crate::source::{ForceImpulse, FrameSources, SwirlImpulse};
use crate::stages::StageContext;

pub trait FluidBackend {
    /// Recreate every field at `grid` resolution for a `viewport`-sized display.
    /// Field contents start at zero.
    fn resize(&mut self, viewport: UVec2, grid: GridSize) -> Result<(), FluidError>;

    /// Current grid, `None` before the first resize.
    fn grid(&self) -> Option<GridSize>;

    /// Start a frame. Clears per-frame state such as the viscous result.
    fn begin_frame(&mut self) -> Result<(), FluidError>;

    fn advect(&mut self, ctx: &StageContext, is_bfecc: bool) -> Result<(), FluidError>;

    /// One additive pass per impulse into the current velocity.
    fn apply_forces(&mut self, ctx: &StageContext, forces: &[ForceImpulse]) -> Result<(), FluidError>;

    fn apply_swirls(&mut self, ctx: &StageContext, swirls: &[SwirlImpulse]) -> Result<(), FluidError>;

    fn confine_vorticity(&mut self, ctx: &StageContext, strength: f32) -> Result<(), FluidError>;

    /// Diffuse the current velocity. Zero iterations leaves the velocity as
    /// the input to the projection.
    fn diffuse(&mut self, ctx: &StageContext, viscosity: f32, iterations: u32) -> Result<(), FluidError>;

    /// Divergence of the diffused velocity, or the current velocity when
    /// diffusion did not run this frame.
    fn divergence(&mut self, ctx: &StageContext) -> Result<(), FluidError>;

    fn solve_pressure(&mut self, ctx: &StageContext, iterations: u32) -> Result<(), FluidError>;

    /// Subtract the pressure gradient and publish the projected velocity.
    fn subtract_gradient(&mut self, ctx: &StageContext) -> Result<(), FluidError>;

    fn transport_density(&mut self, ctx: &StageContext, sources: &FrameSources, dissipation: f32) -> Result<(), FluidError>;

    fn compute_gradient(&mut self, ctx: &StageContext) -> Result<(), FluidError>;

    /// Composite the frame to the backend's display.
    fn present(&mut self, ctx: &StageContext) -> Result<(), FluidError>;
}
