//! CPU reference backend.
//!
//! Runs every stage with rayon-parallel row passes over plain `Vec`-backed
//! fields. Slower than the GPU by orders of magnitude at window resolution,
//! but deterministic and inspectable, which is what tests and the headless
//! renderer want.

use glam::{UVec2, Vec2, Vec4};

use crate::backend::FluidBackend;
use crate::error::FluidError;
use crate::grid::{Field, GridSize, PingPong};
use crate::source::{ForceImpulse, FrameSources, SwirlImpulse};
use crate::stages::output::{self, OutputStyle};
use crate::stages::{
    advection, density, divergence, external_force, gradient, poisson, pressure, swirl, viscous, vortex,
    StageContext,
};

/// Every field the solver touches, all at grid resolution.
#[derive(Debug)]
pub struct CpuFields {
    pub velocity: PingPong<Field<Vec2>>,
    pub viscous: PingPong<Field<Vec2>>,
    pub pressure: PingPong<Field<f32>>,
    pub density: PingPong<Field<Vec4>>,
    pub divergence: Field<f32>,
    pub curl: Field<f32>,
    pub gradient: Field<Vec4>,
}

impl CpuFields {
    pub fn new(grid: GridSize) -> Self {
        Self {
            velocity: PingPong::zeroed(grid),
            viscous: PingPong::zeroed(grid),
            pressure: PingPong::zeroed(grid),
            density: PingPong::zeroed(grid),
            divergence: Field::new(grid),
            curl: Field::new(grid),
            gradient: Field::new(grid),
        }
    }
}

#[derive(Debug, Default)]
pub struct CpuBackend {
    fields: Option<CpuFields>,
    viscous_active: bool,
    style: OutputStyle,
    image: Vec<u8>,
}

impl CpuBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_style(mut self, style: OutputStyle) -> Self {
        self.style = style;
        self
    }

    pub fn fields(&self) -> Option<&CpuFields> {
        self.fields.as_ref()
    }

    pub fn fields_mut(&mut self) -> Option<&mut CpuFields> {
        self.fields.as_mut()
    }

    /// The current velocity, if allocated.
    pub fn velocity(&self) -> Option<&Field<Vec2>> {
        self.fields.as_ref().map(|f| f.velocity.read())
    }

    pub fn density(&self) -> Option<&Field<Vec4>> {
        self.fields.as_ref().map(|f| f.density.read())
    }

    pub fn divergence_field(&self) -> Option<&Field<f32>> {
        self.fields.as_ref().map(|f| &f.divergence)
    }

    /// The last presented frame as RGBA8 at grid resolution.
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    fn fields_for(&mut self, stage: &'static str) -> Result<&mut CpuFields, FluidError> {
        self.fields.as_mut().ok_or(FluidError::Uninitialized(stage))
    }
}

impl FluidBackend for CpuBackend {
    fn resize(&mut self, _viewport: UVec2, grid: GridSize) -> Result<(), FluidError> {
        self.fields = Some(CpuFields::new(grid));
        self.viscous_active = false;
        self.image.clear();
        Ok(())
    }

    fn grid(&self) -> Option<GridSize> {
        self.fields.as_ref().map(|f| f.velocity.read().size())
    }

    fn begin_frame(&mut self) -> Result<(), FluidError> {
        self.fields_for("frame")?;
        self.viscous_active = false;
        Ok(())
    }

    fn advect(&mut self, ctx: &StageContext, is_bfecc: bool) -> Result<(), FluidError> {
        let fields = self.fields_for("advection")?;
        let (velocity, next) = fields.velocity.split();
        advection::advect(ctx, is_bfecc, velocity, next);
        fields.velocity.swap();
        Ok(())
    }

    fn apply_forces(&mut self, ctx: &StageContext, forces: &[ForceImpulse]) -> Result<(), FluidError> {
        let fields = self.fields_for("external force")?;
        for impulse in forces {
            external_force::apply_force(ctx, impulse, fields.velocity.read_mut());
        }
        Ok(())
    }

    fn apply_swirls(&mut self, ctx: &StageContext, swirls: &[SwirlImpulse]) -> Result<(), FluidError> {
        let fields = self.fields_for("swirl")?;
        for impulse in swirls {
            swirl::apply_swirl(ctx, impulse, fields.velocity.read_mut());
        }
        Ok(())
    }

    fn confine_vorticity(&mut self, ctx: &StageContext, strength: f32) -> Result<(), FluidError> {
        let fields = self.fields_for("vortex")?;
        vortex::curl(ctx, fields.velocity.read(), &mut fields.curl);
        let (velocity, next) = fields.velocity.split();
        vortex::confine(ctx, strength, velocity, &fields.curl, next);
        fields.velocity.swap();
        Ok(())
    }

    fn diffuse(&mut self, ctx: &StageContext, viscosity: f32, iterations: u32) -> Result<(), FluidError> {
        let fields = self.fields_for("viscous")?;
        let active = viscous::diffuse(ctx, viscosity, iterations, fields.velocity.read(), &mut fields.viscous);
        self.viscous_active = active;
        Ok(())
    }

    fn divergence(&mut self, ctx: &StageContext) -> Result<(), FluidError> {
        let viscous_active = self.viscous_active;
        let fields = self.fields_for("divergence")?;
        let CpuFields { velocity, viscous, divergence: out, .. } = fields;
        let input = if viscous_active { viscous.read() } else { velocity.read() };
        divergence::divergence(ctx, input, out);
        Ok(())
    }

    fn solve_pressure(&mut self, ctx: &StageContext, iterations: u32) -> Result<(), FluidError> {
        let fields = self.fields_for("poisson")?;
        poisson::solve(ctx, iterations, &fields.divergence, &mut fields.pressure);
        Ok(())
    }

    fn subtract_gradient(&mut self, ctx: &StageContext) -> Result<(), FluidError> {
        let viscous_active = self.viscous_active;
        let fields = self.fields_for("pressure")?;
        if viscous_active {
            pressure::subtract_gradient(ctx, fields.pressure.read(), fields.viscous.read(), fields.velocity.write_mut());
        } else {
            let (velocity, next) = fields.velocity.split();
            pressure::subtract_gradient(ctx, fields.pressure.read(), velocity, next);
        }
        fields.velocity.swap();
        Ok(())
    }

    fn transport_density(&mut self, ctx: &StageContext, sources: &FrameSources, dissipation: f32) -> Result<(), FluidError> {
        let fields = self.fields_for("density")?;
        let (previous, next) = fields.density.split();
        density::transport(
            ctx,
            dissipation,
            sources.points.as_slice(),
            sources.lines.as_slice(),
            fields.velocity.read(),
            previous,
            next,
        );
        fields.density.swap();
        Ok(())
    }

    fn compute_gradient(&mut self, ctx: &StageContext) -> Result<(), FluidError> {
        let fields = self.fields_for("gradient")?;
        gradient::compute(ctx, fields.density.read(), fields.velocity.read(), &mut fields.gradient);
        Ok(())
    }

    fn present(&mut self, _ctx: &StageContext) -> Result<(), FluidError> {
        let fields = self.fields.as_ref().ok_or(FluidError::Uninitialized("output"))?;
        output::render_rgba8(&self.style, fields.density.read(), &fields.gradient, &mut self.image);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stages_before_resize_fail() {
        let mut backend = CpuBackend::new();
        let ctx = StageContext::new(GridSize::new(4, 4), false, 0.016);
        assert!(matches!(backend.advect(&ctx, true), Err(FluidError::Uninitialized("advection"))));
        assert!(matches!(backend.solve_pressure(&ctx, 4), Err(FluidError::Uninitialized("poisson"))));
        assert!(matches!(backend.present(&ctx), Err(FluidError::Uninitialized("output"))));
        assert!(backend.grid().is_none());
    }

    #[test]
    fn test_resize_allocates_zeroed_fields() {
        let mut backend = CpuBackend::new();
        let grid = GridSize::new(12, 7);
        backend.resize(UVec2::new(24, 14), grid).unwrap();
        assert_eq!(backend.grid(), Some(grid));
        let fields = backend.fields().unwrap();
        assert_eq!(fields.velocity.read().size(), grid);
        assert_eq!(fields.density.write().size(), grid);
        assert_eq!(fields.pressure.read().max_magnitude(), 0.0);
    }

    #[test]
    fn test_projection_reads_viscous_result() {
        let mut backend = CpuBackend::new();
        let grid = GridSize::new(8, 8);
        backend.resize(UVec2::new(8, 8), grid).unwrap();
        let ctx = StageContext::new(grid, false, 0.016);
        backend.begin_frame().unwrap();
        backend.fields_mut().unwrap().velocity.read_mut().fill(Vec2::new(1.0, 0.0));
        backend.diffuse(&ctx, 10.0, 2).unwrap();
        assert!(backend.viscous_active);
        assert!((backend.fields().unwrap().viscous.read().get(4, 4) - Vec2::X).length() < 1e-6);

        backend.begin_frame().unwrap();
        backend.diffuse(&ctx, 10.0, 0).unwrap();
        assert!(!backend.viscous_active);
    }

    #[test]
    fn test_present_fills_image() {
        let mut backend = CpuBackend::new();
        let grid = GridSize::new(5, 3);
        backend.resize(UVec2::new(5, 3), grid).unwrap();
        let ctx = StageContext::new(grid, false, 0.016);
        backend.compute_gradient(&ctx).unwrap();
        backend.present(&ctx).unwrap();
        assert_eq!(backend.image().len(), 5 * 3 * 4);
    }
}
