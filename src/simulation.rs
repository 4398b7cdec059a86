//! Frame orchestrator.
//!
//! [`Simulation`] owns the options, the source aggregator and a backend, and
//! runs the stages in a fixed order every frame:
//!
//! boundary select → advect → forces → swirl → vortex → viscous → divergence
//! → poisson → pressure → density → gradient → present
//!
//! ```ignore
//! let mut sim = Simulation::new(CpuBackend::new(), SimulationOptions::default());
//! sim.resize(UVec2::new(640, 360))?;
//! let report = sim.update(now, &FrameInputs::pointer(source))?;
//! ```

use glam::UVec2;

use crate::aggregate::{FrameInputs, SourceAggregator};
use crate::backend::FluidBackend;
use crate::error::FluidError;
use crate::grid::GridSize;
use crate::options::SimulationOptions;
use crate::stages::StageContext;

/// What a frame did, for logging and tests.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub time: f32,
    pub forces: usize,
    pub swirls: usize,
    pub points: usize,
    pub lines: usize,
    /// Sources dropped for capacity.
    pub dropped: usize,
    pub viscous: bool,
    pub vortex: bool,
    pub walled: bool,
}

pub struct Simulation<B: FluidBackend> {
    backend: B,
    options: SimulationOptions,
    aggregator: SourceAggregator,
    grid: Option<GridSize>,
    frame: u64,
}

impl<B: FluidBackend> Simulation<B> {
    pub fn new(backend: B, options: SimulationOptions) -> Self {
        Self {
            backend,
            options,
            aggregator: SourceAggregator::new(),
            grid: None,
            frame: 0,
        }
    }

    pub fn options(&self) -> &SimulationOptions {
        &self.options
    }

    /// Options are read at the start of every frame, so edits apply from the next update.
    pub fn options_mut(&mut self) -> &mut SimulationOptions {
        &mut self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn grid(&self) -> Option<GridSize> {
        self.grid
    }

    /// Frames completed since creation.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Recreate every field for a new viewport. Field contents reset to zero.
    pub fn resize(&mut self, viewport: UVec2) -> Result<GridSize, FluidError> {
        let grid = GridSize::from_viewport(viewport, self.options.resolution);
        self.backend.resize(viewport, grid)?;
        self.grid = Some(grid);
        log::info!(
            "resized to {}x{} viewport, {}x{} grid",
            viewport.x,
            viewport.y,
            grid.width,
            grid.height
        );
        Ok(grid)
    }

    /// Advance one frame.
    pub fn update(&mut self, now: f32, inputs: &FrameInputs) -> Result<FrameReport, FluidError> {
        let grid = self.grid.ok_or(FluidError::Uninitialized("update"))?;
        let options = &self.options;
        let ctx = StageContext::new(grid, options.is_bounce, options.dt);
        let sources = self.aggregator.collect(options, grid, inputs);

        let viscous = options.is_viscous && options.iterations_viscous > 0;
        let vortex = options.vorticity > 0.0;

        self.backend.begin_frame()?;
        self.backend.advect(&ctx, options.is_bfecc)?;
        self.backend.apply_forces(&ctx, &sources.forces)?;
        if options.is_swirl {
            self.backend.apply_swirls(&ctx, &sources.swirls)?;
        }
        if vortex {
            self.backend.confine_vorticity(&ctx, options.vorticity)?;
        }
        if viscous {
            self.backend.diffuse(&ctx, options.viscosity, options.iterations_viscous)?;
        }
        self.backend.divergence(&ctx)?;
        self.backend.solve_pressure(&ctx, options.iterations_poisson)?;
        self.backend.subtract_gradient(&ctx)?;
        self.backend.transport_density(&ctx, sources, options.density_dissipation)?;
        self.backend.compute_gradient(&ctx)?;
        self.backend.present(&ctx)?;

        self.frame += 1;
        Ok(FrameReport {
            time: now,
            forces: sources.forces.len(),
            swirls: if options.is_swirl { sources.swirls.len() } else { 0 },
            points: sources.points.len(),
            lines: sources.lines.len(),
            dropped: sources.dropped(),
            viscous,
            vortex,
            walled: ctx.boundary.is_walled(),
        })
    }
}
