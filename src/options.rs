//! Live-tunable simulation parameters.
//!
//! [`SimulationOptions`] is a flat record read once per frame by the
//! orchestrator. Nothing here is validated: out-of-range values (a negative
//! timestep, a zero cursor) are the caller's responsibility.
//!
//! Options can be built in code or loaded from JSON:
//!
//! ```ignore
//! let options = SimulationOptions::default()
//!     .with_bounce(true)
//!     .with_viscous(true, 30.0, 32);
//! options.save("fluid.json")?;
//! let again = SimulationOptions::load("fluid.json")?;
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which device drives force and density injection.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum InputMode {
    /// Mouse / touch pointer.
    #[default]
    Pointer,
    /// Tracked people and hands.
    Body,
}

impl InputMode {
    pub fn toggled(self) -> Self {
        match self {
            InputMode::Pointer => InputMode::Body,
            InputMode::Body => InputMode::Pointer,
        }
    }
}

/// Solver and injection parameters.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationOptions {
    /// Jacobi iterations for the pressure Poisson solve.
    pub iterations_poisson: u32,
    /// Jacobi iterations for viscous diffusion.
    pub iterations_viscous: u32,
    /// Simulation timestep in seconds.
    pub dt: f32,
    /// Viscosity coefficient used when `is_viscous` is set.
    pub viscosity: f32,
    /// Force kernel radius, in grid cells.
    pub cursor_size: f32,
    /// Force multiplier for the pointer.
    pub mouse_force: f32,
    /// Force multiplier for tracked hands.
    pub hand_force: f32,
    /// Force multiplier for the other tracked body parts.
    pub body_force: f32,
    /// Strength multiplier for the two-hand swirl.
    pub swirl_force: f32,
    pub is_swirl: bool,
    /// Vorticity confinement strength; `0.0` disables the stage.
    pub vorticity: f32,
    /// Solid walls when set, open boundary otherwise.
    pub is_bounce: bool,
    pub is_viscous: bool,
    /// Back-and-forth error compensation in advection.
    pub is_bfecc: bool,
    pub input_mode: InputMode,
    /// Grid resolution relative to the viewport.
    pub resolution: f32,
    /// Per-frame density multiplier.
    pub density_dissipation: f32,
    /// Density disc radius for point sources, in grid cells.
    pub point_radius: f32,
    /// Density capsule radius for line sources, in grid cells.
    pub line_radius: f32,
    /// Density injected per frame at the center of a source.
    pub source_strength: f32,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            iterations_poisson: 32,
            iterations_viscous: 32,
            dt: 0.014,
            viscosity: 30.0,
            cursor_size: 50.0,
            mouse_force: 20.0,
            hand_force: 30.0,
            body_force: 12.0,
            swirl_force: 40.0,
            is_swirl: true,
            vorticity: 0.0,
            is_bounce: false,
            is_viscous: false,
            is_bfecc: true,
            input_mode: InputMode::Pointer,
            resolution: 0.5,
            density_dissipation: 0.985,
            point_radius: 6.0,
            line_radius: 3.0,
            source_strength: 0.35,
        }
    }
}

impl SimulationOptions {
    pub fn with_bounce(mut self, is_bounce: bool) -> Self {
        self.is_bounce = is_bounce;
        self
    }

    pub fn with_bfecc(mut self, is_bfecc: bool) -> Self {
        self.is_bfecc = is_bfecc;
        self
    }

    /// Enable or disable viscous diffusion with the given coefficient and iteration count.
    pub fn with_viscous(mut self, enabled: bool, viscosity: f32, iterations: u32) -> Self {
        self.is_viscous = enabled;
        self.viscosity = viscosity;
        self.iterations_viscous = iterations;
        self
    }

    pub fn with_poisson_iterations(mut self, iterations: u32) -> Self {
        self.iterations_poisson = iterations;
        self
    }

    pub fn with_dt(mut self, dt: f32) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_cursor_size(mut self, cells: f32) -> Self {
        self.cursor_size = cells;
        self
    }

    pub fn with_mouse_force(mut self, force: f32) -> Self {
        self.mouse_force = force;
        self
    }

    pub fn with_input_mode(mut self, mode: InputMode) -> Self {
        self.input_mode = mode;
        self
    }

    pub fn with_resolution(mut self, scale: f32) -> Self {
        self.resolution = scale;
        self
    }

    pub fn with_vorticity(mut self, strength: f32) -> Self {
        self.vorticity = strength;
        self
    }

    pub fn with_swirl(mut self, enabled: bool, force: f32) -> Self {
        self.is_swirl = enabled;
        self.swirl_force = force;
        self
    }

    /// Save options to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load options from a JSON file. Missing keys take their default value.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
