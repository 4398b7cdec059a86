//! # bodyflow
//!
//! Real-time 2D grid fluid driven by tracked bodies, hands or a pointer.
//!
//! bodyflow runs a stable-fluids style solver as a chain of shader passes
//! over a fixed set of field buffers: velocity advection, localized force
//! injection, optional swirl and vorticity confinement, optional viscous
//! diffusion, pressure projection, and density transport. Sources come from
//! a mouse pointer or from up to four tracked people, each contributing
//! per-part forces, density discs and skeleton lines.
//!
//! ## Quick Start
//!
//! ```ignore
//! use bodyflow::prelude::*;
//!
//! let mut sim = Simulation::new(CpuBackend::new(), SimulationOptions::default());
//! sim.resize(UVec2::new(320, 240))?;
//!
//! let source = Source { coords: Vec2::ZERO, diff: Vec2::new(0.02, 0.0), moved: true };
//! sim.update(0.0, &FrameInputs::pointer(source))?;
//! let rgba = sim.backend().image();
//! ```
//!
//! ## Backends
//!
//! | Backend | Runs on | Output |
//! |---------|---------|--------|
//! | [`CpuBackend`] | rayon row passes | RGBA8 image at grid resolution |
//! | [`GpuBackend`] | wgpu render passes | window surface |
//!
//! Both implement [`FluidBackend`] and run the same stage math; the WGSL for
//! each stage lives next to its CPU version in [`stages`].
//!
//! ## Body mode
//!
//! A [`Tracker`] yields a [`TrackerSnapshot`] of people and dedicated hands.
//! [`SharedTracker`] is the thread-safe implementation a landmark detector
//! (or the scripted [`DemoDancer`]) publishes into.

pub mod aggregate;
pub mod app;
pub mod backend;
pub mod body;
pub mod cpu;
pub mod error;
pub mod gpu;
pub mod grid;
pub mod input;
pub mod options;
pub mod pass;
pub mod shaders;
mod simulation;
pub mod source;
pub mod stages;
pub mod time;
pub mod tracker;

pub use aggregate::{FrameInputs, SourceAggregator};
pub use backend::FluidBackend;
pub use body::{BodyConnection, BodyPart, Hand, PartState, Person, CONNECTIONS, MAX_BODY_PARTS, MAX_PEOPLE, MAX_SOURCES};
pub use cpu::CpuBackend;
pub use error::{AppError, ConfigError, FluidError, GpuError};
pub use glam::{UVec2, Vec2, Vec3, Vec4};
pub use gpu::GpuBackend;
pub use grid::{BoundarySpace, CellScale, Field, GridSize, PingPong};
pub use options::{InputMode, SimulationOptions};
pub use simulation::{FrameReport, Simulation};
pub use source::{ForceImpulse, FrameSources, LineSource, PointSource, Source, SourceList, SwirlImpulse};
pub use tracker::{DemoDancer, SharedTracker, Tracker, TrackerSnapshot};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use bodyflow::prelude::*;
/// ```
pub mod prelude {
    pub use crate::aggregate::FrameInputs;
    pub use crate::backend::FluidBackend;
    pub use crate::body::{BodyPart, Hand};
    pub use crate::cpu::CpuBackend;
    pub use crate::input::{Input, KeyCode, Pointer};
    pub use crate::options::{InputMode, SimulationOptions};
    pub use crate::simulation::Simulation;
    pub use crate::source::Source;
    pub use crate::time::Time;
    pub use crate::tracker::{DemoDancer, SharedTracker, Tracker};
    pub use crate::{UVec2, Vec2, Vec3, Vec4};
}
