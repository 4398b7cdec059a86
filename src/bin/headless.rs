//! Render frames on the CPU backend and save the last one as a PNG.
//!
//! ```text
//! bodyflow-headless [OPTIONS.json] [--frames N] [--size WxH] [--dancers N] [--out FILE]
//! ```
//!
//! Without `--dancers` a scripted pointer circles the middle of the view.
//! Time advances by the options' `dt` every frame, so output is repeatable.

use std::fmt;
use std::path::PathBuf;
use std::process::ExitCode;

use bodyflow::prelude::*;
use bodyflow::{ConfigError, FluidError};

struct Args {
    options_path: Option<PathBuf>,
    frames: u32,
    viewport: UVec2,
    dancers: usize,
    out: PathBuf,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            options_path: None,
            frames: 180,
            viewport: UVec2::new(640, 360),
            dancers: 0,
            out: PathBuf::from("bodyflow.png"),
        }
    }
}

#[derive(Debug)]
enum HeadlessError {
    Fluid(FluidError),
    Config(ConfigError),
    Image(image::ImageError),
    BadImage,
}

impl fmt::Display for HeadlessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeadlessError::Fluid(e) => write!(f, "Simulation error: {}", e),
            HeadlessError::Config(e) => write!(f, "Config error: {}", e),
            HeadlessError::Image(e) => write!(f, "Failed to write image: {}", e),
            HeadlessError::BadImage => write!(f, "Rendered image does not match the grid size"),
        }
    }
}

impl From<FluidError> for HeadlessError {
    fn from(e: FluidError) -> Self {
        HeadlessError::Fluid(e)
    }
}

impl From<ConfigError> for HeadlessError {
    fn from(e: ConfigError) -> Self {
        HeadlessError::Config(e)
    }
}

impl From<image::ImageError> for HeadlessError {
    fn from(e: image::ImageError) -> Self {
        HeadlessError::Image(e)
    }
}

fn parse_size(s: &str) -> Option<UVec2> {
    let (w, h) = s.split_once('x')?;
    Some(UVec2::new(w.parse().ok()?, h.parse().ok()?))
}

fn parse_args() -> Args {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        let value = match arg.as_str() {
            "--frames" | "--size" | "--dancers" | "--out" => iter.next(),
            _ => {
                args.options_path = Some(PathBuf::from(arg));
                continue;
            }
        };
        let Some(value) = value else {
            log::warn!("{} expects a value", arg);
            continue;
        };
        match arg.as_str() {
            "--frames" => args.frames = value.parse().unwrap_or(args.frames),
            "--size" => args.viewport = parse_size(&value).unwrap_or(args.viewport),
            "--dancers" => args.dancers = value.parse().unwrap_or(args.dancers),
            _ => args.out = PathBuf::from(value),
        }
    }
    args
}

/// A pointer tracing a circle of radius 0.4 NDC, one turn every two seconds.
fn scripted_pointer(t: f32) -> Vec2 {
    let a = t * std::f32::consts::PI;
    Vec2::new(0.4 * a.cos(), 0.4 * a.sin())
}

fn run(args: Args) -> Result<(), HeadlessError> {
    let mut options = match &args.options_path {
        Some(path) => SimulationOptions::load(path)?,
        None => SimulationOptions::default(),
    };
    if args.dancers > 0 {
        options.input_mode = InputMode::Body;
    }

    let mut time = Time::new();
    time.set_fixed_delta(Some(options.dt));

    let mut sim = Simulation::new(CpuBackend::new(), options);
    let grid = sim.resize(args.viewport)?;

    let tracker = SharedTracker::new();
    let dancer = DemoDancer::new(args.dancers).with_hands(true);
    let mut pointer = Pointer::new();

    for _ in 0..args.frames {
        let (now, _) = time.update();
        let inputs = match sim.options().input_mode {
            InputMode::Pointer => {
                pointer.sample(Some(scripted_pointer(now)), now);
                pointer.source(now).map(FrameInputs::pointer).unwrap_or_default()
            }
            InputMode::Body => {
                dancer.publish(&tracker, now);
                FrameInputs::tracking(tracker.snapshot_at(now))
            }
        };
        let report = sim.update(now, &inputs)?;
        log::debug!(
            "t={:.3} forces={} swirls={} points={} lines={}",
            report.time,
            report.forces,
            report.swirls,
            report.points,
            report.lines
        );
    }

    let rgba = sim.backend().image().to_vec();
    let image = image::RgbaImage::from_raw(grid.width, grid.height, rgba).ok_or(HeadlessError::BadImage)?;
    image.save(&args.out)?;
    log::info!(
        "wrote {} ({}x{}, {} frames)",
        args.out.display(),
        grid.width,
        grid.height,
        args.frames
    );
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(parse_args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
