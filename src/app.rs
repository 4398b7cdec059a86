//! The window app: winit event loop, keyboard controls and the GPU simulation.
//!
//! | Key | Action |
//! |-----|--------|
//! | `B` | toggle walls (bounce) |
//! | `V` | toggle viscous diffusion |
//! | `C` | toggle BFECC advection |
//! | `M` | switch pointer / body input |
//! | `W` | toggle swirl |
//! | `T` | toggle vorticity confinement |
//! | `Up` / `Down` | grow / shrink the cursor |
//! | `Space` | pause |
//! | `S` | save options |
//! | `Escape` | quit |

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use glam::UVec2;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::aggregate::FrameInputs;
use crate::error::{AppError, FluidError};
use crate::gpu::GpuBackend;
use crate::input::{Input, KeyCode, Pointer};
use crate::options::{InputMode, SimulationOptions};
use crate::simulation::Simulation;
use crate::stages::output::OutputStyle;
use crate::time::Time;
use crate::tracker::{DemoDancer, SharedTracker, Tracker};

/// Vorticity used when `T` turns confinement back on.
pub const DEFAULT_VORTICITY: f32 = 0.35;
pub const MIN_CURSOR_SIZE: f32 = 1.0;
pub const MAX_CURSOR_SIZE: f32 = 64.0;

const DEFAULT_OPTIONS_PATH: &str = "bodyflow.json";

const CONTROL_KEYS: [KeyCode; 11] = [
    KeyCode::B,
    KeyCode::V,
    KeyCode::C,
    KeyCode::M,
    KeyCode::W,
    KeyCode::T,
    KeyCode::Up,
    KeyCode::Down,
    KeyCode::Space,
    KeyCode::S,
    KeyCode::Escape,
];

/// App-level effects of a key that are not option edits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    TogglePause,
    Save,
    Quit,
}

/// Apply a control key to `options`, returning any app-level command.
pub fn apply_key(options: &mut SimulationOptions, key: KeyCode) -> Option<Command> {
    match key {
        KeyCode::B => options.is_bounce = !options.is_bounce,
        KeyCode::V => options.is_viscous = !options.is_viscous,
        KeyCode::C => options.is_bfecc = !options.is_bfecc,
        KeyCode::M => options.input_mode = options.input_mode.toggled(),
        KeyCode::W => options.is_swirl = !options.is_swirl,
        KeyCode::T => {
            options.vorticity = if options.vorticity > 0.0 { 0.0 } else { DEFAULT_VORTICITY };
        }
        KeyCode::Up => options.cursor_size = (options.cursor_size + 1.0).min(MAX_CURSOR_SIZE),
        KeyCode::Down => options.cursor_size = (options.cursor_size - 1.0).max(MIN_CURSOR_SIZE),
        KeyCode::Space => return Some(Command::TogglePause),
        KeyCode::S => return Some(Command::Save),
        KeyCode::Escape => return Some(Command::Quit),
        KeyCode::Other(_) => {}
    }
    None
}

/// Build the per-frame inputs for the current input mode.
pub fn frame_inputs(mode: InputMode, pointer: &Pointer, tracker: &impl Tracker, now: f32) -> FrameInputs {
    match mode {
        InputMode::Pointer => pointer.source(now).map(FrameInputs::pointer).unwrap_or_default(),
        InputMode::Body => FrameInputs::tracking(tracker.snapshot()),
    }
}

pub struct App {
    options: SimulationOptions,
    options_path: PathBuf,
    dancers: usize,
    window: Option<Arc<Window>>,
    simulation: Option<Simulation<GpuBackend>>,
    input: Input,
    pointer: Pointer,
    time: Time,
    tracker: SharedTracker,
    feeder: Option<JoinHandle<()>>,
    error: Option<AppError>,
}

impl App {
    pub fn new(options: SimulationOptions) -> Self {
        Self {
            options,
            options_path: PathBuf::from(DEFAULT_OPTIONS_PATH),
            dancers: 0,
            window: None,
            simulation: None,
            input: Input::new(),
            pointer: Pointer::new(),
            time: Time::new(),
            tracker: SharedTracker::new(),
            feeder: None,
            error: None,
        }
    }

    /// Where `S` writes the options.
    pub fn with_options_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options_path = path.into();
        self
    }

    /// Feed body mode from `count` scripted dancers.
    pub fn with_dancers(mut self, count: usize) -> Self {
        self.dancers = count;
        self
    }

    /// The tracker a landmark detector should publish into.
    pub fn tracker(&self) -> &SharedTracker {
        &self.tracker
    }

    /// Run the event loop until the window closes.
    pub fn run(mut self) -> Result<(), AppError> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);
        event_loop.run_app(&mut self)?;
        self.shutdown();
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn init(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let attrs = Window::default_attributes()
            .with_title("bodyflow")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = Arc::new(event_loop.create_window(attrs)?);
        let size = window.inner_size();
        self.input.set_window_size(size.width, size.height);

        let backend = pollster::block_on(GpuBackend::from_window(window.clone(), &OutputStyle::default()))?;
        let mut simulation = Simulation::new(backend, self.options.clone());
        simulation.resize(UVec2::new(size.width.max(1), size.height.max(1)))?;

        if self.dancers > 0 {
            let dancer = DemoDancer::new(self.dancers).with_hands(true);
            self.feeder = Some(dancer.spawn(self.tracker.clone()));
        }

        self.window = Some(window);
        self.simulation = Some(simulation);
        Ok(())
    }

    fn shutdown(&mut self) {
        self.tracker.stop();
        if let Some(handle) = self.feeder.take() {
            if handle.join().is_err() {
                log::error!("tracker feeder thread panicked");
            }
        }
    }

    fn quit(&mut self, event_loop: &ActiveEventLoop) {
        self.shutdown();
        event_loop.exit();
    }

    fn save_options(&self) {
        let Some(simulation) = &self.simulation else {
            return;
        };
        match simulation.options().save(&self.options_path) {
            Ok(()) => log::info!("saved options to {}", self.options_path.display()),
            Err(e) => log::error!("{}", e),
        }
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let Some(simulation) = self.simulation.as_mut() else {
            return;
        };

        let mut commands = Vec::new();
        for key in CONTROL_KEYS {
            if self.input.key_pressed(key) {
                commands.extend(apply_key(simulation.options_mut(), key));
            }
        }
        let scroll = self.input.scroll_delta();
        if scroll != 0.0 {
            let options = simulation.options_mut();
            options.cursor_size = (options.cursor_size + scroll).clamp(MIN_CURSOR_SIZE, MAX_CURSOR_SIZE);
        }
        let mode = simulation.options().input_mode;
        self.input.end_frame();

        for command in commands {
            match command {
                Command::TogglePause => self.time.toggle_pause(),
                Command::Save => self.save_options(),
                Command::Quit => {
                    self.quit(event_loop);
                    return;
                }
            }
        }

        let (now, _) = self.time.update();
        if self.time.is_paused() {
            return;
        }
        self.pointer.sample(self.input.cursor_ndc(), now);
        let inputs = frame_inputs(mode, &self.pointer, &self.tracker, now);

        let Some(simulation) = self.simulation.as_mut() else {
            return;
        };
        match simulation.update(now, &inputs) {
            Ok(report) => {
                if report.dropped > 0 {
                    log::debug!("frame {}: {} sources dropped", simulation.frame(), report.dropped);
                }
            }
            Err(FluidError::Surface(wgpu::SurfaceError::OutOfMemory)) => {
                log::error!("surface out of memory, exiting");
                self.quit(event_loop);
            }
            Err(FluidError::Surface(e)) => log::warn!("surface: {}", e),
            Err(e) => log::error!("{}", e),
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.init(event_loop) {
            log::error!("{}", e);
            self.error = Some(e);
            self.quit(event_loop);
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        self.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => self.quit(event_loop),
            WindowEvent::Resized(size) => {
                self.input.set_window_size(size.width, size.height);
                if size.width == 0 || size.height == 0 {
                    return;
                }
                if let Some(simulation) = &mut self.simulation {
                    if let Err(e) = simulation.resize(UVec2::new(size.width, size.height)) {
                        log::error!("{}", e);
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                self.frame(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}
