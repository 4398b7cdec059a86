//! bodyflow window app.
//!
//! ```text
//! bodyflow [OPTIONS.json] [--dancers N]
//! ```
//!
//! With `--dancers`, body mode (`M`) is fed by scripted skeletons.

use std::path::PathBuf;
use std::process::ExitCode;

use bodyflow::app::App;
use bodyflow::{AppError, SimulationOptions};

struct Args {
    options_path: Option<PathBuf>,
    dancers: usize,
}

fn parse_args() -> Args {
    let mut args = Args {
        options_path: None,
        dancers: 0,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--dancers" => match iter.next().map(|n| n.parse()) {
                Some(Ok(n)) => args.dancers = n,
                _ => log::warn!("--dancers expects a count, ignoring"),
            },
            _ => args.options_path = Some(PathBuf::from(arg)),
        }
    }
    args
}

fn run() -> Result<(), AppError> {
    let args = parse_args();

    let options = match &args.options_path {
        Some(path) if path.exists() => {
            log::info!("loading options from {}", path.display());
            SimulationOptions::load(path)?
        }
        _ => SimulationOptions::default(),
    };

    let mut app = App::new(options).with_dancers(args.dancers);
    if let Some(path) = args.options_path {
        app = app.with_options_path(path);
    }
    app.run()
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
