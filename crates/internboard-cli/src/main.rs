//! internboard - command-line client for the internship scheduler.
//!
//! Lists projects, tasks and teams, edits task stages and comments, and
//! tracks work time on a task with an interactive timer.

mod app;
mod commands;
mod tracker;

use std::io;
use std::process::ExitCode;

use tracing::{debug, error};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use commands::{Command, USAGE};

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes buffered log lines on drop and must be held
/// until the program exits.
fn init_tracing() -> WorkerGuard {
    // Use RUST_LOG to control log level (e.g., RUST_LOG=internboard_core=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let (writer, guard) = tracing_appender::non_blocking(io::stderr());

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let _log_guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("error: {:#}\n", e);
            eprint!("{}", USAGE);
            return ExitCode::from(2);
        }
    };
    debug!(?command, "Parsed command");

    let mut app = match App::new() {
        Ok(app) => app,
        Err(e) => {
            error!(error = %e, "Failed to initialize");
            eprintln!("error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match app.run(command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
