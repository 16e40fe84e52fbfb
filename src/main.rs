//! Thin entrypoint: parse arguments, build a [`Pipeline`], run it, and map
//! the outcome onto the documented exit codes.

use clap::Parser;
use tracing::{error, info};

use runtime_reporter::cli::Cli;
use runtime_reporter::control::{ControlState, SignalControlSource};
use runtime_reporter::errors::ExitReason;
use runtime_reporter::{Pipeline, ReporterError};

#[tokio::main]
async fn main() {
    std::process::exit(run().await);
}

async fn run() -> i32 {
    let cli = Cli::parse();

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return e.exit_reason().code();
        }
    };

    if let Err(e) = runtime_reporter::logging::init(config.log_level, config.log_file.as_deref()) {
        eprintln!("failed to initialize logging: {e}");
        return e.exit_reason().code();
    }

    let control = ControlState::new();
    #[cfg(unix)]
    let _signals = SignalControlSource::spawn(control.clone());

    match acquire(config, control).await {
        Ok(()) => ExitReason::Success.code(),
        Err(e) => {
            error!(error = %e, "acquisition failed");
            e.exit_reason().code()
        }
    }
}

async fn acquire(
    config: runtime_reporter::config::ReporterConfig,
    control: std::sync::Arc<ControlState>,
) -> Result<(), ReporterError> {
    let pipeline = Pipeline::new(config, control).await?;
    let summary = pipeline.run().await?;

    info!(
        events_acquired = summary.events_acquired,
        duration_ms = summary.duration.as_millis() as u64,
        reason = %summary.reason,
        timed = summary.counters.timed,
        state = summary.counters.state,
        process = summary.counters.process,
        component = summary.counters.component,
        "runtime-reporter exiting"
    );

    Ok(())
}
