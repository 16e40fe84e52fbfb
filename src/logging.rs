//! Structured logging setup: console (stderr) by default, or a log file when
//! `--log-file` is given.

use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::LogLevel;
use crate::errors::ReporterError;

/// Install the global `tracing` subscriber for this process.
///
/// `RUST_LOG` still overrides the configured level when set, matching the
/// teacher's own `tracing_subscriber::EnvFilter` layering: `--log-level`
/// picks the default, the environment can always widen or narrow it.
pub fn init(level: LogLevel, log_file: Option<&Path>) -> Result<(), ReporterError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.tracing_level().to_string()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| ReporterError::InvalidPath {
                    message: format!("cannot open log file {}: {e}", path.display()),
                })?;
            builder
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            builder.with_writer(std::io::stderr).init();
        }
    }

    Ok(())
}
