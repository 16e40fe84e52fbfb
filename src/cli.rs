//! The acquisition binary's command-line surface.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{
    validate_input_path, validate_output_dir, BrokerConfig, LogLevel, ReporterConfig, SinkTarget,
};
use crate::errors::ReporterError;

/// Reports runtime events of a software artifact to be used by a runtime monitor.
#[derive(Debug, Parser)]
#[command(name = "runtime-reporter", version, about)]
pub struct Cli {
    /// Path to the executable binary under test.
    pub sut: PathBuf,

    /// TOML file with broker parameters. When present and readable, events
    /// are published to the broker; otherwise they are written as CSV files.
    #[arg(long, default_value = "./rabbitmq_config.toml")]
    pub rabbitmq_config_file: PathBuf,

    /// Directory to write CSV sink files under, when not using a broker.
    /// Defaults to the SUT's parent directory.
    #[arg(long)]
    pub files_path: Option<PathBuf>,

    /// Force the broker sink even if the config file is unreadable (fails fast
    /// with a broker/config error rather than silently falling back to files).
    #[arg(long)]
    pub broker: bool,

    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Acquisition timeout in seconds. Zero means no timeout; negative values
    /// are coerced to zero.
    #[arg(short, long, default_value_t = 0)]
    pub timeout: i64,
}

impl Cli {
    /// Validate arguments and assemble the immutable [`ReporterConfig`].
    pub fn into_config(self) -> Result<ReporterConfig, ReporterError> {
        validate_input_path(&self.sut)?;

        let sink = if self.broker || self.rabbitmq_config_file.is_file() {
            let broker = BrokerConfig::load(&self.rabbitmq_config_file)?;
            SinkTarget::Broker { broker }
        } else {
            let files_path = self.files_path.unwrap_or_else(|| {
                self.sut
                    .parent()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| PathBuf::from("."))
            });
            validate_output_dir(&files_path)?;
            SinkTarget::Files { files_path }
        };

        let timeout_secs = self.timeout.max(0) as u64;

        Ok(ReporterConfig {
            sut_path: self.sut,
            sink,
            timeout_secs,
            log_level: self.log_level,
            log_file: self.log_file,
        })
    }
}
