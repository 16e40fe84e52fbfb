//! Immutable configuration assembled once at startup from CLI arguments and,
//! optionally, a broker TOML file. Replaces the source tool's process-wide
//! mutable configuration objects (see SPEC_FULL.md §9).

mod paths;

pub use paths::{validate_input_path, validate_output_dir};

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::ReporterError;

/// Broker connection parameters, as recognized in the TOML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub exchange: String,
    #[serde(default = "default_connection_attempts")]
    pub connection_attempts: u32,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default)]
    pub heartbeat: u16,
}

const fn default_connection_attempts() -> u32 {
    3
}

const fn default_retry_delay_secs() -> u64 {
    1
}

impl BrokerConfig {
    /// Load and parse a broker TOML config file.
    pub fn load(path: &Path) -> Result<Self, ReporterError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ReporterError::BrokerConfig {
                message: format!("cannot read broker config {}: {e}", path.display()),
            })?;
        toml::from_str(&contents).map_err(|e| ReporterError::BrokerConfig {
            message: format!("cannot parse broker config {}: {e}", path.display()),
        })
    }
}

/// The verbosity levels accepted by `--log-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[clap(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warnings,
    Errors,
    Critical,
}

impl LogLevel {
    /// The `tracing` level this maps to. `tracing` has no `critical` level of
    /// its own, so both `errors` and `critical` map to `ERROR`; the two are
    /// only distinguished by which messages the reporter chooses to emit at
    /// each level, not by anything attached to the log record itself.
    pub fn tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warnings => tracing::Level::WARN,
            LogLevel::Errors | LogLevel::Critical => tracing::Level::ERROR,
        }
    }
}

/// The sink variant a pipeline is configured to use.
#[derive(Debug, Clone)]
pub enum SinkTarget {
    /// Write CSV lines under `files_path`.
    Files { files_path: PathBuf },
    /// Publish to a fanout exchange on an AMQP broker.
    Broker { broker: BrokerConfig },
}

/// The fully assembled, immutable configuration for one reporter run.
#[derive(Debug, Clone)]
pub struct ReporterConfig {
    /// Path to the SUT executable.
    pub sut_path: PathBuf,
    /// Where decoded events are routed.
    pub sink: SinkTarget,
    /// Zero means no timeout; negative CLI values are coerced to zero before
    /// this struct is built.
    pub timeout_secs: u64,
    pub log_level: LogLevel,
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_config_defaults_fill_in_missing_fields() {
        let toml = r#"
            host = "localhost"
            port = 5672
            user = "guest"
            password = "guest"
            exchange = "events"
        "#;
        let config: BrokerConfig = toml::from_str(toml).expect("valid toml");
        assert_eq!(config.connection_attempts, 3);
        assert_eq!(config.retry_delay_secs, 1);
        assert_eq!(config.heartbeat, 0);
    }

    #[test]
    fn negative_timeout_is_not_representable_forcing_coercion_upstream() {
        // u64 cannot hold a negative value; the CLI layer coerces before
        // constructing ReporterConfig. This documents that invariant.
        let config = ReporterConfig {
            sut_path: PathBuf::from("/bin/true"),
            sink: SinkTarget::Files {
                files_path: PathBuf::from("/tmp"),
            },
            timeout_secs: 0,
            log_level: LogLevel::Info,
            log_file: None,
        };
        assert_eq!(config.timeout_secs, 0);
    }
}
