//! The error taxonomy for the acquisition pipeline and its exit-code mapping.

use std::path::PathBuf;

use snafu::Snafu;

use crate::broker::BrokerError;
use report_codec::FramingError;

/// Errors that can terminate the reporter before or during acquisition.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ReporterError {
    /// The SUT executable could not be spawned.
    #[snafu(display("failed to spawn SUT at {}: {source}", path.display()))]
    SutSpawn { path: PathBuf, source: std::io::Error },

    /// A read from the SUT's stdout pipe failed after acquisition began.
    #[snafu(display("failed to read SUT output: {source}"))]
    SutRead { source: std::io::Error },

    /// A batch of bytes read from the SUT could not be framed into packets.
    #[snafu(display("framing error: {source}"))]
    Framing { source: FramingError },

    /// A sink file could not be opened.
    #[snafu(display("failed to open sink {name:?} at {}: {source}", path.display()))]
    SinkOpen {
        name: String,
        path: PathBuf,
        source: std::io::Error,
    },

    /// A write to an open sink failed.
    #[snafu(display("failed to write to sink {name:?}: {source}"))]
    SinkWrite { name: String, source: std::io::Error },

    /// A kind-5 event referenced a sink that was never opened by a kind-4 event.
    #[snafu(display("self-logged component {name:?} has no open sink"))]
    SinkMissing { name: String },

    /// The broker connection, channel, or publish failed.
    #[snafu(display("broker error: {source}"))]
    Broker { source: BrokerError },

    /// The broker TOML config file could not be read or parsed.
    #[snafu(display("broker config error: {message}"))]
    BrokerConfig { message: String },

    /// The configured input or output path failed validation.
    #[snafu(display("path error: {message}"))]
    InvalidPath { message: String },
}

/// The four exit codes documented for the acquisition binary.
///
/// The source tool's exit codes are signed (`-1`..`-4`); process exit codes on
/// every platform this binary targets are unsigned bytes, so each code is
/// mapped to a small positive byte that preserves distinguishability. The
/// mapping is deliberately not `256 - n` (which would collide with codes a
/// shell already treats specially); see DESIGN.md for the chosen table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Normal completion.
    Success,
    /// The SUT path failed validation or could not be spawned.
    InputError,
    /// The broker configuration or connection failed.
    BrokerError,
    /// The acquisition pipeline failed while running.
    ReporterError,
    /// An error outside the documented taxonomy occurred.
    UnexpectedError,
}

impl ExitReason {
    /// The process exit code for this reason.
    pub const fn code(self) -> i32 {
        match self {
            ExitReason::Success => exitcode::OK,
            ExitReason::InputError => exitcode::NOINPUT,
            ExitReason::BrokerError => exitcode::UNAVAILABLE,
            ExitReason::ReporterError => exitcode::SOFTWARE,
            ExitReason::UnexpectedError => exitcode::USAGE,
        }
    }
}

impl ReporterError {
    /// Map this error onto the documented exit-code taxonomy.
    pub fn exit_reason(&self) -> ExitReason {
        match self {
            ReporterError::SutSpawn { .. } | ReporterError::InvalidPath { .. } => {
                ExitReason::InputError
            }
            ReporterError::Broker { .. } | ReporterError::BrokerConfig { .. } => {
                ExitReason::BrokerError
            }
            ReporterError::SutRead { .. }
            | ReporterError::Framing { .. }
            | ReporterError::SinkOpen { .. }
            | ReporterError::SinkWrite { .. }
            | ReporterError::SinkMissing { .. } => ExitReason::ReporterError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sut_spawn_maps_to_input_error() {
        let err = ReporterError::SutSpawn {
            path: PathBuf::from("/does/not/exist"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(err.exit_reason(), ExitReason::InputError);
    }

    #[test]
    fn sink_missing_is_a_reporter_error() {
        let err = ReporterError::SinkMissing {
            name: "mod".to_string(),
        };
        assert_eq!(err.exit_reason(), ExitReason::ReporterError);
    }

    #[test]
    fn broker_config_error_maps_to_broker_error() {
        let err = ReporterError::BrokerConfig {
            message: "cannot parse broker config".to_string(),
        };
        assert_eq!(err.exit_reason(), ExitReason::BrokerError);
    }
}
