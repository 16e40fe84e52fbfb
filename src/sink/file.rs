//! The CSV file-sink router: one `main_log.csv` plus a file per self-logging
//! component, opened lazily on its kind-4 event.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use report_codec::{Event, EventKind};
use tracing::warn;

use crate::errors::{ReporterError, SinkOpenSnafu, SinkWriteSnafu};
use snafu::ResultExt;

use super::{Counters, RouteOutcome, SinkRouter};

const MAIN_SINK: &str = "main";

/// Writes decoded events as CSV lines under `files_path`.
pub struct FileSinkRouter {
    files_path: PathBuf,
    sinks: HashMap<String, File>,
    counters: std::sync::Arc<Counters>,
}

impl FileSinkRouter {
    /// Create a router with the `"main"` sink already open (truncated).
    pub fn new(files_path: PathBuf, counters: std::sync::Arc<Counters>) -> Result<Self, ReporterError> {
        let main_path = files_path.join("main_log.csv");
        let main_file = File::create(&main_path).context(SinkOpenSnafu {
            name: MAIN_SINK.to_string(),
            path: main_path,
        })?;

        let mut sinks = HashMap::new();
        sinks.insert(MAIN_SINK.to_string(), main_file);

        Ok(Self {
            files_path,
            sinks,
            counters,
        })
    }

    fn write_line(&mut self, sink: &str, line: &str) -> Result<(), ReporterError> {
        let file = self
            .sinks
            .get_mut(sink)
            .expect("caller only writes to sinks it has confirmed are open");
        file.write_all(line.as_bytes())
            .context(SinkWriteSnafu {
                name: sink.to_string(),
            })
    }

    fn open_sink(&mut self, name: &str) -> Result<(), ReporterError> {
        if self.sinks.contains_key(name) {
            // A second kind-4 event for the same name is a no-op.
            return Ok(());
        }
        let path = self.files_path.join(format!("{name}_log.csv"));
        let file = File::create(&path).context(SinkOpenSnafu {
            name: name.to_string(),
            path,
        })?;
        self.sinks.insert(name.to_string(), file);
        Ok(())
    }
}

#[async_trait]
impl SinkRouter for FileSinkRouter {
    async fn route(&mut self, event: &Event) -> Result<RouteOutcome, ReporterError> {
        match event.kind {
            EventKind::TimedEvent => {
                self.write_line(
                    MAIN_SINK,
                    &format!("{},{},{}\n", event.timestamp, event.kind.tag(), event.payload),
                )?;
                self.counters.incr_timed();
            }
            EventKind::StateEvent => {
                self.write_line(
                    MAIN_SINK,
                    &format!("{},{},{}\n", event.timestamp, event.kind.tag(), event.payload),
                )?;
                self.counters.incr_state();
            }
            EventKind::ProcessEvent => {
                self.write_line(
                    MAIN_SINK,
                    &format!("{},{},{}\n", event.timestamp, event.kind.tag(), event.payload),
                )?;
                self.counters.incr_process();
            }
            EventKind::ComponentEvent => {
                self.write_line(
                    MAIN_SINK,
                    &format!("{},{},{}\n", event.timestamp, event.kind.tag(), event.payload),
                )?;
                self.counters.incr_component();
            }
            EventKind::LogInit => {
                self.open_sink(event.payload.trim())?;
            }
            EventKind::SelfLoggedComponentEvent => {
                let Some((component, rest)) = event.payload.split_once(',') else {
                    warn!(payload = %event.payload, "self-logged component event missing a comma, dropping");
                    return Ok(RouteOutcome::Continue);
                };
                if !self.sinks.contains_key(component) {
                    warn!(component, "self-logged component event has no open sink, dropping");
                    return Ok(RouteOutcome::Continue);
                }
                self.write_line(component, &format!("{},{}\n", event.timestamp, rest))?;
                self.counters.incr_component();
            }
            EventKind::Invalid => {
                self.write_line(
                    MAIN_SINK,
                    &format!("{},{},{}\n", event.timestamp, event.kind.tag(), event.payload),
                )?;
            }
        }
        Ok(RouteOutcome::Continue)
    }

    async fn close(&mut self) -> Result<(), ReporterError> {
        for (name, file) in self.sinks.iter_mut() {
            file.flush().context(SinkWriteSnafu {
                name: name.to_string(),
            })?;
        }
        Ok(())
    }
}
