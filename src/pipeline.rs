//! Ties the SUT reader, framer, decoder, and sink router into one acquisition
//! loop, driven by the control plane and an optional timeout.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use report_codec::{decode_packet, PacketFramer, PacketLayout};
use snafu::ResultExt;
use tracing::info;

use crate::broker::BrokerClient;
use crate::config::{ReporterConfig, SinkTarget};
use crate::control::ControlState;
use crate::errors::{BrokerSnafu, FramingSnafu, ReporterError, SutReadSnafu};
use crate::sink::{BrokerSinkRouter, CounterSnapshot, Counters, FileSinkRouter, RouteOutcome, SinkRouter};
use crate::sut::SutProcess;

/// Why an acquisition run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The configured timeout elapsed.
    CompletedTimeout,
    /// A control source (typically `SIGINT`) requested a stop.
    StoppedSignal,
    /// The broker variant observed the end-of-report sentinel (kind 4).
    StoppedEndOfReport,
    /// The SUT's stdout reached EOF with no further control signal pending.
    StoppedEof,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TerminationReason::CompletedTimeout => "completed(timeout)",
            TerminationReason::StoppedSignal => "stopped(signal)",
            TerminationReason::StoppedEndOfReport => "stopped(end_of_report)",
            TerminationReason::StoppedEof => "stopped(eof)",
        };
        f.write_str(s)
    }
}

/// The outcome of one acquisition run, logged by the caller on exit.
#[derive(Debug, Clone)]
pub struct PipelineSummary {
    pub events_acquired: u64,
    pub duration: Duration,
    pub reason: TerminationReason,
    pub counters: CounterSnapshot,
}

/// The active sink variant, selected once at construction. Exactly one of
/// the two is live for the lifetime of a [`Pipeline`].
enum ActiveSink {
    Files(FileSinkRouter),
    Broker(BrokerSinkRouter),
}

impl ActiveSink {
    async fn route(&mut self, event: &report_codec::Event) -> Result<RouteOutcome, ReporterError> {
        match self {
            ActiveSink::Files(r) => r.route(event).await,
            ActiveSink::Broker(r) => r.route(event).await,
        }
    }

    /// Flush and close (files variant) or publish the poison pill and shut
    /// down (broker variant).
    async fn finish(self) -> Result<(), ReporterError> {
        match self {
            ActiveSink::Files(mut r) => r.close().await,
            ActiveSink::Broker(r) => r.finish().await,
        }
    }
}

/// The acquisition pipeline: owns the SUT child process, the framer, the
/// active sink, and the shared control state for one run.
pub struct Pipeline {
    sut: SutProcess,
    framer: PacketFramer,
    sink: ActiveSink,
    control: Arc<ControlState>,
    counters: Arc<Counters>,
    timeout: Option<Duration>,
}

impl Pipeline {
    /// Spawn the SUT, connect the configured sink, and assemble a pipeline
    /// ready to [`run`](Pipeline::run). Fails fast if the SUT cannot be
    /// spawned or the broker cannot be reached.
    pub async fn new(config: ReporterConfig, control: Arc<ControlState>) -> Result<Self, ReporterError> {
        let layout = PacketLayout::Canonical;
        let counters = Counters::shared();

        let sut = SutProcess::spawn(&config.sut_path, layout).await?;

        let sink = match config.sink {
            SinkTarget::Files { files_path } => {
                ActiveSink::Files(FileSinkRouter::new(files_path, counters.clone())?)
            }
            SinkTarget::Broker { broker } => {
                let client = BrokerClient::connect(&broker).await.context(BrokerSnafu)?;
                ActiveSink::Broker(BrokerSinkRouter::new(client, counters.clone()))
            }
        };

        let timeout = (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));

        Ok(Self {
            sut,
            framer: PacketFramer::new(layout),
            sink,
            control,
            counters,
            timeout,
        })
    }

    /// A cloneable, read-only handle to the live event counters, for a status
    /// observer to poll independently of the acquisition task.
    pub fn counters(&self) -> Arc<Counters> {
        self.counters.clone()
    }

    /// Run the read-decode-route loop until stop, timeout, SUT EOF, or (the
    /// broker variant) the end-of-report sentinel; then shut down cleanly.
    pub async fn run(mut self) -> Result<PipelineSummary, ReporterError> {
        let start = tokio::time::Instant::now();
        let deadline = self.timeout.map(|d| start + d);
        let mut events_acquired: u64 = 0;
        let mut reached_eof = false;

        let reason = 'acquire: loop {
            if self.control.is_stopped() {
                break TerminationReason::StoppedSignal;
            }

            while self.control.is_paused() {
                if self.control.is_stopped() {
                    break 'acquire TerminationReason::StoppedSignal;
                }
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let bytes = if let Some(dl) = deadline {
                tokio::select! {
                    res = self.sut.read_batch() => res.context(SutReadSnafu)?,
                    _ = tokio::time::sleep_until(dl) => break 'acquire TerminationReason::CompletedTimeout,
                }
            } else {
                self.sut.read_batch().await.context(SutReadSnafu)?
            };

            if bytes.is_empty() {
                reached_eof = true;
                break TerminationReason::StoppedEof;
            }

            for packet in self.framer.push(&bytes) {
                if self.control.is_stopped() {
                    break 'acquire TerminationReason::StoppedSignal;
                }

                let event = decode_packet(&packet, self.framer.layout());
                match self.sink.route(&event).await? {
                    RouteOutcome::Continue => {}
                    RouteOutcome::EndOfReport => break 'acquire TerminationReason::StoppedEndOfReport,
                }
                events_acquired += 1;

                #[cfg(not(test))]
                tokio::time::sleep(Duration::from_micros(10)).await;
            }
        };

        let framing_result = if reached_eof {
            self.framer.finish().context(FramingSnafu)
        } else {
            Ok(())
        };

        self.sut.stop().await;
        self.sink.finish().await?;
        framing_result?;

        info!(
            events_acquired,
            duration_ms = start.elapsed().as_millis() as u64,
            reason = %reason,
            "acquisition finished"
        );

        Ok(PipelineSummary {
            events_acquired,
            duration: start.elapsed(),
            reason,
            counters: self.counters.snapshot(),
        })
    }
}
