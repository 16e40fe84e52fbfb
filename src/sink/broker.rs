//! The AMQP sink router: publishes decoded events to a fanout exchange.

use async_trait::async_trait;
use report_codec::{Event, EventKind};
use snafu::ResultExt;
use tracing::info;

use crate::broker::{log_fatal, BrokerClient};
use crate::errors::{BrokerSnafu, ReporterError};

use super::{Counters, RouteOutcome, SinkRouter};

/// Publishes decoded events to the broker's fanout exchange. Kind 4 is
/// treated as an end-of-report sentinel rather than a sink-open request (the
/// dual-purpose resolution documented in SPEC_FULL.md §9).
pub struct BrokerSinkRouter {
    client: BrokerClient,
    counters: std::sync::Arc<Counters>,
}

impl BrokerSinkRouter {
    pub fn new(client: BrokerClient, counters: std::sync::Arc<Counters>) -> Self {
        Self { client, counters }
    }

    /// Publish the poison pill and consume the underlying client.
    pub async fn finish(self) -> Result<(), ReporterError> {
        if let Err(e) = self.client.publish_poison_pill().await {
            log_fatal("failed to publish poison pill", &e);
            return Err(e).context(BrokerSnafu);
        }
        info!("poison pill sent to the broker");
        self.client.shutdown().await;
        Ok(())
    }
}

#[async_trait]
impl SinkRouter for BrokerSinkRouter {
    async fn route(&mut self, event: &Event) -> Result<RouteOutcome, ReporterError> {
        match event.kind {
            EventKind::LogInit => {
                return Ok(RouteOutcome::EndOfReport);
            }
            EventKind::TimedEvent
            | EventKind::StateEvent
            | EventKind::ProcessEvent
            | EventKind::ComponentEvent
            | EventKind::SelfLoggedComponentEvent
            | EventKind::Invalid => {
                let body = format!("{},{},{}", event.timestamp, event.kind.tag(), event.payload);
                if let Err(e) = self.client.publish(body.as_bytes(), false).await {
                    log_fatal("failed to publish event to the broker", &e);
                    return Err(e).context(BrokerSnafu);
                }
            }
        }

        match event.kind {
            EventKind::TimedEvent => self.counters.incr_timed(),
            EventKind::StateEvent => self.counters.incr_state(),
            EventKind::ProcessEvent => self.counters.incr_process(),
            EventKind::ComponentEvent | EventKind::SelfLoggedComponentEvent => {
                self.counters.incr_component()
            }
            EventKind::Invalid | EventKind::LogInit => {}
        }

        Ok(RouteOutcome::Continue)
    }

    async fn close(&mut self) -> Result<(), ReporterError> {
        // Shutdown is driven explicitly via `finish`, after the poison pill,
        // not through the generic `SinkRouter::close` path.
        Ok(())
    }
}
