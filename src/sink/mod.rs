//! Routes decoded events to their configured destination: CSV files or an
//! AMQP fanout exchange. Exactly one router variant is active per pipeline.

mod broker;
mod file;

pub use broker::BrokerSinkRouter;
pub use file::FileSinkRouter;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use report_codec::Event;

use crate::errors::ReporterError;

/// Monotonically non-decreasing event counters, shared with any status
/// observer via [`Counters::snapshot`].
#[derive(Debug, Default)]
pub struct Counters {
    timed: AtomicU64,
    state: AtomicU64,
    process: AtomicU64,
    component: AtomicU64,
}

/// A point-in-time read of the four counters. Readers may observe the four
/// fields at slightly different instants; no cross-field consistency is
/// guaranteed, matching SPEC_FULL.md §5.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub timed: u64,
    pub state: u64,
    pub process: u64,
    pub component: u64,
}

impl Counters {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            timed: self.timed.load(Ordering::Relaxed),
            state: self.state.load(Ordering::Relaxed),
            process: self.process.load(Ordering::Relaxed),
            component: self.component.load(Ordering::Relaxed),
        }
    }

    fn incr_timed(&self) {
        self.timed.fetch_add(1, Ordering::Relaxed);
    }

    fn incr_state(&self) {
        self.state.fetch_add(1, Ordering::Relaxed);
    }

    fn incr_process(&self) {
        self.process.fetch_add(1, Ordering::Relaxed);
    }

    fn incr_component(&self) {
        self.component.fetch_add(1, Ordering::Relaxed);
    }
}

/// The outcome of routing the end-of-report sentinel (kind 4) through the
/// broker variant: the pipeline treats this as an additional stop condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The event was handled; acquisition continues.
    Continue,
    /// The broker variant observed an end-of-report sentinel.
    EndOfReport,
}

/// Delivers one decoded event to the active sink set.
#[async_trait]
pub trait SinkRouter: Send {
    /// Route one event, updating counters as documented per kind.
    async fn route(&mut self, event: &Event) -> Result<RouteOutcome, ReporterError>;

    /// Flush and close every open sink. Called once, during shutdown.
    async fn close(&mut self) -> Result<(), ReporterError>;
}
