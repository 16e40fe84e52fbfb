//! Stop/pause control state and its sources.
//!
//! Generalizes the source tool's global signal-handler flags into an
//! `Arc`-shared [`ControlState`] fed by one or more [`ControlSource`]
//! implementations, per SPEC_FULL.md §9 ("Global mutable state").

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::info;

/// Shared, atomically-visible stop/pause flags.
#[derive(Debug, Default)]
pub struct ControlState {
    stop: AtomicBool,
    pause: AtomicBool,
}

impl ControlState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        self.pause.load(Ordering::Acquire)
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn set_pause(&self, paused: bool) {
        self.pause.store(paused, Ordering::Release);
    }

    pub fn toggle_pause(&self) {
        self.pause.fetch_xor(true, Ordering::AcqRel);
    }
}

/// A handle for driving [`ControlState`] programmatically — used by tests,
/// library embedders, and any GUI front-end (an external collaborator, per
/// SPEC_FULL.md §1).
#[derive(Debug, Clone)]
pub struct ControlHandle {
    state: Arc<ControlState>,
}

impl ControlHandle {
    pub fn new(state: Arc<ControlState>) -> Self {
        Self { state }
    }

    pub fn request_stop(&self) {
        self.state.request_stop();
    }

    pub fn toggle_pause(&self) {
        self.state.toggle_pause();
    }

    pub fn set_pause(&self, paused: bool) {
        self.state.set_pause(paused);
    }
}

/// A source of stop/pause signals. Two implementations are provided:
/// [`SignalControlSource`] (OS signals) and [`ControlHandle`] (direct
/// programmatic control, used by tests, library embedders, and GUIs), which
/// needs no task of its own.
pub trait ControlSource: Send {}

impl ControlSource for ControlHandle {}

/// Maps OS signals onto [`ControlState`]: `SIGINT` requests stop, `SIGTSTP`
/// toggles pause. Unix-only, since `SIGTSTP` has no portable equivalent.
pub struct SignalControlSource;

impl ControlSource for SignalControlSource {}

impl SignalControlSource {
    /// Spawn a task that maps `SIGINT` to `stop` and `SIGTSTP` to a pause
    /// toggle, mirroring the source tool's `signal.signal(SIGINT, ...)` /
    /// `signal.signal(SIGTSTP, ...)` registration.
    #[cfg(unix)]
    pub fn spawn(state: Arc<ControlState>) -> tokio::task::JoinHandle<()> {
        spawn_signal_listener(state)
    }
}

#[cfg(unix)]
fn spawn_signal_listener(state: Arc<ControlState>) -> tokio::task::JoinHandle<()> {
    use tokio::signal::unix::{signal, SignalKind};

    tokio::spawn(async move {
        let mut sigint = match signal(SignalKind::interrupt()) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGINT handler");
                return;
            }
        };
        let mut sigtstp = match signal(SignalKind::from_raw(20)) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTSTP handler");
                return;
            }
        };

        loop {
            tokio::select! {
                Some(()) = sigint.recv() => {
                    info!("SIGINT received, stopping event acquisition");
                    state.request_stop();
                }
                Some(()) = sigtstp.recv() => {
                    state.toggle_pause();
                    if state.is_paused() {
                        info!("SIGTSTP received, pausing event acquisition");
                    } else {
                        info!("SIGTSTP received, resuming event acquisition");
                    }
                }
                else => break,
            }

            if state.is_stopped() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_is_observable_after_request() {
        let state = ControlState::new();
        assert!(!state.is_stopped());
        state.request_stop();
        assert!(state.is_stopped());
    }

    #[test]
    fn pause_toggles() {
        let state = ControlState::new();
        assert!(!state.is_paused());
        state.toggle_pause();
        assert!(state.is_paused());
        state.toggle_pause();
        assert!(!state.is_paused());
    }

    #[test]
    fn handle_mutates_shared_state() {
        let state = ControlState::new();
        let handle = ControlHandle::new(Arc::clone(&state));
        handle.request_stop();
        assert!(state.is_stopped());
    }
}
