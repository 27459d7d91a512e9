//! Per-job stop signal: a cancellation token plus the reason it fired.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const LIVE: u8 = 0;
const COMMITTED: u8 = 1;
const CANCELLED: u8 = 2;
const STALLED: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Cancelled by a caller
    Cancelled,
    /// Stopped by the watchdog after the stall timeout
    Stalled,
}

/// The first reason recorded wins; later stops are ignored.
///
/// A job that has committed to saving refuses cancellation but can still be
/// stopped as stalled.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    token: CancellationToken,
    state: Arc<AtomicU8>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `reason` and cancel the token. Returns false if the job was
    /// already stopped, or if it committed and `reason` is a cancel.
    pub fn stop(&self, reason: StopReason) -> bool {
        let stopped = match reason {
            StopReason::Cancelled => self
                .state
                .compare_exchange(LIVE, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
                .is_ok(),
            StopReason::Stalled => self
                .state
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                    matches!(state, LIVE | COMMITTED).then_some(STALLED)
                })
                .is_ok(),
        };
        if stopped {
            self.token.cancel();
        }
        stopped
    }

    /// Close the window for cancellation. Returns false if the job was
    /// already stopped.
    pub fn commit(&self) -> bool {
        self.state
            .compare_exchange(LIVE, COMMITTED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_committed(&self) -> bool {
        self.state.load(Ordering::Acquire) == COMMITTED
    }

    pub fn reason(&self) -> Option<StopReason> {
        match self.state.load(Ordering::Acquire) {
            CANCELLED => Some(StopReason::Cancelled),
            STALLED => Some(StopReason::Stalled),
            _ => None,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}
