//! Per-job progress serialization point.
//!
//! Every event for a job flows through one [`ProgressReporter`]. It enforces
//! phase monotonicity, drops fraction regressions within a phase and anything
//! after a terminal phase, and records when the `(phase, fraction)` pair last
//! changed so the stall watchdog can read it without taking the lock.
//!
//! Accepted events go to an outbox and reach the callback in acceptance order,
//! with no lock held. A callback may therefore cancel any job, its own
//! included.

use crate::job::JobId;
use crate::progress::event::{Phase, ProgressCallback, ProgressEvent};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

#[derive(Debug, Default)]
struct State {
    phase: Option<Phase>,
    fraction: f64,
    closed: bool,
    outbox: VecDeque<ProgressEvent>,
    /// Set while some thread is draining the outbox
    delivering: bool,
}

struct Inner {
    job_id: JobId,
    callback: Option<ProgressCallback>,
    state: Mutex<State>,
    origin: Instant,
    last_change_ms: AtomicU64,
}

#[derive(Clone)]
pub struct ProgressReporter {
    inner: Arc<Inner>,
}

impl ProgressReporter {
    pub fn new(job_id: JobId, callback: Option<ProgressCallback>) -> Self {
        Self {
            inner: Arc::new(Inner {
                job_id,
                callback,
                state: Mutex::new(State::default()),
                origin: Instant::now(),
                last_change_ms: AtomicU64::new(0),
            }),
        }
    }

    pub fn job_id(&self) -> JobId {
        self.inner.job_id
    }

    /// Accept an event if it moves the job forward. Returns whether it was accepted.
    ///
    /// An event emitted from inside the callback, or while another thread is
    /// delivering, is handed over by the delivering thread once it gets there.
    pub fn emit(&self, phase: Phase, fraction: f64, message: Option<String>) -> bool {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };

        {
            let mut state = self.inner.state.lock();
            if state.closed {
                trace!(job_id = %self.inner.job_id, phase = %phase, "Dropping event after terminal phase");
                return false;
            }
            if let Some(current) = state.phase {
                if phase < current || (phase == current && fraction <= state.fraction) {
                    return false;
                }
            }
            state.phase = Some(phase);
            state.fraction = fraction;
            state.closed = phase.is_terminal();
            self.touch();

            if self.inner.callback.is_some() {
                let mut event = ProgressEvent::new(self.inner.job_id, phase, fraction);
                event.message = message;
                state.outbox.push_back(event);
            }
        }
        self.deliver();
        true
    }

    fn deliver(&self) {
        let Some(callback) = &self.inner.callback else {
            return;
        };
        {
            let mut state = self.inner.state.lock();
            if state.delivering {
                return;
            }
            state.delivering = true;
        }
        loop {
            let next = {
                let mut state = self.inner.state.lock();
                let next = state.outbox.pop_front();
                if next.is_none() {
                    state.delivering = false;
                }
                next
            };
            match next {
                Some(event) => callback(&event),
                None => break,
            }
        }
    }

    /// Enter `phase` at fraction zero
    pub fn advance(&self, phase: Phase) -> bool {
        self.emit(phase, 0.0, None)
    }

    /// Report `completed / total` within `phase`
    pub fn fraction(&self, phase: Phase, completed: usize, total: usize) -> bool {
        let fraction = if total == 0 {
            1.0
        } else {
            completed as f64 / total as f64
        };
        self.emit(phase, fraction, None)
    }

    /// Last delivered phase
    pub fn phase(&self) -> Option<Phase> {
        self.inner.state.lock().phase
    }

    /// Whether a terminal event has been delivered
    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Time since the `(phase, fraction)` pair last changed
    pub fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.inner.last_change_ms.load(Ordering::Acquire));
        self.inner.origin.elapsed().saturating_sub(last)
    }

    fn touch(&self) {
        let now = u64::try_from(self.inner.origin.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.inner.last_change_ms.store(now, Ordering::Release);
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("job_id", &self.inner.job_id)
            .field("phase", &self.phase())
            .finish()
    }
}
