//! Stall watchdog: one ticking task per running job.
//!
//! The task only reads the reporter's last-change timestamp and, once it is
//! older than the timeout, stops the job's signal with [`StopReason::Stalled`].

use crate::coordinator::signal::{StopReason, StopSignal};
use crate::progress::ProgressReporter;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::warn;

const MIN_TICK: Duration = Duration::from_millis(1);

/// Aborts its task when dropped
#[derive(Debug)]
pub struct Watchdog {
    handle: JoinHandle<()>,
}

impl Watchdog {
    /// Watch `reporter`; ticks every `interval`, or every quarter timeout when that is shorter
    pub fn spawn(
        reporter: ProgressReporter,
        signal: StopSignal,
        timeout: Duration,
        interval: Duration,
    ) -> Self {
        let tick = interval.min(timeout / 4).max(MIN_TICK);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = signal.token().cancelled() => return,
                    _ = ticker.tick() => {}
                }
                let idle = reporter.idle_for();
                if idle >= timeout {
                    if signal.stop(StopReason::Stalled) {
                        warn!(
                            job_id = %reporter.job_id(),
                            phase = ?reporter.phase(),
                            idle_ms = idle.as_millis() as u64,
                            "Job stalled, stopping it"
                        );
                    }
                    return;
                }
            }
        });
        Self { handle }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
