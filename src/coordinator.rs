//! Generation Coordinator
//!
//! Admits, runs, cancels and reports on mosaic jobs. A [`GenerationCoordinator`]
//! is a cheap clonable handle; all scheduling state sits behind one mutex in
//! the shared inner value.
//!
//! Lifecycle of a job: validate, register as `Queued` and take an admission
//! ticket, wait for its turn at the FIFO gate, run the pipeline under a stall
//! watchdog, emit the terminal phase, unregister, release the admission slot.
//! Once a job starts saving it can no longer be cancelled.

pub mod admission;
pub mod signal;
pub mod watchdog;

pub use admission::{auto_limit, AdmissionClosed, AdmissionGate, AdmissionPermit, AdmissionTicket};
pub use signal::{StopReason, StopSignal};
pub use watchdog::Watchdog;

use crate::config::MosaicConfig;
use crate::error::{ConfigurationError, JobError};
use crate::job::{Job, JobId, JobResult, JobState};
use crate::progress::{Phase, ProgressCallback, ProgressReporter};
use crate::runner::{JobRunner, RunOutcome, RunnerSettings};
use crate::services::Services;
use futures::stream::{FuturesUnordered, StreamExt};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Coordinator statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoordinatorStats {
    /// Jobs waiting for admission
    pub queued: usize,
    /// Jobs currently admitted
    pub running: usize,
    pub completed: usize,
    /// Failed jobs, stalled ones included
    pub failed: usize,
    pub stalled: usize,
    pub cancelled: usize,
    /// Highest number of jobs running at once
    pub peak_running: usize,
    pub effective_limit: usize,
}

#[derive(Debug)]
struct ActiveJob {
    state: JobState,
    signal: StopSignal,
    reporter: ProgressReporter,
}

#[derive(Debug, Default)]
struct Totals {
    completed: usize,
    failed: usize,
    stalled: usize,
    cancelled: usize,
    peak_running: usize,
}

#[derive(Debug)]
struct CoordinatorState {
    active: HashMap<JobId, ActiveJob>,
    configured_limit: i64,
    totals: Totals,
}

impl CoordinatorState {
    fn running(&self) -> usize {
        self.active
            .values()
            .filter(|job| job.state == JobState::Running)
            .count()
    }
}

struct Inner {
    services: Services,
    config: MosaicConfig,
    gate: Arc<AdmissionGate>,
    state: Mutex<CoordinatorState>,
}

/// A registered job holding its place in the admission line
struct QueuedJob {
    job: Job,
    reporter: ProgressReporter,
    signal: StopSignal,
    ticket: AdmissionTicket,
    started: Instant,
}

#[derive(Clone)]
pub struct GenerationCoordinator {
    inner: Arc<Inner>,
}

impl GenerationCoordinator {
    pub fn new(services: Services, config: MosaicConfig) -> Result<Self, ConfigurationError> {
        let config = config.validated()?;
        let configured_limit = config.coordinator.concurrency_limit;
        let limit = resolve_limit(configured_limit, &services, &config);
        info!(
            configured_limit,
            effective_limit = limit,
            "Generation coordinator ready"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                gate: AdmissionGate::new(limit),
                state: Mutex::new(CoordinatorState {
                    active: HashMap::new(),
                    configured_limit,
                    totals: Totals::default(),
                }),
                services,
                config,
            }),
        })
    }

    pub fn config(&self) -> &MosaicConfig {
        &self.inner.config
    }

    /// Run one job to completion.
    ///
    /// Configuration errors are returned before the job is queued; every
    /// later failure is reported inside the [`JobResult`].
    pub async fn submit(
        &self,
        job: Job,
        callback: Option<ProgressCallback>,
    ) -> Result<JobResult, ConfigurationError> {
        job.config.validate()?;
        self.refresh_limit();
        let queued = self.enqueue(job, callback);
        Ok(self.run_queued(queued).await)
    }

    /// Run many jobs concurrently under the shared admission gate.
    ///
    /// Jobs are queued in the order given and admitted in that order. Returns
    /// one result per job, in completion order. Invalid jobs yield a failed
    /// result carrying their configuration error.
    pub async fn submit_batch(
        &self,
        jobs: Vec<Job>,
        callback: Option<ProgressCallback>,
    ) -> Vec<JobResult> {
        let limit = self.refresh_limit();
        info!(jobs = jobs.len(), effective_limit = limit, "Submitting batch");

        let mut results = Vec::with_capacity(jobs.len());
        let mut pending = FuturesUnordered::new();
        for job in jobs {
            let job_id = job.id;
            if let Err(err) = job.config.validate() {
                warn!(job_id = %job_id, error = %err, "Rejecting invalid job");
                let reporter = ProgressReporter::new(job_id, callback.clone());
                reporter.emit(Phase::Failed, 1.0, Some(err.to_string()));
                self.inner.state.lock().totals.failed += 1;
                results.push(JobResult::failed(job_id, err.into(), Duration::ZERO));
                continue;
            }

            let queued = self.enqueue(job, callback.clone());
            let coordinator = self.clone();
            let handle = tokio::spawn(async move { coordinator.run_queued(queued).await });
            pending.push(async move { (job_id, handle.await) });
        }

        while let Some((job_id, joined)) = pending.next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!(job_id = %job_id, error = %e, "Job task failed");
                    results.push(JobResult::failed(
                        job_id,
                        JobError::Internal(format!("job task failed: {}", e)),
                        Duration::ZERO,
                    ));
                }
            }
        }
        results
    }

    /// Cancel a queued or running job. Returns whether a cancellable job was
    /// found; a job that has started saving is no longer cancellable.
    pub fn cancel(&self, job_id: JobId) -> bool {
        let removed = {
            let mut state = self.inner.state.lock();
            let stopped = state
                .active
                .get(&job_id)
                .is_some_and(|job| job.signal.stop(StopReason::Cancelled));
            if stopped {
                state.active.remove(&job_id)
            } else {
                None
            }
        };
        let Some(job) = removed else {
            if self.is_saving(job_id) {
                debug!(job_id = %job_id, "Cancel refused, job is saving");
            }
            return false;
        };

        info!(job_id = %job_id, state = ?job.state, "Job cancelled");
        job.reporter.emit(Phase::Cancelled, 1.0, None);
        true
    }

    /// Cancel every cancellable active job. Returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let removed: Vec<(JobId, ActiveJob)> = {
            let mut state = self.inner.state.lock();
            let ids: Vec<JobId> = state
                .active
                .iter()
                .filter(|(_, job)| job.signal.stop(StopReason::Cancelled))
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| state.active.remove(&id).map(|job| (id, job)))
                .collect()
        };

        for (_, job) in &removed {
            job.reporter.emit(Phase::Cancelled, 1.0, None);
        }
        info!(count = removed.len(), "Cancelled all active jobs");
        removed.len()
    }

    /// Set the concurrency bound for future admissions; 0 derives it from
    /// host resources. Running jobs are never preempted.
    pub fn set_concurrency_limit(&self, limit: i64) -> Result<(), ConfigurationError> {
        if limit < 0 {
            return Err(ConfigurationError::InvalidConcurrencyLimit(limit));
        }
        let mut state = self.inner.state.lock();
        state.configured_limit = limit;
        let effective = resolve_limit(limit, &self.inner.services, &self.inner.config);
        self.inner.gate.resize(effective);
        info!(configured_limit = limit, effective_limit = effective, "Concurrency limit updated");
        Ok(())
    }

    /// Limit the next admission will be held to
    pub fn effective_concurrency_limit(&self) -> usize {
        let configured = self.inner.state.lock().configured_limit;
        resolve_limit(configured, &self.inner.services, &self.inner.config)
    }

    pub fn stats(&self) -> CoordinatorStats {
        let state = self.inner.state.lock();
        let running = state.running();
        CoordinatorStats {
            queued: state.active.len() - running,
            running,
            completed: state.totals.completed,
            failed: state.totals.failed,
            stalled: state.totals.stalled,
            cancelled: state.totals.cancelled,
            peak_running: state.totals.peak_running,
            effective_limit: self.inner.gate.limit(),
        }
    }

    /// Snapshot of active jobs, ordered by id
    pub fn active_jobs(&self) -> Vec<(JobId, JobState)> {
        let state = self.inner.state.lock();
        let mut jobs: Vec<_> = state.active.iter().map(|(id, job)| (*id, job.state)).collect();
        jobs.sort_by_key(|(id, _)| *id);
        jobs
    }

    /// Recompute the effective limit from the configured value and current resources
    fn refresh_limit(&self) -> usize {
        let state = self.inner.state.lock();
        let effective = resolve_limit(state.configured_limit, &self.inner.services, &self.inner.config);
        self.inner.gate.resize(effective);
        effective
    }

    /// Register the job as queued and take its admission ticket
    fn enqueue(&self, job: Job, callback: Option<ProgressCallback>) -> QueuedJob {
        let started = Instant::now();
        let job_id = job.id;
        let reporter = ProgressReporter::new(job_id, callback);
        let signal = StopSignal::new();
        let ticket = self.inner.gate.ticket();

        self.inner.state.lock().active.insert(
            job_id,
            ActiveJob {
                state: JobState::Queued,
                signal: signal.clone(),
                reporter: reporter.clone(),
            },
        );
        debug!(job_id = %job_id, input = %job.input, algorithm = %job.config.algorithm, "Job queued");
        reporter.advance(Phase::Queued);

        QueuedJob {
            job,
            reporter,
            signal,
            ticket,
            started,
        }
    }

    async fn run_queued(&self, queued: QueuedJob) -> JobResult {
        let QueuedJob {
            job,
            reporter,
            signal,
            ticket,
            started,
        } = queued;
        let job_id = job.id;

        let admitted = tokio::select! {
            biased;
            _ = signal.token().cancelled() => None,
            permit = ticket.admit() => Some(permit),
        };
        let permit = match admitted {
            None => return self.finish(job_id, &signal, &reporter, Err(JobError::Cancelled), started),
            Some(Err(closed)) => {
                let err = JobError::Internal(closed.to_string());
                return self.finish(job_id, &signal, &reporter, Err(err), started);
            }
            Some(Ok(permit)) => permit,
        };

        if !self.mark_running(job_id) {
            let result = self.finish(job_id, &signal, &reporter, Err(JobError::Cancelled), started);
            drop(permit);
            return result;
        }
        reporter.advance(Phase::Analyzing);

        let coordinator_config = &self.inner.config.coordinator;
        let watchdog = Watchdog::spawn(
            reporter.clone(),
            signal.clone(),
            coordinator_config.stall_timeout(),
            coordinator_config.watchdog_interval(),
        );
        let settings = RunnerSettings::from_config(
            &self.inner.config.extraction,
            self.inner.services.resources.cpu_core_count(),
        );
        let runner = JobRunner::new(
            job,
            self.inner.services.clone(),
            settings,
            reporter.clone(),
            signal.clone(),
        );

        let mut task = tokio::spawn(runner.run());
        let outcome = tokio::select! {
            biased;
            joined = &mut task => match joined {
                Ok(outcome) => outcome,
                Err(e) if e.is_panic() => Err(JobError::Internal("job pipeline panicked".to_string())),
                Err(_) => Err(JobError::Cancelled),
            },
            _ = signal.token().cancelled() => {
                // Stop awaiting a pipeline stuck in a collaborator.
                task.abort();
                Err(JobError::Cancelled)
            }
        };
        drop(watchdog);

        let result = self.finish(job_id, &signal, &reporter, outcome, started);
        drop(permit);
        result
    }

    fn is_saving(&self, job_id: JobId) -> bool {
        self.inner
            .state
            .lock()
            .active
            .get(&job_id)
            .is_some_and(|job| job.signal.is_committed())
    }

    fn mark_running(&self, job_id: JobId) -> bool {
        let mut state = self.inner.state.lock();
        let Some(job) = state.active.get_mut(&job_id) else {
            return false;
        };
        if job.signal.reason().is_some() {
            return false;
        }
        job.state = JobState::Running;
        let running = state.running();
        state.totals.peak_running = state.totals.peak_running.max(running);
        debug!(job_id = %job_id, running, "Job admitted");
        true
    }

    /// Unregister the job, settle its result, and emit the terminal phase.
    ///
    /// A recorded stop reason outranks whatever the pipeline returned.
    fn finish(
        &self,
        job_id: JobId,
        signal: &StopSignal,
        reporter: &ProgressReporter,
        outcome: Result<RunOutcome, JobError>,
        started: Instant,
    ) -> JobResult {
        let stall_timeout = self.inner.config.coordinator.stall_timeout();
        let result = {
            let mut state = self.inner.state.lock();
            state.active.remove(&job_id);
            let elapsed = started.elapsed();
            let result = match (signal.reason(), outcome) {
                (Some(StopReason::Stalled), _) => JobResult::failed(
                    job_id,
                    JobError::Stalled {
                        timeout: stall_timeout,
                    },
                    elapsed,
                ),
                (Some(StopReason::Cancelled), _) | (None, Err(JobError::Cancelled)) => {
                    JobResult::cancelled(job_id, elapsed)
                }
                (None, Ok(run)) => JobResult::completed(
                    job_id,
                    run.artifact,
                    run.layout.placed_count,
                    run.placeholder_count,
                    elapsed,
                ),
                (None, Err(err)) => JobResult::failed(job_id, err, elapsed),
            };
            match result.state() {
                JobState::Completed => state.totals.completed += 1,
                JobState::Cancelled => state.totals.cancelled += 1,
                _ => {
                    state.totals.failed += 1;
                    if matches!(result.error, Some(JobError::Stalled { .. })) {
                        state.totals.stalled += 1;
                    }
                }
            }
            result
        };

        match result.state() {
            JobState::Completed => {
                reporter.emit(Phase::Completed, 1.0, None);
                info!(
                    job_id = %job_id,
                    placed = result.placed_count,
                    placeholders = result.placeholder_count,
                    elapsed_ms = result.elapsed.as_millis() as u64,
                    "Job completed"
                );
            }
            JobState::Cancelled => {
                reporter.emit(Phase::Cancelled, 1.0, None);
                info!(job_id = %job_id, "Job finished as cancelled");
            }
            _ => {
                let message = result.error.as_ref().map(|e| e.to_string());
                reporter.emit(Phase::Failed, 1.0, message.clone());
                warn!(job_id = %job_id, error = message.as_deref().unwrap_or(""), "Job failed");
            }
        }
        result
    }
}

fn resolve_limit(configured: i64, services: &Services, config: &MosaicConfig) -> usize {
    if configured > 0 {
        usize::try_from(configured).unwrap_or(usize::MAX)
    } else {
        auto_limit(services.resources.as_ref(), &config.coordinator)
    }
}
