//! FIFO admission gate with a resizable bound.
//!
//! Jobs take an [`AdmissionTicket`] when they are submitted and are admitted in
//! ticket order, whichever task happens to reach the gate first.

use crate::config::CoordinatorConfig;
use crate::services::ResourcePool;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{watch, OwnedSemaphorePermit, Semaphore};

/// Bounds of the derived concurrency limit
pub const AUTO_LIMIT_MIN: usize = 2;
pub const AUTO_LIMIT_MAX: usize = 8;

/// Concurrency limit derived from host resources:
/// `clamp(min(cores / 2, memory budget / per-job estimate), 2, 8)`
pub fn auto_limit(resources: &dyn ResourcePool, config: &CoordinatorConfig) -> usize {
    let by_cpu = resources.cpu_core_count() / 2;
    let budget = resources.available_memory_bytes() as f64 * config.memory_budget_fraction;
    let by_memory = (budget / config.per_job_memory_bytes.max(1) as f64).floor() as usize;
    by_cpu.min(by_memory).clamp(AUTO_LIMIT_MIN, AUTO_LIMIT_MAX)
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("admission gate closed")]
pub struct AdmissionClosed;

#[derive(Debug)]
struct GateState {
    limit: usize,
    /// Permits still to be retired after a shrink that found them checked out
    debt: usize,
    next_ticket: u64,
    /// Ticket allowed to wait on the semaphore
    serving: u64,
    /// Tickets given up before their turn came
    abandoned: BTreeSet<u64>,
}

/// Semaphore-backed gate. Only the ticket being served waits on the
/// semaphore, so admission follows ticket order. Shrinking the limit never
/// preempts a running job, it retires permits as they return.
#[derive(Debug)]
pub struct AdmissionGate {
    semaphore: Arc<Semaphore>,
    state: Mutex<GateState>,
    turn: watch::Sender<u64>,
}

impl AdmissionGate {
    pub fn new(limit: usize) -> Arc<Self> {
        let limit = limit.max(1);
        let (turn, _) = watch::channel(0);
        Arc::new(Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            state: Mutex::new(GateState {
                limit,
                debt: 0,
                next_ticket: 0,
                serving: 0,
                abandoned: BTreeSet::new(),
            }),
            turn,
        })
    }

    pub fn limit(&self) -> usize {
        self.state.lock().limit
    }

    /// Take the next place in line
    pub fn ticket(self: &Arc<Self>) -> AdmissionTicket {
        let mut state = self.state.lock();
        let seq = state.next_ticket;
        state.next_ticket += 1;
        AdmissionTicket {
            gate: Arc::clone(self),
            seq,
            served: false,
        }
    }

    /// Take a place in line and wait for a free slot
    pub async fn admit(self: &Arc<Self>) -> Result<AdmissionPermit, AdmissionClosed> {
        self.ticket().admit().await
    }

    fn pass_turn(&self, state: &mut GateState) {
        state.serving += 1;
        while state.abandoned.remove(&state.serving) {
            state.serving += 1;
        }
        self.turn.send_replace(state.serving);
    }

    /// Change the bound for future admissions
    pub fn resize(&self, limit: usize) {
        let limit = limit.max(1);
        let mut state = self.state.lock();
        if limit > state.limit {
            let grow = limit - state.limit;
            let repaid = grow.min(state.debt);
            state.debt -= repaid;
            self.semaphore.add_permits(grow - repaid);
        } else if limit < state.limit {
            let shrink = state.limit - limit;
            let forgotten = self.semaphore.forget_permits(shrink);
            state.debt += shrink - forgotten;
        }
        state.limit = limit;
    }
}

/// A place in the admission line. Dropping it unadmitted gives the place up.
#[derive(Debug)]
pub struct AdmissionTicket {
    gate: Arc<AdmissionGate>,
    seq: u64,
    served: bool,
}

impl AdmissionTicket {
    /// Wait for this ticket's turn, then for a free slot
    pub async fn admit(mut self) -> Result<AdmissionPermit, AdmissionClosed> {
        let seq = self.seq;
        let mut turn = self.gate.turn.subscribe();
        let reached = turn.wait_for(|serving| *serving >= seq).await.is_ok();
        if !reached {
            return Err(AdmissionClosed);
        }

        let permit = Arc::clone(&self.gate.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| AdmissionClosed)?;
        {
            let mut state = self.gate.state.lock();
            self.gate.pass_turn(&mut state);
        }
        self.served = true;
        Ok(AdmissionPermit {
            permit: Some(permit),
            gate: Arc::clone(&self.gate),
        })
    }
}

impl Drop for AdmissionTicket {
    fn drop(&mut self) {
        if self.served {
            return;
        }
        let mut state = self.gate.state.lock();
        if state.serving == self.seq {
            self.gate.pass_turn(&mut state);
        } else if state.serving < self.seq {
            state.abandoned.insert(self.seq);
        }
    }
}

/// Held by a running job; returns its slot to the gate on drop
#[derive(Debug)]
pub struct AdmissionPermit {
    permit: Option<OwnedSemaphorePermit>,
    gate: Arc<AdmissionGate>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        let Some(permit) = self.permit.take() else {
            return;
        };
        let mut state = self.gate.state.lock();
        if state.debt > 0 {
            state.debt -= 1;
            permit.forget();
        }
    }
}
