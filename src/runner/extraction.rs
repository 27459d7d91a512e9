//! Streamed frame extraction.
//!
//! A producer task walks the requests in batches of at most `in_flight` and
//! forwards every outcome through a bounded channel. The consumer files each
//! frame under its slot index, so arrival order does not matter. Indices that
//! fail or are never reported get one retry pass; whatever still fails after
//! that becomes a blank placeholder.

use crate::error::JobError;
use crate::job::InputDescriptor;
use crate::layout::{Layout, Size};
use crate::progress::{Phase, ProgressReporter};
use crate::services::{FetchOutcome, Frame, FrameRequest, FrameSource};
use futures::StreamExt;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Lifecycle of one layout slot's frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Pending,
    Fetched,
    /// Fetched on the retry pass
    Retried,
    Placeholder,
    Placed,
}

impl SlotState {
    /// Whether the slot holds a frame ready for compositing
    pub fn is_resolved(self) -> bool {
        matches!(
            self,
            SlotState::Fetched | SlotState::Retried | SlotState::Placeholder
        )
    }
}

#[derive(Debug, Clone)]
pub struct FrameSlot {
    pub index: usize,
    pub state: SlotState,
    frame: Option<Frame>,
}

impl FrameSlot {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            state: SlotState::Pending,
            frame: None,
        }
    }

    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    fn fill(&mut self, frame: Frame, retry: bool) {
        self.state = if retry {
            SlotState::Retried
        } else {
            SlotState::Fetched
        };
        self.frame = Some(frame);
    }

    fn fill_placeholder(&mut self, size: Size) {
        self.state = SlotState::Placeholder;
        self.frame = Some(Frame::placeholder(size));
    }

    /// Mark the slot composited and release its frame
    pub(crate) fn mark_placed(&mut self) {
        self.state = SlotState::Placed;
        self.frame = None;
    }
}

/// Frames for every slot of a layout, in index order
#[derive(Debug)]
pub struct ExtractionOutcome {
    pub slots: Vec<FrameSlot>,
    pub placeholder_count: usize,
}

/// Aborts the wrapped task when dropped, so an abandoned job never leaves its
/// producer running.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct Extractor<'a> {
    pub source: &'a Arc<dyn FrameSource>,
    pub input: &'a InputDescriptor,
    pub reporter: &'a ProgressReporter,
    pub cancel: &'a CancellationToken,
    pub in_flight: usize,
}

impl Extractor<'_> {
    pub async fn run(
        &self,
        layout: &Layout,
        timestamps: &[f64],
    ) -> Result<ExtractionOutcome, JobError> {
        let total = layout.placed_count;
        let mut slots: Vec<FrameSlot> = (0..total).map(FrameSlot::new).collect();
        let requests: Vec<FrameRequest> = (0..total)
            .map(|index| FrameRequest {
                index,
                timestamp_secs: timestamps.get(index).copied().unwrap_or(0.0),
            })
            .collect();

        self.reporter.advance(Phase::Extracting);
        let mut resolved = 0usize;

        let failed = self.pass(requests.clone(), &mut slots, false, &mut resolved).await?;
        let failed = if failed.is_empty() {
            failed
        } else {
            debug!(
                job_id = %self.reporter.job_id(),
                count = failed.len(),
                "Retrying failed frames"
            );
            let retry = failed.iter().map(|&index| requests[index]).collect();
            self.pass(retry, &mut slots, true, &mut resolved).await?
        };

        if resolved == 0 {
            return Err(JobError::FrameFetchExhausted { attempted: total });
        }

        for &index in &failed {
            warn!(job_id = %self.reporter.job_id(), index, "Frame failed twice, using placeholder");
            slots[index].fill_placeholder(layout.sizes[index]);
        }
        self.reporter.fraction(Phase::Extracting, total, total);

        Ok(ExtractionOutcome {
            slots,
            placeholder_count: failed.len(),
        })
    }

    /// Fetch `requests` and file the results. Returns the indices that failed
    /// or were never reported.
    async fn pass(
        &self,
        requests: Vec<FrameRequest>,
        slots: &mut [FrameSlot],
        retry: bool,
        resolved: &mut usize,
    ) -> Result<Vec<usize>, JobError> {
        let total = slots.len();
        let mut outstanding: BTreeSet<usize> = requests.iter().map(|r| r.index).collect();
        let mut failed = BTreeSet::new();

        let (tx, mut rx) = mpsc::channel::<FetchOutcome>(self.in_flight.max(1));
        let mut producer = AbortOnDrop(tokio::spawn(produce(
            Arc::clone(self.source),
            self.input.clone(),
            requests,
            self.in_flight,
            self.cancel.clone(),
            tx,
        )));

        loop {
            let outcome = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(JobError::Cancelled),
                outcome = rx.recv() => outcome,
            };
            let Some(outcome) = outcome else { break };

            if !outstanding.remove(&outcome.index) {
                warn!(
                    job_id = %self.reporter.job_id(),
                    index = outcome.index,
                    "Ignoring unexpected or duplicate frame"
                );
                continue;
            }
            match outcome.result {
                Ok(frame) => {
                    slots[outcome.index].fill(frame, retry);
                    *resolved += 1;
                    self.reporter.fraction(Phase::Extracting, *resolved, total);
                }
                Err(err) => {
                    debug!(job_id = %self.reporter.job_id(), index = outcome.index, error = %err, retry, "Frame fetch failed");
                    failed.insert(outcome.index);
                }
            }
        }

        // The channel closed, so the producer has finished; surface a panic.
        match (&mut producer.0).await {
            Ok(()) => {}
            Err(e) if e.is_panic() => {
                return Err(JobError::Internal(
                    "Frame producer task panicked".to_string(),
                ))
            }
            Err(_) => return Err(JobError::Cancelled),
        }
        if self.cancel.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        failed.extend(outstanding);
        Ok(failed.into_iter().collect())
    }
}

async fn produce(
    source: Arc<dyn FrameSource>,
    input: InputDescriptor,
    requests: Vec<FrameRequest>,
    in_flight: usize,
    cancel: CancellationToken,
    tx: mpsc::Sender<FetchOutcome>,
) {
    for batch in requests.chunks(in_flight.max(1)) {
        if cancel.is_cancelled() {
            return;
        }
        let mut stream = source.fetch(&input, batch.to_vec());
        while let Some(outcome) = stream.next().await {
            if tx.send(outcome).await.is_err() {
                return;
            }
        }
    }
}
