//! Event schema for job progress.

use crate::job::JobId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Named stage in a job's lifecycle, in pipeline order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Queued,
    Analyzing,
    ComputingLayout,
    Extracting,
    Compositing,
    Saving,
    Completed,
    Failed,
    Cancelled,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Queued => "queued",
            Phase::Analyzing => "analyzing",
            Phase::ComputingLayout => "computing_layout",
            Phase::Extracting => "extracting",
            Phase::Compositing => "compositing",
            Phase::Saving => "saving",
            Phase::Completed => "completed",
            Phase::Failed => "failed",
            Phase::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Completed | Phase::Failed | Phase::Cancelled)
    }

    /// Phases that count against the concurrency limit
    pub fn is_admitted(self) -> bool {
        !matches!(self, Phase::Queued) && !self.is_terminal()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub phase: Phase,
    /// Completion within the phase, in `[0, 1]`
    pub fraction: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProgressEvent {
    pub fn new(job_id: JobId, phase: Phase, fraction: f64) -> Self {
        Self {
            job_id,
            phase,
            fraction: fraction.clamp(0.0, 1.0),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Caller-supplied observer. Invoked synchronously, one event at a time per job.
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;
