//! Jobs, their configuration, and their results.

use crate::config::MosaicConfig;
use crate::error::{ConfigurationError, JobError};
use crate::layout::{DisplayBounds, LayoutAlgorithm, LayoutRequest};
use crate::services::ArtifactLocation;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Opaque unique job identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(u64);

impl JobId {
    /// Generate the next job ID
    pub fn next() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        JobId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Handle to the job's source media. The core never inspects it; it is only
/// handed to the frame source collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputDescriptor(String);

impl InputDescriptor {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InputDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Naming inputs for the persisted artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputOptions {
    /// File stem; defaults to a name derived from the input handle
    pub file_stem: Option<String>,
    /// Artifact format extension, as produced by the compositor
    pub format: String,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            file_stem: None,
            format: "png".to_string(),
        }
    }
}

/// Parameters that produce a job's layout request and artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    pub algorithm: LayoutAlgorithm,
    pub canvas_width: u32,
    pub target_aspect_ratio: f64,
    pub density_factor: f64,
    /// Fixed thumbnail count; derived from the source duration when absent
    pub item_count: Option<usize>,
    /// Display bounds for the screen-fit algorithm
    pub display: Option<DisplayBounds>,
    pub output: OutputOptions,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            algorithm: LayoutAlgorithm::GridSearch,
            canvas_width: 1920,
            target_aspect_ratio: 16.0 / 9.0,
            density_factor: 1.0,
            item_count: None,
            display: None,
            output: OutputOptions::default(),
        }
    }
}

impl JobConfig {
    /// Job defaults from the `[layout]` and `[output]` configuration sections
    pub fn from_config(config: &MosaicConfig) -> Self {
        Self {
            algorithm: config.layout.algorithm,
            canvas_width: config.layout.canvas_width,
            target_aspect_ratio: config.layout.target_aspect_ratio,
            density_factor: config.layout.density_factor,
            item_count: None,
            display: None,
            output: OutputOptions {
                file_stem: None,
                format: config.output.format.clone(),
            },
        }
    }

    /// Reject configurations that could never produce a valid layout request.
    ///
    /// The source aspect ratio is only known after analysis, so a neutral one
    /// stands in for it here.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let item_count = match self.item_count {
            Some(count) => i64::try_from(count).unwrap_or(i64::MAX),
            None => 1,
        };
        let request = LayoutRequest::new(
            1.0,
            self.target_aspect_ratio,
            item_count,
            i64::from(self.canvas_width),
            self.algorithm,
            self.density_factor,
        )?;
        if let Some(display) = self.display {
            request.with_display(display)?;
        }
        if self.output.format.trim().is_empty() {
            return Err(ConfigurationError::Invalid(
                "Output format cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// One unit of coordinator-scheduled work
#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub input: InputDescriptor,
    pub config: JobConfig,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(input: InputDescriptor, config: JobConfig) -> Self {
        Self {
            id: JobId::next(),
            input,
            config,
            created_at: Utc::now(),
        }
    }

    /// File stem for the artifact: the configured one, or the last path
    /// segment of the input handle without its extension
    pub fn file_stem(&self) -> String {
        if let Some(stem) = &self.config.output.file_stem {
            return stem.clone();
        }
        let handle = self.input.as_str();
        let last = handle
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(handle);
        let stem = match last.rfind('.') {
            Some(dot) if dot > 0 => &last[..dot],
            _ => last,
        };
        if stem.is_empty() {
            self.id.to_string()
        } else {
            stem.to_string()
        }
    }
}

/// Lifecycle state tracked by the coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobState::Completed | JobState::Failed | JobState::Cancelled
        )
    }
}

/// Outcome of one job. Failures are data: `error` is set iff the job neither
/// succeeded nor was cancelled.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub job_id: JobId,
    pub success: bool,
    pub artifact: Option<ArtifactLocation>,
    pub error: Option<JobError>,
    pub cancelled: bool,
    pub placed_count: usize,
    pub placeholder_count: usize,
    pub elapsed: Duration,
}

impl JobResult {
    pub fn completed(
        job_id: JobId,
        artifact: ArtifactLocation,
        placed_count: usize,
        placeholder_count: usize,
        elapsed: Duration,
    ) -> Self {
        Self {
            job_id,
            success: true,
            artifact: Some(artifact),
            error: None,
            cancelled: false,
            placed_count,
            placeholder_count,
            elapsed,
        }
    }

    pub fn failed(job_id: JobId, error: JobError, elapsed: Duration) -> Self {
        Self {
            job_id,
            success: false,
            artifact: None,
            error: Some(error),
            cancelled: false,
            placed_count: 0,
            placeholder_count: 0,
            elapsed,
        }
    }

    pub fn cancelled(job_id: JobId, elapsed: Duration) -> Self {
        Self {
            job_id,
            success: false,
            artifact: None,
            error: None,
            cancelled: true,
            placed_count: 0,
            placeholder_count: 0,
            elapsed,
        }
    }

    /// Terminal state matching this result
    pub fn state(&self) -> JobState {
        if self.success {
            JobState::Completed
        } else if self.cancelled {
            JobState::Cancelled
        } else {
            JobState::Failed
        }
    }
}
