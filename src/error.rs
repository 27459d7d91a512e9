//! Error types for the mosaic layout engine and generation coordinator.

use std::time::Duration;
use thiserror::Error;

/// Invalid request or configuration values, rejected before any work starts
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("Invalid {field}: {value} (must be a finite number greater than zero)")]
    InvalidAspectRatio { field: &'static str, value: f64 },

    #[error("Invalid item count: {0} (must be at least 1)")]
    InvalidItemCount(i64),

    #[error("Invalid canvas width: {0} (must be greater than zero)")]
    InvalidCanvasWidth(i64),

    #[error("Invalid density factor: {0} (must be a finite number greater than zero)")]
    InvalidDensity(f64),

    #[error("Invalid display bounds: {0}")]
    InvalidDisplay(String),

    #[error("Invalid concurrency limit: {0} (must be zero for auto or a positive count)")]
    InvalidConcurrencyLimit(i64),

    #[error("Configuration error: {0}")]
    Invalid(String),
}

impl From<config::ConfigError> for ConfigurationError {
    fn from(err: config::ConfigError) -> Self {
        ConfigurationError::Invalid(err.to_string())
    }
}

/// Layout engine errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("Layout unsatisfiable: {0}")]
    Unsatisfiable(String),
}

/// Errors reported by a frame source collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Frame decode failed at index {index}: {message}")]
    Decode { index: usize, message: String },

    #[error("Frame not delivered for index {0}")]
    Missing(usize),
}

/// Errors reported by a compositor collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositionError {
    #[error("Canvas allocation failed: {0}")]
    Allocation(String),

    #[error("Frame placement failed at index {index}: {message}")]
    Placement { index: usize, message: String },

    #[error("Canvas finalize failed: {0}")]
    Finalize(String),
}

/// Errors reported by a persistence collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PersistenceError {
    #[error("Persistence I/O error: {0}")]
    Io(String),

    #[error("Invalid artifact name: {0}")]
    InvalidName(String),
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        PersistenceError::Io(err.to_string())
    }
}

/// Per-job failure, captured into a `JobResult` rather than propagated
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JobError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    LayoutUnsatisfiable(#[from] LayoutError),

    #[error("Source analysis failed: {0}")]
    Source(#[from] SourceError),

    #[error("Frame fetch exhausted: none of {attempted} frames could be fetched")]
    FrameFetchExhausted { attempted: usize },

    #[error("Composition failed: {0}")]
    Composition(#[from] CompositionError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Job cancelled")]
    Cancelled,

    #[error("Job stalled: no progress for {timeout:?}")]
    Stalled { timeout: Duration },

    #[error("Job pipeline aborted: {0}")]
    Internal(String),
}

impl JobError {
    /// Whether this error represents a cooperative cancellation rather than a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, JobError::Cancelled)
    }
}
