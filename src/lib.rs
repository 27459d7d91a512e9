//! Mosaic: thumbnail mosaic layouts and concurrent generation
//!
//! Two subsystems: a deterministic, multi-algorithm [`layout`] engine that
//! arranges N thumbnails on a canvas, and a [`coordinator`] that admits, runs,
//! cancels and reports on many mosaic jobs under a resource-derived
//! concurrency limit. Decoding, compositing and encoding stay behind the
//! collaborator traits in [`services`].

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod job;
pub mod layout;
pub mod logging;
pub mod progress;
pub mod runner;
pub mod services;

pub use coordinator::{CoordinatorStats, GenerationCoordinator};
pub use error::{ConfigurationError, JobError, LayoutError};
pub use job::{InputDescriptor, Job, JobConfig, JobId, JobResult, JobState};
pub use layout::{compute_layout, Layout, LayoutAlgorithm, LayoutRequest};
pub use progress::{Phase, ProgressCallback, ProgressEvent};
