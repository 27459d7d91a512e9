//! Configuration System
//!
//! Layered configuration for the coordinator and the job pipeline: merge
//! policy defaults, the global file, workspace files and `MOSAIC__`
//! environment overrides, deserialized into [`MosaicConfig`].

use crate::error::ConfigurationError;
use crate::layout::{LayoutAlgorithm, LayoutRequest};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use merge::merge_policy::{ENV_PREFIX, ENV_SEPARATOR};
pub use sources::workspace_file::WORKSPACE_CONFIG_FILE;

const MIB: u64 = 1024 * 1024;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MosaicConfig {
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Defaults for jobs built from configuration
    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Admission control and stall detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Maximum concurrently running jobs; 0 derives it from host resources
    #[serde(default)]
    pub concurrency_limit: i64,

    /// Seconds without progress before a running job is declared stalled
    #[serde(default = "default_stall_timeout_secs")]
    pub stall_timeout_secs: f64,

    /// How often the watchdog checks a running job
    #[serde(default = "default_watchdog_interval_ms")]
    pub watchdog_interval_ms: u64,

    /// Memory one running job is expected to need
    #[serde(default = "default_per_job_memory_bytes")]
    pub per_job_memory_bytes: u64,

    /// Share of available memory that running jobs may use together
    #[serde(default = "default_memory_budget_fraction")]
    pub memory_budget_fraction: f64,

    /// Available memory assumed when the host cannot be probed
    #[serde(default = "default_fallback_memory_bytes")]
    pub fallback_memory_bytes: u64,
}

fn default_stall_timeout_secs() -> f64 {
    60.0
}

fn default_watchdog_interval_ms() -> u64 {
    1000
}

fn default_per_job_memory_bytes() -> u64 {
    512 * MIB
}

fn default_memory_budget_fraction() -> f64 {
    0.5
}

fn default_fallback_memory_bytes() -> u64 {
    4096 * MIB
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 0,
            stall_timeout_secs: default_stall_timeout_secs(),
            watchdog_interval_ms: default_watchdog_interval_ms(),
            per_job_memory_bytes: default_per_job_memory_bytes(),
            memory_budget_fraction: default_memory_budget_fraction(),
            fallback_memory_bytes: default_fallback_memory_bytes(),
        }
    }
}

impl CoordinatorConfig {
    pub fn stall_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.stall_timeout_secs.max(0.0))
    }

    pub fn watchdog_interval(&self) -> Duration {
        Duration::from_millis(self.watchdog_interval_ms.max(1))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency_limit < 0 {
            return Err(ConfigurationError::InvalidConcurrencyLimit(self.concurrency_limit).to_string());
        }
        if !self.stall_timeout_secs.is_finite() || self.stall_timeout_secs <= 0.0 {
            return Err(format!(
                "stall_timeout_secs must be positive, got {}",
                self.stall_timeout_secs
            ));
        }
        if self.watchdog_interval_ms == 0 {
            return Err("watchdog_interval_ms must be positive".to_string());
        }
        if self.per_job_memory_bytes == 0 {
            return Err("per_job_memory_bytes must be positive".to_string());
        }
        if !(self.memory_budget_fraction > 0.0 && self.memory_budget_fraction <= 1.0) {
            return Err(format!(
                "memory_budget_fraction must be in (0, 1], got {}",
                self.memory_budget_fraction
            ));
        }
        Ok(())
    }
}

/// Frame extraction and compositing pipeline tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_min_in_flight")]
    pub min_in_flight: usize,

    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,

    /// Frames placed between compositor flushes
    #[serde(default = "default_composite_chunk_size")]
    pub composite_chunk_size: usize,

    /// Fraction of the source duration skipped at each end when sampling
    #[serde(default = "default_edge_margin")]
    pub edge_margin: f64,
}

fn default_min_in_flight() -> usize {
    4
}

fn default_max_in_flight() -> usize {
    16
}

fn default_composite_chunk_size() -> usize {
    64
}

fn default_edge_margin() -> f64 {
    0.05
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_in_flight: default_min_in_flight(),
            max_in_flight: default_max_in_flight(),
            composite_chunk_size: default_composite_chunk_size(),
            edge_margin: default_edge_margin(),
        }
    }
}

impl ExtractionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_in_flight == 0 {
            return Err("min_in_flight must be at least 1".to_string());
        }
        if self.max_in_flight < self.min_in_flight {
            return Err(format!(
                "max_in_flight ({}) is below min_in_flight ({})",
                self.max_in_flight, self.min_in_flight
            ));
        }
        if self.composite_chunk_size == 0 {
            return Err("composite_chunk_size must be at least 1".to_string());
        }
        if !(0.0..0.5).contains(&self.edge_margin) {
            return Err(format!("edge_margin must be in [0, 0.5), got {}", self.edge_margin));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_algorithm")]
    pub algorithm: LayoutAlgorithm,

    #[serde(default = "default_density_factor")]
    pub density_factor: f64,

    #[serde(default = "default_canvas_width")]
    pub canvas_width: u32,

    #[serde(default = "default_target_aspect_ratio")]
    pub target_aspect_ratio: f64,
}

fn default_algorithm() -> LayoutAlgorithm {
    LayoutAlgorithm::GridSearch
}

fn default_density_factor() -> f64 {
    1.0
}

fn default_canvas_width() -> u32 {
    1920
}

fn default_target_aspect_ratio() -> f64 {
    16.0 / 9.0
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            density_factor: default_density_factor(),
            canvas_width: default_canvas_width(),
            target_aspect_ratio: default_target_aspect_ratio(),
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), String> {
        LayoutRequest::new(
            1.0,
            self.target_aspect_ratio,
            1,
            i64::from(self.canvas_width),
            self.algorithm,
            self.density_factor,
        )
        .map(|_| ())
        .map_err(|e| e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory the file sink writes artifacts into
    #[serde(default = "default_output_directory")]
    pub directory: PathBuf,

    #[serde(default = "default_output_format")]
    pub format: String,
}

fn default_output_directory() -> PathBuf {
    PathBuf::from("mosaics")
}

fn default_output_format() -> String {
    "png".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_directory(),
            format: default_output_format(),
        }
    }
}

impl OutputConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.directory.as_os_str().is_empty() {
            return Err("Output directory cannot be empty".to_string());
        }
        if self.format.is_empty() || !self.format.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(format!("Invalid output format '{}'", self.format));
        }
        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("coordinator: {0}")]
    Coordinator(String),
    #[error("extraction: {0}")]
    Extraction(String),
    #[error("layout: {0}")]
    Layout(String),
    #[error("output: {0}")]
    Output(String),
    #[error("logging: {0}")]
    Logging(String),
}

impl MosaicConfig {
    /// Validate every section, collecting all errors
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.coordinator.validate() {
            errors.push(ValidationError::Coordinator(e));
        }
        if let Err(e) = self.extraction.validate() {
            errors.push(ValidationError::Extraction(e));
        }
        if let Err(e) = self.layout.validate() {
            errors.push(ValidationError::Layout(e));
        }
        if let Err(e) = self.output.validate() {
            errors.push(ValidationError::Output(e));
        }
        if let Err(e) = crate::logging::validate(&self.logging) {
            errors.push(ValidationError::Logging(e.to_string()));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold all errors into one [`ConfigurationError`]
    pub fn validated(self) -> Result<Self, ConfigurationError> {
        self.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ConfigurationError::Invalid(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;
        Ok(self)
    }
}
