//! Per-job pipeline: analysis, layout, extraction, compositing, saving.
//!
//! A [`JobRunner`] is built fresh for every admitted job and consumed by
//! [`JobRunner::run`]. It emits the non-terminal phases through the job's
//! [`ProgressReporter`]; the coordinator emits the terminal one. Every phase
//! boundary is a cancellation check point. Entering `Saving` commits the job,
//! after which cancellation is refused.

pub mod analysis;
pub mod compositing;
pub mod extraction;

pub use extraction::{ExtractionOutcome, FrameSlot, SlotState};

use crate::config::ExtractionConfig;
use crate::coordinator::StopSignal;
use crate::error::JobError;
use crate::job::Job;
use crate::layout::{try_compute_layout, Layout, LayoutRequest};
use crate::progress::{Phase, ProgressReporter};
use crate::services::{ArtifactLocation, NamingInputs, Services, SourceInfo};
use extraction::Extractor;
use std::time::Instant;
use tracing::{debug, info};

/// Pipeline tuning resolved for one job
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunnerSettings {
    /// Frames requested per producer batch
    pub in_flight: usize,
    pub composite_chunk_size: usize,
    /// Fraction of the duration skipped at each end when sampling
    pub edge_margin: f64,
}

impl RunnerSettings {
    /// `in_flight` is one less than the core count, kept inside the configured bounds
    pub fn from_config(config: &ExtractionConfig, cpu_cores: usize) -> Self {
        let min = config.min_in_flight.max(1);
        let max = config.max_in_flight.max(min);
        Self {
            in_flight: cpu_cores.saturating_sub(1).clamp(min, max),
            composite_chunk_size: config.composite_chunk_size.max(1),
            edge_margin: config.edge_margin,
        }
    }
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default(), num_cpus::get())
    }
}

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub artifact: ArtifactLocation,
    pub layout: Layout,
    pub placeholder_count: usize,
}

pub struct JobRunner {
    job: Job,
    services: Services,
    settings: RunnerSettings,
    reporter: ProgressReporter,
    signal: StopSignal,
}

impl JobRunner {
    pub fn new(
        job: Job,
        services: Services,
        settings: RunnerSettings,
        reporter: ProgressReporter,
        signal: StopSignal,
    ) -> Self {
        Self {
            job,
            services,
            settings,
            reporter,
            signal,
        }
    }

    pub async fn run(self) -> Result<RunOutcome, JobError> {
        let started = Instant::now();
        let job_id = self.job.id;

        self.checkpoint()?;
        let info = self.analyze().await?;

        self.checkpoint()?;
        let layout = self.compute_layout(&info)?;

        self.checkpoint()?;
        let timestamps =
            analysis::sample_timestamps(info.duration_secs, layout.placed_count, self.settings.edge_margin);
        let extractor = Extractor {
            source: &self.services.frame_source,
            input: &self.job.input,
            reporter: &self.reporter,
            cancel: self.signal.token(),
            in_flight: self.settings.in_flight,
        };
        let ExtractionOutcome {
            mut slots,
            placeholder_count,
        } = extractor.run(&layout, &timestamps).await?;

        self.checkpoint()?;
        let artifact = compositing::composite(
            self.services.compositor.as_ref(),
            &layout,
            &mut slots,
            self.settings.composite_chunk_size,
            &self.reporter,
            self.signal.token(),
        )
        .await?;
        drop(slots);

        self.checkpoint()?;
        if !self.signal.commit() {
            return Err(JobError::Cancelled);
        }
        self.reporter.advance(Phase::Saving);
        let naming = NamingInputs {
            job_id,
            file_stem: self.job.file_stem(),
            algorithm: layout.algorithm,
            format: self.job.config.output.format.clone(),
            created_at: self.job.created_at,
        };
        let location = self.services.persistence.save(&artifact, &naming).await?;
        self.reporter.emit(Phase::Saving, 1.0, None);

        info!(
            job_id = %job_id,
            placed = layout.placed_count,
            placeholders = placeholder_count,
            elapsed_ms = started.elapsed().as_millis() as u64,
            artifact = %location,
            "Job pipeline finished"
        );
        Ok(RunOutcome {
            artifact: location,
            layout,
            placeholder_count,
        })
    }

    async fn analyze(&self) -> Result<SourceInfo, JobError> {
        self.reporter.advance(Phase::Analyzing);
        let info = self.services.frame_source.probe(&self.job.input).await?;
        debug!(
            job_id = %self.job.id,
            duration_secs = info.duration_secs,
            width = info.width,
            height = info.height,
            "Source probed"
        );
        self.reporter.emit(Phase::Analyzing, 1.0, None);
        Ok(info)
    }

    fn compute_layout(&self, info: &SourceInfo) -> Result<Layout, JobError> {
        self.reporter.advance(Phase::ComputingLayout);
        let config = &self.job.config;
        let item_count = config.item_count.unwrap_or_else(|| {
            analysis::derive_item_count(info.duration_secs, config.canvas_width, config.density_factor)
        });

        let mut request = LayoutRequest::new(
            info.aspect_ratio().unwrap_or(0.0),
            config.target_aspect_ratio,
            i64::try_from(item_count).unwrap_or(i64::MAX),
            i64::from(config.canvas_width),
            config.algorithm,
            config.density_factor,
        )?;
        if let Some(display) = config.display {
            request = request.with_display(display)?;
        }

        let layout = try_compute_layout(&request)?;
        debug!(
            job_id = %self.job.id,
            requested = item_count,
            algorithm = %layout.algorithm,
            rows = layout.rows,
            cols = layout.cols,
            placed = layout.placed_count,
            "Layout computed"
        );
        self.reporter.emit(
            Phase::ComputingLayout,
            1.0,
            Some(format!(
                "{} {}x{}, {} cells",
                layout.algorithm, layout.rows, layout.cols, layout.placed_count
            )),
        );
        Ok(layout)
    }

    fn checkpoint(&self) -> Result<(), JobError> {
        if self.signal.token().is_cancelled() {
            Err(JobError::Cancelled)
        } else {
            Ok(())
        }
    }
}
