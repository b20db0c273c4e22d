//! Running one upscale job end to end.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, UpscaleError};
use crate::inference::{BackendId, InferenceAdapter};
use crate::pixel::PixelBuffer;
use crate::registry::{ModelId, ModelResolver};
use crate::telemetry::JobMetrics;
use crate::tiling::{TileCompositor, TileGrid};

use super::progress::{ProgressSink, UpscalingProgress};
use super::state::JobState;

/// Default model input edge in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 64;

/// Default minimum overlap between neighbouring tiles.
pub const DEFAULT_MIN_OVERLAP: u32 = 12;

/// Largest accepted tile edge. One tile crop is `tile_size² × 4` bytes.
pub const MAX_TILE_SIZE: u32 = 1024;

/// Tiling parameters shared by all jobs on an orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpscaleConfig {
    pub tile_size: u32,
    pub min_overlap: u32,
}

impl Default for UpscaleConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            min_overlap: DEFAULT_MIN_OVERLAP,
        }
    }
}

impl UpscaleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_min_overlap(mut self, min_overlap: u32) -> Self {
        self.min_overlap = min_overlap;
        self
    }

    /// Check that `tile_size` is within `1..=MAX_TILE_SIZE`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDimension` otherwise.
    pub fn validate(&self) -> Result<()> {
        if self.tile_size == 0 || self.tile_size > MAX_TILE_SIZE {
            return Err(UpscaleError::InvalidDimension(format!(
                "tile_size {} outside 1..={}",
                self.tile_size, MAX_TILE_SIZE
            )));
        }
        Ok(())
    }
}

/// Per-job choices. Immutable once the job starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpscalingOptions {
    pub model: ModelId,
    pub backend: BackendId,
    pub factor: u32,
}

impl UpscalingOptions {
    pub fn new(model: ModelId, backend: BackendId, factor: u32) -> Self {
        Self {
            model,
            backend,
            factor,
        }
    }

    /// Options using the model's own scale as the factor.
    pub fn for_model(model: ModelId, backend: BackendId) -> Self {
        Self::new(model, backend, model.scale())
    }
}

/// A job: options plus the image it owns.
#[derive(Debug)]
pub struct UpscaleRequest {
    pub options: UpscalingOptions,
    pub input: PixelBuffer,
}

impl UpscaleRequest {
    pub fn new(options: UpscalingOptions, input: PixelBuffer) -> Self {
        Self { options, input }
    }
}

/// Drives jobs through [`JobState`].
///
/// Tiles are processed strictly in row-major order, one at a time; progress
/// after tile `i` (1-based) of `n` is exactly `100 * i / n`.
pub struct UpscaleOrchestrator {
    resolver: Arc<dyn ModelResolver>,
    config: UpscaleConfig,
    metrics: Arc<JobMetrics>,
}

impl UpscaleOrchestrator {
    pub fn new(resolver: Arc<dyn ModelResolver>, config: UpscaleConfig) -> Self {
        Self {
            resolver,
            config,
            metrics: Arc::new(JobMetrics::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<JobMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> UpscaleConfig {
        self.config
    }

    pub fn metrics(&self) -> &Arc<JobMetrics> {
        &self.metrics
    }

    /// Wait for the resolver's background work.
    pub async fn flush(&self) {
        self.resolver.flush().await
    }

    /// Run a job and report its outcome through `progress`.
    ///
    /// Emits any number of `Progress` events and then exactly one `Done` (with
    /// the output buffer moved into it) or `Failed`.
    #[instrument(
        skip_all,
        fields(
            model = %request.options.model,
            backend = %request.options.backend,
            width = request.input.width(),
            height = request.input.height(),
        )
    )]
    pub async fn execute(
        &self,
        request: UpscaleRequest,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) {
        self.metrics.job_started();
        let started = Instant::now();

        match self.run(request, progress, cancel).await {
            Ok(output) => {
                self.metrics.job_completed();
                info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    out_width = output.width(),
                    out_height = output.height(),
                    "Job complete"
                );
                progress.emit(UpscalingProgress::Done { output });
            }
            Err(e) => {
                if matches!(e, UpscaleError::Cancelled) {
                    self.metrics.job_cancelled();
                    info!("Job cancelled");
                } else {
                    self.metrics.job_failed();
                    warn!(code = e.error_code(), error = %e, "Job failed");
                }
                progress.emit(UpscalingProgress::Failed {
                    message: e.to_string(),
                });
            }
        }

        debug!(telemetry = %self.metrics.snapshot(), "Orchestrator totals");
    }

    /// Run a job and return its output.
    ///
    /// Only `Progress` events are emitted; the caller decides what to do with
    /// the result.
    ///
    /// # Errors
    ///
    /// Any [`UpscaleError`]; no partial output is ever returned.
    pub async fn run(
        &self,
        request: UpscaleRequest,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<PixelBuffer> {
        let UpscaleRequest { options, input } = request;
        let mut state = JobState::Idle;

        let result = self
            .drive(&mut state, options, input, progress, cancel)
            .await;
        if result.is_err() {
            transition(&mut state, JobState::Failed);
        }
        result
    }

    async fn drive(
        &self,
        state: &mut JobState,
        options: UpscalingOptions,
        input: PixelBuffer,
        progress: &ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<PixelBuffer> {
        if options.factor == 0 {
            return Err(UpscaleError::InvalidDimension(
                "factor must be positive".to_string(),
            ));
        }
        self.config.validate()?;

        transition(state, JobState::Resolving);
        check_cancelled(cancel)?;
        let backend = self.resolver.resolve_backend(options.backend)?;
        debug!(
            device = backend.device(),
            parallelism = backend.parallelism(),
            "Backend resolved"
        );
        let model = self
            .resolver
            .resolve_model(options.model, &backend, progress)
            .await?;
        if model.scale() != options.factor {
            return Err(UpscaleError::FactorMismatch {
                requested: options.factor,
                model: options.model,
                scale: model.scale(),
            });
        }

        transition(state, JobState::Planning);
        let grid = TileGrid::plan(
            input.width(),
            input.height(),
            self.config.tile_size,
            self.config.min_overlap,
        )?;
        let out_width = scaled_dimension(input.width(), options.factor)?;
        let out_height = scaled_dimension(input.height(), options.factor)?;
        info!(
            columns = grid.columns().len(),
            rows = grid.rows().len(),
            tiles = grid.len(),
            out_width,
            out_height,
            "Tile grid planned"
        );

        let adapter = InferenceAdapter::new(model);
        let compositor = TileCompositor::new(options.factor);
        let mut output = PixelBuffer::new(out_width, out_height);
        let total = grid.len();

        for (index, tile) in grid.tiles().iter().enumerate() {
            check_cancelled(cancel)?;
            transition(state, JobState::Processing { tile: index, total });

            let crop = compositor.extract(&input, tile.src_rect);
            let started = Instant::now();
            let upscaled = adapter.run(index, &crop).await?;
            self.metrics.tile_completed(started.elapsed());
            compositor.composite_tile(&mut output, &upscaled, tile)?;

            let completed = index + 1;
            progress.emit(UpscalingProgress::Progress {
                percent: percent(completed, total),
                message: format!("Upscaled tile {}/{}", completed, total),
            });
        }

        transition(state, JobState::Finalizing);
        drop(input);
        transition(state, JobState::Done);
        Ok(output)
    }
}

fn transition(state: &mut JobState, next: JobState) {
    debug_assert!(state.can_transition_to(next), "{} -> {}", state, next);
    debug!(from = %state, to = %next, "Job state");
    *state = next;
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(UpscaleError::Cancelled);
    }
    Ok(())
}

/// Progress after `completed` of `total` tiles.
pub fn percent(completed: usize, total: usize) -> f32 {
    (100 * completed) as f32 / total as f32
}

fn scaled_dimension(dimension: u32, factor: u32) -> Result<u32> {
    dimension.checked_mul(factor).ok_or_else(|| {
        UpscaleError::InvalidDimension(format!(
            "{} x {} overflows the output size",
            dimension, factor
        ))
    })
}
