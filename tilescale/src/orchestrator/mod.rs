//! Job orchestration.
//!
//! The [`UpscaleOrchestrator`] runs one job at a time:
//!
//! 1. resolve the backend, then the model (a backend failure stops here)
//! 2. plan the tile grid for the input dimensions
//! 3. for each tile in row-major order: extract, infer, composite, report
//! 4. hand the finished buffer over in `Done`
//!
//! Any error ends the job with a single `Failed` event. Cancellation is
//! checked before resolution and between tiles.

mod job;
mod progress;
mod state;

pub use job::{
    percent, UpscaleConfig, UpscaleOrchestrator, UpscaleRequest, UpscalingOptions,
    DEFAULT_MIN_OVERLAP, DEFAULT_TILE_SIZE, MAX_TILE_SIZE,
};
pub use progress::{ProgressSink, UpscalingProgress};
pub use state::JobState;
