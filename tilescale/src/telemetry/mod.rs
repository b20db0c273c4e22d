//! Job telemetry.
//!
//! Lock-free counters shared by the orchestrator and the model registry.
//!
//! ```text
//! Orchestrator ─┐
//!               ├──► JobMetrics ───► TelemetrySnapshot ───► logs, CLI summary
//! ModelRegistry ┘    (atomics)       (point-in-time copy)
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tilescale::telemetry::JobMetrics;
//!
//! let metrics = Arc::new(JobMetrics::new());
//! metrics.job_started();
//! metrics.tile_completed(Duration::from_millis(12));
//! metrics.job_completed();
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.tiles_completed, 1);
//! assert_eq!(snapshot.jobs_completed, 1);
//! ```

mod metrics;
mod snapshot;

pub use metrics::JobMetrics;
pub use snapshot::TelemetrySnapshot;
