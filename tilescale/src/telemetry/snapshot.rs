use std::fmt;
use std::time::Duration;

/// Point-in-time copy of [`super::JobMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub uptime: Duration,
    pub jobs_started: u64,
    pub jobs_completed: u64,
    pub jobs_failed: u64,
    pub jobs_cancelled: u64,
    pub tiles_completed: u64,
    pub inference_time: Duration,
    pub model_cache_hits: u64,
    pub model_cache_misses: u64,
    pub model_downloads: u64,
}

impl TelemetrySnapshot {
    /// Mean inference time per tile, zero before the first tile.
    pub fn mean_tile_time(&self) -> Duration {
        if self.tiles_completed == 0 {
            return Duration::ZERO;
        }
        self.inference_time / self.tiles_completed as u32
    }

    /// Fraction of model lookups served without a download.
    pub fn cache_hit_rate(&self) -> f64 {
        let lookups = self.model_cache_hits + self.model_cache_misses;
        if lookups == 0 {
            return 0.0;
        }
        self.model_cache_hits as f64 / lookups as f64
    }
}

impl fmt::Display for TelemetrySnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "jobs {}/{} ok ({} failed, {} cancelled), {} tiles, {:.1}ms/tile, model cache {:.0}% hit",
            self.jobs_completed,
            self.jobs_started,
            self.jobs_failed,
            self.jobs_cancelled,
            self.tiles_completed,
            self.mean_tile_time().as_secs_f64() * 1000.0,
            self.cache_hit_rate() * 100.0
        )
    }
}
