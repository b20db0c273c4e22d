use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::snapshot::TelemetrySnapshot;

/// Atomic counters for upscale jobs.
///
/// All updates use `Relaxed` ordering; counters are independent and only read
/// together through [`JobMetrics::snapshot`].
#[derive(Debug)]
pub struct JobMetrics {
    started_at: Instant,
    jobs_started: AtomicU64,
    jobs_completed: AtomicU64,
    jobs_failed: AtomicU64,
    jobs_cancelled: AtomicU64,
    tiles_completed: AtomicU64,
    inference_micros: AtomicU64,
    model_cache_hits: AtomicU64,
    model_cache_misses: AtomicU64,
    model_downloads: AtomicU64,
}

impl Default for JobMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl JobMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            jobs_started: AtomicU64::new(0),
            jobs_completed: AtomicU64::new(0),
            jobs_failed: AtomicU64::new(0),
            jobs_cancelled: AtomicU64::new(0),
            tiles_completed: AtomicU64::new(0),
            inference_micros: AtomicU64::new(0),
            model_cache_hits: AtomicU64::new(0),
            model_cache_misses: AtomicU64::new(0),
            model_downloads: AtomicU64::new(0),
        }
    }

    pub fn job_started(&self) {
        self.jobs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn job_completed(&self) {
        self.jobs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn job_failed(&self) {
        self.jobs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn job_cancelled(&self) {
        self.jobs_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one finished tile and the time its inference took.
    pub fn tile_completed(&self, inference: Duration) {
        self.tiles_completed.fetch_add(1, Ordering::Relaxed);
        self.inference_micros
            .fetch_add(inference.as_micros() as u64, Ordering::Relaxed);
    }

    /// Model found in the in-process map or the persistent cache.
    pub fn model_cache_hit(&self) {
        self.model_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn model_cache_miss(&self) {
        self.model_cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn model_downloaded(&self) {
        self.model_downloads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            uptime: self.started_at.elapsed(),
            jobs_started: self.jobs_started.load(Ordering::Relaxed),
            jobs_completed: self.jobs_completed.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            jobs_cancelled: self.jobs_cancelled.load(Ordering::Relaxed),
            tiles_completed: self.tiles_completed.load(Ordering::Relaxed),
            inference_time: Duration::from_micros(self.inference_micros.load(Ordering::Relaxed)),
            model_cache_hits: self.model_cache_hits.load(Ordering::Relaxed),
            model_cache_misses: self.model_cache_misses.load(Ordering::Relaxed),
            model_downloads: self.model_downloads.load(Ordering::Relaxed),
        }
    }
}
