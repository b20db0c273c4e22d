//! Shared setup for commands that run jobs.

use std::sync::Arc;

use tilescale::config::ConfigFile;
use tilescale::logging::{init_logging, LogGuard};
use tilescale::telemetry::JobMetrics;
use tilescale::{ModelRegistry, UpscaleConfig, UpscaleOrchestrator, UpscaleWorker};
use tracing::info;

use crate::error::CliError;

/// Loads configuration and logging once per invocation.
pub struct CliRunner {
    config: ConfigFile,
    metrics: Arc<JobMetrics>,
    _log_guard: LogGuard,
}

impl CliRunner {
    pub fn new() -> Result<Self, CliError> {
        let config = ConfigFile::load()?;
        let log_guard = init_logging(config.logging_config())?;
        Ok(Self {
            config,
            metrics: Arc::new(JobMetrics::new()),
            _log_guard: log_guard,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn metrics(&self) -> &Arc<JobMetrics> {
        &self.metrics
    }

    pub fn log_startup(&self, command: &str) {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            command,
            model_cache = %self.config.models.cache_directory.display(),
            "tilescale starting"
        );
    }

    /// Start a worker backed by the configured model registry.
    pub fn create_worker(&self, upscale: UpscaleConfig) -> Result<UpscaleWorker, CliError> {
        let registry = ModelRegistry::from_config(self.config.registry_config())?
            .with_metrics(Arc::clone(&self.metrics));
        let orchestrator = UpscaleOrchestrator::new(Arc::new(registry), upscale)
            .with_metrics(Arc::clone(&self.metrics));
        Ok(UpscaleWorker::with_orchestrator(orchestrator)?)
    }
}
