//! CLI error type.

use std::fmt;

use tilescale::config::ConfigError;
use tilescale::logging::LoggingError;
use tilescale::registry::RegistryError;
use tilescale::worker::WorkerError;

/// Errors surfaced to the user by `main`.
#[derive(Debug)]
pub enum CliError {
    /// Bad configuration value or key.
    Config(String),
    /// Reading or writing `config.ini` failed.
    ConfigFile(ConfigError),
    Logging(LoggingError),
    Registry(RegistryError),
    Worker(WorkerError),
    /// Decoding the input or encoding the output image failed.
    Image(String),
    /// The worker reported a failed job.
    Upscale(String),
    /// The worker went away without a final message.
    Disconnected,
    CacheClear(String),
    CacheStats(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Logging(e) => write!(f, "Failed to initialize logging: {}", e),
            CliError::Registry(e) => write!(f, "Failed to open model registry: {}", e),
            CliError::Worker(e) => write!(f, "{}", e),
            CliError::Image(msg) => write!(f, "Image error: {}", msg),
            CliError::Upscale(msg) => write!(f, "Upscaling failed: {}", msg),
            CliError::Disconnected => write!(f, "Worker exited before the job finished"),
            CliError::CacheClear(msg) => write!(f, "Failed to clear cache: {}", msg),
            CliError::CacheStats(msg) => write!(f, "Failed to read cache stats: {}", msg),
        }
    }
}

impl std::error::Error for CliError {}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<RegistryError> for CliError {
    fn from(e: RegistryError) -> Self {
        CliError::Registry(e)
    }
}

impl From<WorkerError> for CliError {
    fn from(e: WorkerError) -> Self {
        CliError::Worker(e)
    }
}

impl From<image::ImageError> for CliError {
    fn from(e: image::ImageError) -> Self {
        CliError::Image(e.to_string())
    }
}
