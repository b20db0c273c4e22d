//! Tracing subscriber setup.
//!
//! Logs go to stderr and, when configured, to a file written by a
//! background thread. `RUST_LOG` overrides the configured level.

use std::path::{Path, PathBuf};

use thiserror::Error;
use time::macros::format_description;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log directory {path}: {source}")]
    Directory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid log filter '{0}'")]
    Filter(String),

    #[error("Logging already initialized")]
    AlreadyInitialized,
}

/// Where and how much to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    level: String,
    file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new("info")
    }
}

impl LoggingConfig {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            file: None,
        }
    }

    /// Also write logs to `path`.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    fn filter(&self) -> Result<EnvFilter, LoggingError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.level).map_err(|_| LoggingError::Filter(self.level.clone()))
    }
}

/// Keeps the file writer alive. Buffered lines are flushed when dropped.
#[must_use = "dropping the guard stops file logging"]
pub struct LogGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails if the log directory can't be created, the level is not a valid
/// filter, or a subscriber is already installed.
pub fn init_logging(config: LoggingConfig) -> Result<LogGuard, LoggingError> {
    let filter = config.filter()?;
    let timer = LocalTime::new(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    ));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(timer.clone())
        .with_target(false);

    let (file_layer, guard) = match config.file() {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            let layer = fmt::layer()
                .with_writer(writer)
                .with_timer(timer)
                .with_ansi(false)
                .with_thread_names(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInitialized)?;

    Ok(LogGuard { _file: guard })
}

fn file_writer(
    path: &Path,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard), LoggingError> {
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&directory).map_err(|source| LoggingError::Directory {
        path: directory.clone(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "tilescale.log".into());

    let appender = tracing_appender::rolling::never(directory, file_name);
    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_builder() {
        let config = LoggingConfig::new("debug").with_file("/tmp/ts.log");
        assert_eq!(config.level(), "debug");
        assert_eq!(config.file(), Some(Path::new("/tmp/ts.log")));
        assert_eq!(LoggingConfig::default().file(), None);
    }

    #[test]
    fn test_file_writer_creates_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs").join("tilescale.log");
        let (_writer, _guard) = file_writer(&path).unwrap();
        assert!(dir.path().join("logs").is_dir());
    }
}
