//! `~/.tilescale/config.ini` loading and saving.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::inference::BackendId;
use crate::logging::LoggingConfig;
use crate::orchestrator::{UpscaleConfig, DEFAULT_MIN_OVERLAP, DEFAULT_TILE_SIZE, MAX_TILE_SIZE};
use crate::registry::{ModelId, RegistryConfig, DEFAULT_BASE_URL};

use super::size::{format_size_exact, parse_size};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Errors loading, validating or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// `[upscale]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpscaleSettings {
    pub tile_size: u32,
    pub min_overlap: u32,
    pub model: ModelId,
    pub backend: BackendId,
}

impl Default for UpscaleSettings {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            min_overlap: DEFAULT_MIN_OVERLAP,
            model: ModelId::Slim2x,
            backend: BackendId::Cpu,
        }
    }
}

/// `[models]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    pub base_url: String,
    pub cache_directory: PathBuf,
    /// Bytes.
    pub cache_size: usize,
    /// Seconds.
    pub timeout: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_directory: config_directory().join("models"),
            cache_size: 512 * 1024 * 1024,
            timeout: 60,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub upscale: UpscaleSettings,
    pub models: ModelSettings,
    pub logging: LoggingSettings,
}

/// `~/.tilescale`
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tilescale")
}

/// `~/.tilescale/config.ini`
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// Replace a leading `~` with the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix('~') {
        Some(rest) => {
            let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
            home.join(rest.trim_start_matches(['/', '\\']))
        }
        None => PathBuf::from(path),
    }
}

impl ConfigFile {
    /// Load from [`config_file_path`]. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from `path`. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns `Parse` for malformed ini and `InvalidValue` for values that
    /// fail validation.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    /// Parse ini text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        for key in super::ConfigKey::all() {
            let value = ini
                .section(Some(key.section()))
                .and_then(|props| props.get(key.key_name()));
            if let Some(value) = value {
                key.set(&mut config, value)?;
            }
        }
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upscale.tile_size > MAX_TILE_SIZE {
            return Err(ConfigError::invalid(
                "upscale.tile_size",
                &self.upscale.tile_size.to_string(),
                format!("must be at most {}", MAX_TILE_SIZE),
            ));
        }
        if self.upscale.min_overlap >= self.upscale.tile_size {
            return Err(ConfigError::invalid(
                "upscale.min_overlap",
                &self.upscale.min_overlap.to_string(),
                format!("must be smaller than tile_size ({})", self.upscale.tile_size),
            ));
        }
        Ok(())
    }

    /// Render as ini.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some("upscale"))
            .set("tile_size", self.upscale.tile_size.to_string())
            .set("min_overlap", self.upscale.min_overlap.to_string())
            .set("model", self.upscale.model.as_str())
            .set("backend", self.upscale.backend.as_str());
        ini.with_section(Some("models"))
            .set("base_url", self.models.base_url.as_str())
            .set(
                "cache_directory",
                self.models.cache_directory.to_string_lossy().into_owned(),
            )
            .set("cache_size", format_size_exact(self.models.cache_size))
            .set("timeout", self.models.timeout.to_string());
        let mut logging = ini.with_section(Some("logging"));
        logging.set("level", self.logging.level.as_str());
        if let Some(file) = &self.logging.file {
            logging.set("file", file.to_string_lossy().into_owned());
        }
        ini
    }

    /// Write to [`config_file_path`].
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Write to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.to_ini().write_to_file(path)?;
        Ok(())
    }

    pub fn upscale_config(&self) -> UpscaleConfig {
        UpscaleConfig::new()
            .with_tile_size(self.upscale.tile_size)
            .with_min_overlap(self.upscale.min_overlap)
    }

    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig::default()
            .with_base_url(self.models.base_url.clone())
            .with_cache_directory(self.models.cache_directory.clone())
            .with_cache_size(self.models.cache_size as u64)
            .with_timeout(Duration::from_secs(self.models.timeout))
    }

    pub fn logging_config(&self) -> LoggingConfig {
        let config = LoggingConfig::new(self.logging.level.clone());
        match &self.logging.file {
            Some(file) => config.with_file(file.clone()),
            None => config,
        }
    }
}

pub(crate) fn parse_u32(key: &str, value: &str, min: u32) -> Result<u32, ConfigError> {
    let parsed: u32 = value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, value, "expected a whole number"))?;
    if parsed < min {
        return Err(ConfigError::invalid(key, value, format!("must be at least {}", min)));
    }
    Ok(parsed)
}

pub(crate) fn parse_level(key: &str, value: &str) -> Result<String, ConfigError> {
    let level = value.trim().to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        return Err(ConfigError::invalid(
            key,
            value,
            format!("expected one of {}", LOG_LEVELS.join(", ")),
        ));
    }
    Ok(level)
}

pub(crate) fn parse_size_value(key: &str, value: &str) -> Result<usize, ConfigError> {
    parse_size(value).map_err(|reason| ConfigError::invalid(key, value, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&dir.path().join("absent.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.upscale.tile_size, 64);
        assert_eq!(config.upscale.min_overlap, 12);
        assert_eq!(config.upscale.model, ModelId::Slim2x);
    }

    #[test]
    fn test_parse_overrides() {
        let config = ConfigFile::parse(
            "[upscale]\ntile_size = 128\nmodel = thick-4x\nbackend = gpu\n\
             [models]\ncache_size = 2GB\ntimeout = 5\n\
             [logging]\nlevel = DEBUG\nfile = /tmp/tilescale.log\n",
        )
        .unwrap();

        assert_eq!(config.upscale.tile_size, 128);
        assert_eq!(config.upscale.min_overlap, 12);
        assert_eq!(config.upscale.model, ModelId::Thick4x);
        assert_eq!(config.upscale.backend, BackendId::Gpu);
        assert_eq!(config.models.cache_size, 2 << 30);
        assert_eq!(config.models.timeout, 5);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/tilescale.log")));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = ConfigFile::parse("[upscale]\ntile_size = big\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "upscale.tile_size"));

        let err = ConfigFile::parse("[upscale]\ntile_size = 16\nmin_overlap = 16\n").unwrap_err();
        assert!(err.to_string().contains("smaller than tile_size"));

        let err = ConfigFile::parse("[upscale]\ntile_size = 4096\n").unwrap_err();
        assert!(err.to_string().contains("at most 1024"));

        assert!(ConfigFile::parse("[logging]\nlevel = loud\n").is_err());
        assert!(ConfigFile::parse("[upscale]\nmodel = huge-8x\n").is_err());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.ini");
        let mut config = ConfigFile::default();
        config.upscale.tile_size = 96;
        config.models.base_url = "http://localhost:9000/models".to_string();
        config.models.cache_size = 3 << 20;
        config.logging.file = Some(dir.path().join("log.txt"));

        config.save_to(&path).unwrap();
        assert_eq!(ConfigFile::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_derived_configs() {
        let mut config = ConfigFile::default();
        config.upscale.tile_size = 32;
        config.upscale.min_overlap = 4;
        config.models.timeout = 9;

        assert_eq!(
            config.upscale_config(),
            UpscaleConfig::new().with_tile_size(32).with_min_overlap(4)
        );
        assert_eq!(config.registry_config().timeout, Duration::from_secs(9));
        assert_eq!(config.logging_config().level(), "info");
    }

    #[test]
    fn test_expand_tilde() {
        assert_eq!(expand_tilde("/abs/path"), PathBuf::from("/abs/path"));
        let expanded = expand_tilde("~/models");
        assert!(expanded.ends_with("models"));
        assert!(!expanded.to_string_lossy().contains('~'));
    }
}
