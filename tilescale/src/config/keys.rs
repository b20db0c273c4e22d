//! `section.key` names for reading and writing single settings.

use std::fmt;
use std::str::FromStr;

use crate::inference::BackendId;
use crate::registry::ModelId;

use super::file::{expand_tilde, parse_level, parse_size_value, parse_u32, ConfigError, ConfigFile};
use super::size::format_size_exact;

/// Every setting in `config.ini`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    UpscaleTileSize,
    UpscaleMinOverlap,
    UpscaleModel,
    UpscaleBackend,
    ModelsBaseUrl,
    ModelsCacheDirectory,
    ModelsCacheSize,
    ModelsTimeout,
    LoggingLevel,
    LoggingFile,
}

impl ConfigKey {
    /// All keys, grouped by section.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::UpscaleTileSize,
            ConfigKey::UpscaleMinOverlap,
            ConfigKey::UpscaleModel,
            ConfigKey::UpscaleBackend,
            ConfigKey::ModelsBaseUrl,
            ConfigKey::ModelsCacheDirectory,
            ConfigKey::ModelsCacheSize,
            ConfigKey::ModelsTimeout,
            ConfigKey::LoggingLevel,
            ConfigKey::LoggingFile,
        ]
    }

    /// `section.key`
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::UpscaleTileSize => "upscale.tile_size",
            ConfigKey::UpscaleMinOverlap => "upscale.min_overlap",
            ConfigKey::UpscaleModel => "upscale.model",
            ConfigKey::UpscaleBackend => "upscale.backend",
            ConfigKey::ModelsBaseUrl => "models.base_url",
            ConfigKey::ModelsCacheDirectory => "models.cache_directory",
            ConfigKey::ModelsCacheSize => "models.cache_size",
            ConfigKey::ModelsTimeout => "models.timeout",
            ConfigKey::LoggingLevel => "logging.level",
            ConfigKey::LoggingFile => "logging.file",
        }
    }

    pub fn section(&self) -> &'static str {
        self.split().0
    }

    pub fn key_name(&self) -> &'static str {
        self.split().1
    }

    fn split(&self) -> (&'static str, &'static str) {
        let name = self.name();
        name.split_once('.').unwrap_or((name, ""))
    }

    /// Current value as written in the ini file; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::UpscaleTileSize => config.upscale.tile_size.to_string(),
            ConfigKey::UpscaleMinOverlap => config.upscale.min_overlap.to_string(),
            ConfigKey::UpscaleModel => config.upscale.model.to_string(),
            ConfigKey::UpscaleBackend => config.upscale.backend.to_string(),
            ConfigKey::ModelsBaseUrl => config.models.base_url.clone(),
            ConfigKey::ModelsCacheDirectory => {
                config.models.cache_directory.to_string_lossy().into_owned()
            }
            ConfigKey::ModelsCacheSize => format_size_exact(config.models.cache_size),
            ConfigKey::ModelsTimeout => config.models.timeout.to_string(),
            ConfigKey::LoggingLevel => config.logging.level.clone(),
            ConfigKey::LoggingFile => config
                .logging
                .file
                .as_ref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    /// Parse `value` and store it.
    ///
    /// Only this key's own format is checked; cross-field rules are applied by
    /// [`ConfigFile::validate`].
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        let key = self.name();
        match self {
            ConfigKey::UpscaleTileSize => config.upscale.tile_size = parse_u32(key, value, 1)?,
            ConfigKey::UpscaleMinOverlap => config.upscale.min_overlap = parse_u32(key, value, 0)?,
            ConfigKey::UpscaleModel => {
                config.upscale.model = value
                    .parse::<ModelId>()
                    .map_err(|reason| ConfigError::invalid(key, value, reason))?
            }
            ConfigKey::UpscaleBackend => {
                config.upscale.backend = value
                    .parse::<BackendId>()
                    .map_err(|reason| ConfigError::invalid(key, value, reason))?
            }
            ConfigKey::ModelsBaseUrl => {
                let url = value.trim();
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(ConfigError::invalid(key, value, "expected an http(s) URL"));
                }
                config.models.base_url = url.to_string();
            }
            ConfigKey::ModelsCacheDirectory => {
                config.models.cache_directory = expand_tilde(value.trim())
            }
            ConfigKey::ModelsCacheSize => config.models.cache_size = parse_size_value(key, value)?,
            ConfigKey::ModelsTimeout => config.models.timeout = parse_u32(key, value, 1)? as u64,
            ConfigKey::LoggingLevel => config.logging.level = parse_level(key, value)?,
            ConfigKey::LoggingFile => {
                let value = value.trim();
                config.logging.file = if value.is_empty() {
                    None
                } else {
                    Some(expand_tilde(value))
                };
            }
        }
        Ok(())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_split_into_section_and_key() {
        assert_eq!(ConfigKey::ModelsCacheSize.section(), "models");
        assert_eq!(ConfigKey::ModelsCacheSize.key_name(), "cache_size");
        for key in ConfigKey::all() {
            assert_eq!(key.name().parse::<ConfigKey>().unwrap(), *key);
        }
    }

    #[test]
    fn test_unknown_key() {
        assert!(matches!(
            "upscale.colour".parse::<ConfigKey>(),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_get_set_round_trip() {
        let mut config = ConfigFile::default();
        ConfigKey::UpscaleModel.set(&mut config, "medium-4x").unwrap();
        ConfigKey::ModelsCacheSize.set(&mut config, "1GB").unwrap();
        ConfigKey::LoggingFile.set(&mut config, "/var/log/ts.log").unwrap();

        assert_eq!(ConfigKey::UpscaleModel.get(&config), "medium-4x");
        assert_eq!(ConfigKey::ModelsCacheSize.get(&config), "1GB");
        assert_eq!(ConfigKey::LoggingFile.get(&config), "/var/log/ts.log");

        ConfigKey::LoggingFile.set(&mut config, "").unwrap();
        assert_eq!(ConfigKey::LoggingFile.get(&config), "");
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::UpscaleTileSize.set(&mut config, "0").is_err());
        assert!(ConfigKey::UpscaleBackend.set(&mut config, "tpu").is_err());
        assert!(ConfigKey::ModelsBaseUrl.set(&mut config, "ftp://x").is_err());
        assert!(ConfigKey::ModelsTimeout.set(&mut config, "0").is_err());
        assert_eq!(config, ConfigFile::default());
    }
}
