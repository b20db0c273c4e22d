//! Common types and utilities shared across CLI commands.

use clap::ValueEnum;
use tilescale::config::ConfigFile;
use tilescale::inference::BackendId;
use tilescale::registry::ModelId;
use tilescale::UpscaleConfig;

use crate::error::CliError;

/// Model selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ModelChoice {
    /// Fast 2x model
    #[value(name = "slim-2x")]
    Slim2x,
    /// Fast 4x model
    #[value(name = "slim-4x")]
    Slim4x,
    /// Balanced 2x model
    #[value(name = "medium-2x")]
    Medium2x,
    /// Balanced 4x model
    #[value(name = "medium-4x")]
    Medium4x,
    /// Highest quality 4x model
    #[value(name = "thick-4x")]
    Thick4x,
}

impl From<ModelChoice> for ModelId {
    fn from(choice: ModelChoice) -> Self {
        match choice {
            ModelChoice::Slim2x => ModelId::Slim2x,
            ModelChoice::Slim4x => ModelId::Slim4x,
            ModelChoice::Medium2x => ModelId::Medium2x,
            ModelChoice::Medium4x => ModelId::Medium4x,
            ModelChoice::Thick4x => ModelId::Thick4x,
        }
    }
}

/// Compute backend selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum BackendChoice {
    /// Run on CPU threads
    Cpu,
    /// Run on the GPU (requires the `gpu` feature)
    Gpu,
}

impl From<BackendChoice> for BackendId {
    fn from(choice: BackendChoice) -> Self {
        match choice {
            BackendChoice::Cpu => BackendId::Cpu,
            BackendChoice::Gpu => BackendId::Gpu,
        }
    }
}

/// CLI takes precedence, then config.
pub fn resolve_model(cli: Option<ModelChoice>, config: &ConfigFile) -> ModelId {
    cli.map(ModelId::from).unwrap_or(config.upscale.model)
}

pub fn resolve_backend(cli: Option<BackendChoice>, config: &ConfigFile) -> BackendId {
    cli.map(BackendId::from).unwrap_or(config.upscale.backend)
}

/// Tiling settings from config with CLI overrides applied.
pub fn resolve_upscale_config(
    tile_size: Option<u32>,
    min_overlap: Option<u32>,
    config: &ConfigFile,
) -> Result<UpscaleConfig, CliError> {
    let base = config.upscale_config();
    let upscale = UpscaleConfig::new()
        .with_tile_size(tile_size.unwrap_or(base.tile_size))
        .with_min_overlap(min_overlap.unwrap_or(base.min_overlap));
    upscale
        .validate()
        .map_err(|e| CliError::Config(e.to_string()))?;
    Ok(upscale)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_config() {
        let mut config = ConfigFile::default();
        config.upscale.model = ModelId::Medium4x;

        assert_eq!(resolve_model(None, &config), ModelId::Medium4x);
        assert_eq!(
            resolve_model(Some(ModelChoice::Thick4x), &config),
            ModelId::Thick4x
        );
        assert_eq!(
            resolve_backend(Some(BackendChoice::Gpu), &config),
            BackendId::Gpu
        );

        let upscale = resolve_upscale_config(Some(128), None, &config).unwrap();
        assert_eq!(upscale.tile_size, 128);
        assert_eq!(upscale.min_overlap, config.upscale.min_overlap);
    }

    #[test]
    fn test_oversized_tile_size_rejected() {
        let config = ConfigFile::default();
        let err = resolve_upscale_config(Some(100_000), None, &config).unwrap_err();
        assert!(matches!(err, CliError::Config(ref m) if m.contains("tile_size")));
    }

    #[test]
    fn test_model_choice_names_match_ids() {
        for choice in ModelChoice::value_variants() {
            let name = choice.to_possible_value().unwrap();
            assert_eq!(name.get_name(), ModelId::from(*choice).as_str());
        }
    }
}
