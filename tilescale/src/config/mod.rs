//! User configuration.
//!
//! Settings live in `~/.tilescale/config.ini`:
//!
//! ```ini
//! [upscale]
//! tile_size = 64
//! min_overlap = 12
//! model = slim-2x
//! backend = cpu
//!
//! [models]
//! base_url = https://models.tilescale.dev/v1
//! cache_directory = ~/.tilescale/models
//! cache_size = 512MB
//! timeout = 60
//!
//! [logging]
//! level = info
//! file = ~/.tilescale/tilescale.log
//! ```
//!
//! Missing keys keep their defaults. [`ConfigKey`] addresses single settings
//! by `section.key` name for the CLI.

mod file;
mod keys;
mod size;

pub use file::{
    config_directory, config_file_path, expand_tilde, ConfigError, ConfigFile, LoggingSettings,
    ModelSettings, UpscaleSettings,
};
pub use keys::ConfigKey;
pub use size::{format_size, parse_size};
