//! Model cache CLI commands.

use clap::Subcommand;
use tilescale::cache::{clear_disk_cache, disk_cache_stats};
use tilescale::config::{format_size, ConfigFile};

use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// Clear the model cache, forcing models to be downloaded again
    Clear,
    /// Show model cache statistics
    Stats,
}

/// Run a cache subcommand.
pub fn run(action: CacheAction) -> Result<(), CliError> {
    let config = ConfigFile::load().unwrap_or_default();
    let cache_dir = &config.models.cache_directory;

    match action {
        CacheAction::Clear => {
            println!("Clearing model cache at: {}", cache_dir.display());

            let result =
                clear_disk_cache(cache_dir).map_err(|e| CliError::CacheClear(e.to_string()))?;
            println!(
                "Deleted {} files, freed {}",
                result.files_deleted,
                format_size(result.bytes_freed as usize)
            );
            Ok(())
        }
        CacheAction::Stats => {
            println!("Model cache: {}", cache_dir.display());

            let (files, bytes) =
                disk_cache_stats(cache_dir).map_err(|e| CliError::CacheStats(e.to_string()))?;
            println!("  Files: {}", files);
            println!("  Size:  {}", format_size(bytes as usize));
            println!("  Limit: {}", format_size(config.models.cache_size));
            Ok(())
        }
    }
}
