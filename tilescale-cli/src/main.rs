//! Tilescale CLI - tile-based super-resolution from the command line.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::cache::CacheAction;
use commands::common::{BackendChoice, ModelChoice};
use commands::config::ConfigCommands;
use commands::models::ModelsAction;
use commands::upscale::UpscaleArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "tilescale", version, about = "Tile-based image super-resolution")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Upscale an image
    Upscale {
        /// Input image (any format the `image` crate can decode)
        input: PathBuf,

        /// Output image; format follows the extension
        output: PathBuf,

        /// Model to use [default: upscale.model]
        #[arg(long, value_enum)]
        model: Option<ModelChoice>,

        /// Compute backend [default: upscale.backend]
        #[arg(long, value_enum)]
        backend: Option<BackendChoice>,

        /// Scale factor; must match the model [default: the model's scale]
        #[arg(long)]
        factor: Option<u32>,

        /// Tile edge length in input pixels [default: upscale.tile_size]
        #[arg(long)]
        tile_size: Option<u32>,

        /// Minimum overlap between neighbouring tiles [default: upscale.min_overlap]
        #[arg(long)]
        min_overlap: Option<u32>,
    },

    /// Inspect available models
    Models {
        #[command(subcommand)]
        action: ModelsAction,
    },

    /// Manage the model cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// View or change configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result: Result<(), CliError> = match cli.command {
        Commands::Upscale {
            input,
            output,
            model,
            backend,
            factor,
            tile_size,
            min_overlap,
        } => commands::upscale::run(UpscaleArgs {
            input,
            output,
            model,
            backend,
            factor,
            tile_size,
            min_overlap,
        }),
        Commands::Models { action } => commands::models::run(action),
        Commands::Cache { action } => commands::cache::run(action),
        Commands::Config { command } => commands::config::run(command),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
