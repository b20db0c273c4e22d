//! Model catalogue CLI commands.

use clap::Subcommand;
use tilescale::registry::ModelId;

use crate::error::CliError;

/// Models subcommands.
#[derive(Debug, Subcommand)]
pub enum ModelsAction {
    /// List the models that can be requested
    List,
}

/// Run a models subcommand.
pub fn run(action: ModelsAction) -> Result<(), CliError> {
    match action {
        ModelsAction::List => {
            println!("{:<12} {:>5}  DESCRIPTION", "MODEL", "SCALE");
            for id in ModelId::all() {
                println!(
                    "{:<12} {:>4}x  {}",
                    id.as_str(),
                    id.scale(),
                    id.description()
                );
            }
            Ok(())
        }
    }
}
