use std::{env, path::PathBuf, str::FromStr};

#[cfg(feature = "jemalloc")]
use tikv_jemallocator::Jemalloc;

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use clap::Parser;
use rbundler_core::{load_env_from_project_path, setup_info_logger};

use crate::{
    cli_interface::{Cli, Commands},
    commands::{init, start, wallets},
    error::CliError,
    project_location::ProjectLocation,
};

mod cli_interface;
mod commands;
mod console;
pub use console::{print_error_message, print_success_message};
mod error;
mod project_location;

fn resolve_path(override_path: &Option<String>) -> Result<PathBuf, String> {
    let path = match override_path {
        Some(path) => {
            PathBuf::from_str(path).map_err(|_| format!("Invalid path provided: '{}'", path))?
        }
        None => env::current_dir().map_err(|_| "Failed to get current directory.".to_string())?,
    };

    path.canonicalize().map_err(|e| format!("Failed to resolve path '{}': {}", path.display(), e))
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Init { path } => {
            setup_info_logger();
            let resolved_path = resolve_path(path).inspect_err(|e| print_error_message(e))?;

            init::handle_init(&resolved_path).await?;
        }
        Commands::Start { path } => {
            // the service installs its own logger at the configured level
            let resolved_path = resolve_path(path).inspect_err(|e| print_error_message(e))?;

            start::handle_start(&ProjectLocation::new(resolved_path)).await?;
        }
        Commands::Wallets { path } => {
            setup_info_logger();
            let resolved_path = resolve_path(path).inspect_err(|e| print_error_message(e))?;
            load_env_from_project_path(&resolved_path);

            wallets::handle_wallets(&ProjectLocation::new(resolved_path)).await?;
        }
    }

    Ok(())
}
