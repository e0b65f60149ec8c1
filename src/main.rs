//! Simplex CLI - Blendshape Rig Tool
//!
//! Command-line interface for the Simplex rig graph.

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::debug;

use simplex::cli::{commands, Cli, Commands};
use simplex::system::VectorFilter;
use simplex::SimplexConfig;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    debug!("Simplex CLI v{}", env!("CARGO_PKG_VERSION"));

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Some(cmd) => handle_command(cmd, &config),
        None => {
            println!("Simplex CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands, config: &SimplexConfig) -> Result<()> {
    match cmd {
        Commands::Info { file } => commands::info(&file, config),
        Commands::Convert {
            file,
            output,
            legacy,
            pretty,
        } => commands::convert(&file, &output, legacy, pretty, config),
        Commands::Split { file, output } => commands::split(&file, &output, config),
        Commands::Vectors {
            file,
            extremes,
            ignore_floaters,
            ignore_traversals,
            depth,
        } => {
            let filter = VectorFilter {
                extremes,
                ignore_floaters,
                ignore_traversals,
                depth_cutoff: depth,
                ..VectorFilter::default()
            };
            commands::vectors(&file, &filter, config)
        }
        Commands::Check { dir } => commands::check(&dir, config),
    }
}
