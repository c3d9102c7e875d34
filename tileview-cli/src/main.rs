//! TileView CLI - Command-line interface
//!
//! Developer tooling for the TileView library: resolve views onto the tile
//! grid and run simulated zoom sessions against a dataset.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tileview::config::{ConfigFile, FormatConfig};
use tracing_subscriber::EnvFilter;

use commands::config::ConfigCommands;
use commands::resolve::ResolveArgs;
use commands::simulate::SimulateArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "tileview", version, about = "Tiled spatiotemporal cache tools")]
struct Cli {
    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Show the grid level and tiles covering a view
    Resolve(ResolveArgs),

    /// Run a zoom session against a dataset and report each cutover
    Simulate(SimulateArgs),

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let file = config_file(cli.config.as_ref());
    match cli.command {
        Commands::Resolve(args) => commands::resolve::run(args, load_config(&file)?),
        Commands::Simulate(args) => commands::simulate::run(args, load_config(&file)?),
        Commands::Config { command } => commands::config::run(command, &file),
    }
}

fn config_file(path: Option<&PathBuf>) -> ConfigFile {
    match path {
        Some(path) => ConfigFile::at(path),
        None => ConfigFile::default(),
    }
}

fn load_config(file: &ConfigFile) -> Result<FormatConfig, CliError> {
    Ok(file.load_or_default()?)
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "tileview=debug,tileview_cli=debug"
    } else {
        "tileview=info,tileview_cli=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
