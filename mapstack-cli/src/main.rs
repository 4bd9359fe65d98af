//! mapstack CLI - Command-line interface
//!
//! Drives the resource and layer managers headlessly against a directory
//! of layer manifests.

mod collaborators;
mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use commands::scan::ScanArgs;

#[derive(Parser)]
#[command(name = "mapstack")]
#[command(version, about = "Load map layer manifests and bind them to a map", long_about = None)]
struct Cli {
    /// Enable debug logging, mirrored to stdout
    #[arg(long, global = true)]
    debug: bool,

    /// Configuration file to use instead of ~/.mapstack/config.ini
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a manifest directory and print the resulting layer stack
    Scan(ScanArgs),

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Commands::Scan(args) => commands::scan::run(args, config_path, cli.debug),
        Commands::Config { command } => commands::config::run(command, config_path),
    };

    if let Err(e) = result {
        e.exit();
    }
}
