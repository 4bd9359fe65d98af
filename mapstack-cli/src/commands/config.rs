//! Configuration management CLI commands.
//!
//! Provides `config path`, `config show` and `config init` for inspecting
//! and creating the configuration file.

use std::path::Path;

use clap::Subcommand;
use mapstack::config::ConfigFile;

use crate::error::CliError;
use crate::runner::{load_config, resolve_config_path};

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Show the effective configuration settings
    Show,

    /// Write a configuration file with default settings
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => run_path(config_path),
        ConfigCommands::Show => run_show(config_path),
        ConfigCommands::Init { force } => run_init(config_path, force),
    }
}

/// Show the configuration file path.
fn run_path(config_path: Option<&Path>) -> Result<(), CliError> {
    println!("{}", resolve_config_path(config_path).display());
    Ok(())
}

/// List all configuration settings.
fn run_show(config_path: Option<&Path>) -> Result<(), CliError> {
    let path = resolve_config_path(config_path);
    let config = load_config(config_path)?;

    println!("Configuration Settings");
    println!("======================");
    if !path.exists() {
        println!("(no file at {}, showing defaults)", path.display());
    }
    println!();

    let bounds = config
        .layers
        .initial_bounds
        .map(|b| format!("{},{},{},{}", b.south, b.west, b.north, b.east));

    let sections: [(&str, Vec<(&str, Option<String>)>); 3] = [
        (
            "resources",
            vec![
                (
                    "concurrent_refresh",
                    Some(config.resources.concurrent_refresh.to_string()),
                ),
                ("stamp_imports", Some(config.resources.stamp_imports.to_string())),
            ],
        ),
        (
            "layers",
            vec![
                (
                    "element_batch_size",
                    Some(config.layers.element_batch_size.to_string()),
                ),
                ("initial_bounds", bounds),
            ],
        ),
        (
            "logging",
            vec![
                (
                    "directory",
                    Some(config.logging.directory.display().to_string()),
                ),
                ("file", Some(config.logging.file.clone())),
            ],
        ),
    ];

    for (i, (section, keys)) in sections.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!("[{}]", section);
        for (key, value) in keys {
            match value {
                Some(value) => println!("  {} = {}", key, value),
                None => println!("  {} = (not set)", key),
            }
        }
    }

    Ok(())
}

/// Create the configuration file with defaults.
fn run_init(config_path: Option<&Path>, force: bool) -> Result<(), CliError> {
    let path = resolve_config_path(config_path);

    if force {
        ConfigFile::default().save_to(&path)?;
        println!("Wrote default configuration to {}", path.display());
        return Ok(());
    }

    if ConfigFile::ensure_exists_at(&path)? {
        println!("Created configuration file at {}", path.display());
    } else {
        println!("Configuration file already exists at {}", path.display());
        println!("Use 'mapstack config init --force' to overwrite it.");
    }
    Ok(())
}
