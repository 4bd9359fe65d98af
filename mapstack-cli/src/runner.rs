//! CLI runner for common setup.
//!
//! Encapsulates config loading, logging initialization and the async
//! runtime so command handlers only deal with their own work.

use std::future::Future;
use std::path::{Path, PathBuf};

use mapstack::config::{config_file_path, ConfigFile};
use mapstack::logging::{init_logging, LoggingGuard};
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::info;

use crate::error::CliError;

/// Runner that manages CLI lifecycle.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
    runtime: Runtime,
}

impl CliRunner {
    /// Load config, initialize logging and start the runtime.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Config file to use instead of `~/.mapstack/config.ini`
    /// * `debug_mode` - Enables debug-level logging and mirrors logs to stdout
    pub fn new(config_path: Option<&Path>, debug_mode: bool) -> Result<Self, CliError> {
        let config = load_config(config_path)?;

        let logging_guard = init_logging(
            &config.logging.directory,
            &config.logging.file,
            debug_mode,
            debug_mode,
        )
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        let runtime = Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)?;

        Ok(Self {
            logging_guard,
            config,
            runtime,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("mapstack v{}", mapstack::VERSION);
        info!(
            log = %self.logging_guard.log_path().display(),
            "mapstack CLI: {} command", command
        );
    }

    /// Handle for spawning background work on the runtime.
    pub fn handle(&self) -> Handle {
        self.runtime.handle().clone()
    }

    /// Drive a future to completion on the runtime.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// Resolve the config file path, honouring an explicit override.
pub fn resolve_config_path(config_path: Option<&Path>) -> PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path)
}

/// Load the config file, falling back to defaults when it doesn't exist.
pub fn load_config(config_path: Option<&Path>) -> Result<ConfigFile, CliError> {
    Ok(ConfigFile::load_from(&resolve_config_path(config_path))?)
}
