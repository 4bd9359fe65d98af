//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use mapstack::config::ConfigFileError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Invalid command-line or configuration value
    Config(String),
    /// Failed to read or write the configuration file
    ConfigFile(ConfigFileError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// The manifest directory cannot be scanned
    ScanDirectory { path: PathBuf, reason: String },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::ScanDirectory { .. } => {
                eprintln!();
                eprintln!("The scan command expects a directory of *.layers manifests.");
            }
            CliError::ConfigFile(ConfigFileError::InvalidValue { .. }) => {
                eprintln!();
                eprintln!("Fix the value above or regenerate defaults with: mapstack config init --force");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "{}", e),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::ScanDirectory { path, reason } => {
                write!(f, "Cannot scan '{}': {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}
