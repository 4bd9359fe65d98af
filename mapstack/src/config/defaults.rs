//! Default values and constants for all configuration settings.

use std::path::PathBuf;

use super::settings::*;
use super::ConcurrentRefresh;

/// Mid-cycle refresh requests schedule one more cycle.
pub const DEFAULT_CONCURRENT_REFRESH: ConcurrentRefresh = ConcurrentRefresh::Coalesce;

/// Imports are stamped with the time they completed.
pub const DEFAULT_STAMP_IMPORTS: bool = true;

/// Elements handed to the owner per build batch.
pub const DEFAULT_ELEMENT_BATCH_SIZE: usize = 64;

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "mapstack.log";

/// Name of the directory under the home directory holding config and logs.
pub const CONFIG_DIR_NAME: &str = ".mapstack";

/// Get the path to the config directory (~/.mapstack).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Get the path to the config file (~/.mapstack/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            resources: ResourceSettings {
                concurrent_refresh: DEFAULT_CONCURRENT_REFRESH,
                stamp_imports: DEFAULT_STAMP_IMPORTS,
            },
            layers: LayerSettings {
                element_batch_size: DEFAULT_ELEMENT_BATCH_SIZE,
                initial_bounds: None,
            },
            logging: LoggingSettings {
                directory: crate::logging::default_log_dir(),
                file: crate::logging::default_log_file().to_string(),
            },
        }
    }
}
