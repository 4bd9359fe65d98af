//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

use super::{ConcurrentRefresh, LayerConfig, ResourceConfig};
use crate::geo::GeoBounds;

/// Complete application configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Resource manager settings
    pub resources: ResourceSettings,
    /// Layer manager settings
    pub layers: LayerSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Resource manager configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSettings {
    /// Behaviour of refresh requests that arrive mid-cycle
    pub concurrent_refresh: ConcurrentRefresh,
    /// Stamp newly imported resources with the import time
    pub stamp_imports: bool,
}

/// Layer manager configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSettings {
    /// Elements per streamed build batch
    pub element_batch_size: usize,
    /// Fixed element request bounds, if any
    pub initial_bounds: Option<GeoBounds>,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Directory holding the log file
    pub directory: PathBuf,
    /// Log file name
    pub file: String,
}

impl ConfigFile {
    /// Runtime configuration for the resource manager.
    pub fn resource_config(&self) -> ResourceConfig {
        ResourceConfig::new()
            .with_concurrent_refresh(self.resources.concurrent_refresh)
            .with_stamp_imports(self.resources.stamp_imports)
    }

    /// Runtime configuration for the layer manager.
    pub fn layer_config(&self) -> LayerConfig {
        let config = LayerConfig::new().with_element_batch_size(self.layers.element_batch_size);
        match self.layers.initial_bounds {
            Some(bounds) => config.with_initial_bounds(bounds),
            None => config,
        }
    }
}
