//! Configuration for the resource and layer managers.
//!
//! Runtime configuration objects ([`ResourceConfig`], [`LayerConfig`]) are
//! plain builders handed to the managers. [`ConfigFile`] is the on-disk
//! INI form loaded from `~/.mapstack/config.ini`.
//!
//! # Example
//!
//! ```
//! use mapstack::config::{ConfigFile, ConcurrentRefresh};
//!
//! let file = ConfigFile::default();
//! let resources = file.resource_config();
//! assert_eq!(resources.concurrent_refresh(), ConcurrentRefresh::Coalesce);
//! ```

mod defaults;
mod file;
mod layers;
mod parser;
mod resources;
mod settings;
mod writer;

pub use defaults::{
    config_directory, config_file_path, DEFAULT_CONCURRENT_REFRESH, DEFAULT_ELEMENT_BATCH_SIZE,
    DEFAULT_LOG_FILE, DEFAULT_STAMP_IMPORTS,
};
pub use file::ConfigFileError;
pub use layers::LayerConfig;
pub use resources::{ConcurrentRefresh, ResourceConfig};
pub use settings::{ConfigFile, LayerSettings, LoggingSettings, ResourceSettings};
