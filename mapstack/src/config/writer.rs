//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! Produces the commented INI representation written to `config.ini`.

use std::path::Path;

use super::settings::ConfigFile;

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let initial_bounds = config
        .layers
        .initial_bounds
        .map(|b| format!("{},{},{},{}", b.south, b.west, b.north, b.east))
        .unwrap_or_default();

    format!(
        r#"[resources]
; What to do when a refresh is requested while one is already running:
;   coalesce - run exactly one more cycle after the current one
;   drop     - ignore the request
concurrent_refresh = {}
; Record the import time on newly imported resources
stamp_imports = {}

[layers]
; Number of map elements added per batch while a layer builds
element_batch_size = {}
; Restrict element requests to "south,west,north,east" (decimal degrees).
; Leave empty to use the map viewport.
initial_bounds = {}

[logging]
; Directory for the log file
directory = {}
; Log file name
file = {}
"#,
        config.resources.concurrent_refresh,
        config.resources.stamp_imports,
        config.layers.element_batch_size,
        initial_bounds,
        path_to_string(&config.logging.directory),
        config.logging.file,
    )
}

/// Convert path to string, replacing home directory with ~.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
