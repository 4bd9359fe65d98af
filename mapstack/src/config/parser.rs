//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This is the single place where INI key names are mapped to struct fields.

use ini::Ini;
use std::path::PathBuf;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::geo::GeoBounds;

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [resources] section
    if let Some(section) = ini.section(Some("resources")) {
        if let Some(v) = section.get("concurrent_refresh") {
            config.resources.concurrent_refresh =
                v.parse().map_err(|_| ConfigFileError::InvalidValue {
                    section: "resources".to_string(),
                    key: "concurrent_refresh".to_string(),
                    value: v.to_string(),
                    reason: "must be 'coalesce' or 'drop'".to_string(),
                })?;
        }
        if let Some(v) = section.get("stamp_imports") {
            config.resources.stamp_imports = parse_bool(v);
        }
    }

    // [layers] section
    if let Some(section) = ini.section(Some("layers")) {
        if let Some(v) = section.get("element_batch_size") {
            let size: usize = v.trim().parse().map_err(|_| ConfigFileError::InvalidValue {
                section: "layers".to_string(),
                key: "element_batch_size".to_string(),
                value: v.to_string(),
                reason: "must be a positive integer".to_string(),
            })?;
            if size == 0 {
                return Err(ConfigFileError::InvalidValue {
                    section: "layers".to_string(),
                    key: "element_batch_size".to_string(),
                    value: v.to_string(),
                    reason: "must be at least 1".to_string(),
                });
            }
            config.layers.element_batch_size = size;
        }
        if let Some(v) = section.get("initial_bounds") {
            let v = v.trim();
            if !v.is_empty() {
                config.layers.initial_bounds =
                    Some(parse_bounds(v).map_err(|reason| ConfigFileError::InvalidValue {
                        section: "layers".to_string(),
                        key: "initial_bounds".to_string(),
                        value: v.to_string(),
                        reason,
                    })?);
            }
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("directory") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.directory = expand_tilde(v);
            }
        }
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = v.to_string();
            }
        }
    }

    Ok(config)
}

/// Parse "south,west,north,east" in decimal degrees.
pub(super) fn parse_bounds(value: &str) -> Result<GeoBounds, String> {
    let parts = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("expected four numbers: {}", e))?;

    let &[south, west, north, east] = parts.as_slice() else {
        return Err(format!(
            "expected 'south,west,north,east', got {} values",
            parts.len()
        ));
    };
    if !(-90.0..=90.0).contains(&south) || !(-90.0..=90.0).contains(&north) {
        return Err("latitude must be within -90..=90".to_string());
    }
    if !(-180.0..=180.0).contains(&west) || !(-180.0..=180.0).contains(&east) {
        return Err("longitude must be within -180..=180".to_string());
    }
    Ok(GeoBounds::new(south, west, north, east))
}

/// Parse a boolean value from a config string.
/// Accepts: true/false, yes/no, 1/0, on/off (case-insensitive)
pub(super) fn parse_bool(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "true" || v == "1" || v == "yes" || v == "on"
}

/// Expand ~ to home directory in paths.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::*;
    use crate::config::ConcurrentRefresh;
    use tempfile::TempDir;

    fn load(content: &str) -> Result<ConfigFile, ConfigFileError> {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");
        std::fs::write(&path, content).unwrap();
        ConfigFile::load_from(&path)
    }

    #[test]
    fn test_partial_config() {
        let config = load("[resources]\nconcurrent_refresh = drop\n").unwrap();

        assert_eq!(config.resources.concurrent_refresh, ConcurrentRefresh::Drop);
        assert_eq!(config.resources.stamp_imports, DEFAULT_STAMP_IMPORTS);
        assert_eq!(config.layers.element_batch_size, DEFAULT_ELEMENT_BATCH_SIZE);
    }

    #[test]
    fn test_invalid_refresh_policy() {
        let result = load("[resources]\nconcurrent_refresh = queue\n");
        match result {
            Err(ConfigFileError::InvalidValue { section, key, .. }) => {
                assert_eq!(section, "resources");
                assert_eq!(key, "concurrent_refresh");
            }
            other => panic!("expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let result = load("[layers]\nelement_batch_size = 0\n");
        assert!(matches!(result, Err(ConfigFileError::InvalidValue { .. })));
    }

    #[test]
    fn test_initial_bounds() {
        let config = load("[layers]\ninitial_bounds = 45.5, -123.0, 46.0, -122.5\n").unwrap();
        let bounds = config.layers.initial_bounds.unwrap();
        assert_eq!(bounds.south, 45.5);
        assert_eq!(bounds.east, -122.5);
    }

    #[test]
    fn test_parse_bounds_errors() {
        assert!(parse_bounds("1,2,3").is_err());
        assert!(parse_bounds("a,b,c,d").is_err());
        assert!(parse_bounds("91,0,0,0").is_err());
        assert!(parse_bounds("0,0,0,181").is_err());
    }

    #[test]
    fn test_parse_bool_values() {
        for v in ["true", "YES", " 1 ", "on"] {
            assert!(parse_bool(v), "{} should be true", v);
        }
        for v in ["false", "no", "0", "off", "maybe"] {
            assert!(!parse_bool(v), "{} should be false", v);
        }
    }

    #[test]
    fn test_expand_tilde() {
        let path = expand_tilde("~/test/path");
        assert!(!path.to_string_lossy().starts_with('~'));
        assert!(path.to_string_lossy().ends_with("test/path"));

        assert_eq!(expand_tilde("/absolute/path"), PathBuf::from("/absolute/path"));
    }
}
