//! Resource location identifiers.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use url::Url;

use super::ResourceError;

/// Absolute, hierarchical location of a resource.
///
/// Opaque URIs such as `mailto:` or `data:` are rejected at construction,
/// so every identifier has a path that can be split into segments. Two
/// resources are the same resource exactly when their identifiers are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceUri(Url);

impl ResourceUri {
    /// Parse an identifier from its string form.
    pub fn parse(input: &str) -> Result<Self, ResourceError> {
        let url = Url::parse(input).map_err(|e| ResourceError::InvalidUri {
            uri: input.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_url(url)
    }

    /// Wrap an already parsed URL.
    pub fn from_url(url: Url) -> Result<Self, ResourceError> {
        if url.cannot_be_a_base() {
            return Err(ResourceError::OpaqueUri(url.to_string()));
        }
        Ok(Self(url))
    }

    /// Build a `file://` identifier from an absolute filesystem path.
    pub fn from_file_path(path: impl AsRef<Path>) -> Result<Self, ResourceError> {
        let path = path.as_ref();
        let url = Url::from_file_path(path).map_err(|()| ResourceError::InvalidUri {
            uri: path.display().to_string(),
            reason: "path must be absolute".to_string(),
        })?;
        Ok(Self(url))
    }

    /// The underlying URL.
    pub fn as_url(&self) -> &Url {
        &self.0
    }

    /// The serialized identifier.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The URI scheme, e.g. `file` or `https`.
    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// Returns true for resources backed by local storage.
    pub fn is_local_file(&self) -> bool {
        self.0.scheme() == "file"
    }

    /// Local filesystem path for `file://` identifiers.
    pub fn to_file_path(&self) -> Option<PathBuf> {
        if !self.is_local_file() {
            return None;
        }
        self.0.to_file_path().ok()
    }

    /// Last non-empty path segment.
    pub fn file_name(&self) -> Option<&str> {
        self.0
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
    }

    /// Extension of the last path segment, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name()?;
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() {
            return None;
        }
        Some(ext)
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl FromStr for ResourceUri {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
