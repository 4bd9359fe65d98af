//! Error types for the resource module.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::{ProviderType, ResourceUri};

/// Errors raised when constructing resource identifiers.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The identifier could not be parsed as an absolute URI.
    #[error("Invalid resource location '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// The identifier is opaque (has no hierarchical path).
    #[error("Resource location '{0}' is opaque, a hierarchical URI is required")]
    OpaqueUri(String),
}

/// Per-resource failure during import.
///
/// Import failures are recorded in the cycle report and never abort the
/// rest of a batch.
#[derive(Debug, Error)]
pub enum ImportError {
    /// No registered provider accepted the resource.
    #[error("No provider can import {uri}")]
    NoCapableProvider { uri: ResourceUri },

    /// The local backing storage could not be read.
    #[error("Resource {uri} is unreadable at {path:?}: {source}")]
    Unreadable {
        uri: ResourceUri,
        path: PathBuf,
        source: io::Error,
    },

    /// The provider rejected or failed to parse the resource.
    #[error("Provider '{provider}' failed to import {uri}: {reason}")]
    ResolveFailed {
        uri: ResourceUri,
        provider: ProviderType,
        reason: String,
    },

    /// The provider panicked while importing.
    #[error("Provider '{provider}' panicked while importing {uri}")]
    ProviderPanicked {
        uri: ResourceUri,
        provider: ProviderType,
    },
}

impl ImportError {
    /// Convenience constructor for provider implementations.
    pub fn resolve_failed(
        uri: &ResourceUri,
        provider: &ProviderType,
        reason: impl Into<String>,
    ) -> Self {
        Self::ResolveFailed {
            uri: uri.clone(),
            provider: provider.clone(),
            reason: reason.into(),
        }
    }

    /// Location of the resource that failed.
    pub fn uri(&self) -> &ResourceUri {
        match self {
            Self::NoCapableProvider { uri }
            | Self::Unreadable { uri, .. }
            | Self::ResolveFailed { uri, .. }
            | Self::ProviderPanicked { uri, .. } => uri,
        }
    }
}
