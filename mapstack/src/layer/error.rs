//! Layer build errors.

use thiserror::Error;

use crate::resource::{LayerKey, ProviderType};

/// Errors raised while building an on-map layer.
///
/// A failed build leaves no entry in the on-map table; calling `show`
/// again retries from scratch.
#[derive(Debug, Error)]
pub enum LayerBuildError {
    /// No provider is registered for the layer's provider type.
    #[error("no provider registered for type '{provider}' (layer {layer})")]
    UnknownProvider {
        layer: LayerKey,
        provider: ProviderType,
    },

    /// The provider could not create an adapter for the layer.
    #[error("adapter for layer {layer} failed: {reason}")]
    AdapterFailed { layer: LayerKey, reason: String },

    /// The background build panicked.
    #[error("build of layer {layer} panicked")]
    BuildPanicked { layer: LayerKey },
}

impl LayerBuildError {
    /// Shorthand used by providers.
    pub fn adapter_failed(layer: LayerKey, reason: impl Into<String>) -> Self {
        Self::AdapterFailed {
            layer,
            reason: reason.into(),
        }
    }

    /// The layer the build was for.
    pub fn layer(&self) -> &LayerKey {
        match self {
            Self::UnknownProvider { layer, .. }
            | Self::AdapterFailed { layer, .. }
            | Self::BuildPanicked { layer } => layer,
        }
    }
}
