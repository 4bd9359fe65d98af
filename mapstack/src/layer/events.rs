//! Notifications emitted by the layer manager.

use crate::resource::LayerKey;

/// Change notification for UI observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerEvent {
    /// The z-order or the set of known layers changed.
    LayersChanged,
    /// A build completed and the layer is on the map.
    LayerRealized(LayerKey),
    /// A build failed; the layer has no on-map entry.
    LayerFailed { layer: LayerKey, reason: String },
}

/// Description returned by a layer adapter for a click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerClick {
    /// Layer that handled the click.
    pub layer: LayerKey,
    /// Logical element id for primitive clicks.
    pub element: Option<String>,
    pub description: String,
}
