//! Layer manager configuration.

use super::defaults::DEFAULT_ELEMENT_BATCH_SIZE;
use crate::geo::GeoBounds;

/// Configuration for the layer manager.
///
/// # Example
///
/// ```
/// use mapstack::config::LayerConfig;
/// use mapstack::geo::GeoBounds;
///
/// let config = LayerConfig::new()
///     .with_element_batch_size(16)
///     .with_initial_bounds(GeoBounds::new(45.0, -123.0, 46.0, -122.0));
/// assert_eq!(config.element_batch_size(), 16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerConfig {
    /// Elements per streamed batch handed back to the owner.
    element_batch_size: usize,
    /// Bounds to request elements for. `None` uses the surface viewport,
    /// falling back to the whole world.
    initial_bounds: Option<GeoBounds>,
}

impl LayerConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the streamed batch size. Values below 1 are raised to 1.
    pub fn with_element_batch_size(mut self, size: usize) -> Self {
        self.element_batch_size = size.max(1);
        self
    }

    /// Restrict element requests to fixed bounds.
    pub fn with_initial_bounds(mut self, bounds: GeoBounds) -> Self {
        self.initial_bounds = Some(bounds);
        self
    }

    pub fn element_batch_size(&self) -> usize {
        self.element_batch_size
    }

    pub fn initial_bounds(&self) -> Option<GeoBounds> {
        self.initial_bounds
    }
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            element_batch_size: DEFAULT_ELEMENT_BATCH_SIZE,
            initial_bounds: None,
        }
    }
}
