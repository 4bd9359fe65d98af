//! The map surface abstraction that on-map layers draw onto.

use std::fmt;

use crate::geo::GeoBounds;

use super::{ElementSpec, PrimitiveKind};

/// Opaque handle of a primitive created by a [`MapSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PrimitiveHandle(u64);

impl PrimitiveHandle {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PrimitiveHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Rendering target for visual primitives.
///
/// Every method is called on the owner of the layer manager. Handles must
/// be unique for the life of the surface.
pub trait MapSurface {
    /// Create a primitive for `spec`.
    fn add_primitive(&mut self, spec: &ElementSpec, z_index: usize, visible: bool)
        -> PrimitiveHandle;

    /// Remove a primitive. Unknown handles are ignored.
    fn remove_primitive(&mut self, handle: PrimitiveHandle);

    fn set_visible(&mut self, handle: PrimitiveHandle, visible: bool);

    fn set_z_index(&mut self, handle: PrimitiveHandle, z_index: usize);

    /// Ask the surface to report clicks on primitives of `kind`.
    fn register_click_listener(&mut self, _kind: PrimitiveKind) {}

    /// Bounds currently in view, if the surface knows them.
    fn visible_bounds(&self) -> Option<GeoBounds> {
        None
    }
}
