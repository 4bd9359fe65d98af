//! Headless map surface that logs primitive operations.

use std::collections::HashMap;

use mapstack::layer::{ElementSpec, MapSurface, PrimitiveHandle, PrimitiveKind};
use tracing::{debug, trace};

#[derive(Debug, Clone)]
struct Primitive {
    kind: PrimitiveKind,
    z_index: usize,
    visible: bool,
}

/// Map surface without a display.
///
/// Keeps just enough state to report what would be on screen.
#[derive(Debug, Default)]
pub struct ConsoleSurface {
    next: u64,
    primitives: HashMap<PrimitiveHandle, Primitive>,
}

impl ConsoleSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primitive_count(&self) -> usize {
        self.primitives.len()
    }

    pub fn visible_count(&self) -> usize {
        self.primitives.values().filter(|p| p.visible).count()
    }

    /// Handles of visible primitives, top-most first.
    pub fn visible_handles(&self) -> Vec<PrimitiveHandle> {
        let mut visible: Vec<(&PrimitiveHandle, &Primitive)> =
            self.primitives.iter().filter(|(_, p)| p.visible).collect();
        visible.sort_by(|a, b| b.1.z_index.cmp(&a.1.z_index).then(a.0.cmp(b.0)));
        visible.into_iter().map(|(h, _)| *h).collect()
    }
}

impl MapSurface for ConsoleSurface {
    fn add_primitive(&mut self, spec: &ElementSpec, z_index: usize, visible: bool) -> PrimitiveHandle {
        self.next += 1;
        let handle = PrimitiveHandle::new(self.next);
        trace!(handle = %handle, element = %spec.id, kind = ?spec.kind(), z_index, visible, "add");
        self.primitives.insert(
            handle,
            Primitive {
                kind: spec.kind(),
                z_index,
                visible,
            },
        );
        handle
    }

    fn remove_primitive(&mut self, handle: PrimitiveHandle) {
        if let Some(p) = self.primitives.remove(&handle) {
            trace!(handle = %handle, kind = ?p.kind, "remove");
        }
    }

    fn set_visible(&mut self, handle: PrimitiveHandle, visible: bool) {
        if let Some(p) = self.primitives.get_mut(&handle) {
            trace!(handle = %handle, visible, "visibility");
            p.visible = visible;
        }
    }

    fn set_z_index(&mut self, handle: PrimitiveHandle, z_index: usize) {
        if let Some(p) = self.primitives.get_mut(&handle) {
            trace!(handle = %handle, z_index, "z-index");
            p.z_index = z_index;
        }
    }

    fn register_click_listener(&mut self, kind: PrimitiveKind) {
        debug!(kind = ?kind, "Click listener registered");
    }
}
