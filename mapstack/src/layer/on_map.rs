//! Live visual binding of one layer descriptor.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::resource::LayerDescriptor;

use super::build::BuildId;
use super::{ElementSpec, LayerAdapter, MapSurface, PrimitiveHandle};

/// Externally visible lifecycle state of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerState {
    /// Known but nothing built.
    Unrealized,
    /// A build is in flight.
    Pending,
    /// Built and hidden.
    Hidden,
    /// Built and shown.
    Visible,
    /// The layer manager has been disposed.
    Disposed,
}

/// Primitives created for one layer, keyed by handle.
#[derive(Debug, Default)]
pub(crate) struct ElementContainer {
    ids: HashMap<PrimitiveHandle, String>,
    handles: Vec<PrimitiveHandle>,
}

impl ElementContainer {
    pub fn insert(&mut self, handle: PrimitiveHandle, id: String) {
        if self.ids.insert(handle, id).is_none() {
            self.handles.push(handle);
        }
    }

    pub fn contains(&self, handle: PrimitiveHandle) -> bool {
        self.ids.contains_key(&handle)
    }

    /// Logical element id for a handle.
    pub fn element_id(&self, handle: PrimitiveHandle) -> Option<&str> {
        self.ids.get(&handle).map(String::as_str)
    }

    /// Handles in creation order.
    pub fn handles(&self) -> &[PrimitiveHandle] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }
}

enum Phase {
    Pending {
        build: BuildId,
        cancel: CancellationToken,
    },
    Realized,
}

/// One entry of the layer manager's on-map table.
///
/// While pending, `visible` is the visibility requested for when the build
/// completes; primitives streamed in the meantime already honour it.
pub(crate) struct OnMapLayer {
    descriptor: Arc<LayerDescriptor>,
    phase: Phase,
    visible: bool,
    z_index: usize,
    adapter: Option<Box<dyn LayerAdapter>>,
    elements: ElementContainer,
}

impl OnMapLayer {
    pub fn pending(
        descriptor: Arc<LayerDescriptor>,
        build: BuildId,
        cancel: CancellationToken,
        visible: bool,
        z_index: usize,
    ) -> Self {
        Self {
            descriptor,
            phase: Phase::Pending { build, cancel },
            visible,
            z_index,
            adapter: None,
            elements: ElementContainer::default(),
        }
    }

    pub fn descriptor(&self) -> &Arc<LayerDescriptor> {
        &self.descriptor
    }

    pub fn is_realized(&self) -> bool {
        matches!(self.phase, Phase::Realized)
    }

    /// Build currently filling this layer, if pending.
    pub fn pending_build(&self) -> Option<BuildId> {
        match self.phase {
            Phase::Pending { build, .. } => Some(build),
            Phase::Realized => None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn z_index(&self) -> usize {
        self.z_index
    }

    pub fn elements(&self) -> &ElementContainer {
        &self.elements
    }

    pub fn state(&self) -> LayerState {
        match (&self.phase, self.visible) {
            (Phase::Pending { .. }, _) => LayerState::Pending,
            (Phase::Realized, true) => LayerState::Visible,
            (Phase::Realized, false) => LayerState::Hidden,
        }
    }

    pub fn attach_adapter(&mut self, adapter: Box<dyn LayerAdapter>) {
        if let Some(mut old) = self.adapter.replace(adapter) {
            old.dispose();
        }
    }

    /// Create the primitive for `spec` and record it.
    pub fn add_element<S: MapSurface>(&mut self, surface: &mut S, spec: ElementSpec) {
        let handle = surface.add_primitive(&spec, self.z_index, self.visible);
        if let Some(adapter) = self.adapter.as_mut() {
            adapter.on_element_added(&spec, handle);
        }
        self.elements.insert(handle, spec.id);
    }

    pub fn realize(&mut self) {
        self.phase = Phase::Realized;
    }

    /// Push visibility to every primitive. No-op when unchanged.
    pub fn set_visible<S: MapSurface>(&mut self, surface: &mut S, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        for &handle in self.elements.handles() {
            surface.set_visible(handle, visible);
        }
    }

    /// Push a z-index to every primitive. No-op when unchanged.
    pub fn set_z_index<S: MapSurface>(&mut self, surface: &mut S, z_index: usize) {
        if self.z_index == z_index {
            return;
        }
        self.z_index = z_index;
        for &handle in self.elements.handles() {
            surface.set_z_index(handle, z_index);
        }
    }

    /// Forward a primitive click to the adapter if this layer owns it.
    pub fn click(&mut self, handle: PrimitiveHandle) -> Option<String> {
        if !self.elements.contains(handle) {
            return None;
        }
        self.adapter.as_mut()?.on_click(handle)
    }

    pub fn adapter_mut(&mut self) -> Option<&mut (dyn LayerAdapter + 'static)> {
        self.adapter.as_deref_mut()
    }

    /// Cancel any build, remove all primitives and dispose the adapter.
    pub fn teardown<S: MapSurface>(mut self, surface: &mut S) {
        if let Phase::Pending { cancel, .. } = &self.phase {
            cancel.cancel();
        }
        for &handle in self.elements.handles() {
            surface.remove_primitive(handle);
        }
        if let Some(mut adapter) = self.adapter.take() {
            adapter.dispose();
        }
    }
}
