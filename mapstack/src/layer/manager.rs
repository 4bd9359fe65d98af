//! The layer manager: z-order, lazy builds, visibility, reconciliation and
//! click dispatch.
//!
//! Like the resource manager, it is owned by one coordinating task and
//! mutated through `&mut self`. Builds run on the runtime handed to
//! [`LayerManager::new`] and their results are applied by
//! [`LayerManager::pump`], [`LayerManager::pump_next`] or
//! [`LayerManager::run_until_idle`]. The same calls deliver diffs published
//! by the bound resource manager.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::LayerConfig;
use crate::geo::{GeoBounds, LatLon};
use crate::resource::{
    default_layer_order, DiffRecord, LayerDescriptor, LayerKey, ListenerId, ManagerId,
    ProviderRegistry, ResourceManager,
};

use super::build::{run_build, BuildEvent, BuildId, BuildRequest};
use super::on_map::{LayerState, OnMapLayer};
use super::zorder::ZOrder;
use super::{LayerClick, LayerEvent, MapSurface, PrimitiveHandle, PrimitiveKind};

const EVENT_CAPACITY: usize = 64;

/// Binds the descriptors of one resource manager to a map surface.
pub struct LayerManager<S: MapSurface> {
    resource_manager: ManagerId,
    listener: Option<ListenerId>,
    diffs: Option<mpsc::UnboundedReceiver<Arc<DiffRecord>>>,
    providers: Arc<ProviderRegistry>,
    surface: S,
    runtime: Handle,
    config: LayerConfig,
    z_order: ZOrder,
    layers: HashMap<LayerKey, OnMapLayer>,
    pending: HashMap<BuildId, LayerKey>,
    build_tx: mpsc::UnboundedSender<BuildEvent>,
    build_rx: mpsc::UnboundedReceiver<BuildEvent>,
    builds_in_flight: usize,
    next_build: u64,
    events: broadcast::Sender<LayerEvent>,
    disposed: bool,
}

impl<S: MapSurface> LayerManager<S> {
    /// Bind to `resources`, seeding the z-order from its current snapshot.
    pub fn new(
        resources: &mut ResourceManager,
        providers: Arc<ProviderRegistry>,
        mut surface: S,
        runtime: Handle,
        config: LayerConfig,
    ) -> Self {
        let subscription = resources.subscribe();
        let mut seed: Vec<Arc<LayerDescriptor>> =
            resources.current_snapshot().layers().cloned().collect();
        seed.sort_by(|a, b| default_layer_order(a, b));

        for kind in PrimitiveKind::ALL {
            surface.register_click_listener(kind);
        }

        let (build_tx, build_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        debug!(
            resource_manager = %resources.id(),
            layers = seed.len(),
            "Layer manager bound"
        );

        Self {
            resource_manager: resources.id(),
            listener: Some(subscription.id),
            diffs: Some(subscription.receiver),
            providers,
            surface,
            runtime,
            config,
            z_order: ZOrder::from_descriptors(seed),
            layers: HashMap::new(),
            pending: HashMap::new(),
            build_tx,
            build_rx,
            builds_in_flight: 0,
            next_build: 0,
            events,
            disposed: false,
        }
    }

    /// Subscribe to layer change notifications.
    pub fn subscribe_events(&self) -> broadcast::Receiver<LayerEvent> {
        self.events.subscribe()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Number of builds that have not reported a terminal event yet.
    pub fn builds_in_flight(&self) -> usize {
        self.builds_in_flight
    }

    /// Copy of the current order, bottom first.
    pub fn layers_in_z_order(&self) -> Vec<Arc<LayerDescriptor>> {
        self.z_order.to_vec()
    }

    /// Lifecycle state of a layer, or `None` for an unknown descriptor.
    pub fn layer_state(&self, descriptor: &LayerDescriptor) -> Option<LayerState> {
        if self.disposed {
            return Some(LayerState::Disposed);
        }
        let key = descriptor.key();
        self.z_order.position(&key)?;
        Some(
            self.layers
                .get(&key)
                .map_or(LayerState::Unrealized, OnMapLayer::state),
        )
    }

    /// Whether a layer is shown. Pending layers report the visibility they
    /// will have once built.
    pub fn is_visible(&self, descriptor: &LayerDescriptor) -> bool {
        self.layers
            .get(&descriptor.key())
            .is_some_and(OnMapLayer::is_visible)
    }

    /// Show a layer, building it on first use.
    ///
    /// Returns false for descriptors not in the z-order.
    pub fn show(&mut self, descriptor: &LayerDescriptor) -> bool {
        if self.disposed {
            return false;
        }
        let key = descriptor.key();
        let Some(position) = self.z_order.position(&key) else {
            return false;
        };

        match self.layers.get_mut(&key) {
            Some(layer) if layer.is_realized() => {
                layer.set_visible(&mut self.surface, true);
                layer.set_z_index(&mut self.surface, position);
            }
            Some(layer) => {
                trace!(layer = %key, "Show while pending");
                layer.set_visible(&mut self.surface, true);
            }
            None => {
                if let Some(current) = self.z_order.descriptor(&key).cloned() {
                    self.start_build(current, true);
                }
            }
        }
        true
    }

    /// Hide a layer. Hiding an unbuilt or hidden layer changes nothing.
    ///
    /// Returns false for descriptors not in the z-order.
    pub fn hide(&mut self, descriptor: &LayerDescriptor) -> bool {
        if self.disposed {
            return false;
        }
        let key = descriptor.key();
        if self.z_order.position(&key).is_none() {
            return false;
        }
        if let Some(layer) = self.layers.get_mut(&key) {
            layer.set_visible(&mut self.surface, false);
        }
        true
    }

    /// Commit a new order if it is exactly a permutation of the current one.
    pub fn set_z_order(&mut self, new_order: &[Arc<LayerDescriptor>]) -> bool {
        if self.disposed || !self.z_order.set_order(new_order) {
            debug!(requested = new_order.len(), current = self.z_order.len(), "Rejected z-order");
            return false;
        }
        self.push_z_indices();
        self.notify(LayerEvent::LayersChanged);
        true
    }

    /// Move the layer at `from` to position `to`.
    pub fn move_z_index(&mut self, from: usize, to: usize) -> bool {
        let mut order = self.layers_in_z_order();
        if from >= order.len() || to >= order.len() {
            return false;
        }
        let moved = order.remove(from);
        order.insert(to, moved);
        self.set_z_order(&order)
    }

    /// Reconcile the z-order and on-map table with a published diff.
    ///
    /// # Panics
    ///
    /// Panics if the record was not issued by the bound resource manager.
    pub fn on_diff(&mut self, diff: &DiffRecord) {
        assert!(
            diff.issuer() == self.resource_manager,
            "diff record from {} presented to layer manager bound to {}",
            diff.issuer(),
            self.resource_manager
        );
        if self.disposed {
            return;
        }

        let current: HashMap<LayerKey, &Arc<LayerDescriptor>> = diff
            .snapshot()
            .layers()
            .map(|d| (d.key(), d))
            .collect();

        let mut next_order = Vec::with_capacity(current.len());
        let mut matched = HashSet::new();
        let mut rebuild = Vec::new();
        let (mut removed, mut replaced) = (0usize, 0usize);

        for descriptor in self.z_order.to_vec() {
            let key = descriptor.key();
            match current.get(&key) {
                None => {
                    if let Some(layer) = self.layers.remove(&key) {
                        self.retire(layer);
                    }
                    removed += 1;
                }
                Some(next) if Arc::ptr_eq(*next, &descriptor) => {
                    next_order.push(descriptor);
                }
                Some(next) => {
                    if let Some(layer) = self.layers.remove(&key) {
                        if layer.is_visible() {
                            rebuild.push(key.clone());
                        }
                        self.retire(layer);
                    }
                    next_order.push(Arc::clone(*next));
                    replaced += 1;
                }
            }
            matched.insert(key);
        }

        let mut added: Vec<Arc<LayerDescriptor>> = current
            .iter()
            .filter(|(key, _)| !matched.contains(*key))
            .map(|(_, d)| Arc::clone(*d))
            .collect();
        added.sort_by(|a, b| default_layer_order(a, b));
        let added_count = added.len();
        next_order.extend(added);

        self.z_order = ZOrder::from_descriptors(next_order);
        for key in &rebuild {
            if let Some(descriptor) = self.z_order.descriptor(key).cloned() {
                self.start_build(descriptor, true);
            }
        }
        self.push_z_indices();

        info!(
            removed,
            replaced,
            added = added_count,
            rebuilt = rebuild.len(),
            total = self.z_order.len(),
            "Layers reconciled"
        );
        self.notify(LayerEvent::LayersChanged);
    }

    /// Dispatch a click on a primitive to the top-most realized layer that
    /// owns it.
    pub fn on_primitive_click(&mut self, handle: PrimitiveHandle) -> Option<LayerClick> {
        let keys: Vec<LayerKey> = self.z_order.iter().rev().map(|d| d.key()).collect();
        for key in keys {
            let Some(layer) = self.layers.get_mut(&key) else {
                continue;
            };
            if !layer.is_realized() || !layer.elements().contains(handle) {
                continue;
            }
            let element = layer.elements().element_id(handle).map(str::to_string);
            let description = layer.click(handle)?;
            return Some(LayerClick {
                layer: key,
                element,
                description,
            });
        }
        trace!(handle = %handle, "Click on unowned primitive");
        None
    }

    /// Dispatch a map click to every layer in z-order, bottom to top.
    ///
    /// Pending layers get the click once their adapter has arrived; layers
    /// with no adapter yet have no hook to call.
    pub fn on_map_click(&mut self, position: LatLon) -> Vec<LayerClick> {
        let keys: Vec<LayerKey> = self.z_order.iter().map(|d| d.key()).collect();
        let mut clicks = Vec::new();
        for key in keys {
            let Some(layer) = self.layers.get_mut(&key) else {
                continue;
            };
            if let Some(description) = layer.adapter_mut().and_then(|a| a.on_map_click(position))
            {
                clicks.push(LayerClick {
                    layer: key,
                    element: None,
                    description,
                });
            }
        }
        clicks
    }

    /// Apply every queued diff and build event without waiting.
    ///
    /// Returns the number applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = self.pump_diffs();
        while let Ok(event) = self.build_rx.try_recv() {
            self.apply_build_event(event);
            applied += 1;
        }
        applied
    }

    /// Apply queued diffs, then wait for the next build event.
    ///
    /// Returns false when no build is in flight.
    pub async fn pump_next(&mut self) -> bool {
        let diffs = self.pump_diffs();
        if self.builds_in_flight == 0 {
            return diffs > 0;
        }
        match self.build_rx.recv().await {
            Some(event) => {
                self.apply_build_event(event);
                true
            }
            None => false,
        }
    }

    /// Apply events until every build has finished.
    pub async fn run_until_idle(&mut self) {
        while self.pump_next().await {}
    }

    /// Unbind from `resources` and tear down every on-map layer.
    ///
    /// Builds still running are cancelled; their late results are
    /// discarded by later pumps. Calling this twice is harmless.
    pub fn dispose(&mut self, resources: &mut ResourceManager) {
        if self.disposed {
            return;
        }
        if let Some(id) = self.listener.take() {
            if resources.id() == self.resource_manager {
                resources.unsubscribe(id);
            } else {
                warn!(
                    bound = %self.resource_manager,
                    given = %resources.id(),
                    "Dispose called with a different resource manager"
                );
            }
        }
        self.diffs = None;

        let layers: Vec<OnMapLayer> = self.layers.drain().map(|(_, layer)| layer).collect();
        let count = layers.len();
        for layer in layers {
            self.retire(layer);
        }
        self.pending.clear();
        while let Ok(event) = self.build_rx.try_recv() {
            self.apply_build_event(event);
        }

        self.z_order = ZOrder::default();
        self.disposed = true;
        info!(layers = count, builds_in_flight = self.builds_in_flight, "Layer manager disposed");
        self.notify(LayerEvent::LayersChanged);
    }

    fn pump_diffs(&mut self) -> usize {
        let mut applied = 0;
        while let Some(diff) = self.diffs.as_mut().and_then(|rx| rx.try_recv().ok()) {
            self.on_diff(&diff);
            applied += 1;
        }
        applied
    }

    fn start_build(&mut self, descriptor: Arc<LayerDescriptor>, visible: bool) {
        let key = descriptor.key();
        let position = self.z_order.position(&key).unwrap_or(0);
        let build = BuildId::new(self.next_build);
        self.next_build += 1;
        let cancel = CancellationToken::new();

        let bounds = self
            .config
            .initial_bounds()
            .or_else(|| self.surface.visible_bounds())
            .unwrap_or(GeoBounds::WORLD);
        let request = BuildRequest {
            build,
            descriptor: Arc::clone(&descriptor),
            provider: self.providers.get(descriptor.provider_type()).cloned(),
            bounds,
            batch_size: self.config.element_batch_size(),
            cancel: cancel.clone(),
            events: self.build_tx.clone(),
        };

        debug!(layer = %key, build = %build, z_index = position, "Layer build started");
        self.layers.insert(
            key.clone(),
            OnMapLayer::pending(descriptor, build, cancel, visible, position),
        );
        self.pending.insert(build, key);
        self.builds_in_flight += 1;
        self.runtime.spawn(run_build(request));
    }

    fn apply_build_event(&mut self, event: BuildEvent) {
        if event.is_terminal() {
            self.builds_in_flight = self.builds_in_flight.saturating_sub(1);
        }
        let build = event.build();
        let Some(key) = self.pending.get(&build).cloned() else {
            trace!(build = %build, "Discarding event from stale build");
            if let BuildEvent::Started { mut adapter, .. } = event {
                adapter.dispose();
            }
            return;
        };
        let Some(layer) = self.layers.get_mut(&key) else {
            self.pending.remove(&build);
            return;
        };

        match event {
            BuildEvent::Started { adapter, .. } => layer.attach_adapter(adapter),
            BuildEvent::Elements { elements, .. } => {
                for spec in elements {
                    layer.add_element(&mut self.surface, spec);
                }
            }
            BuildEvent::Finished { .. } => {
                self.pending.remove(&build);
                let position = self.z_order.position(&key).unwrap_or(layer.z_index());
                layer.realize();
                layer.set_z_index(&mut self.surface, position);
                info!(
                    layer = %key,
                    build = %build,
                    elements = layer.elements().len(),
                    visible = layer.is_visible(),
                    "Layer realized"
                );
                self.notify(LayerEvent::LayerRealized(key));
            }
            BuildEvent::Failed { error, .. } => {
                self.pending.remove(&build);
                if let Some(layer) = self.layers.remove(&key) {
                    layer.teardown(&mut self.surface);
                }
                warn!(layer = %key, build = %build, error = %error, "Layer build failed");
                self.notify(LayerEvent::LayerFailed {
                    layer: key,
                    reason: error.to_string(),
                });
            }
            BuildEvent::Cancelled { .. } => {
                self.pending.remove(&build);
                if let Some(layer) = self.layers.remove(&key) {
                    layer.teardown(&mut self.surface);
                }
                debug!(layer = %key, build = %build, "Layer build cancelled");
            }
        }
    }

    /// Remove a layer's primitives, cancel its build and forget the build.
    fn retire(&mut self, layer: OnMapLayer) {
        if let Some(build) = layer.pending_build() {
            self.pending.remove(&build);
        }
        trace!(layer = %layer.descriptor().key(), "Retiring on-map layer");
        layer.teardown(&mut self.surface);
    }

    fn push_z_indices(&mut self) {
        for (key, layer) in self.layers.iter_mut() {
            if let Some(position) = self.z_order.position(key) {
                layer.set_z_index(&mut self.surface, position);
            }
        }
    }

    fn notify(&self, event: LayerEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }
}
