//! Mock collaborators shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::geo::{GeoBounds, LatLon};
use crate::layer::{
    ElementSpec, ElementStream, Geometry, LayerAdapter, LayerBuildError, MapSurface,
    PrimitiveHandle, PrimitiveKind,
};
use crate::resource::{
    ImportError, LayerDescriptor, Provider, ProviderType, Repository, RepositoryId,
    ResolvedPayload, Resource, ResourceUri,
};

/// A resolved resource with one descriptor per layer name.
pub fn resolved(uri: &str, provider: &str, layers: &[&str]) -> Resource {
    let uri = ResourceUri::parse(uri).unwrap();
    let provider_type = ProviderType::new(provider);
    let descriptors: Vec<LayerDescriptor> = layers
        .iter()
        .map(|name| LayerDescriptor::new(&uri, *name, provider_type.clone()).with_title(*name))
        .collect();
    let name = uri.file_name().unwrap_or("resource").to_string();
    Resource::discovered(uri)
        .with_provider_type(provider_type.clone())
        .with_payload(ResolvedPayload::new(name, provider_type, descriptors))
}

/// `count` point elements with ids `element-0`, `element-1`, ...
pub fn point_elements(count: usize) -> Vec<ElementSpec> {
    (0..count)
        .map(|i| {
            ElementSpec::new(
                format!("element-{}", i),
                Geometry::Point(LatLon::new(i as f64, i as f64)),
            )
        })
        .collect()
}

/// Repository reporting a fixed, replaceable list of locations.
pub struct MockRepository {
    id: RepositoryId,
    locations: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockRepository {
    pub fn new(id: &str, locations: &[&str]) -> Self {
        Self {
            id: RepositoryId::new(id),
            locations: Mutex::new(locations.iter().map(|s| s.to_string()).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_locations(&self, locations: &[&str]) {
        *self.locations.lock().unwrap() = locations.iter().map(|s| s.to_string()).collect();
    }

    pub fn enumerate_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Repository for MockRepository {
    fn id(&self) -> &RepositoryId {
        &self.id
    }

    fn enumerate(&self) -> Vec<Resource> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.locations
            .lock()
            .unwrap()
            .iter()
            .map(|s| Resource::discovered(ResourceUri::parse(s).unwrap()))
            .collect()
    }
}

#[derive(Default)]
struct ProviderState {
    fail_resolve: HashSet<String>,
    panic_resolve: HashSet<String>,
    vanished: HashSet<String>,
    replace: HashSet<String>,
    refresh_calls: usize,
    last_refresh_size: usize,
    elements: Vec<ElementSpec>,
    fail_build: bool,
    panic_build: bool,
}

/// Provider handling every location with a given extension.
///
/// Each resolved resource gets one layer named after the file stem.
pub struct MockProvider {
    provider_type: ProviderType,
    extension: String,
    state: Mutex<ProviderState>,
    adapter_builds: AtomicUsize,
    disposed: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn new(provider_type: &str, extension: &str) -> Self {
        Self {
            provider_type: ProviderType::new(provider_type),
            extension: extension.to_string(),
            state: Mutex::new(ProviderState::default()),
            adapter_builds: AtomicUsize::new(0),
            disposed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// `resolve` returns an error for this location.
    pub fn fail_resolve(&self, uri: &str) {
        self.state().fail_resolve.insert(uri.to_string());
    }

    /// `resolve` panics for this location.
    pub fn panic_resolve(&self, uri: &str) {
        self.state().panic_resolve.insert(uri.to_string());
    }

    /// `refresh_batch` omits this location from now on.
    pub fn vanish(&self, uri: &str) {
        self.state().vanished.insert(uri.to_string());
    }

    /// The next `refresh_batch` returns a new instance for this location.
    pub fn replace_on_refresh(&self, uri: &str) {
        self.state().replace.insert(uri.to_string());
    }

    pub fn refresh_calls(&self) -> usize {
        self.state().refresh_calls
    }

    pub fn last_refresh_size(&self) -> usize {
        self.state().last_refresh_size
    }

    /// Elements every adapter built from now on produces.
    pub fn set_elements(&self, elements: Vec<ElementSpec>) {
        self.state().elements = elements;
    }

    pub fn fail_build(&self) {
        self.state().fail_build = true;
    }

    pub fn allow_build(&self) {
        let mut state = self.state();
        state.fail_build = false;
        state.panic_build = false;
    }

    pub fn panic_build(&self) {
        self.state().panic_build = true;
    }

    pub fn adapter_builds(&self) -> usize {
        self.adapter_builds.load(Ordering::SeqCst)
    }

    pub fn adapters_disposed(&self) -> usize {
        self.disposed.load(Ordering::SeqCst)
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ProviderState> {
        self.state.lock().unwrap()
    }

    fn layer_name(uri: &ResourceUri) -> String {
        let file = uri.file_name().unwrap_or("layer");
        file.rsplit_once('.').map_or(file, |(stem, _)| stem).to_string()
    }
}

impl Provider for MockProvider {
    fn provider_type(&self) -> &ProviderType {
        &self.provider_type
    }

    fn can_handle(&self, resource: &Resource) -> bool {
        resource.uri().extension() == Some(self.extension.as_str())
    }

    fn resolve(&self, resource: &Resource) -> Result<Resource, ImportError> {
        let uri = resource.uri().as_str().to_string();
        let (fail, panic) = {
            let state = self.state();
            (
                state.fail_resolve.contains(&uri),
                state.panic_resolve.contains(&uri),
            )
        };
        if panic {
            panic!("mock provider panicked resolving {}", uri);
        }
        if fail {
            return Err(ImportError::resolve_failed(
                resource.uri(),
                &self.provider_type,
                "mock failure",
            ));
        }
        let layer = Self::layer_name(resource.uri());
        Ok(resolved(&uri, self.provider_type.as_str(), &[layer.as_str()]))
    }

    fn refresh_batch(&self, resources: Vec<Arc<Resource>>) -> Vec<Arc<Resource>> {
        let mut state = self.state();
        state.refresh_calls += 1;
        state.last_refresh_size = resources.len();

        let mut out = Vec::with_capacity(resources.len());
        for resource in resources {
            let uri = resource.uri().as_str().to_string();
            if state.vanished.contains(&uri) {
                continue;
            }
            if state.replace.remove(&uri) {
                let names: Vec<&str> = resource.layers().iter().map(|l| l.name()).collect();
                out.push(Arc::new(resolved(&uri, self.provider_type.as_str(), &names)));
            } else {
                out.push(resource);
            }
        }
        out
    }

    fn build_layer_adapter(
        &self,
        layer: &LayerDescriptor,
    ) -> Result<Box<dyn LayerAdapter>, LayerBuildError> {
        self.adapter_builds.fetch_add(1, Ordering::SeqCst);
        let (fail, panic, elements) = {
            let state = self.state();
            (state.fail_build, state.panic_build, state.elements.clone())
        };
        if panic {
            panic!("mock adapter factory panicked for {}", layer.key());
        }
        if fail {
            return Err(LayerBuildError::adapter_failed(layer.key(), "mock adapter failure"));
        }
        Ok(Box::new(
            MockAdapter::new(elements).with_dispose_counter(Arc::clone(&self.disposed)),
        ))
    }
}

/// Adapter serving a fixed element list and describing every click.
pub struct MockAdapter {
    elements: Vec<ElementSpec>,
    added: HashMap<PrimitiveHandle, String>,
    disposed: Arc<AtomicUsize>,
}

impl MockAdapter {
    pub fn new(elements: Vec<ElementSpec>) -> Self {
        Self {
            elements,
            added: HashMap::new(),
            disposed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_dispose_counter(mut self, counter: Arc<AtomicUsize>) -> Self {
        self.disposed = counter;
        self
    }
}

impl LayerAdapter for MockAdapter {
    fn elements_in_bounds(&mut self, bounds: GeoBounds) -> ElementStream {
        let elements = self.elements.clone();
        Box::new(elements.into_iter().filter(move |e| {
            e.geometry
                .bounds()
                .map_or(true, |b| b.intersects(&bounds))
        }))
    }

    fn on_element_added(&mut self, spec: &ElementSpec, handle: PrimitiveHandle) {
        self.added.insert(handle, spec.id.clone());
    }

    fn on_click(&mut self, handle: PrimitiveHandle) -> Option<String> {
        let id = self.added.get(&handle).map_or("unknown", String::as_str);
        Some(format!("clicked {} ({})", id, handle))
    }

    fn on_map_click(&mut self, position: LatLon) -> Option<String> {
        Some(format!("map click at {}", position))
    }

    fn dispose(&mut self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

/// State of one primitive on a [`RecordingSurface`].
#[derive(Debug, Clone)]
pub struct RecordedPrimitive {
    pub spec: ElementSpec,
    pub z_index: usize,
    pub visible: bool,
}

/// Map surface that records every primitive operation.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    next: u64,
    primitives: HashMap<PrimitiveHandle, RecordedPrimitive>,
    ops: usize,
    click_kinds: Vec<PrimitiveKind>,
}

impl RecordingSurface {
    pub fn primitive(&self, handle: PrimitiveHandle) -> Option<&RecordedPrimitive> {
        self.primitives.get(&handle)
    }

    /// Primitives currently on the surface.
    pub fn live_count(&self) -> usize {
        self.primitives.len()
    }

    /// Total number of mutating calls received.
    pub fn op_count(&self) -> usize {
        self.ops
    }

    pub fn click_kinds(&self) -> &[PrimitiveKind] {
        &self.click_kinds
    }
}

impl MapSurface for RecordingSurface {
    fn add_primitive(
        &mut self,
        spec: &ElementSpec,
        z_index: usize,
        visible: bool,
    ) -> PrimitiveHandle {
        self.next += 1;
        self.ops += 1;
        let handle = PrimitiveHandle::new(self.next);
        self.primitives.insert(
            handle,
            RecordedPrimitive {
                spec: spec.clone(),
                z_index,
                visible,
            },
        );
        handle
    }

    fn remove_primitive(&mut self, handle: PrimitiveHandle) {
        self.ops += 1;
        self.primitives.remove(&handle);
    }

    fn set_visible(&mut self, handle: PrimitiveHandle, visible: bool) {
        self.ops += 1;
        if let Some(p) = self.primitives.get_mut(&handle) {
            p.visible = visible;
        }
    }

    fn set_z_index(&mut self, handle: PrimitiveHandle, z_index: usize) {
        self.ops += 1;
        if let Some(p) = self.primitives.get_mut(&handle) {
            p.z_index = z_index;
        }
    }

    fn register_click_listener(&mut self, kind: PrimitiveKind) {
        self.click_kinds.push(kind);
    }
}
