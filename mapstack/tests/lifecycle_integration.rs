//! Integration tests for the resource and layer lifecycle.
//!
//! These tests drive both managers through the public API only:
//! - Discovery, import and refresh feeding the layer stack
//! - Lazy builds and rebuilds of visible layers
//! - Removal of resources tearing down their primitives
//! - Single imports outside the refresh cycle
//! - Disposal

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mapstack::config::{LayerConfig, ResourceConfig};
use mapstack::geo::{GeoBounds, LatLon};
use mapstack::layer::{
    ElementSpec, ElementStream, Geometry, LayerAdapter, LayerBuildError, LayerManager, LayerState,
    MapSurface, PrimitiveHandle,
};
use mapstack::resource::{
    ImportError, LayerDescriptor, Provider, ProviderRegistry, ProviderType, Repository,
    RepositoryId, ResolvedPayload, Resource, ResourceManager, ResourceUri,
};
use tokio::runtime::Handle;

// =============================================================================
// Test Helpers
// =============================================================================

const PROVIDER: &str = "memory";

fn uri(s: &str) -> ResourceUri {
    ResourceUri::parse(s).unwrap()
}

/// Catalogue shared by the repository and the provider.
#[derive(Default)]
struct Catalogue {
    /// Layer names per location.
    entries: Mutex<HashMap<String, Vec<String>>>,
    /// Locations whose next refresh returns a new instance.
    changed: Mutex<HashSet<String>>,
}

impl Catalogue {
    fn put(&self, location: &str, layers: &[&str]) {
        self.entries.lock().unwrap().insert(
            location.to_string(),
            layers.iter().map(|s| s.to_string()).collect(),
        );
    }

    fn change(&self, location: &str, layers: &[&str]) {
        self.put(location, layers);
        self.changed.lock().unwrap().insert(location.to_string());
    }

    fn remove(&self, location: &str) {
        self.entries.lock().unwrap().remove(location);
    }

    fn layers(&self, location: &str) -> Option<Vec<String>> {
        self.entries.lock().unwrap().get(location).cloned()
    }
}

struct CatalogueRepository {
    id: RepositoryId,
    catalogue: Arc<Catalogue>,
}

impl Repository for CatalogueRepository {
    fn id(&self) -> &RepositoryId {
        &self.id
    }

    fn enumerate(&self) -> Vec<Resource> {
        let mut locations: Vec<String> =
            self.catalogue.entries.lock().unwrap().keys().cloned().collect();
        locations.sort();
        locations
            .iter()
            .map(|l| Resource::discovered(uri(l)))
            .collect()
    }
}

struct CatalogueProvider {
    provider_type: ProviderType,
    catalogue: Arc<Catalogue>,
    disposed: Arc<AtomicUsize>,
}

impl CatalogueProvider {
    fn resolved(&self, location: &ResourceUri, layers: &[String]) -> Resource {
        let descriptors = layers.iter().map(|name| {
            LayerDescriptor::new(location, name, self.provider_type.clone()).with_title(name)
        });
        Resource::discovered(location.clone()).with_payload(ResolvedPayload::new(
            location.file_name().unwrap_or("resource"),
            self.provider_type.clone(),
            descriptors,
        ))
    }
}

impl Provider for CatalogueProvider {
    fn provider_type(&self) -> &ProviderType {
        &self.provider_type
    }

    fn can_handle(&self, resource: &Resource) -> bool {
        resource.uri().scheme() == "mem"
    }

    fn resolve(&self, resource: &Resource) -> Result<Resource, ImportError> {
        let layers = self
            .catalogue
            .layers(resource.uri().as_str())
            .ok_or_else(|| {
                ImportError::resolve_failed(resource.uri(), &self.provider_type, "not catalogued")
            })?;
        Ok(self.resolved(resource.uri(), &layers))
    }

    fn refresh_batch(&self, resources: Vec<Arc<Resource>>) -> Vec<Arc<Resource>> {
        let mut changed = self.catalogue.changed.lock().unwrap();
        resources
            .into_iter()
            .filter_map(|resource| {
                let location = resource.uri().as_str().to_string();
                let layers = self.catalogue.layers(&location)?;
                if changed.remove(&location) {
                    Some(Arc::new(self.resolved(resource.uri(), &layers)))
                } else {
                    Some(resource)
                }
            })
            .collect()
    }

    fn build_layer_adapter(
        &self,
        layer: &LayerDescriptor,
    ) -> Result<Box<dyn LayerAdapter>, LayerBuildError> {
        Ok(Box::new(PointsAdapter {
            name: layer.name().to_string(),
            added: HashMap::new(),
            disposed: Arc::clone(&self.disposed),
        }))
    }
}

/// Two point elements per layer.
struct PointsAdapter {
    name: String,
    added: HashMap<PrimitiveHandle, String>,
    disposed: Arc<AtomicUsize>,
}

impl LayerAdapter for PointsAdapter {
    fn elements_in_bounds(&mut self, _bounds: GeoBounds) -> ElementStream {
        let name = self.name.clone();
        Box::new((0..2).map(move |i| {
            ElementSpec::new(
                format!("{}-{}", name, i),
                Geometry::Point(LatLon::new(i as f64, i as f64)),
            )
        }))
    }

    fn on_element_added(&mut self, spec: &ElementSpec, handle: PrimitiveHandle) {
        self.added.insert(handle, spec.id.clone());
    }

    fn on_click(&mut self, handle: PrimitiveHandle) -> Option<String> {
        self.added.get(&handle).cloned()
    }

    fn dispose(&mut self) {
        self.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Surface tracking live primitives and their visibility.
#[derive(Default)]
struct CountingSurface {
    next: u64,
    live: HashMap<PrimitiveHandle, bool>,
}

impl CountingSurface {
    fn visible(&self) -> usize {
        self.live.values().filter(|v| **v).count()
    }
}

impl MapSurface for CountingSurface {
    fn add_primitive(&mut self, _spec: &ElementSpec, _z: usize, visible: bool) -> PrimitiveHandle {
        self.next += 1;
        let handle = PrimitiveHandle::new(self.next);
        self.live.insert(handle, visible);
        handle
    }

    fn remove_primitive(&mut self, handle: PrimitiveHandle) {
        self.live.remove(&handle);
    }

    fn set_visible(&mut self, handle: PrimitiveHandle, visible: bool) {
        if let Some(v) = self.live.get_mut(&handle) {
            *v = visible;
        }
    }

    fn set_z_index(&mut self, _handle: PrimitiveHandle, _z_index: usize) {}
}

struct World {
    catalogue: Arc<Catalogue>,
    disposed: Arc<AtomicUsize>,
    resources: ResourceManager,
    layers: LayerManager<CountingSurface>,
}

impl World {
    fn new(with_repository: bool) -> Self {
        let catalogue = Arc::new(Catalogue::default());
        let disposed = Arc::new(AtomicUsize::new(0));
        let provider = Arc::new(CatalogueProvider {
            provider_type: ProviderType::new(PROVIDER),
            catalogue: Arc::clone(&catalogue),
            disposed: Arc::clone(&disposed),
        });
        let providers = Arc::new(ProviderRegistry::new().with_provider(provider));

        let mut resources = ResourceManager::new(Handle::current(), Arc::clone(&providers))
            .with_config(ResourceConfig::default());
        if with_repository {
            resources = resources.with_repository(Arc::new(CatalogueRepository {
                id: RepositoryId::new("catalogue"),
                catalogue: Arc::clone(&catalogue),
            }));
        }
        let layers = LayerManager::new(
            &mut resources,
            providers,
            CountingSurface::default(),
            Handle::current(),
            LayerConfig::default(),
        );

        Self {
            catalogue,
            disposed,
            resources,
            layers,
        }
    }

    async fn settle(&mut self) {
        within(self.resources.run_until_idle()).await;
        self.layers.pump();
        within(self.layers.run_until_idle()).await;
    }

    async fn refresh(&mut self) {
        self.resources.refresh_available();
        self.settle().await;
    }

    fn names(&self) -> Vec<String> {
        self.layers
            .layers_in_z_order()
            .iter()
            .map(|d| d.name().to_string())
            .collect()
    }

    fn descriptor(&self, name: &str) -> Arc<LayerDescriptor> {
        self.layers
            .layers_in_z_order()
            .into_iter()
            .find(|d| d.name() == name)
            .unwrap_or_else(|| panic!("layer {} not in z-order", name))
    }
}

async fn within<F: Future<Output = ()>>(future: F) {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out waiting for background work");
}

// =============================================================================
// Integration Tests
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_full_lifecycle() {
    let mut world = World::new(true);
    world.catalogue.put("mem://maps/a.cat", &["roads", "rivers"]);
    world.catalogue.put("mem://maps/b.cat", &["parks"]);

    world.refresh().await;
    assert_eq!(world.names(), vec!["rivers", "roads", "parks"]);
    let roads = world.descriptor("roads");
    assert_eq!(world.layers.layer_state(&roads), Some(LayerState::Unrealized));

    // Lazy build on first show.
    world.layers.show(&roads);
    world.settle().await;
    assert_eq!(world.layers.layer_state(&roads), Some(LayerState::Visible));
    assert_eq!(world.layers.surface().visible(), 2);

    // A changed resource rebuilds its visible layers.
    world.catalogue.change("mem://maps/a.cat", &["roads", "rivers", "rail"]);
    world.refresh().await;
    assert_eq!(world.names(), vec!["rivers", "roads", "parks", "rail"]);
    let roads = world.descriptor("roads");
    assert_eq!(world.layers.layer_state(&roads), Some(LayerState::Visible));
    assert_eq!(world.layers.surface().live.len(), 2);
    assert_eq!(world.disposed.load(Ordering::SeqCst), 1);

    // A vanished resource takes its layers and primitives with it.
    world.catalogue.remove("mem://maps/a.cat");
    world.refresh().await;
    assert_eq!(world.names(), vec!["parks"]);
    assert!(world.layers.surface().live.is_empty());
    assert_eq!(world.disposed.load(Ordering::SeqCst), 2);

    world.layers.dispose(&mut world.resources);
    assert!(world.layers.is_disposed());
    assert_eq!(world.resources.listener_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_try_import_reaches_layer_stack() {
    let mut world = World::new(false);
    world.catalogue.put("mem://maps/c.cat", &["trails"]);

    world.resources.try_import(uri("mem://maps/c.cat"));
    world.settle().await;
    assert_eq!(world.names(), vec!["trails"]);

    let report = world.resources.last_report().expect("import report");
    assert_eq!(report.imported, 1);
    assert!(report.is_clean());

    // Importing an unknown location changes nothing.
    world.resources.try_import(uri("mem://maps/missing.cat"));
    world.settle().await;
    assert_eq!(world.names(), vec!["trails"]);
    assert_eq!(world.resources.last_report().unwrap().failures.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_listeners_see_every_diff_in_order() {
    let mut world = World::new(true);
    let mut first = world.resources.subscribe();
    let mut second = world.resources.subscribe();

    world.catalogue.put("mem://maps/a.cat", &["roads"]);
    world.refresh().await;
    world.catalogue.remove("mem://maps/a.cat");
    world.refresh().await;

    let a1 = first.receiver.try_recv().unwrap();
    let a2 = first.receiver.try_recv().unwrap();
    let b1 = second.receiver.try_recv().unwrap();
    assert!(Arc::ptr_eq(&a1, &b1));
    assert_eq!(a1.added_count(), 1);
    assert_eq!(a2.removed_count(), 1);
    assert!(a2.snapshot().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_clicks_reach_owning_layer() {
    let mut world = World::new(true);
    world.catalogue.put("mem://maps/a.cat", &["roads"]);
    world.refresh().await;

    let roads = world.descriptor("roads");
    world.layers.show(&roads);
    world.settle().await;

    let handle = *world.layers.surface().live.keys().min().unwrap();
    let click = world.layers.on_primitive_click(handle).expect("owned primitive");
    assert_eq!(click.layer, roads.key());
    assert_eq!(click.element.as_deref(), Some("roads-0"));

    assert!(world
        .layers
        .on_primitive_click(PrimitiveHandle::new(999))
        .is_none());
}
