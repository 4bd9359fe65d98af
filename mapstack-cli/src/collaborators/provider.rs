//! Provider for `*.layers` manifest files on the local filesystem.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::SystemTime;

use mapstack::geo::{GeoBounds, LatLon};
use mapstack::layer::{
    ElementSpec, ElementStream, Geometry, LayerAdapter, LayerBuildError, PrimitiveHandle,
};
use mapstack::resource::{
    ImportError, LayerDescriptor, LayerKey, Provider, ProviderType, ResolvedPayload, Resource,
    ResourceUri,
};
use tracing::{debug, warn};

use super::manifest::Manifest;

/// Tag under which manifests are registered.
pub const MANIFEST_PROVIDER: &str = "manifest";

/// File extension recognized by [`ManifestProvider`].
pub const MANIFEST_EXTENSION: &str = "layers";

/// Imports layer manifests and builds adapters serving their elements.
///
/// Refresh compares file modification times recorded at import: an
/// untouched file keeps its instance, a modified one is re-read, a deleted
/// one is dropped.
pub struct ManifestProvider {
    provider_type: ProviderType,
    modified: Mutex<HashMap<ResourceUri, SystemTime>>,
}

impl ManifestProvider {
    pub fn new() -> Self {
        Self {
            provider_type: ProviderType::new(MANIFEST_PROVIDER),
            modified: Mutex::new(HashMap::new()),
        }
    }

    fn modified(&self) -> MutexGuard<'_, HashMap<ResourceUri, SystemTime>> {
        self.modified.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn local_path(&self, uri: &ResourceUri) -> Result<PathBuf, ImportError> {
        uri.to_file_path().ok_or_else(|| {
            ImportError::resolve_failed(uri, &self.provider_type, "not a local file")
        })
    }

    fn read_manifest(&self, uri: &ResourceUri, path: &Path) -> Result<Manifest, ImportError> {
        let text = fs::read_to_string(path).map_err(|source| ImportError::Unreadable {
            uri: uri.clone(),
            path: path.to_path_buf(),
            source,
        })?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| uri.to_string());
        Manifest::parse(&text, &stem)
            .map_err(|reason| ImportError::resolve_failed(uri, &self.provider_type, reason))
    }

    /// Read and resolve `resource`, recording the file's modification time.
    fn load(&self, resource: &Resource) -> Result<Resource, ImportError> {
        let uri = resource.uri();
        let path = self.local_path(uri)?;
        let modified = modification_time(&path).ok();
        let manifest = self.read_manifest(uri, &path)?;

        let descriptors = manifest.layers.iter().map(|layer| {
            let mut descriptor = LayerDescriptor::new(uri, &layer.name, self.provider_type.clone());
            if let Some(title) = &layer.title {
                descriptor = descriptor.with_title(title);
            }
            if let Some(icon) = &layer.icon {
                descriptor = descriptor.with_icon(icon);
            }
            if let Some(info) = &layer.info {
                descriptor = descriptor.with_info(info);
            }
            descriptor
        });
        let payload = ResolvedPayload::new(&manifest.name, self.provider_type.clone(), descriptors);

        let mut resolved = Resource::discovered(uri.clone()).with_payload(payload);
        if let Some(repository) = resource.repository() {
            resolved = resolved.with_repository(repository.clone());
        }

        if let Some(modified) = modified {
            self.modified().insert(uri.clone(), modified);
        }
        debug!(uri = %uri, layers = manifest.layers.len(), "Manifest loaded");
        Ok(resolved)
    }

    fn refresh_one(&self, resource: Arc<Resource>) -> Option<Arc<Resource>> {
        let Some(path) = resource.uri().to_file_path() else {
            return Some(resource);
        };
        let modified = match modification_time(&path) {
            Ok(modified) => modified,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(uri = %resource.uri(), "Manifest removed");
                self.modified().remove(resource.uri());
                return None;
            }
            Err(e) => {
                warn!(uri = %resource.uri(), error = %e, "Cannot stat manifest, keeping previous");
                return Some(resource);
            }
        };

        if self.modified().get(resource.uri()) == Some(&modified) {
            return Some(resource);
        }

        match self.load(&resource) {
            Ok(updated) => Some(Arc::new(updated)),
            Err(e) => {
                warn!(uri = %resource.uri(), error = %e, "Manifest reload failed, keeping previous");
                Some(resource)
            }
        }
    }
}

impl Default for ManifestProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider for ManifestProvider {
    fn provider_type(&self) -> &ProviderType {
        &self.provider_type
    }

    fn can_handle(&self, resource: &Resource) -> bool {
        resource.uri().is_local_file() && resource.uri().extension() == Some(MANIFEST_EXTENSION)
    }

    fn resolve(&self, resource: &Resource) -> Result<Resource, ImportError> {
        self.load(resource)
    }

    fn refresh_batch(&self, resources: Vec<Arc<Resource>>) -> Vec<Arc<Resource>> {
        resources
            .into_iter()
            .filter_map(|resource| self.refresh_one(resource))
            .collect()
    }

    fn build_layer_adapter(
        &self,
        layer: &LayerDescriptor,
    ) -> Result<Box<dyn LayerAdapter>, LayerBuildError> {
        let key = layer.key();
        let path = self
            .local_path(layer.resource())
            .map_err(|e| LayerBuildError::adapter_failed(key.clone(), e.to_string()))?;
        let manifest = self
            .read_manifest(layer.resource(), &path)
            .map_err(|e| LayerBuildError::adapter_failed(key.clone(), e.to_string()))?;
        let section = manifest.layer(layer.name()).ok_or_else(|| {
            LayerBuildError::adapter_failed(key.clone(), "layer no longer in manifest")
        })?;

        Ok(Box::new(ManifestAdapter::new(
            key,
            layer.title().to_string(),
            section.elements.clone(),
        )))
    }
}

fn modification_time(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

/// Adapter serving the elements of one manifest section.
pub struct ManifestAdapter {
    layer: LayerKey,
    title: String,
    elements: Vec<ElementSpec>,
    added: HashMap<PrimitiveHandle, ElementSpec>,
}

impl ManifestAdapter {
    pub fn new(layer: LayerKey, title: String, elements: Vec<ElementSpec>) -> Self {
        Self {
            layer,
            title,
            elements,
            added: HashMap::new(),
        }
    }
}

impl LayerAdapter for ManifestAdapter {
    fn elements_in_bounds(&mut self, bounds: GeoBounds) -> ElementStream {
        let elements = self.elements.clone();
        Box::new(elements.into_iter().filter(move |element| {
            element
                .geometry
                .bounds()
                .is_some_and(|b| b.intersects(&bounds))
        }))
    }

    fn on_element_added(&mut self, spec: &ElementSpec, handle: PrimitiveHandle) {
        self.added.insert(handle, spec.clone());
    }

    fn on_click(&mut self, handle: PrimitiveHandle) -> Option<String> {
        let spec = self.added.get(&handle)?;
        let name = spec.label.as_deref().unwrap_or(&spec.id);
        Some(format!("{}: {}", self.title, name))
    }

    fn on_map_click(&mut self, position: LatLon) -> Option<String> {
        let hits: Vec<&str> = self
            .added
            .values()
            .filter(|spec| match &spec.geometry {
                Geometry::Polygon(ring) => {
                    GeoBounds::enclosing(ring).is_some_and(|b| b.contains(&position))
                }
                _ => false,
            })
            .map(|spec| spec.label.as_deref().unwrap_or(&spec.id))
            .collect();
        if hits.is_empty() {
            return None;
        }
        Some(format!("{}: inside {}", self.title, hits.join(", ")))
    }

    fn dispose(&mut self) {
        debug!(layer = %self.layer, primitives = self.added.len(), "Manifest adapter disposed");
        self.added.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TRAILS: &str = "\
name = Outdoors

[trails]
title = Hiking trails
point = 45.52,-122.68 | Trailhead

[parks]
polygon = 45.50,-122.70 45.50,-122.60 45.56,-122.65 | Forest Park
";

    fn discovered(path: &Path) -> Resource {
        Resource::discovered(ResourceUri::from_file_path(path).unwrap())
    }

    #[test]
    fn test_resolve_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("outdoors.layers");
        fs::write(&path, TRAILS).unwrap();

        let provider = ManifestProvider::new();
        let resource = discovered(&path);
        assert!(provider.can_handle(&resource));

        let resolved = provider.resolve(&resource).unwrap();
        assert_eq!(resolved.name(), "Outdoors");
        assert!(resolved.check_resolved().is_ok());
        let titles: Vec<&str> = resolved.layers().iter().map(|l| l.title()).collect();
        assert_eq!(titles, vec!["Hiking trails", "parks"]);
    }

    #[test]
    fn test_cannot_handle_other_extensions() {
        let provider = ManifestProvider::new();
        assert!(!provider.can_handle(&discovered(Path::new("/maps/a.kml"))));
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let provider = ManifestProvider::new();
        let err = provider
            .resolve(&discovered(&dir.path().join("gone.layers")))
            .unwrap_err();
        assert!(matches!(err, ImportError::Unreadable { .. }));
    }

    #[test]
    fn test_refresh_keeps_unchanged_and_drops_deleted() {
        let dir = TempDir::new().unwrap();
        let kept_path = dir.path().join("kept.layers");
        let gone_path = dir.path().join("gone.layers");
        fs::write(&kept_path, TRAILS).unwrap();
        fs::write(&gone_path, TRAILS).unwrap();

        let provider = ManifestProvider::new();
        let kept = Arc::new(provider.resolve(&discovered(&kept_path)).unwrap());
        let gone = Arc::new(provider.resolve(&discovered(&gone_path)).unwrap());
        fs::remove_file(&gone_path).unwrap();

        let refreshed = provider.refresh_batch(vec![Arc::clone(&kept), gone]);
        assert_eq!(refreshed.len(), 1);
        assert!(Arc::ptr_eq(&refreshed[0], &kept));
    }

    #[test]
    fn test_refresh_reloads_modified() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.layers");
        fs::write(&path, TRAILS).unwrap();

        let provider = ManifestProvider::new();
        let original = Arc::new(provider.resolve(&discovered(&path)).unwrap());
        // Forget the recorded time so the next refresh treats the file as changed.
        provider.modified().clear();
        fs::write(&path, "[only]\n").unwrap();

        let refreshed = provider.refresh_batch(vec![Arc::clone(&original)]);
        assert_eq!(refreshed.len(), 1);
        assert!(!Arc::ptr_eq(&refreshed[0], &original));
        assert_eq!(refreshed[0].layers()[0].name(), "only");
    }

    #[test]
    fn test_adapter_clicks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.layers");
        fs::write(&path, TRAILS).unwrap();

        let provider = ManifestProvider::new();
        let resolved = provider.resolve(&discovered(&path)).unwrap();
        let parks = resolved.layers()[1].clone();

        let mut adapter = provider.build_layer_adapter(&parks).unwrap();
        let elements: Vec<ElementSpec> = adapter.elements_in_bounds(GeoBounds::WORLD).collect();
        assert_eq!(elements.len(), 1);
        adapter.on_element_added(&elements[0], PrimitiveHandle::new(7));

        assert_eq!(
            adapter.on_click(PrimitiveHandle::new(7)).as_deref(),
            Some("parks: Forest Park")
        );
        assert!(adapter.on_click(PrimitiveHandle::new(8)).is_none());
        assert_eq!(
            adapter.on_map_click(LatLon::new(45.53, -122.65)).as_deref(),
            Some("parks: inside Forest Park")
        );
        assert!(adapter.on_map_click(LatLon::new(0.0, 0.0)).is_none());
    }

    #[test]
    fn test_adapter_for_removed_section_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.layers");
        fs::write(&path, TRAILS).unwrap();

        let provider = ManifestProvider::new();
        let resolved = provider.resolve(&discovered(&path)).unwrap();
        fs::write(&path, "[other]\n").unwrap();

        let result = provider.build_layer_adapter(&resolved.layers()[0]);
        assert!(matches!(result, Err(LayerBuildError::AdapterFailed { .. })));
    }
}
