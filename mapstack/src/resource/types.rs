//! Resource and layer descriptor value types.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::ResourceUri;

/// Tag naming the provider implementation that owns a resource.
///
/// The registry dispatches on this tag rather than on concrete types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderType(Cow<'static, str>);

impl ProviderType {
    /// Tag from a static string, usable in constants.
    pub const fn from_static(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }

    /// Tag from an owned string.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(Cow::Owned(tag.into()))
    }

    /// The tag text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of the repository that reported a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryId(String);

impl RepositoryId {
    /// Create a repository identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RepositoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a layer: owning resource plus layer name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerKey {
    /// Owning resource.
    pub resource: ResourceUri,
    /// Layer name, unique within the resource.
    pub name: String,
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.resource, self.name)
    }
}

/// Metadata of one logical layer inside a resource.
///
/// Equality and hashing consider only the owning resource and the layer
/// name, so the same logical layer keeps its identity when a different
/// provider produces it on a later refresh. Whether a descriptor changed
/// is decided by instance identity (`Arc::ptr_eq`), not by comparing
/// fields.
#[derive(Debug, Clone)]
pub struct LayerDescriptor {
    resource: ResourceUri,
    name: String,
    title: String,
    provider_type: ProviderType,
    icon: Option<String>,
    info: Option<String>,
}

impl LayerDescriptor {
    /// Create a descriptor. The title defaults to the layer name.
    pub fn new(resource: &ResourceUri, name: impl Into<String>, provider_type: ProviderType) -> Self {
        let name = name.into();
        Self {
            resource: resource.clone(),
            title: name.clone(),
            name,
            provider_type,
            icon: None,
            info: None,
        }
    }

    /// Set the display title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Set the icon hint.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    /// Set the info hint.
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    pub fn resource(&self) -> &ResourceUri {
        &self.resource
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn provider_type(&self) -> &ProviderType {
        &self.provider_type
    }

    pub fn icon(&self) -> Option<&str> {
        self.icon.as_deref()
    }

    pub fn info(&self) -> Option<&str> {
        self.info.as_deref()
    }

    /// Identity key of this layer.
    pub fn key(&self) -> LayerKey {
        LayerKey {
            resource: self.resource.clone(),
            name: self.name.clone(),
        }
    }
}

impl PartialEq for LayerDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.resource == other.resource && self.name == other.name
    }
}

impl Eq for LayerDescriptor {}

impl Hash for LayerDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resource.hash(state);
        self.name.hash(state);
    }
}

/// Default stacking comparator: group by owning resource, then by title.
///
/// The layer name breaks ties between equal titles so the order is total.
pub fn default_layer_order(a: &LayerDescriptor, b: &LayerDescriptor) -> Ordering {
    a.resource
        .cmp(&b.resource)
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.name.cmp(&b.name))
}

/// Result of successfully importing a resource.
#[derive(Debug, Clone)]
pub struct ResolvedPayload {
    name: String,
    provider_type: ProviderType,
    layers: Vec<Arc<LayerDescriptor>>,
}

impl ResolvedPayload {
    /// Create a payload, taking ownership of the layer descriptors.
    pub fn new(
        name: impl Into<String>,
        provider_type: ProviderType,
        layers: impl IntoIterator<Item = LayerDescriptor>,
    ) -> Self {
        Self {
            name: name.into(),
            provider_type,
            layers: layers.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn provider_type(&self) -> &ProviderType {
        &self.provider_type
    }

    pub fn layers(&self) -> &[Arc<LayerDescriptor>] {
        &self.layers
    }
}

/// A discovered, possibly unresolved data source.
///
/// Resources are immutable values shared as `Arc<Resource>`; an update is
/// a new instance with the same [`ResourceUri`]. Equality and hashing use
/// only the location identifier.
#[derive(Debug, Clone)]
pub struct Resource {
    uri: ResourceUri,
    repository: Option<RepositoryId>,
    name: String,
    provider_type: Option<ProviderType>,
    refreshed_at: Option<DateTime<Utc>>,
    resolved: Option<ResolvedPayload>,
}

impl Resource {
    /// A freshly discovered, unresolved resource.
    ///
    /// The name defaults to the last path segment of the location.
    pub fn discovered(uri: ResourceUri) -> Self {
        let name = uri.file_name().unwrap_or(uri.as_str()).to_string();
        Self {
            uri,
            repository: None,
            name,
            provider_type: None,
            refreshed_at: None,
            resolved: None,
        }
    }

    /// Set the owning repository.
    pub fn with_repository(mut self, repository: RepositoryId) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Set the human name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the provider-type tag.
    pub fn with_provider_type(mut self, provider_type: ProviderType) -> Self {
        self.provider_type = Some(provider_type);
        self
    }

    /// Set the last-refreshed timestamp.
    pub fn with_refreshed_at(mut self, at: DateTime<Utc>) -> Self {
        self.refreshed_at = Some(at);
        self
    }

    /// Attach a resolved payload; name and provider type follow the payload.
    pub fn with_payload(mut self, payload: ResolvedPayload) -> Self {
        self.name = payload.name.clone();
        self.provider_type = Some(payload.provider_type.clone());
        self.resolved = Some(payload);
        self
    }

    pub fn uri(&self) -> &ResourceUri {
        &self.uri
    }

    pub fn repository(&self) -> Option<&RepositoryId> {
        self.repository.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn provider_type(&self) -> Option<&ProviderType> {
        self.provider_type.as_ref()
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.refreshed_at
    }

    pub fn resolved(&self) -> Option<&ResolvedPayload> {
        self.resolved.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }

    /// Layers of the resolved payload; empty when unresolved.
    pub fn layers(&self) -> &[Arc<LayerDescriptor>] {
        self.resolved.as_ref().map(|p| p.layers()).unwrap_or(&[])
    }

    /// Check the invariants a provider must uphold for a resolved resource.
    ///
    /// Every layer must belong to this resource and layer names must be
    /// unique within it.
    pub fn check_resolved(&self) -> Result<(), String> {
        let payload = self
            .resolved
            .as_ref()
            .ok_or_else(|| "resource has no resolved payload".to_string())?;
        let mut names = HashSet::new();
        for layer in payload.layers() {
            if layer.resource() != &self.uri {
                return Err(format!(
                    "layer '{}' belongs to {}, not {}",
                    layer.name(),
                    layer.resource(),
                    self.uri
                ));
            }
            if !names.insert(layer.name()) {
                return Err(format!("duplicate layer name '{}'", layer.name()));
            }
        }
        Ok(())
    }
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.uri == other.uri
    }
}

impl Eq for Resource {}

impl Hash for Resource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.uri.hash(state);
    }
}
