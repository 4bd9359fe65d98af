//! Collaborator traits consumed by the managers.
//!
//! Concrete repositories and providers live outside this crate; these
//! traits are the seams they plug into. All methods may block and are only
//! ever called from background workers.

use std::sync::Arc;

use crate::layer::{LayerAdapter, LayerBuildError};

use super::{ImportError, LayerDescriptor, ProviderType, RepositoryId, Resource};

/// Source of candidate resource locations.
pub trait Repository: Send + Sync {
    /// Identifier stamped on resources this repository reports.
    fn id(&self) -> &RepositoryId;

    /// Enumerate candidate resources.
    ///
    /// Returned resources are usually unresolved. Repositories handle their
    /// own I/O errors; an empty result is valid.
    fn enumerate(&self) -> Vec<Resource>;
}

/// Importer, refresher and layer adapter factory for one kind of resource.
pub trait Provider: Send + Sync {
    /// Tag under which this provider is registered.
    fn provider_type(&self) -> &ProviderType;

    /// Whether this provider recognizes the resource.
    fn can_handle(&self, resource: &Resource) -> bool;

    /// Import a resource, returning a new resolved instance with the same
    /// location.
    fn resolve(&self, resource: &Resource) -> Result<Resource, ImportError>;

    /// Refresh previously resolved resources owned by this provider.
    ///
    /// Returns a subset of the input: the same `Arc` for unchanged
    /// resources, a new instance for changed ones, and nothing for
    /// resources that are no longer available.
    fn refresh_batch(&self, resources: Vec<Arc<Resource>>) -> Vec<Arc<Resource>>;

    /// Create the live adapter that produces visual elements for a layer.
    fn build_layer_adapter(
        &self,
        layer: &LayerDescriptor,
    ) -> Result<Box<dyn LayerAdapter>, LayerBuildError>;
}
