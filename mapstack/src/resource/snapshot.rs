//! Immutable resource snapshots.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{LayerDescriptor, Resource, ResourceUri};

/// An immutable set of known resources, keyed by location.
///
/// Snapshots are built once and shared via `Arc`; a refresh builds a new
/// snapshot and swaps it in.
#[derive(Debug, Clone, Default)]
pub struct ResourceSnapshot {
    resources: BTreeMap<ResourceUri, Arc<Resource>>,
}

impl ResourceSnapshot {
    /// Build a snapshot. Later duplicates of a location replace earlier ones.
    pub fn from_resources(resources: impl IntoIterator<Item = Arc<Resource>>) -> Self {
        Self {
            resources: resources
                .into_iter()
                .map(|r| (r.uri().clone(), r))
                .collect(),
        }
    }

    pub fn get(&self, uri: &ResourceUri) -> Option<&Arc<Resource>> {
        self.resources.get(uri)
    }

    pub fn contains(&self, uri: &ResourceUri) -> bool {
        self.resources.contains_key(uri)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources ordered by location.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Resource>> {
        self.resources.values()
    }

    /// All layer descriptors of all resolved resources, flattened.
    pub fn layers(&self) -> impl Iterator<Item = &Arc<LayerDescriptor>> {
        self.resources.values().flat_map(|r| r.layers().iter())
    }

    /// A copy of this snapshot with one resource inserted or replaced.
    pub(crate) fn with_resource(&self, resource: Arc<Resource>) -> Self {
        let mut resources = self.resources.clone();
        resources.insert(resource.uri().clone(), resource);
        Self { resources }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::resolved;

    #[test]
    fn test_layers_flatten_in_location_order() {
        let snapshot = ResourceSnapshot::from_resources([
            Arc::new(resolved("file:///maps/b.dog", "dog", &["x"])),
            Arc::new(resolved("file:///maps/a.cat", "cat", &["one", "two"])),
        ]);
        let names: Vec<_> = snapshot.layers().map(|l| l.name().to_string()).collect();
        assert_eq!(names, ["one", "two", "x"]);
    }

    #[test]
    fn test_with_resource_leaves_original_untouched() {
        let original =
            ResourceSnapshot::from_resources([Arc::new(resolved("file:///a.cat", "cat", &["l"]))]);
        let updated = original.with_resource(Arc::new(resolved("file:///b.cat", "cat", &["l"])));
        assert_eq!(original.len(), 1);
        assert_eq!(updated.len(), 2);
    }
}
