//! Ordered provider registry keyed by provider type.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::warn;

use super::{Provider, ProviderType, Resource};

/// Providers in their configured order, indexed by provider type.
///
/// Import asks providers in registration order and the first one that
/// accepts a resource wins. Refresh and adapter construction look a
/// provider up by the tag recorded on the resource or layer.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn Provider>>,
    by_type: HashMap<ProviderType, usize>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style registration.
    pub fn with_provider(mut self, provider: Arc<dyn Provider>) -> Self {
        self.register(provider);
        self
    }

    /// Register a provider at the end of the order.
    ///
    /// Returns false, leaving the registry unchanged, when a provider with
    /// the same type is already registered.
    pub fn register(&mut self, provider: Arc<dyn Provider>) -> bool {
        let provider_type = provider.provider_type().clone();
        if self.by_type.contains_key(&provider_type) {
            warn!(provider = %provider_type, "Provider type already registered, ignoring");
            return false;
        }
        self.by_type.insert(provider_type, self.providers.len());
        self.providers.push(provider);
        true
    }

    /// Look up a provider by type.
    pub fn get(&self, provider_type: &ProviderType) -> Option<&Arc<dyn Provider>> {
        self.by_type.get(provider_type).map(|&i| &self.providers[i])
    }

    /// First provider, in registration order, that can handle the resource.
    pub fn find_capable(&self, resource: &Resource) -> Option<&Arc<dyn Provider>> {
        self.providers.iter().find(|p| p.can_handle(resource))
    }

    /// Providers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.providers.iter()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.provider_type()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceUri;
    use crate::testing::MockProvider;

    fn resource(s: &str) -> Resource {
        Resource::discovered(ResourceUri::parse(s).unwrap())
    }

    #[test]
    fn test_first_capable_provider_wins() {
        let generic = Arc::new(MockProvider::new("generic", "cat"));
        let specific = Arc::new(MockProvider::new("cat", "cat"));
        let registry = ProviderRegistry::new()
            .with_provider(generic)
            .with_provider(specific);

        let chosen = registry.find_capable(&resource("file:///a.cat")).unwrap();
        assert_eq!(chosen.provider_type().as_str(), "generic");
        assert!(registry.find_capable(&resource("file:///a.dog")).is_none());
    }

    #[test]
    fn test_lookup_by_type() {
        let registry = ProviderRegistry::new()
            .with_provider(Arc::new(MockProvider::new("cat", "cat")))
            .with_provider(Arc::new(MockProvider::new("dog", "dog")));

        assert_eq!(registry.len(), 2);
        assert!(registry.get(&ProviderType::from_static("dog")).is_some());
        assert!(registry.get(&ProviderType::from_static("bird")).is_none());
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let mut registry = ProviderRegistry::new();
        assert!(registry.register(Arc::new(MockProvider::new("cat", "cat"))));
        assert!(!registry.register(Arc::new(MockProvider::new("cat", "kitten"))));
        assert_eq!(registry.len(), 1);
    }
}
