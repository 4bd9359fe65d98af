//! Resource discovery, import, refresh and diff publication.
//!
//! A [`Resource`] is a data source identified by its [`ResourceUri`].
//! [`Repository`] implementations report candidate resources,
//! [`Provider`] implementations resolve them into [`LayerDescriptor`]s, and
//! the [`ResourceManager`] ties the two together into single-flight refresh
//! cycles whose results are published as [`DiffRecord`]s.

mod cycle;
mod diff;
mod error;
mod manager;
mod registry;
mod snapshot;
mod traits;
mod types;
mod uri;

pub use cycle::CycleReport;
pub use diff::{DiffIssuer, DiffRecord, ManagerId};
pub use error::{ImportError, ResourceError};
pub use manager::{DiffSubscription, ListenerId, RefreshOutcome, ResourceManager};
pub use registry::ProviderRegistry;
pub use snapshot::ResourceSnapshot;
pub use traits::{Provider, Repository};
pub use types::{
    default_layer_order, LayerDescriptor, LayerKey, ProviderType, RepositoryId, ResolvedPayload,
    Resource,
};
pub use uri::ResourceUri;
