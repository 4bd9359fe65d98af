//! mapstack - map data lifecycle and layer binding engine.
//!
//! The [`resource`] module discovers candidate data sources through
//! [`Repository`](resource::Repository) implementations, imports them with
//! [`Provider`](resource::Provider)s and publishes the differences between
//! successive snapshots. The [`layer`] module consumes those differences and
//! keeps a user-orderable stack of live visual layers bound to a
//! [`MapSurface`](layer::MapSurface).
//!
//! ```ignore
//! use std::sync::Arc;
//! use mapstack::config::LayerConfig;
//! use mapstack::layer::LayerManager;
//! use mapstack::resource::{ProviderRegistry, ResourceManager};
//!
//! let providers = Arc::new(ProviderRegistry::new().with_provider(my_provider));
//! let mut resources = ResourceManager::new(handle.clone(), Arc::clone(&providers))
//!     .with_repository(my_repository);
//! let mut layers = LayerManager::new(&mut resources, providers, surface, handle, LayerConfig::default());
//!
//! resources.refresh_available();
//! resources.run_until_idle().await;
//! layers.pump();
//! ```

pub mod config;
pub mod geo;
pub mod layer;
pub mod logging;
pub mod resource;

#[cfg(test)]
pub(crate) mod testing;

/// Version of the mapstack library and CLI.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
