//! Binding of layer descriptors to live visual layers on a map surface.
//!
//! The [`LayerManager`] consumes diffs from a
//! [`ResourceManager`](crate::resource::ResourceManager), keeps a
//! user-orderable z-order of every known layer, builds on-map layers lazily
//! through provider-supplied [`LayerAdapter`]s and dispatches clicks back to
//! them. Rendering is delegated to a [`MapSurface`].

mod adapter;
mod build;
mod error;
mod events;
mod manager;
mod on_map;
mod surface;
mod zorder;

pub use adapter::{ElementSpec, ElementStream, Geometry, LayerAdapter, PrimitiveKind};
pub use error::LayerBuildError;
pub use events::{LayerClick, LayerEvent};
pub use manager::LayerManager;
pub use on_map::LayerState;
pub use surface::{MapSurface, PrimitiveHandle};
