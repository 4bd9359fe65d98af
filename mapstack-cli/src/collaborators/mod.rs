//! Filesystem-backed collaborators for the engine.
//!
//! - [`DirectoryRepository`] lists `*.layers` manifests in a directory
//! - [`ManifestProvider`] imports manifests and builds their adapters
//! - [`ConsoleSurface`] stands in for a map display

mod manifest;
mod provider;
mod repository;
mod surface;

pub use manifest::parse_lat_lon;
pub use provider::ManifestProvider;
pub use repository::DirectoryRepository;
pub use surface::ConsoleSurface;
