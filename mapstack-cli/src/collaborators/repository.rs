//! Repository listing manifest files in one directory.

use std::fs;
use std::path::PathBuf;

use mapstack::resource::{Repository, RepositoryId, Resource, ResourceUri};
use tracing::{debug, warn};

use super::provider::MANIFEST_EXTENSION;

/// Reports every `*.layers` file directly inside a directory.
pub struct DirectoryRepository {
    id: RepositoryId,
    root: PathBuf,
}

impl DirectoryRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            id: RepositoryId::new(format!("dir:{}", root.display())),
            root,
        }
    }
}

impl Repository for DirectoryRepository {
    fn id(&self) -> &RepositoryId {
        &self.id
    }

    fn enumerate(&self) -> Vec<Resource> {
        let root = match fs::canonicalize(&self.root) {
            Ok(root) => root,
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "Cannot open manifest directory");
                return Vec::new();
            }
        };
        let entries = match fs::read_dir(&root) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(root = %root.display(), error = %e, "Cannot list manifest directory");
                return Vec::new();
            }
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|e| e.to_str()) == Some(MANIFEST_EXTENSION)
            })
            .collect();
        paths.sort();

        let resources: Vec<Resource> = paths
            .iter()
            .filter_map(|path| match ResourceUri::from_file_path(path) {
                Ok(uri) => Some(Resource::discovered(uri).with_repository(self.id.clone())),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping manifest");
                    None
                }
            })
            .collect();
        debug!(root = %root.display(), found = resources.len(), "Manifest directory scanned");
        resources
    }
}
