//! Diff records published by the resource manager.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{Resource, ResourceSnapshot, ResourceUri};

static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a resource manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ManagerId(u64);

impl fmt::Display for ManagerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource-manager-{}", self.0)
    }
}

/// Capability held by exactly one resource manager.
///
/// Only code in the resource module can create an issuer, and a
/// [`DiffRecord`] can only be built from one, so listeners can trust the
/// `issuer()` of every record they receive.
#[derive(Debug)]
pub struct DiffIssuer {
    id: ManagerId,
}

impl DiffIssuer {
    pub(super) fn new() -> Self {
        Self {
            id: ManagerId(NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed)),
        }
    }

    pub fn id(&self) -> ManagerId {
        self.id
    }
}

/// Added / updated / removed partition between two snapshots.
///
/// The three sets are disjoint and keyed by location. The record also
/// carries the snapshot it leads to, which is the complete current view
/// (added, updated and unchanged resources).
#[derive(Debug, Clone)]
pub struct DiffRecord {
    issuer: ManagerId,
    added: BTreeMap<ResourceUri, Arc<Resource>>,
    updated: BTreeMap<ResourceUri, Arc<Resource>>,
    removed: BTreeMap<ResourceUri, Arc<Resource>>,
    snapshot: Arc<ResourceSnapshot>,
}

impl DiffRecord {
    /// Compute the diff from `prior` to `next`.
    ///
    /// A resource present in both is updated only when the instances
    /// differ; providers signal "unchanged" by returning the same `Arc`.
    pub(super) fn between(
        issuer: &DiffIssuer,
        prior: &ResourceSnapshot,
        next: Arc<ResourceSnapshot>,
    ) -> Self {
        let mut added = BTreeMap::new();
        let mut updated = BTreeMap::new();
        for resource in next.iter() {
            match prior.get(resource.uri()) {
                None => {
                    added.insert(resource.uri().clone(), Arc::clone(resource));
                }
                Some(old) if !Arc::ptr_eq(old, resource) => {
                    updated.insert(resource.uri().clone(), Arc::clone(resource));
                }
                Some(_) => {}
            }
        }
        let removed = prior
            .iter()
            .filter(|r| !next.contains(r.uri()))
            .map(|r| (r.uri().clone(), Arc::clone(r)))
            .collect();

        Self {
            issuer: issuer.id(),
            added,
            updated,
            removed,
            snapshot: next,
        }
    }

    /// Manager that issued this record.
    pub fn issuer(&self) -> ManagerId {
        self.issuer
    }

    pub fn added(&self) -> impl Iterator<Item = &Arc<Resource>> {
        self.added.values()
    }

    pub fn updated(&self) -> impl Iterator<Item = &Arc<Resource>> {
        self.updated.values()
    }

    pub fn removed(&self) -> impl Iterator<Item = &Arc<Resource>> {
        self.removed.values()
    }

    pub fn added_count(&self) -> usize {
        self.added.len()
    }

    pub fn updated_count(&self) -> usize {
        self.updated.len()
    }

    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    pub fn is_added(&self, uri: &ResourceUri) -> bool {
        self.added.contains_key(uri)
    }

    pub fn is_updated(&self, uri: &ResourceUri) -> bool {
        self.updated.contains_key(uri)
    }

    pub fn is_removed(&self, uri: &ResourceUri) -> bool {
        self.removed.contains_key(uri)
    }

    /// True when nothing changed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    /// Snapshot after applying this diff.
    pub fn snapshot(&self) -> &Arc<ResourceSnapshot> {
        &self.snapshot
    }
}
