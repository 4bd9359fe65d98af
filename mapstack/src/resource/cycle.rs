//! Background discovery, import and refresh phases.
//!
//! Everything here runs off the owning thread. Provider and repository
//! calls may block, so each one is moved onto the blocking pool with
//! `spawn_blocking`; calls within a phase run concurrently, and phases run
//! strictly one after another. The result is handed back to the manager as
//! a [`CycleOutcome`] which is applied on the owner.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tokio::task::spawn_blocking;
use tracing::{debug, error, info, warn};

use super::{
    ImportError, Provider, ProviderRegistry, ProviderType, Repository, Resource,
    ResourceSnapshot, ResourceUri,
};

/// Summary of one completed cycle or single import.
#[derive(Debug)]
pub struct CycleReport {
    /// Distinct resources reported by repositories.
    pub discovered: usize,
    /// Resources successfully imported in this cycle.
    pub imported: usize,
    /// Previously known resources kept after refresh.
    pub refreshed: usize,
    /// Per-resource import failures.
    pub failures: Vec<ImportError>,
    /// When the cycle started.
    pub started_at: DateTime<Utc>,
    /// When the cycle finished.
    pub finished_at: DateTime<Utc>,
}

impl CycleReport {
    pub(super) fn begin() -> Self {
        let now = Utc::now();
        Self {
            discovered: 0,
            imported: 0,
            refreshed: 0,
            failures: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    pub(super) fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    /// True when no resource failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Everything the background cycle needs, captured on the owner.
pub(super) struct CycleJob {
    pub repositories: Vec<Arc<dyn Repository>>,
    pub providers: Arc<ProviderRegistry>,
    pub prior: Arc<ResourceSnapshot>,
    pub stamp_imports: bool,
}

/// Result of a full cycle: the complete incoming resource set.
pub(super) struct CycleOutcome {
    pub incoming: Vec<Arc<Resource>>,
    pub report: CycleReport,
}

/// Run discover → import → refresh and return the merged incoming set.
pub(super) async fn run_cycle(job: CycleJob) -> CycleOutcome {
    let started = Instant::now();
    let mut report = CycleReport::begin();

    let discovered = discover(&job.repositories).await;
    report.discovered = discovered.len();
    let reported: HashSet<ResourceUri> = discovered.iter().map(|r| r.uri().clone()).collect();

    let candidates: Vec<Resource> = discovered
        .into_iter()
        .filter(|r| !job.prior.contains(r.uri()))
        .collect();
    debug!(
        discovered = report.discovered,
        new = candidates.len(),
        "Discovery finished"
    );

    let imported = import_all(&job.providers, candidates, job.stamp_imports).await;
    let refreshed = refresh_existing(&job.providers, &job.prior, &reported).await;
    report.refreshed = refreshed.len();

    let mut incoming: HashMap<ResourceUri, Arc<Resource>> = refreshed
        .into_iter()
        .map(|r| (r.uri().clone(), r))
        .collect();
    for result in imported {
        match result {
            Ok(resource) => {
                report.imported += 1;
                incoming.insert(resource.uri().clone(), resource);
            }
            Err(e) => {
                warn!(uri = %e.uri(), error = %e, "Resource import failed");
                report.failures.push(e);
            }
        }
    }

    report.finished_at = Utc::now();
    info!(
        discovered = report.discovered,
        imported = report.imported,
        refreshed = report.refreshed,
        failed = report.failures.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Refresh cycle finished"
    );

    CycleOutcome {
        incoming: incoming.into_values().collect(),
        report,
    }
}

/// Import a single resource: pick the first capable provider and resolve
/// on a worker.
pub(super) async fn import_one(
    providers: Arc<ProviderRegistry>,
    resource: Resource,
    stamp: bool,
) -> Result<Arc<Resource>, ImportError> {
    let uri = resource.uri().clone();
    let Some(provider) = providers.find_capable(&resource).cloned() else {
        return Err(ImportError::NoCapableProvider { uri });
    };
    let provider_type = provider.provider_type().clone();
    let repository = resource.repository().cloned();

    let resolved = match spawn_blocking(move || import_with(&*provider, &resource)).await {
        Ok(Ok(resolved)) => resolved,
        Ok(Err(e)) => return Err(e),
        Err(_) => {
            return Err(ImportError::ProviderPanicked {
                uri,
                provider: provider_type,
            })
        }
    };

    let mut resolved = match repository {
        Some(id) if resolved.repository().is_none() => resolved.with_repository(id),
        _ => resolved,
    };
    if stamp {
        resolved = resolved.with_refreshed_at(Utc::now());
    }
    debug!(
        uri = %uri,
        provider = %provider_type,
        layers = resolved.layers().len(),
        "Resource imported"
    );
    Ok(Arc::new(resolved))
}

/// Query every repository and union the results by location.
///
/// The first repository to report a location wins.
async fn discover(repositories: &[Arc<dyn Repository>]) -> Vec<Resource> {
    let tasks = repositories.iter().map(|repo| {
        let repo = Arc::clone(repo);
        async move {
            let id = repo.id().clone();
            let result = spawn_blocking(move || {
                let owner = repo.id().clone();
                repo.enumerate()
                    .into_iter()
                    .map(|r| {
                        if r.repository().is_some() {
                            r
                        } else {
                            r.with_repository(owner.clone())
                        }
                    })
                    .collect::<Vec<_>>()
            })
            .await;
            match result {
                Ok(resources) => {
                    debug!(repository = %id, count = resources.len(), "Repository enumerated");
                    resources
                }
                Err(e) => {
                    error!(repository = %id, error = %e, "Repository enumeration panicked");
                    Vec::new()
                }
            }
        }
    });

    let mut seen = HashSet::new();
    join_all(tasks)
        .await
        .into_iter()
        .flatten()
        .filter(|r| seen.insert(r.uri().clone()))
        .collect()
}

/// Import every candidate concurrently; one result per candidate, in order.
async fn import_all(
    providers: &Arc<ProviderRegistry>,
    candidates: Vec<Resource>,
    stamp: bool,
) -> Vec<Result<Arc<Resource>, ImportError>> {
    join_all(
        candidates
            .into_iter()
            .map(|resource| import_one(Arc::clone(providers), resource, stamp)),
    )
    .await
}

/// Readability check followed by the provider's resolve, on a worker.
fn import_with(provider: &dyn Provider, resource: &Resource) -> Result<Resource, ImportError> {
    let uri = resource.uri();
    if let Some(path) = uri.to_file_path() {
        check_readable(&path).map_err(|source| ImportError::Unreadable {
            uri: uri.clone(),
            path: path.clone(),
            source,
        })?;
    }

    let resolved = provider.resolve(resource)?;
    if resolved.uri() != uri {
        return Err(ImportError::resolve_failed(
            uri,
            provider.provider_type(),
            format!("provider returned a different location {}", resolved.uri()),
        ));
    }
    resolved
        .check_resolved()
        .map_err(|reason| ImportError::resolve_failed(uri, provider.provider_type(), reason))?;
    Ok(resolved)
}

/// Fail fast if local backing storage cannot be read.
fn check_readable(path: &Path) -> io::Result<()> {
    let metadata = fs::metadata(path)?;
    if metadata.is_dir() {
        fs::read_dir(path).map(|_| ())
    } else {
        fs::File::open(path).map(|_| ())
    }
}

/// Ask each provider to refresh the resolved resources it owns.
///
/// Only resources some repository reported this cycle are refreshed; the
/// rest are dropped from the incoming set. A group whose provider is no longer registered is dropped. A group
/// whose provider panics is kept as-is, since a crash says nothing about
/// whether the resources still exist.
async fn refresh_existing(
    providers: &Arc<ProviderRegistry>,
    prior: &ResourceSnapshot,
    reported: &HashSet<ResourceUri>,
) -> Vec<Arc<Resource>> {
    let mut groups: BTreeMap<ProviderType, Vec<Arc<Resource>>> = BTreeMap::new();
    for resource in prior.iter() {
        if !reported.contains(resource.uri()) {
            debug!(uri = %resource.uri(), "No longer reported, dropping");
            continue;
        }
        match resource.resolved() {
            Some(payload) => groups
                .entry(payload.provider_type().clone())
                .or_default()
                .push(Arc::clone(resource)),
            None => debug!(uri = %resource.uri(), "Skipping unresolved resource during refresh"),
        }
    }

    let tasks = groups.into_iter().map(|(provider_type, group)| {
        let provider = providers.get(&provider_type).cloned();
        async move {
            let Some(provider) = provider else {
                warn!(
                    provider = %provider_type,
                    dropped = group.len(),
                    "No provider registered for known resources"
                );
                return Vec::new();
            };
            let requested: HashSet<ResourceUri> =
                group.iter().map(|r| r.uri().clone()).collect();
            let fallback = group.clone();

            match spawn_blocking(move || provider.refresh_batch(group)).await {
                Ok(refreshed) => refreshed
                    .into_iter()
                    .filter(|r| {
                        let known = requested.contains(r.uri());
                        if !known {
                            warn!(uri = %r.uri(), provider = %provider_type, "Refresh returned an unknown resource, ignoring");
                        }
                        known
                    })
                    .filter(|r| match r.check_resolved() {
                        Ok(()) => true,
                        Err(reason) => {
                            warn!(uri = %r.uri(), provider = %provider_type, %reason, "Refresh returned an invalid resource, dropping");
                            false
                        }
                    })
                    .collect(),
                Err(e) => {
                    error!(provider = %provider_type, error = %e, "Provider refresh panicked, keeping previous state");
                    fallback
                }
            }
        }
    });

    join_all(tasks).await.into_iter().flatten().collect()
}
