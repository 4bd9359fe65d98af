//! The resource manager: authoritative snapshot, refresh cycles and diff
//! publication.
//!
//! The manager is owned by a single coordinating task and mutated only
//! through `&mut self`. Discovery, import and refresh run on the tokio
//! runtime it was given; their results come back over a channel and are
//! applied when the owner calls [`ResourceManager::pump`],
//! [`ResourceManager::pump_next`] or [`ResourceManager::run_until_idle`].
//! That hand-off is the only place the snapshot changes and listeners are
//! notified.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::cycle::{import_one, run_cycle, CycleJob, CycleOutcome, CycleReport};
use super::{
    DiffIssuer, DiffRecord, ImportError, ManagerId, ProviderRegistry, Repository, Resource,
    ResourceSnapshot, ResourceUri,
};
use crate::config::{ConcurrentRefresh, ResourceConfig};

/// Result of a [`ResourceManager::refresh_available`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new cycle was scheduled.
    Started,
    /// A cycle is running; one more will run after it publishes.
    Coalesced,
    /// A cycle is running and the request was ignored.
    Dropped,
}

/// Identifier of a diff subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A registered diff listener.
///
/// Records arrive on `receiver` in publication order. Dropping the
/// receiver is equivalent to unsubscribing; the manager prunes closed
/// listeners on the next publication.
#[derive(Debug)]
pub struct DiffSubscription {
    pub id: ListenerId,
    pub receiver: mpsc::UnboundedReceiver<Arc<DiffRecord>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleState {
    Idle,
    Running { rerun: bool },
}

enum Completion {
    Cycle {
        base: Arc<ResourceSnapshot>,
        outcome: CycleOutcome,
    },
    Import {
        uri: ResourceUri,
        result: Result<Arc<Resource>, ImportError>,
    },
}

struct Listener {
    id: ListenerId,
    sender: mpsc::UnboundedSender<Arc<DiffRecord>>,
}

/// Discovers, imports and refreshes resources and publishes diffs.
pub struct ResourceManager {
    issuer: DiffIssuer,
    runtime: Handle,
    providers: Arc<ProviderRegistry>,
    repositories: Vec<Arc<dyn Repository>>,
    config: ResourceConfig,
    snapshot: Arc<ResourceSnapshot>,
    state: CycleState,
    listeners: Vec<Listener>,
    next_listener: u64,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    in_flight: usize,
    last_report: Option<CycleReport>,
}

impl ResourceManager {
    /// Create a manager with an empty snapshot and no repositories.
    ///
    /// Background work is spawned on `runtime`.
    pub fn new(runtime: Handle, providers: Arc<ProviderRegistry>) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let issuer = DiffIssuer::new();
        debug!(manager = %issuer.id(), providers = providers.len(), "Resource manager created");
        Self {
            issuer,
            runtime,
            providers,
            repositories: Vec::new(),
            config: ResourceConfig::default(),
            snapshot: Arc::new(ResourceSnapshot::default()),
            state: CycleState::Idle,
            listeners: Vec::new(),
            next_listener: 0,
            completion_tx,
            completion_rx,
            in_flight: 0,
            last_report: None,
        }
    }

    /// Add a repository queried during discovery.
    pub fn with_repository(mut self, repository: Arc<dyn Repository>) -> Self {
        self.repositories.push(repository);
        self
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: ResourceConfig) -> Self {
        self.config = config;
        self
    }

    /// Identity carried by every diff this manager publishes.
    pub fn id(&self) -> ManagerId {
        self.issuer.id()
    }

    /// Provider registry shared with the layer manager.
    pub fn providers(&self) -> &Arc<ProviderRegistry> {
        &self.providers
    }

    /// Trigger one discovery → import → refresh cycle.
    ///
    /// At most one cycle runs at a time. While one is running the request
    /// is coalesced into a single follow-up cycle or dropped, depending on
    /// [`ResourceConfig::concurrent_refresh`].
    pub fn refresh_available(&mut self) -> RefreshOutcome {
        match self.state {
            CycleState::Idle => {
                self.start_cycle();
                RefreshOutcome::Started
            }
            CycleState::Running { .. } => match self.config.concurrent_refresh() {
                ConcurrentRefresh::Coalesce => {
                    self.state = CycleState::Running { rerun: true };
                    debug!(manager = %self.id(), "Refresh requested mid-cycle, coalescing");
                    RefreshOutcome::Coalesced
                }
                ConcurrentRefresh::Drop => {
                    debug!(manager = %self.id(), "Refresh requested mid-cycle, dropping");
                    RefreshOutcome::Dropped
                }
            },
        }
    }

    /// Import one resource outside the full cycle.
    ///
    /// On success the next hand-off publishes a one-resource diff. On
    /// failure the error is logged and recorded in
    /// [`ResourceManager::last_report`]; any existing entry for the
    /// location is left as it was.
    ///
    /// An imported resource lives only until the next full cycle that no
    /// repository reports it in.
    pub fn try_import(&mut self, uri: ResourceUri) {
        debug!(manager = %self.id(), uri = %uri, "Single import requested");
        let providers = Arc::clone(&self.providers);
        let stamp = self.config.stamp_imports();
        let tx = self.completion_tx.clone();
        self.in_flight += 1;
        self.runtime.spawn(async move {
            let result = import_one(providers, Resource::discovered(uri.clone()), stamp).await;
            let _ = tx.send(Completion::Import { uri, result });
        });
    }

    /// The last published snapshot.
    pub fn current_snapshot(&self) -> Arc<ResourceSnapshot> {
        Arc::clone(&self.snapshot)
    }

    /// Register a diff listener.
    pub fn subscribe(&mut self) -> DiffSubscription {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        let (sender, receiver) = mpsc::unbounded_channel();
        self.listeners.push(Listener { id, sender });
        DiffSubscription { id, receiver }
    }

    /// Remove a diff listener. Returns false if it was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Whether a full cycle is running.
    pub fn is_refreshing(&self) -> bool {
        matches!(self.state, CycleState::Running { .. })
    }

    /// Whether any cycle or single import is still in flight.
    pub fn is_idle(&self) -> bool {
        self.in_flight == 0
    }

    /// Report of the most recently applied cycle or single import.
    pub fn last_report(&self) -> Option<&CycleReport> {
        self.last_report.as_ref()
    }

    /// Apply every completion that is already available without waiting.
    ///
    /// Returns the number applied.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completion_rx.try_recv() {
            self.apply(completion);
            applied += 1;
        }
        applied
    }

    /// Wait for the next completion and apply it.
    ///
    /// Returns false immediately when nothing is in flight.
    pub async fn pump_next(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        match self.completion_rx.recv().await {
            Some(completion) => {
                self.apply(completion);
                true
            }
            None => false,
        }
    }

    /// Apply completions until no cycle or import is in flight, including
    /// any coalesced follow-up cycle.
    pub async fn run_until_idle(&mut self) {
        while self.pump_next().await {}
    }

    fn start_cycle(&mut self) {
        let base = Arc::clone(&self.snapshot);
        let job = CycleJob {
            repositories: self.repositories.clone(),
            providers: Arc::clone(&self.providers),
            prior: Arc::clone(&base),
            stamp_imports: self.config.stamp_imports(),
        };
        info!(
            manager = %self.id(),
            repositories = self.repositories.len(),
            known = base.len(),
            "Refresh cycle started"
        );

        self.state = CycleState::Running { rerun: false };
        self.in_flight += 1;
        let tx = self.completion_tx.clone();
        self.runtime.spawn(async move {
            let outcome = run_cycle(job).await;
            let _ = tx.send(Completion::Cycle { base, outcome });
        });
    }

    fn apply(&mut self, completion: Completion) {
        self.in_flight = self.in_flight.saturating_sub(1);
        match completion {
            Completion::Cycle { base, outcome } => self.apply_cycle(&base, outcome),
            Completion::Import { uri, result } => self.apply_import(uri, result),
        }
    }

    /// Swap in the cycle's resource set and publish.
    ///
    /// Single imports that landed while the cycle ran are newer than
    /// anything the cycle saw and are carried over.
    fn apply_cycle(&mut self, base: &ResourceSnapshot, outcome: CycleOutcome) {
        let CycleOutcome { incoming, report } = outcome;
        let landed_mid_cycle = self.snapshot.iter().filter(|current| {
            !matches!(base.get(current.uri()), Some(seen) if Arc::ptr_eq(seen, current))
        });
        let merged: Vec<Arc<Resource>> = incoming
            .into_iter()
            .chain(landed_mid_cycle.cloned())
            .collect();
        // Later entries win, so mid-cycle imports override the cycle's view.
        let next = Arc::new(ResourceSnapshot::from_resources(merged));

        self.last_report = Some(report);
        self.publish(next);

        let rerun = matches!(self.state, CycleState::Running { rerun: true });
        self.state = CycleState::Idle;
        if rerun {
            debug!(manager = %self.id(), "Starting coalesced refresh cycle");
            self.start_cycle();
        }
    }

    fn apply_import(&mut self, uri: ResourceUri, result: Result<Arc<Resource>, ImportError>) {
        let mut report = CycleReport::begin();
        report.discovered = 1;
        match result {
            Ok(resource) => {
                report.imported = 1;
                let next = Arc::new(self.snapshot.with_resource(resource));
                self.last_report = Some(report.finish());
                self.publish(next);
            }
            Err(e) => {
                warn!(manager = %self.id(), uri = %uri, error = %e, "Single import failed");
                report.failures.push(e);
                self.last_report = Some(report.finish());
            }
        }
    }

    /// Replace the snapshot and notify listeners in registration order.
    fn publish(&mut self, next: Arc<ResourceSnapshot>) {
        let diff = Arc::new(DiffRecord::between(&self.issuer, &self.snapshot, Arc::clone(&next)));
        self.snapshot = next;
        info!(
            manager = %self.id(),
            added = diff.added_count(),
            updated = diff.updated_count(),
            removed = diff.removed_count(),
            total = self.snapshot.len(),
            "Publishing diff"
        );

        self.listeners.retain(|listener| {
            let delivered = listener.sender.send(Arc::clone(&diff)).is_ok();
            if !delivered {
                debug!(listener = listener.id.0, "Pruning closed diff listener");
            }
            delivered
        });
    }
}
