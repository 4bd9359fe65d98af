//! Background layer builds.
//!
//! A build asks the provider for an adapter, drains the adapter's element
//! stream on a blocking worker and hands batches back to the owner of the
//! layer manager over a channel. Every build ends with exactly one terminal
//! event (`Finished`, `Failed` or `Cancelled`), even when the worker panics.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::spawn_blocking;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::geo::GeoBounds;
use crate::resource::{LayerDescriptor, Provider};

use super::{ElementSpec, LayerAdapter, LayerBuildError};

/// Identifier of one build attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct BuildId(u64);

impl BuildId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "build-{}", self.0)
    }
}

pub(crate) enum BuildEvent {
    Started {
        build: BuildId,
        adapter: Box<dyn LayerAdapter>,
    },
    Elements {
        build: BuildId,
        elements: Vec<ElementSpec>,
    },
    Finished {
        build: BuildId,
    },
    Failed {
        build: BuildId,
        error: LayerBuildError,
    },
    Cancelled {
        build: BuildId,
    },
}

impl BuildEvent {
    pub fn build(&self) -> BuildId {
        match self {
            Self::Started { build, .. }
            | Self::Elements { build, .. }
            | Self::Finished { build }
            | Self::Failed { build, .. }
            | Self::Cancelled { build } => *build,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Finished { .. } | Self::Failed { .. } | Self::Cancelled { .. }
        )
    }
}

/// Everything a build needs, captured on the owner.
pub(crate) struct BuildRequest {
    pub build: BuildId,
    pub descriptor: Arc<LayerDescriptor>,
    pub provider: Option<Arc<dyn Provider>>,
    pub bounds: GeoBounds,
    pub batch_size: usize,
    pub cancel: CancellationToken,
    pub events: UnboundedSender<BuildEvent>,
}

/// Run one build to completion on the blocking pool.
pub(crate) async fn run_build(request: BuildRequest) {
    let build = request.build;
    let layer = request.descriptor.key();
    let events = request.events.clone();

    if spawn_blocking(move || build_blocking(request)).await.is_err() {
        debug!(build = %build, layer = %layer, "Layer build panicked");
        let _ = events.send(BuildEvent::Failed {
            build,
            error: LayerBuildError::BuildPanicked { layer },
        });
    }
}

fn build_blocking(request: BuildRequest) {
    let BuildRequest {
        build,
        descriptor,
        provider,
        bounds,
        batch_size,
        cancel,
        events,
    } = request;
    let send = |event: BuildEvent| events.send(event).is_ok();

    if cancel.is_cancelled() {
        send(BuildEvent::Cancelled { build });
        return;
    }

    let Some(provider) = provider else {
        send(BuildEvent::Failed {
            build,
            error: LayerBuildError::UnknownProvider {
                layer: descriptor.key(),
                provider: descriptor.provider_type().clone(),
            },
        });
        return;
    };

    let mut adapter = match provider.build_layer_adapter(&descriptor) {
        Ok(adapter) => adapter,
        Err(error) => {
            send(BuildEvent::Failed { build, error });
            return;
        }
    };
    let elements = adapter.elements_in_bounds(bounds);

    if cancel.is_cancelled() {
        adapter.dispose();
        send(BuildEvent::Cancelled { build });
        return;
    }
    if let Err(rejected) = events.send(BuildEvent::Started { build, adapter }) {
        if let BuildEvent::Started { mut adapter, .. } = rejected.0 {
            adapter.dispose();
        }
        return;
    }

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;
    for spec in elements {
        if cancel.is_cancelled() {
            send(BuildEvent::Cancelled { build });
            return;
        }
        batch.push(spec);
        if batch.len() >= batch_size {
            total += batch.len();
            let elements = std::mem::replace(&mut batch, Vec::with_capacity(batch_size));
            if !send(BuildEvent::Elements { build, elements }) {
                return;
            }
        }
    }
    if !batch.is_empty() {
        total += batch.len();
        if !send(BuildEvent::Elements {
            build,
            elements: batch,
        }) {
            return;
        }
    }

    trace!(build = %build, layer = %descriptor.key(), elements = total, "Element stream drained");
    send(BuildEvent::Finished { build });
}
