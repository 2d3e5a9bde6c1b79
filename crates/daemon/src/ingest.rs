// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ingest pipeline for one payload kind
//!
//! Decoded batches are routed into per-source stores and, independently,
//! every event that carries a payload is re-encoded and offered to the
//! kind's fan-out dispatcher.

use std::path::Path;
use std::sync::Arc;

use evl_adapters::{FanoutConfig, FanoutDispatcher};
use evl_core::{Encoder, EventWrapper, JsonCodec, MemoryRegistry, SourceIdentifier};
use evl_engine::{IndexWatcher, RouteReport, RouterStore, SourceRouter};
use evl_storage::{FileLayout, StoreOptions};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::config::{EventKind, ForwardConfig};

/// Event payloads the daemon can ingest
pub trait Payload: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T: Serialize + DeserializeOwned + Send + Sync + 'static> Payload for T {}

pub type IngestCodec<T> = JsonCodec<EventWrapper<T>>;
pub type IngestRegistry<T> = Arc<MemoryRegistry<RouterStore<T, IngestCodec<T>>>>;
pub type IngestRouter<T> = SourceRouter<T, IngestCodec<T>, IngestRegistry<T>>;

pub struct Ingest<T> {
    kind: EventKind,
    router: Arc<IngestRouter<T>>,
    registry: IngestRegistry<T>,
    codec: Arc<IngestCodec<T>>,
    fanout: FanoutDispatcher,
}

impl<T: Payload> Ingest<T> {
    pub fn new(
        kind: EventKind,
        root: &Path,
        options: StoreOptions,
        watcher: Arc<IndexWatcher>,
        fanout: FanoutConfig,
    ) -> Self {
        let codec = Arc::new(IngestCodec::new());
        let registry: IngestRegistry<T> = Arc::new(MemoryRegistry::new());
        let router = SourceRouter::new(
            FileLayout::new(root),
            options,
            Arc::clone(&codec),
            Arc::clone(&registry),
        )
        .with_watcher(watcher);

        Self {
            kind,
            router: Arc::new(router),
            registry,
            codec,
            fanout: FanoutDispatcher::new(fanout),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Register forwarding destinations and start the dispatcher
    pub fn start_up<'a>(&self, forwards: impl IntoIterator<Item = &'a ForwardConfig>) {
        for forward in forwards {
            if !self.fanout.add_destination(forward.sender_config()) {
                warn!(kind = %self.kind, target = %forward.target, "forward not added");
            }
        }
        self.fanout.start_up();
    }

    /// Decode one inbound frame: a JSON array of wrappers
    pub fn decode_batch(&self, payload: &[u8]) -> Result<Vec<EventWrapper<T>>, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// Route a batch into the stores, then forward its payload-carrying events
    pub async fn ingest(&self, batch: Vec<EventWrapper<T>>) -> RouteReport {
        let forwarded: Vec<Vec<u8>> = if self.fanout.destinations().is_empty() {
            Vec::new()
        } else {
            batch
                .iter()
                .filter(|event| event.identifier.is_some() && !event.is_end_of_stream())
                .filter_map(|event| self.codec.encode(event))
                .collect()
        };

        let router = Arc::clone(&self.router);
        let report = match tokio::task::spawn_blocking(move || router.route(batch)).await {
            Ok(report) => report,
            Err(e) => {
                error!(kind = %self.kind, error = %e, "route task failed");
                RouteReport::default()
            }
        };
        for e in &report.errors {
            warn!(kind = %self.kind, source = %e.source_id(), error = %e, "route failed");
        }

        for bytes in forwarded {
            if let Err(e) = self.fanout.send(bytes).await {
                debug!(kind = %self.kind, error = %e, "forwarding stopped");
                break;
            }
        }
        report
    }

    pub fn router(&self) -> &IngestRouter<T> {
        &self.router
    }

    pub fn registry(&self) -> &MemoryRegistry<RouterStore<T, IngestCodec<T>>> {
        &self.registry
    }

    pub fn fanout(&self) -> &FanoutDispatcher {
        &self.fanout
    }

    pub fn active_sources(&self) -> Vec<SourceIdentifier> {
        self.router.active_sources()
    }

    /// Stop forwarding and dispose every open store; files are kept.
    /// Returns the number of stores closed.
    pub async fn shut_down(&self) -> usize {
        self.fanout.shut_down().await;
        self.router.close_all()
    }
}

#[cfg(test)]
#[path = "ingest_tests.rs"]
mod tests;
