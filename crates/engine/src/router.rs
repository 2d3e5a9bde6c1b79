// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-source routing and store lifecycle
//!
//! A batch is partitioned by source, keeping each source's relative order.
//! Each source's events go to its own store, created on first use. A
//! source whose events end with an end-of-stream sentinel is retired: the
//! registry is told, the store is disposed and its files are deleted.

use crate::error::RouterError;
use crate::watcher::IndexWatcher;
use evl_core::{Codec, EventWrapper, SourceIdentifier, SourceRegistry};
use evl_storage::{CodecStore, EventStore, FileLayout, Layout, StoreOptions};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Store type held per source
pub type RouterStore<T, C> = CodecStore<EventWrapper<T>, C>;

/// What one `route` call did
#[derive(Debug, Default)]
pub struct RouteReport {
    /// Events written to stores, sentinels included
    pub appended: usize,
    /// Stores created by this call
    pub created: usize,
    /// Sources retired by this call
    pub retired: usize,
    /// Wrappers dropped for lacking an identifier
    pub skipped: usize,
    pub errors: Vec<RouterError>,
}

impl RouteReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct SourceRouter<T, C, R> {
    layout: FileLayout,
    options: StoreOptions,
    codec: Arc<C>,
    registry: R,
    watcher: Option<Arc<IndexWatcher>>,
    stores: RwLock<HashMap<SourceIdentifier, Arc<RouterStore<T, C>>>>,
}

impl<T, C, R> SourceRouter<T, C, R>
where
    T: Send + 'static,
    C: Codec<EventWrapper<T>> + 'static,
    R: SourceRegistry<RouterStore<T, C>>,
{
    pub fn new(layout: FileLayout, options: StoreOptions, codec: Arc<C>, registry: R) -> Self {
        Self {
            layout,
            options,
            codec,
            registry,
            watcher: None,
            stores: RwLock::new(HashMap::new()),
        }
    }

    /// Register every store this router creates with `watcher`
    #[must_use]
    pub fn with_watcher(mut self, watcher: Arc<IndexWatcher>) -> Self {
        self.watcher = Some(watcher);
        self
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Store currently active for `id`
    pub fn store(&self, id: &SourceIdentifier) -> Option<Arc<RouterStore<T, C>>> {
        self.read().get(id).cloned()
    }

    /// Sources with an active store, sorted
    pub fn active_sources(&self) -> Vec<SourceIdentifier> {
        let mut sources: Vec<_> = self.read().keys().cloned().collect();
        sources.sort();
        sources
    }

    /// Route a batch that may mix sources
    pub fn route(&self, batch: Vec<EventWrapper<T>>) -> RouteReport {
        let mut report = RouteReport::default();

        for (id, events) in self.partition(batch, &mut report) {
            self.route_source(id, events, &mut report);
        }

        if !report.is_ok() {
            tracing::warn!(
                failed = report.errors.len(),
                appended = report.appended,
                "batch routed with errors"
            );
        }
        report
    }

    /// Dispose every active store, keeping the files
    pub fn close_all(&self) -> usize {
        let stores: Vec<_> = self.write().drain().collect();
        for (id, store) in &stores {
            if let Some(watcher) = &self.watcher {
                watcher.unregister(&store.store().paths().data);
            }
            tracing::debug!(source = %id, "store closed");
            store.dispose();
        }
        tracing::info!(stores = stores.len(), "router closed");
        stores.len()
    }

    fn partition(
        &self,
        batch: Vec<EventWrapper<T>>,
        report: &mut RouteReport,
    ) -> Vec<(SourceIdentifier, Vec<EventWrapper<T>>)> {
        let mut groups: Vec<(SourceIdentifier, Vec<EventWrapper<T>>)> = Vec::new();
        let mut positions: HashMap<SourceIdentifier, usize> = HashMap::new();

        for event in batch {
            let Some(id) = event.source().cloned() else {
                tracing::debug!("event without identifier skipped");
                report.skipped += 1;
                continue;
            };
            match positions.get(&id) {
                Some(&position) => groups[position].1.push(event),
                None => {
                    positions.insert(id.clone(), groups.len());
                    groups.push((id, vec![event]));
                }
            }
        }
        groups
    }

    fn route_source(
        &self,
        id: SourceIdentifier,
        events: Vec<EventWrapper<T>>,
        report: &mut RouteReport,
    ) {
        let closing = events.last().is_some_and(EventWrapper::is_end_of_stream);
        let skip_create = closing && events.len() == 1;

        if !skip_create {
            let store = self.resolve(&id, report);
            let sparse = self.options.layout == Layout::Sparse;
            let result = store.append_all(&events, |event| {
                if sparse {
                    event.local_id().and_then(|n| u64::try_from(n).ok())
                } else {
                    None
                }
            });
            match result {
                Ok(appended) => report.appended += appended.written,
                Err(error) => {
                    tracing::warn!(source = %id, error = %error, "append failed");
                    report.errors.push(RouterError::Storage {
                        id: id.clone(),
                        error,
                    });
                }
            }
        }

        if closing {
            self.retire(&id, report);
        }
    }

    fn resolve(&self, id: &SourceIdentifier, report: &mut RouteReport) -> Arc<RouterStore<T, C>> {
        if let Some(store) = self.read().get(id) {
            return Arc::clone(store);
        }

        // Creating a store opens nothing, so a losing candidate is just dropped
        let candidate = Arc::new(CodecStore::new(
            EventStore::new(self.layout.paths_for(id), self.options.clone()),
            Arc::clone(&self.codec),
        ));
        let (store, created) = match self.write().entry(id.clone()) {
            Entry::Occupied(entry) => (Arc::clone(entry.get()), false),
            Entry::Vacant(entry) => (Arc::clone(entry.insert(candidate)), true),
        };

        if created {
            tracing::info!(source = %id, data = %store.store().paths().data.display(), "source store created");
            self.registry.add_source(id, Arc::clone(&store));
            if let Some(watcher) = &self.watcher {
                watcher.register(store.store().paths().data.clone(), Arc::clone(&store) as _);
            }
            report.created += 1;
        }
        store
    }

    fn retire(&self, id: &SourceIdentifier, report: &mut RouteReport) {
        self.registry.remove_source(id);
        let paths = self.layout.paths_for(id);
        if let Some(watcher) = &self.watcher {
            watcher.unregister(&paths.data);
        }
        if let Some(store) = self.write().remove(id) {
            store.dispose();
        }

        if let Err(error) = paths.remove() {
            tracing::warn!(source = %id, error = %error, "failed to delete source files");
            report.errors.push(RouterError::Delete {
                id: id.clone(),
                error,
            });
        }
        tracing::info!(source = %id, "source retired");
        report.retired += 1;
    }

    fn read(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, HashMap<SourceIdentifier, Arc<RouterStore<T, C>>>> {
        self.stores.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, HashMap<SourceIdentifier, Arc<RouterStore<T, C>>>> {
        self.stores.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
