// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared index watcher
//!
//! One task ticks every registered store on a fixed interval and rebuilds
//! indexes that fell behind their data file. A failed rebuild is logged and
//! tried again on the next tick.

use evl_core::Codec;
use evl_storage::{CodecStore, EventStore, StorageError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Something whose index can fall behind its data
pub trait Refresh: Send + Sync {
    /// Rebuild if stale, returning whether a rebuild happened
    fn refresh(&self) -> Result<bool, StorageError>;
}

impl Refresh for EventStore {
    fn refresh(&self) -> Result<bool, StorageError> {
        EventStore::refresh(self)
    }
}

impl<T, C: Codec<T>> Refresh for CodecStore<T, C> {
    fn refresh(&self) -> Result<bool, StorageError> {
        CodecStore::refresh(self)
    }
}

/// Result of one tick
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub checked: usize,
    pub refreshed: usize,
    pub failed: usize,
}

#[derive(Default)]
pub struct IndexWatcher {
    entries: Mutex<BTreeMap<PathBuf, Arc<dyn Refresh>>>,
}

impl IndexWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch `target` under `key`, replacing any previous entry
    pub fn register(&self, key: PathBuf, target: Arc<dyn Refresh>) {
        self.lock().insert(key, target);
    }

    pub fn unregister(&self, key: &Path) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Refresh every registered target once
    pub fn tick(&self) -> TickReport {
        // Snapshot so refreshes run without holding the lock
        let entries: Vec<_> = self
            .lock()
            .iter()
            .map(|(key, target)| (key.clone(), Arc::clone(target)))
            .collect();

        let mut report = TickReport {
            checked: entries.len(),
            ..Default::default()
        };
        for (key, target) in entries {
            match target.refresh() {
                Ok(true) => report.refreshed += 1,
                Ok(false) => {}
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        data = %key.display(),
                        error = %e,
                        transient = e.is_transient(),
                        "index refresh failed, will retry"
                    );
                }
            }
        }
        report
    }

    /// Tick every `interval` until `shutdown` turns true
    pub async fn run(self: Arc<Self>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    // Rebuilds read and sync whole files
                    let watcher = Arc::clone(&self);
                    match tokio::task::spawn_blocking(move || watcher.tick()).await {
                        Ok(report) if report.refreshed > 0 => {
                            tracing::debug!(refreshed = report.refreshed, checked = report.checked, "indexes refreshed");
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!(error = %e, "index watcher tick failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("index watcher stopped");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, Arc<dyn Refresh>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
