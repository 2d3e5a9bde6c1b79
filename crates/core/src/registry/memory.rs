// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory source registry

use super::SourceRegistry;
use crate::source::SourceIdentifier;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Registry keeping the currently known sources in memory
pub struct MemoryRegistry<S> {
    sources: RwLock<BTreeMap<SourceIdentifier, Arc<S>>>,
}

impl<S> MemoryRegistry<S> {
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(BTreeMap::new()),
        }
    }

    /// Known sources in identifier order
    pub fn sources(&self) -> Vec<SourceIdentifier> {
        self.sources
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    pub fn get(&self, id: &SourceIdentifier) -> Option<Arc<S>> {
        self.sources
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.sources.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S> Default for MemoryRegistry<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Send + Sync> SourceRegistry<S> for MemoryRegistry<S> {
    fn add_source(&self, id: &SourceIdentifier, store: Arc<S>) {
        let mut sources = self.sources.write().unwrap_or_else(|e| e.into_inner());
        sources.insert(id.clone(), store);
    }

    fn remove_source(&self, id: &SourceIdentifier) {
        let mut sources = self.sources.write().unwrap_or_else(|e| e.into_inner());
        sources.remove(id);
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
