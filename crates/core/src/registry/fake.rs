// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake source registry for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::SourceRegistry;
use crate::source::SourceIdentifier;
use std::sync::{Arc, Mutex};

/// Recorded registry notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    Add(SourceIdentifier),
    Remove(SourceIdentifier),
}

/// Registry that records every notification it receives
#[derive(Clone, Default)]
pub struct FakeRegistry {
    calls: Arc<Mutex<Vec<RegistryCall>>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all recorded notifications
    pub fn calls(&self) -> Vec<RegistryCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Sources added by the recorded calls
    pub fn added(&self) -> Vec<SourceIdentifier> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RegistryCall::Add(id) => Some(id),
                RegistryCall::Remove(_) => None,
            })
            .collect()
    }

    /// Sources removed by the recorded calls
    pub fn removed(&self) -> Vec<SourceIdentifier> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RegistryCall::Remove(id) => Some(id),
                RegistryCall::Add(_) => None,
            })
            .collect()
    }
}

impl<S> SourceRegistry<S> for FakeRegistry {
    fn add_source(&self, id: &SourceIdentifier, _store: Arc<S>) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RegistryCall::Add(id.clone()));
    }

    fn remove_source(&self, id: &SourceIdentifier) {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RegistryCall::Remove(id.clone()));
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
