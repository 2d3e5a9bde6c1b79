// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Source registry: the list of known sources shown to consumers
//!
//! The router notifies the registry when it creates a source's store and
//! when it retires the source.

mod memory;

#[cfg(any(test, feature = "test-support"))]
mod fake;

pub use memory::MemoryRegistry;

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeRegistry, RegistryCall};

use crate::source::SourceIdentifier;
use std::sync::Arc;

/// Collaborator notified about source store creation and retirement
pub trait SourceRegistry<S>: Send + Sync {
    fn add_source(&self, id: &SourceIdentifier, store: Arc<S>);
    fn remove_source(&self, id: &SourceIdentifier);
}

impl<S, R: SourceRegistry<S> + ?Sized> SourceRegistry<S> for Arc<R> {
    fn add_source(&self, id: &SourceIdentifier, store: Arc<S>) {
        (**self).add_source(id, store)
    }

    fn remove_source(&self, id: &SourceIdentifier) {
        (**self).remove_source(id)
    }
}
