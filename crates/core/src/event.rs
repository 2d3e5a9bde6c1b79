// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event identity and the wrapper carried through the pipeline

use crate::source::SourceIdentifier;
use serde::{Deserialize, Serialize};

/// Producer-assigned identity of a single event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventIdentifier {
    pub source: SourceIdentifier,
    /// Per-source sequence number assigned by the producer
    pub local_id: i64,
}

impl EventIdentifier {
    pub fn new(source: SourceIdentifier, local_id: i64) -> Self {
        Self { source, local_id }
    }
}

/// An event together with its identity
///
/// A wrapper without a payload is the end-of-stream sentinel for its
/// source: the producer has no further events and its store is retired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventWrapper<T> {
    pub identifier: Option<EventIdentifier>,
    pub payload: Option<T>,
}

impl<T> EventWrapper<T> {
    pub fn new(source: SourceIdentifier, local_id: i64, payload: T) -> Self {
        Self {
            identifier: Some(EventIdentifier::new(source, local_id)),
            payload: Some(payload),
        }
    }

    /// End-of-stream sentinel for `source`
    pub fn end_of_stream(source: SourceIdentifier, local_id: i64) -> Self {
        Self {
            identifier: Some(EventIdentifier::new(source, local_id)),
            payload: None,
        }
    }

    pub fn source(&self) -> Option<&SourceIdentifier> {
        self.identifier.as_ref().map(|id| &id.source)
    }

    pub fn local_id(&self) -> Option<i64> {
        self.identifier.as_ref().map(|id| id.local_id)
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.payload.is_none()
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
