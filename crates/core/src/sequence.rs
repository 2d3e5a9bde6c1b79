// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Growable sequences of events
//!
//! A sequence only ever grows, except when it is reset or wraps around,
//! in which case its length drops and every previously handed out
//! position becomes invalid.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use thiserror::Error;

/// A position that exists but could not be read this time
#[derive(Debug, Error)]
#[error("position {index} could not be read: {reason}")]
pub struct Unreadable {
    pub index: u64,
    pub reason: String,
}

/// Read access to a sequence that may grow (or shrink) while being read
pub trait EventSequence<E>: Send + Sync {
    /// Current number of positions
    fn len(&self) -> u64;

    /// Element at `index`, `None` when absent or unreadable
    fn get(&self, index: u64) -> Option<E>;

    /// Element at `index`, telling a gap from a read worth retrying
    ///
    /// `Ok(None)` is a position that holds nothing and never will.
    fn try_get(&self, index: u64) -> Result<Option<E>, Unreadable> {
        Ok(self.get(index))
    }

    /// Whether the sequence has been disposed and will never change again
    fn is_disposed(&self) -> bool {
        false
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Bounded in-memory sequence that starts a new lap when full
///
/// Pushing into a full buffer discards the previous lap entirely, so the
/// length drops back to one and stale positions are never reused silently.
/// A held position never refers to a different entry.
pub struct CircularBuffer<E> {
    capacity: usize,
    items: Mutex<VecDeque<E>>,
    disposed: AtomicBool,
}

impl<E> CircularBuffer<E> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append an element, wrapping when the buffer is full
    pub fn push(&self, item: E) {
        let mut items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        if items.len() >= self.capacity {
            items.clear();
        }
        items.push_back(item);
    }

    pub fn clear(&self) {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}

impl<E: Clone + Send> EventSequence<E> for CircularBuffer<E> {
    fn len(&self) -> u64 {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).len() as u64
    }

    fn get(&self, index: u64) -> Option<E> {
        let items = self.items.lock().unwrap_or_else(|e| e.into_inner());
        usize::try_from(index)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "sequence_tests.rs"]
mod tests;
