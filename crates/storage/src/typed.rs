// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed view over an [`EventStore`]

use crate::error::StorageError;
use crate::store::EventStore;
use evl_core::{Codec, EventSequence, Unreadable};
use std::marker::PhantomData;
use std::sync::Arc;

/// Outcome of [`CodecStore::append_all`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Appended {
    /// Events encoded and written
    pub written: usize,
    /// Record number of the last event written
    pub last: Option<u64>,
}

/// Event store that encodes on append and decodes on read
pub struct CodecStore<T, C> {
    store: Arc<EventStore>,
    codec: Arc<C>,
    _marker: PhantomData<fn() -> T>,
}

impl<T, C> CodecStore<T, C>
where
    C: Codec<T>,
{
    pub fn new(store: EventStore, codec: Arc<C>) -> Self {
        Self {
            store: Arc::new(store),
            codec,
            _marker: PhantomData,
        }
    }

    pub fn store(&self) -> &Arc<EventStore> {
        &self.store
    }

    /// Append one event. An event the codec cannot encode is skipped and
    /// `Ok(None)` is returned.
    pub fn append(&self, event: &T) -> Result<Option<u64>, StorageError> {
        Ok(self.append_all(std::slice::from_ref(event), |_| None)?.last)
    }

    /// Append events in order, with an optional sequence per event
    ///
    /// Events the codec cannot encode are skipped and not counted.
    pub fn append_all<F>(&self, events: &[T], sequence: F) -> Result<Appended, StorageError>
    where
        F: Fn(&T) -> Option<u64>,
    {
        let encoded: Vec<(Option<u64>, Vec<u8>)> = events
            .iter()
            .filter_map(|event| match self.codec.encode(event) {
                Some(bytes) => Some((sequence(event), bytes)),
                None => {
                    tracing::warn!(
                        data = %self.store.paths().data.display(),
                        "event could not be encoded, skipped"
                    );
                    None
                }
            })
            .collect();
        if encoded.is_empty() {
            return Ok(Appended::default());
        }

        let last = self
            .store
            .append_records(encoded.iter().map(|(seq, bytes)| (*seq, bytes.as_slice())))?;
        Ok(Appended {
            written: encoded.len(),
            last: Some(last),
        })
    }

    pub fn get(&self, number: u64) -> Result<Option<T>, StorageError> {
        Ok(self
            .store
            .get(number)?
            .and_then(|bytes| self.codec.decode(&bytes)))
    }

    pub fn size(&self) -> Result<u64, StorageError> {
        self.store.size()
    }

    pub fn refresh(&self) -> Result<bool, StorageError> {
        self.store.refresh()
    }

    pub fn dispose(&self) {
        self.store.dispose();
    }

    pub fn delete_files(&self) -> std::io::Result<()> {
        self.store.delete_files()
    }

    pub fn is_disposed(&self) -> bool {
        self.store.is_disposed()
    }
}

impl<T, C> EventSequence<T> for CodecStore<T, C>
where
    C: Codec<T>,
{
    fn len(&self) -> u64 {
        EventSequence::len(self.store.as_ref())
    }

    fn get(&self, index: u64) -> Option<T> {
        EventSequence::get(self.store.as_ref(), index).and_then(|bytes| self.codec.decode(&bytes))
    }

    fn try_get(&self, index: u64) -> Result<Option<T>, Unreadable> {
        Ok(EventSequence::try_get(self.store.as_ref(), index)?
            .and_then(|bytes| self.codec.decode(&bytes)))
    }

    fn is_disposed(&self) -> bool {
        self.store.is_disposed()
    }
}

#[cfg(test)]
#[path = "typed_tests.rs"]
mod tests;
