// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only event store
//!
//! Creating a store touches no file. The data file and index are created
//! or opened on first use, so a store that is created and then discarded
//! never holds an OS resource.

use crate::error::StorageError;
use crate::header::{FileHeader, Layout};
use crate::index::{IndexFile, MAX_RECORD_NUMBER};
use crate::layout::StorePaths;
use crate::record::{self, frame_len, MAX_RECORD_LEN};
use crate::recovery::{index_is_stale, rebuild_index, repair_tail};
use evl_core::{EventSequence, Unreadable};
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Options used when a store creates its data file
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub layout: Layout,
    /// Opaque bytes stored in the file header
    pub metadata: Vec<u8>,
    /// fsync data and index after every append call
    pub sync_on_write: bool,
    /// Highest record number an append may use
    ///
    /// Bounds the index file: slot `n` lives at byte `n * SLOT_LEN`.
    pub max_sequence: u64,
}

/// Default cap on record numbers: a full index stays at 32 GiB of sparse file
pub const DEFAULT_MAX_SEQUENCE: u64 = u32::MAX as u64;

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            layout: Layout::Dense,
            metadata: Vec::new(),
            sync_on_write: true,
            max_sequence: DEFAULT_MAX_SEQUENCE,
        }
    }
}

impl StoreOptions {
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: impl Into<Vec<u8>>) -> Self {
        self.metadata = metadata.into();
        self
    }

    #[must_use]
    pub fn with_sync_on_write(mut self, sync: bool) -> Self {
        self.sync_on_write = sync;
        self
    }

    /// Cap record numbers at `max`, clamped to what the index can address
    #[must_use]
    pub fn with_max_sequence(mut self, max: u64) -> Self {
        self.max_sequence = max.min(MAX_RECORD_NUMBER);
        self
    }
}

struct OpenStore {
    data: File,
    index: IndexFile,
    header: FileHeader,
    writable: bool,
    /// Offset where the next record goes
    end: u64,
    /// Number assigned to the next record without an explicit sequence
    next_record: u64,
}

/// Per-source append-only data file with a recoverable offset index
pub struct EventStore {
    paths: StorePaths,
    options: StoreOptions,
    state: Mutex<Option<OpenStore>>,
    /// Last size reported successfully
    known_len: AtomicU64,
    disposed: AtomicBool,
}

impl EventStore {
    pub fn new(paths: StorePaths, options: StoreOptions) -> Self {
        Self {
            paths,
            options,
            state: Mutex::new(None),
            known_len: AtomicU64::new(0),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn paths(&self) -> &StorePaths {
        &self.paths
    }

    /// Header of the open data file, if it has been opened
    pub fn header(&self) -> Option<FileHeader> {
        self.lock().as_ref().map(|open| open.header.clone())
    }

    /// Append one record, returning its record number
    pub fn append(&self, payload: &[u8]) -> Result<u64, StorageError> {
        self.append_records([(None, payload)])
    }

    /// Append one record under an explicit sequence number (sparse layout)
    pub fn append_with_sequence(&self, sequence: u64, payload: &[u8]) -> Result<u64, StorageError> {
        self.append_records([(Some(sequence), payload)])
    }

    /// Append records in order, syncing once at the end
    ///
    /// Records without a sequence are numbered after the highest record so
    /// far. Returns the number of the last record written.
    ///
    /// The whole batch is checked before anything is written: an oversized
    /// payload or an out-of-range number rejects every record of the call.
    pub fn append_records<'a, I>(&self, records: I) -> Result<u64, StorageError>
    where
        I: IntoIterator<Item = (Option<u64>, &'a [u8])>,
    {
        if self.is_disposed() {
            return Err(StorageError::Disposed);
        }

        let mut state = self.lock();
        let open = self.open_for_write(&mut state)?;
        let layout = open.header.layout;
        let max = self.options.max_sequence.min(MAX_RECORD_NUMBER);

        let mut planned = Vec::new();
        let mut next_record = open.next_record;
        for (sequence, payload) in records {
            if payload.len() > MAX_RECORD_LEN as usize {
                return Err(StorageError::RecordTooLarge(payload.len() as u64));
            }
            let number = match (layout, sequence) {
                (Layout::Dense, Some(_)) => return Err(StorageError::LayoutMismatch),
                (_, Some(sequence)) => sequence,
                (_, None) => next_record,
            };
            if number > max {
                return Err(StorageError::SequenceOutOfRange { number, max });
            }
            next_record = next_record.max(number + 1);
            planned.push((number, payload));
        }

        let mut last = None;
        for (number, payload) in planned {
            let offset = open.end;
            open.data.seek(SeekFrom::Start(offset))?;
            open.data.write_all(&record::encode(layout, number, payload))?;
            open.index.set(number, offset)?;

            open.end = offset + frame_len(layout, payload.len() as u32);
            open.next_record = open.next_record.max(number + 1);
            last = Some(number);
        }

        if self.options.sync_on_write {
            open.data.sync_data()?;
            open.index.sync()?;
        }
        self.known_len.store(open.next_record, Ordering::SeqCst);

        Ok(last.unwrap_or(open.next_record.saturating_sub(1)))
    }

    /// Highest known record number plus one
    pub fn size(&self) -> Result<u64, StorageError> {
        if self.is_disposed() {
            return Ok(self.known_len.load(Ordering::SeqCst));
        }
        let mut state = self.lock();
        let len = match self.open_for_read(&mut state)? {
            Some(open) => open.index.len()?,
            None => 0,
        };
        self.known_len.store(len, Ordering::SeqCst);
        Ok(len)
    }

    /// Payload of record `number`, `None` for gaps and unknown numbers
    pub fn get(&self, number: u64) -> Result<Option<Vec<u8>>, StorageError> {
        if self.is_disposed() {
            return Err(StorageError::Disposed);
        }
        let mut state = self.lock();
        let Some(open) = self.open_for_read(&mut state)? else {
            return Ok(None);
        };
        let Some(offset) = open.index.get(number)? else {
            return Ok(None);
        };
        let (_, payload) = record::read(&mut open.data, offset, open.header.layout)?;
        Ok(Some(payload))
    }

    /// Rebuild the index if the data file moved ahead of it
    ///
    /// Returns whether a rebuild happened. A store that writes its own
    /// index never needs one.
    pub fn refresh(&self) -> Result<bool, StorageError> {
        if self.is_disposed() || !index_is_stale(&self.paths.data, &self.paths.index)? {
            return Ok(false);
        }

        let mut state = self.lock();
        if state.as_ref().is_some_and(|open| open.writable) {
            return Ok(false);
        }
        *state = None;
        let records = rebuild_index(&self.paths.data, &self.paths.index)?;
        tracing::debug!(data = %self.paths.data.display(), records, "store refreshed");
        Ok(true)
    }

    /// Close file handles; the store rejects further appends
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        *self.lock() = None;
    }

    /// Dispose and delete both files
    pub fn delete_files(&self) -> io::Result<()> {
        self.dispose();
        self.paths.remove()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<OpenStore>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn open_for_write<'s>(
        &self,
        state: &'s mut Option<OpenStore>,
    ) -> Result<&'s mut OpenStore, StorageError> {
        if !state.as_ref().is_some_and(|open| open.writable) {
            *state = Some(self.open_writable()?);
        }
        state.as_mut().ok_or(StorageError::Disposed)
    }

    fn open_for_read<'s>(
        &self,
        state: &'s mut Option<OpenStore>,
    ) -> Result<Option<&'s mut OpenStore>, StorageError> {
        if state.is_none() {
            *state = self.open_readable()?;
        }
        Ok(state.as_mut())
    }

    fn open_writable(&self) -> Result<OpenStore, StorageError> {
        if let Some(parent) = self.paths.data.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let existing_len = match std::fs::metadata(&self.paths.data) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => 0,
            Err(e) => return Err(e.into()),
        };
        if existing_len == 0 {
            return self.create_files();
        }

        repair_tail(&self.paths.data)?;
        if index_is_stale(&self.paths.data, &self.paths.index)? {
            rebuild_index(&self.paths.data, &self.paths.index)?;
        }

        let mut data = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.paths.data)?;
        let end = data.metadata()?.len();
        let header = FileHeader::read_from(&mut data, end)?;
        if header.layout != self.options.layout {
            tracing::warn!(
                data = %self.paths.data.display(),
                file_layout = ?header.layout,
                "existing store layout differs from configured layout, keeping file layout"
            );
        }
        let index = IndexFile::open(&self.paths.index)?;
        let next_record = index.len()?;

        tracing::debug!(
            data = %self.paths.data.display(),
            records = next_record,
            offset = end,
            "store reopened for append"
        );

        Ok(OpenStore {
            data,
            index,
            header,
            writable: true,
            end,
            next_record,
        })
    }

    fn create_files(&self) -> Result<OpenStore, StorageError> {
        let header = FileHeader::with_metadata(self.options.layout, self.options.metadata.clone());
        let mut data = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&self.paths.data)?;
        data.write_all(&header.to_bytes())?;
        if self.options.sync_on_write {
            data.sync_data()?;
        }
        let index = IndexFile::create(&self.paths.index)?;

        tracing::debug!(data = %self.paths.data.display(), "store created");

        Ok(OpenStore {
            data,
            index,
            end: header.data_offset,
            header,
            writable: true,
            next_record: 0,
        })
    }

    fn open_readable(&self) -> Result<Option<OpenStore>, StorageError> {
        let mut data = match File::open(&self.paths.data) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if index_is_stale(&self.paths.data, &self.paths.index)? {
            rebuild_index(&self.paths.data, &self.paths.index)?;
        }

        let end = data.metadata()?.len();
        let header = FileHeader::read_from(&mut data, end)?;
        let index = IndexFile::open_read_only(&self.paths.index)?;
        let next_record = index.len()?;

        Ok(Some(OpenStore {
            data,
            index,
            header,
            writable: false,
            end,
            next_record,
        }))
    }
}

impl EventSequence<Vec<u8>> for EventStore {
    fn len(&self) -> u64 {
        match self.size() {
            Ok(len) => len,
            Err(e) => {
                tracing::debug!(
                    data = %self.paths.data.display(),
                    error = %e,
                    "size unavailable, reporting last known size"
                );
                self.known_len.load(Ordering::SeqCst)
            }
        }
    }

    fn get(&self, index: u64) -> Option<Vec<u8>> {
        EventStore::get(self, index).ok().flatten()
    }

    fn try_get(&self, index: u64) -> Result<Option<Vec<u8>>, Unreadable> {
        match EventStore::get(self, index) {
            Ok(payload) => Ok(payload),
            Err(e) if e.is_transient() => Err(Unreadable {
                index,
                reason: e.to_string(),
            }),
            Err(e) => {
                tracing::debug!(
                    data = %self.paths.data.display(),
                    index,
                    error = %e,
                    "record unreadable, treated as a gap"
                );
                Ok(None)
            }
        }
    }

    fn is_disposed(&self) -> bool {
        EventStore::is_disposed(self)
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
