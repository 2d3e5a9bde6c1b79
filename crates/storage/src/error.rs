// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for event storage

use thiserror::Error;

/// Errors that can occur in event store operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("short read at offset {offset}: expected {expected} bytes, got {actual}")]
    ShortRead {
        offset: u64,
        expected: u64,
        actual: u64,
    },
    #[error("corrupt header: {0}")]
    CorruptHeader(String),
    #[error("corrupt record at offset {offset}: {reason}")]
    CorruptRecord { offset: u64, reason: String },
    #[error("record of {0} bytes exceeds the maximum record size")]
    RecordTooLarge(u64),
    #[error("record number {number} exceeds the maximum of {max}")]
    SequenceOutOfRange { number: u64, max: u64 },
    #[error("explicit sequence numbers require the sparse layout")]
    LayoutMismatch,
    #[error("store is disposed")]
    Disposed,
}

impl StorageError {
    /// Whether retrying later can succeed without intervention
    ///
    /// A short read is what a reader sees when it catches up with a writer
    /// that has not flushed the rest of a record yet.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Io(_) | StorageError::ShortRead { .. })
    }
}
