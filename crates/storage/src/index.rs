// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Offset index
//!
//! Slot `n` holds the data file offset of record `n` as a big-endian u64
//! at byte `n * SLOT_LEN`. A zero slot is a gap: offset zero always lies
//! inside the file header, so no record can live there.

use crate::error::StorageError;
use crate::record::read_full;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Width of one index slot
pub const SLOT_LEN: u64 = 8;

/// Highest record number whose slot offset fits in a u64
pub const MAX_RECORD_NUMBER: u64 = u64::MAX / SLOT_LEN - 1;

/// Index file mapping record numbers to data offsets
pub struct IndexFile {
    path: PathBuf,
    file: File,
}

impl IndexFile {
    /// Create an empty index, truncating any existing file
    pub fn create(path: &Path) -> Result<Self, StorageError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Open an existing index for reading and writing
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Open an existing index without write access
    pub fn open_read_only(path: &Path) -> Result<Self, StorageError> {
        let file = File::open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    /// Number of slots: highest record number seen plus one
    ///
    /// Taken from the file length on every call, so growth by another
    /// handle on the same file is visible.
    pub fn len(&self) -> Result<u64, StorageError> {
        Ok(self.file.metadata()?.len() / SLOT_LEN)
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    /// Point slot `record` at `offset`, growing the file as needed
    ///
    /// Skipped slots read back as zero, i.e. as gaps.
    pub fn set(&mut self, record: u64, offset: u64) -> Result<(), StorageError> {
        self.file.seek(SeekFrom::Start(slot_offset(record)?))?;
        self.file.write_all(&offset.to_be_bytes())?;
        Ok(())
    }

    /// Data offset of `record`, `None` for gaps and slots past the end
    pub fn get(&mut self, record: u64) -> Result<Option<u64>, StorageError> {
        if record >= self.len()? {
            return Ok(None);
        }
        let mut slot = [0u8; SLOT_LEN as usize];
        read_full(&mut self.file, slot_offset(record)?, &mut slot)?;
        match u64::from_be_bytes(slot) {
            0 => Ok(None),
            offset => Ok(Some(offset)),
        }
    }

    pub fn sync(&mut self) -> Result<(), StorageError> {
        self.file.sync_data()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn slot_offset(record: u64) -> Result<u64, StorageError> {
    record
        .checked_mul(SLOT_LEN)
        .filter(|_| record <= MAX_RECORD_NUMBER)
        .ok_or(StorageError::SequenceOutOfRange {
            number: record,
            max: MAX_RECORD_NUMBER,
        })
}

#[cfg(test)]
#[path = "index_tests.rs"]
mod tests;
