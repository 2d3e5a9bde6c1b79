// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Index recovery
//!
//! The index is rebuilt by a full rescan of the data file whenever the data
//! file is newer than the index: after a crash, or when the file was written
//! by a writer that does not maintain the index live. A rebuild always
//! starts from an empty index, so running it twice yields the same index.
//!
//! A scan that cannot complete deletes the partial index and returns the
//! error. A short read is the expected outcome of catching up with an
//! in-flight writer; callers retry on their next poll.

use crate::error::StorageError;
use crate::header::FileHeader;
use crate::index::{IndexFile, MAX_RECORD_NUMBER};
use crate::record::{self, frame_len};
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Rebuild `index_path` from `data_path`, returning the number of records
pub fn rebuild_index(data_path: &Path, index_path: &Path) -> Result<u64, StorageError> {
    match rebuild(data_path, index_path) {
        Ok(records) => {
            tracing::debug!(
                data = %data_path.display(),
                records,
                "index rebuilt"
            );
            Ok(records)
        }
        Err(e) => {
            if let Err(remove_err) = std::fs::remove_file(index_path) {
                if remove_err.kind() != io::ErrorKind::NotFound {
                    tracing::warn!(
                        index = %index_path.display(),
                        error = %remove_err,
                        "failed to remove partial index"
                    );
                }
            }
            tracing::warn!(
                data = %data_path.display(),
                error = %e,
                transient = e.is_transient(),
                "index rebuild aborted"
            );
            Err(e)
        }
    }
}

fn rebuild(data_path: &Path, index_path: &Path) -> Result<u64, StorageError> {
    let mut index = IndexFile::create(index_path)?;
    let mut data = File::open(data_path)?;
    let end = data.metadata()?.len();
    let header = FileHeader::read_from(&mut data, end)?;

    let scan = scan_records(&mut data, &header, end, |number, offset| {
        index.set(number, offset)
    });
    if let Some(failure) = scan.failure {
        return Err(failure);
    }

    index.sync()?;
    Ok(scan.records)
}

/// Truncate a torn record left at the end of `data_path` by a crashed writer
///
/// Returns the new file length when something was cut off. Only the owning
/// writer may call this: for a reader, a torn tail is a record in flight.
pub fn repair_tail(data_path: &Path) -> Result<Option<u64>, StorageError> {
    let mut data = OpenOptions::new().read(true).write(true).open(data_path)?;
    let end = data.metadata()?.len();
    let header = FileHeader::read_from(&mut data, end)?;

    let scan = scan_records(&mut data, &header, end, |_, _| Ok(()));
    match scan.failure {
        None => Ok(None),
        Some(StorageError::ShortRead { .. }) => {
            tracing::warn!(
                data = %data_path.display(),
                from = end,
                to = scan.valid_end,
                "truncating torn record"
            );
            data.set_len(scan.valid_end)?;
            data.sync_all()?;
            Ok(Some(scan.valid_end))
        }
        Some(e) => Err(e),
    }
}

/// Whether the index must be rebuilt before it can be trusted
///
/// True when the data file exists and the index is missing or older.
pub fn index_is_stale(data_path: &Path, index_path: &Path) -> io::Result<bool> {
    let data_modified = match std::fs::metadata(data_path) {
        Ok(meta) => meta.modified()?,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };
    match std::fs::metadata(index_path) {
        Ok(meta) => Ok(data_modified > meta.modified()?),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e),
    }
}

struct Scan {
    records: u64,
    /// End of the last complete record
    valid_end: u64,
    failure: Option<StorageError>,
}

fn scan_records<F>(data: &mut File, header: &FileHeader, end: u64, mut visit: F) -> Scan
where
    F: FnMut(u64, u64) -> Result<(), StorageError>,
{
    let mut scan = Scan {
        records: 0,
        valid_end: header.data_offset,
        failure: None,
    };
    let mut offset = header.data_offset;

    while offset < end {
        let record = match record::read_header(data, offset, header.layout) {
            Ok(record) => record,
            Err(e) => {
                scan.failure = Some(e);
                return scan;
            }
        };

        let next = offset + frame_len(header.layout, record.length);
        if next > end {
            scan.failure = Some(StorageError::ShortRead {
                offset,
                expected: next - offset,
                actual: end - offset,
            });
            return scan;
        }

        let number = record.sequence.unwrap_or(scan.records);
        if number > MAX_RECORD_NUMBER {
            scan.failure = Some(StorageError::CorruptRecord {
                offset,
                reason: format!("sequence {number} exceeds {MAX_RECORD_NUMBER}"),
            });
            return scan;
        }
        if let Err(e) = visit(number, offset) {
            scan.failure = Some(e);
            return scan;
        }

        scan.records += 1;
        scan.valid_end = next;
        offset = next;
    }

    scan
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
