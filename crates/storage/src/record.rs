// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record framing
//!
//! ```text
//! dense:  [length u32][payload]
//! sparse: [length u32][sequence u64][payload]
//! ```
//!
//! All integers are big-endian.

use crate::error::StorageError;
use crate::header::Layout;
use std::io::{ErrorKind, Read, Seek, SeekFrom};

/// Size of the length field
pub const LENGTH_LEN: u64 = 4;

/// Size of the explicit sequence field of sparse records
pub const SEQUENCE_LEN: u64 = 8;

/// Largest payload accepted on append and on recovery
pub const MAX_RECORD_LEN: u32 = 64 * 1024 * 1024;

/// Fixed part of a record preceding its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RecordHeader {
    pub length: u32,
    pub sequence: Option<u64>,
}

/// Bytes between the start of a record and its payload
pub(crate) fn prefix_len(layout: Layout) -> u64 {
    match layout {
        Layout::Dense => LENGTH_LEN,
        Layout::Sparse => LENGTH_LEN + SEQUENCE_LEN,
    }
}

/// Total on-disk size of a record with a payload of `length` bytes
pub(crate) fn frame_len(layout: Layout, length: u32) -> u64 {
    prefix_len(layout) + u64::from(length)
}

/// Frame a payload for appending
pub(crate) fn encode(layout: Layout, sequence: u64, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(prefix_len(layout) as usize + payload.len());
    buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    if layout == Layout::Sparse {
        buf.extend_from_slice(&sequence.to_be_bytes());
    }
    buf.extend_from_slice(payload);
    buf
}

/// Read the fixed part of the record starting at `offset`
pub(crate) fn read_header<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    layout: Layout,
) -> Result<RecordHeader, StorageError> {
    let mut length = [0u8; LENGTH_LEN as usize];
    read_full(reader, offset, &mut length)?;
    let length = u32::from_be_bytes(length);
    if length > MAX_RECORD_LEN {
        return Err(StorageError::CorruptRecord {
            offset,
            reason: format!("length {} exceeds maximum", length),
        });
    }

    let sequence = match layout {
        Layout::Dense => None,
        Layout::Sparse => {
            let mut sequence = [0u8; SEQUENCE_LEN as usize];
            read_full(reader, offset + LENGTH_LEN, &mut sequence)?;
            Some(u64::from_be_bytes(sequence))
        }
    };

    Ok(RecordHeader { length, sequence })
}

/// Read the whole record starting at `offset`
pub(crate) fn read<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    layout: Layout,
) -> Result<(RecordHeader, Vec<u8>), StorageError> {
    let header = read_header(reader, offset, layout)?;
    let mut payload = vec![0u8; header.length as usize];
    read_full(reader, offset + prefix_len(layout), &mut payload)?;
    Ok((header, payload))
}

/// Seek to `offset` and fill `buf`, reporting how much was there on EOF
pub(crate) fn read_full<R: Read + Seek>(
    reader: &mut R,
    offset: u64,
    buf: &mut [u8],
) -> Result<(), StorageError> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(StorageError::ShortRead {
                    offset,
                    expected: buf.len() as u64,
                    actual: filled as u64,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
