// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data file header
//!
//! ```text
//! [magic "EVL\0"][version u16][flags u16][data_offset u64][metadata...]
//! ```
//!
//! `data_offset` is the byte offset of the first record. Anything between
//! the fixed header and `data_offset` is opaque metadata.

use crate::error::StorageError;
use crate::record::read_full;
use std::io::{Read, Seek};

pub const MAGIC: [u8; 4] = *b"EVL\0";
pub const VERSION: u16 = 1;

/// Size of the fixed part of the header
pub const HEADER_LEN: u64 = 16;

const FLAG_SPARSE: u16 = 0x0001;

/// How record numbers are assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// Records are numbered by their position in the file
    #[default]
    Dense,
    /// Records carry an explicit sequence number
    Sparse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub layout: Layout,
    pub data_offset: u64,
    pub metadata: Vec<u8>,
}

impl FileHeader {
    pub fn new(layout: Layout) -> Self {
        Self::with_metadata(layout, Vec::new())
    }

    pub fn with_metadata(layout: Layout, metadata: Vec<u8>) -> Self {
        Self {
            layout,
            data_offset: HEADER_LEN + metadata.len() as u64,
            metadata,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let flags = match self.layout {
            Layout::Dense => 0,
            Layout::Sparse => FLAG_SPARSE,
        };
        let mut buf = Vec::with_capacity(self.data_offset as usize);
        buf.extend_from_slice(&MAGIC);
        buf.extend_from_slice(&VERSION.to_be_bytes());
        buf.extend_from_slice(&flags.to_be_bytes());
        buf.extend_from_slice(&self.data_offset.to_be_bytes());
        buf.extend_from_slice(&self.metadata);
        buf
    }

    /// Read and validate the header of a data file of `file_len` bytes
    pub fn read_from<R: Read + Seek>(reader: &mut R, file_len: u64) -> Result<Self, StorageError> {
        let mut fixed = [0u8; HEADER_LEN as usize];
        read_full(reader, 0, &mut fixed)?;

        if fixed[0..4] != MAGIC {
            return Err(StorageError::CorruptHeader("bad magic".to_string()));
        }
        let version = u16::from_be_bytes([fixed[4], fixed[5]]);
        if version != VERSION {
            return Err(StorageError::CorruptHeader(format!(
                "unsupported version {}",
                version
            )));
        }
        let flags = u16::from_be_bytes([fixed[6], fixed[7]]);
        let mut offset = [0u8; 8];
        offset.copy_from_slice(&fixed[8..16]);
        let data_offset = u64::from_be_bytes(offset);
        if data_offset < HEADER_LEN || data_offset > file_len {
            return Err(StorageError::CorruptHeader(format!(
                "data offset {} outside file of {} bytes",
                data_offset, file_len
            )));
        }

        let mut metadata = vec![0u8; (data_offset - HEADER_LEN) as usize];
        read_full(reader, HEADER_LEN, &mut metadata)?;

        let layout = if flags & FLAG_SPARSE != 0 {
            Layout::Sparse
        } else {
            Layout::Dense
        };

        Ok(Self {
            layout,
            data_offset,
            metadata,
        })
    }
}

#[cfg(test)]
#[path = "header_tests.rs"]
mod tests;
