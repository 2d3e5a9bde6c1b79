// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic on-disk locations for source stores

use evl_core::SourceIdentifier;
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};

const DATA_EXTENSION: &str = "evl";
const INDEX_EXTENSION: &str = "idx";

/// Data and index file of one store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    pub data: PathBuf,
    pub index: PathBuf,
}

impl StorePaths {
    pub fn new(data: impl Into<PathBuf>, index: impl Into<PathBuf>) -> Self {
        Self {
            data: data.into(),
            index: index.into(),
        }
    }

    /// Paths for a data file, with the index next to it
    pub fn for_data(data: impl Into<PathBuf>) -> Self {
        let data = data.into();
        let index = data.with_extension(INDEX_EXTENSION);
        Self { data, index }
    }

    pub fn exists(&self) -> bool {
        self.data.exists()
    }

    /// Delete both files; missing files are not an error
    pub fn remove(&self) -> io::Result<()> {
        for path in [&self.data, &self.index] {
            match std::fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

/// Maps source identifiers to store paths under a root directory
#[derive(Debug, Clone)]
pub struct FileLayout {
    root: PathBuf,
}

impl FileLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paths_for(&self, id: &SourceIdentifier) -> StorePaths {
        let stem = file_stem(id);
        StorePaths {
            data: self.root.join(format!("{}.{}", stem, DATA_EXTENSION)),
            index: self.root.join(format!("{}.{}", stem, INDEX_EXTENSION)),
        }
    }
}

/// Readable, filesystem-safe stem with a hash suffix
///
/// Sanitising is lossy, so the suffix keeps distinct identifiers apart.
pub fn file_stem(id: &SourceIdentifier) -> String {
    let mut readable = sanitize(&id.primary);
    if let Some(secondary) = &id.secondary {
        readable.push('-');
        readable.push_str(&sanitize(secondary));
    }

    let mut hasher = Sha256::new();
    hasher.update(id.primary.as_bytes());
    if let Some(secondary) = &id.secondary {
        hasher.update([0u8]);
        hasher.update(secondary.as_bytes());
    }
    let digest = hasher.finalize();

    format!("{}-{}", readable, hex_encode(&digest[..8]))
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

// Hex encoding helper
fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
#[path = "layout_tests.rs"]
mod tests;
