// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for routing

use evl_core::SourceIdentifier;
use evl_storage::StorageError;
use thiserror::Error;

/// Failure to store or retire one source's events
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("storage error for source {id}: {error}")]
    Storage {
        id: SourceIdentifier,
        #[source]
        error: StorageError,
    },
    #[error("failed to delete files for source {id}: {error}")]
    Delete {
        id: SourceIdentifier,
        #[source]
        error: std::io::Error,
    },
}

impl RouterError {
    pub fn source_id(&self) -> &SourceIdentifier {
        match self {
            RouterError::Storage { id, .. } | RouterError::Delete { id, .. } => id,
        }
    }
}
