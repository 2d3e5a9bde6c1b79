// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable per-source event storage
//!
//! ## Architecture
//!
//! ```text
//! append(payload) → data file  [header][len|payload][len|payload]...
//!                 → index file [offset u64][offset u64]...
//!
//! data newer than index → rebuild_index() → index file
//! ```
//!
//! The data file is the source of truth. The index is derived from it and
//! can always be rebuilt by a full rescan.

mod error;
mod header;
mod index;
mod layout;
mod record;
pub mod recovery;
mod store;
mod typed;

pub use error::StorageError;
pub use header::{FileHeader, Layout, HEADER_LEN, MAGIC, VERSION};
pub use index::{IndexFile, MAX_RECORD_NUMBER, SLOT_LEN};
pub use layout::{FileLayout, StorePaths};
pub use record::{LENGTH_LEN, MAX_RECORD_LEN, SEQUENCE_LEN};
pub use recovery::{index_is_stale, rebuild_index, repair_tail};
pub use store::{EventStore, StoreOptions, DEFAULT_MAX_SEQUENCE};
pub use typed::{Appended, CodecStore};
