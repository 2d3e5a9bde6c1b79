// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Routing, live filtering and index watching on top of event stores

mod error;
mod filter;
mod router;
mod watcher;

pub use error::RouterError;
pub use filter::{FilterCursor, FilterHandle, LiveFilter};
pub use router::{RouteReport, RouterStore, SourceRouter};
pub use watcher::{IndexWatcher, Refresh, TickReport};
