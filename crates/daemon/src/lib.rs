// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! evl-daemon: the `evld` ingestion daemon
//!
//! Producers connect over TCP and send length-prefixed JSON batches of
//! event wrappers. Each batch is routed into per-source stores under the
//! state directory and forwarded to the configured collectors.

pub mod config;
pub mod ingest;
pub mod lifecycle;
pub mod server;

pub use config::{Config, ConfigError, EventKind, ForwardConfig, ListenerConfig, StoreLayout};
pub use ingest::{Ingest, Payload};
pub use lifecycle::{startup, Daemon, LifecycleError, ShutdownSummary};
pub use server::{ConnectionSummary, ServerError};
