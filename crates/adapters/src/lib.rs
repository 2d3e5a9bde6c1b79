// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Network adapters: framing, connections, reliable senders and fan-out

pub mod connector;
mod error;
mod fanout;
pub mod framing;
pub mod sender;
pub mod traced;

pub use connector::{Connection, Connector, TcpConnector};
pub use error::{FrameError, SenderError};
pub use fanout::{FanoutConfig, FanoutDispatcher};
pub use framing::{read_frame, Framing, LengthPrefixed, DEFAULT_MAX_FRAME};
pub use sender::{ConnectionState, ReliableSender, SenderConfig, SenderStats};
pub use traced::TracedConnector;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use connector::{ConnectCall, FakeConnector};
