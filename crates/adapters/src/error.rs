// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for network adapters

use thiserror::Error;

/// Errors from connecting to or writing to a destination
#[derive(Debug, Error)]
pub enum SenderError {
    #[error("connection to {target} failed: {source}")]
    ConnectFailed {
        target: String,
        #[source]
        source: std::io::Error,
    },
    #[error("connection to {0} timed out")]
    ConnectTimeout(String),
    #[error("write timed out")]
    WriteTimeout,
    #[error("no connection to target")]
    NotConnected,
    #[error("sender is shut down")]
    Canceled,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reading an inbound frame
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame of {len} bytes exceeds limit of {max}")]
    TooLarge { len: u32, max: u32 },
    #[error("connection closed mid-frame")]
    Truncated,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
