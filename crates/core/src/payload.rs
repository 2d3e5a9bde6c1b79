// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concrete payload types carried by the pipeline
//!
//! Everything downstream of the codec is generic over the payload; these
//! are the two kinds the daemon knows how to ingest.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a logging event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Exception details attached to a logging event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrowableInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stack_trace: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<Box<ThrowableInfo>>,
}

/// A single application log record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingEvent {
    /// Milliseconds since Unix epoch
    pub timestamp_millis: i64,
    pub level: Level,
    pub logger: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub throwable: Option<ThrowableInfo>,
}

impl LoggingEvent {
    pub fn new(
        timestamp_millis: i64,
        level: Level,
        logger: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp_millis,
            level,
            logger: logger.into(),
            message: message.into(),
            thread: None,
            throwable: None,
        }
    }
}

/// A single HTTP access record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEvent {
    /// Milliseconds since Unix epoch
    pub timestamp_millis: i64,
    pub remote_host: String,
    pub method: String,
    pub uri: String,
    pub protocol: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_millis: Option<u64>,
}

impl AccessEvent {
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
