// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identity of an event producer

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an event producer, compared by value
///
/// `primary` is usually the producer's host or address; `secondary`
/// distinguishes several producers sharing a host (for example a port or
/// an application name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceIdentifier {
    pub primary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
}

impl SourceIdentifier {
    pub fn new(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: None,
        }
    }

    pub fn with_secondary(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            secondary: Some(secondary.into()),
        }
    }
}

impl fmt::Display for SourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.secondary {
            Some(secondary) => write!(f, "{}-{}", self.primary, secondary),
            None => f.write_str(&self.primary),
        }
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
