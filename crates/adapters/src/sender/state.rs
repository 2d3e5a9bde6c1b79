// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection state machine
//!
//! ```text
//! Offline → Connecting → Connected
//!    ↑          │            │
//!    └──────────┴────────────┘   (failure)
//!
//! any → Canceled (terminal)
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Offline,
    Connecting,
    Connected,
    Canceled,
}

impl ConnectionState {
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Offline, Connecting)
                | (Connecting, Connected)
                | (Connecting, Offline)
                | (Connected, Offline)
                | (Offline | Connecting | Connected, Canceled)
        )
    }

    pub fn is_canceled(&self) -> bool {
        *self == ConnectionState::Canceled
    }

    pub fn is_connected(&self) -> bool {
        *self == ConnectionState::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Offline => "offline",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Canceled => "canceled",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
