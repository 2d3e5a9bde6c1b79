// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake connector for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Connection, Connector};
use crate::error::SenderError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::io::DuplexStream;

/// Recorded connect attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectCall {
    Connected,
    Refused,
}

#[derive(Default)]
struct FakeState {
    refuse: bool,
    calls: Vec<ConnectCall>,
    /// Peer ends of established connections, oldest first
    peers: VecDeque<DuplexStream>,
}

/// Connector that hands out in-memory pipes
///
/// Each successful connect creates a duplex pipe; the test reads what the
/// sender wrote from the peer end via [`FakeConnector::take_peer`].
#[derive(Clone)]
pub struct FakeConnector {
    target: String,
    buffer: usize,
    state: Arc<Mutex<FakeState>>,
}

impl FakeConnector {
    pub fn new(target: impl Into<String>) -> Self {
        Self::with_buffer(target, 64 * 1024)
    }

    /// Pipes buffer at most `buffer` bytes before writes block
    pub fn with_buffer(target: impl Into<String>, buffer: usize) -> Self {
        Self {
            target: target.into(),
            buffer,
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    /// Make later connect attempts fail
    pub fn set_refuse(&self, refuse: bool) {
        self.lock().refuse = refuse;
    }

    pub fn calls(&self) -> Vec<ConnectCall> {
        self.lock().calls.clone()
    }

    /// Number of successful connects so far
    pub fn connects(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| **c == ConnectCall::Connected)
            .count()
    }

    /// Peer end of the oldest connection not yet taken
    pub fn take_peer(&self) -> Option<DuplexStream> {
        self.lock().peers.pop_front()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Connector for FakeConnector {
    fn target(&self) -> &str {
        &self.target
    }

    async fn connect(&self) -> Result<Connection, SenderError> {
        let mut state = self.lock();
        if state.refuse {
            state.calls.push(ConnectCall::Refused);
            return Err(SenderError::ConnectFailed {
                target: self.target.clone(),
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            });
        }
        let (local, peer) = tokio::io::duplex(self.buffer);
        state.calls.push(ConnectCall::Connected);
        state.peers.push_back(peer);
        Ok(Box::new(local))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
