// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound connections

use crate::error::SenderError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::AsyncWrite;
use tokio::net::TcpStream;
use tokio::time::timeout;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{ConnectCall, FakeConnector};

/// Writable half of an established connection
pub type Connection = Box<dyn AsyncWrite + Send + Unpin>;

/// Opens connections to one destination
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Destination, for logs and keys
    fn target(&self) -> &str;

    async fn connect(&self) -> Result<Connection, SenderError>;
}

/// TCP connector with a connect timeout
#[derive(Debug, Clone)]
pub struct TcpConnector {
    target: String,
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(target: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            target: target.into(),
            connect_timeout,
        }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    fn target(&self) -> &str {
        &self.target
    }

    async fn connect(&self) -> Result<Connection, SenderError> {
        let stream = match timeout(self.connect_timeout, TcpStream::connect(&self.target)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(SenderError::ConnectFailed {
                    target: self.target.clone(),
                    source,
                })
            }
            Err(_) => return Err(SenderError::ConnectTimeout(self.target.clone())),
        };

        // Set TCP_NODELAY for lower latency (non-fatal if it fails)
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(target = %self.target, error = %e, "failed to set TCP_NODELAY");
        }

        Ok(Box::new(stream))
    }
}

#[cfg(test)]
#[path = "tcp_tests.rs"]
mod tests;
