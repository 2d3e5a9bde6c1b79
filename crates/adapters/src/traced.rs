// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced connector wrapper for consistent observability

use crate::connector::{Connection, Connector};
use crate::error::SenderError;
use async_trait::async_trait;
use tracing::Instrument;

/// Wrapper that adds tracing to any Connector
#[derive(Clone)]
pub struct TracedConnector<C> {
    inner: C,
}

impl<C> TracedConnector<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<C: Connector> Connector for TracedConnector<C> {
    fn target(&self) -> &str {
        self.inner.target()
    }

    async fn connect(&self) -> Result<Connection, SenderError> {
        let span = tracing::info_span!("connector.connect", target = %self.inner.target());

        async {
            let start = std::time::Instant::now();
            let result = self.inner.connect().await;
            let elapsed = start.elapsed();

            match &result {
                Ok(_) => tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "connected"),
                Err(e) => tracing::warn!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "connect failed"
                ),
            }
            result
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
