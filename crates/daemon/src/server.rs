// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound socket server: one task per producer connection

use std::collections::HashMap;
use std::sync::Arc;

use evl_adapters::{read_frame, FrameError, DEFAULT_MAX_FRAME};
use evl_core::{EventWrapper, SourceIdentifier};
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ingest::{Ingest, Payload};

/// Errors that end a producer connection
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("framing error: {0}")]
    Frame(#[from] FrameError),
}

/// What one connection delivered
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionSummary {
    pub frames: u64,
    pub heartbeats: u64,
    /// Frames that were not a JSON array of wrappers
    pub rejected: u64,
    pub events: u64,
    /// Sources closed on the producer's behalf when the connection ended
    pub closed_sources: Vec<SourceIdentifier>,
}

/// Sources seen on a connection that have not sent end-of-stream yet,
/// with the highest local id seen for each
#[derive(Default)]
struct OpenSources {
    last_ids: HashMap<SourceIdentifier, i64>,
}

impl OpenSources {
    fn observe<T>(&mut self, batch: &[EventWrapper<T>]) {
        for event in batch {
            let Some(identifier) = &event.identifier else {
                continue;
            };
            if event.is_end_of_stream() {
                self.last_ids.remove(&identifier.source);
            } else {
                let last = self
                    .last_ids
                    .entry(identifier.source.clone())
                    .or_insert(identifier.local_id);
                *last = (*last).max(identifier.local_id);
            }
        }
    }

    fn into_sentinels<T>(self) -> Vec<EventWrapper<T>> {
        let mut open: Vec<_> = self.last_ids.into_iter().collect();
        open.sort();
        open.into_iter()
            .map(|(source, last)| EventWrapper::end_of_stream(source, last.saturating_add(1)))
            .collect()
    }
}

/// Read frames from one producer until it disconnects or `shutdown` fires.
///
/// A producer that disconnects (cleanly or not) has every source it left
/// open retired. Shutdown leaves the sources open so their files survive.
pub async fn handle_connection<T, S>(
    ingest: &Ingest<T>,
    mut stream: S,
    mut shutdown: watch::Receiver<bool>,
) -> (ConnectionSummary, Result<(), ServerError>)
where
    T: Payload,
    S: AsyncRead + Unpin,
{
    let mut summary = ConnectionSummary::default();
    let mut open = OpenSources::default();

    let result = loop {
        let frame = tokio::select! {
            biased;
            _ = until_shutdown(&mut shutdown) => return (summary, Ok(())),
            frame = read_frame(&mut stream, DEFAULT_MAX_FRAME) => frame,
        };

        let payload = match frame {
            Ok(Some(payload)) => payload,
            Ok(None) => break Ok(()),
            Err(e) => break Err(ServerError::from(e)),
        };

        if payload.is_empty() {
            summary.heartbeats += 1;
            continue;
        }
        summary.frames += 1;

        let batch = match ingest.decode_batch(&payload) {
            Ok(batch) => batch,
            Err(e) => {
                warn!(kind = %ingest.kind(), len = payload.len(), error = %e, "undecodable frame");
                summary.rejected += 1;
                continue;
            }
        };
        summary.events += batch.len() as u64;
        open.observe(&batch);
        ingest.ingest(batch).await;
    };

    let sentinels: Vec<EventWrapper<T>> = open.into_sentinels();
    if !sentinels.is_empty() {
        summary.closed_sources = sentinels.iter().filter_map(|s| s.source().cloned()).collect();
        ingest.ingest(sentinels).await;
    }
    (summary, result)
}

async fn until_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// Accept producers on `listener` until `shutdown` fires, then wait for
/// every connection task to finish
pub async fn accept_loop<T: Payload>(
    listener: TcpListener,
    ingest: Arc<Ingest<T>>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = until_shutdown(&mut shutdown) => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let ingest = Arc::clone(&ingest);
                    let shutdown = shutdown.clone();
                    connections.spawn(async move {
                        let connection = Uuid::new_v4();
                        debug!(%connection, %peer, kind = %ingest.kind(), "producer connected");
                        let (summary, result) = handle_connection(&ingest, stream, shutdown).await;
                        if let Err(e) = result {
                            warn!(%connection, %peer, error = %e, "producer connection failed");
                        }
                        info!(
                            %connection,
                            %peer,
                            frames = summary.frames,
                            events = summary.events,
                            rejected = summary.rejected,
                            closed = summary.closed_sources.len(),
                            "producer disconnected"
                        );
                    });
                }
                Err(e) => warn!(error = %e, "accept failed"),
            },
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = joined {
                    warn!(error = %e, "connection task failed");
                }
            }
        }
    }

    while let Some(joined) = connections.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "connection task failed");
        }
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
