// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reliable sender
//!
//! One sender per destination. Items are queued on a bounded channel and
//! written by a background writer task. A separate reconnect task keeps a
//! connection installed, and an optional heartbeat task queues empty
//! payloads so a half-open connection shows up as a failed write.
//!
//! ```text
//! send() → [bounded queue] → writer ──frame──→ connection
//!                                  ↑ install
//!                              reconnect ←── state watch
//! ```

mod state;

pub use state::ConnectionState;

use crate::connector::{Connection, Connector, TcpConnector};
use crate::error::SenderError;
use crate::framing::{Framing, LengthPrefixed};
use crate::traced::TracedConnector;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};

/// Configuration for one destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderConfig {
    /// Destination address (host:port)
    pub target: String,
    pub connect_timeout: Duration,
    /// Bound on writing and flushing one batch
    pub write_timeout: Duration,
    /// Wait after each connect attempt before the next one
    pub reconnect_delay: Duration,
    pub queue_capacity: usize,
    /// `None` disables the heartbeat
    pub heartbeat_interval: Option<Duration>,
}

impl SenderConfig {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            connect_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(5),
            reconnect_delay: Duration::from_secs(30),
            queue_capacity: 1000,
            heartbeat_interval: Some(Duration::from_secs(45)),
        }
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_heartbeat_interval(mut self, interval: Option<Duration>) -> Self {
        self.heartbeat_interval = interval;
        self
    }
}

/// Point-in-time counters for one sender
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStats {
    pub written: u64,
    /// Items lost to a missing or failed connection
    pub discarded: u64,
    pub connects: u64,
}

#[derive(Default)]
struct Counters {
    written: AtomicU64,
    discarded: AtomicU64,
    connects: AtomicU64,
}

struct Inner {
    config: SenderConfig,
    connector: Box<dyn Connector>,
    framing: Box<dyn Framing>,
    queue_tx: mpsc::Sender<Bytes>,
    queue_rx: Mutex<mpsc::Receiver<Bytes>>,
    connection: Mutex<Option<Connection>>,
    state: watch::Sender<ConnectionState>,
    started: AtomicBool,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
    counters: Counters,
}

pub struct ReliableSender {
    inner: Arc<Inner>,
}

impl ReliableSender {
    /// Sender over traced TCP connections to `config.target`
    pub fn tcp(config: SenderConfig) -> Self {
        let connector = TracedConnector::new(TcpConnector::new(
            config.target.clone(),
            config.connect_timeout,
        ));
        Self::new(config, connector)
    }

    pub fn new(config: SenderConfig, connector: impl Connector) -> Self {
        Self::with_framing(config, connector, LengthPrefixed)
    }

    pub fn with_framing(
        config: SenderConfig,
        connector: impl Connector,
        framing: impl Framing + 'static,
    ) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (state, _) = watch::channel(ConnectionState::Offline);
        Self {
            inner: Arc::new(Inner {
                config,
                connector: Box::new(connector),
                framing: Box::new(framing),
                queue_tx,
                queue_rx: Mutex::new(queue_rx),
                connection: Mutex::new(None),
                state,
                started: AtomicBool::new(false),
                tasks: std::sync::Mutex::new(Vec::new()),
                counters: Counters::default(),
            }),
        }
    }

    pub fn target(&self) -> &str {
        self.inner.connector.target()
    }

    pub fn config(&self) -> &SenderConfig {
        &self.inner.config
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Watch state changes
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Items waiting in the queue
    pub fn queued(&self) -> usize {
        self.inner.queue_tx.max_capacity() - self.inner.queue_tx.capacity()
    }

    pub fn stats(&self) -> SenderStats {
        let counters = &self.inner.counters;
        SenderStats {
            written: counters.written.load(Ordering::Relaxed),
            discarded: counters.discarded.load(Ordering::Relaxed),
            connects: counters.connects.load(Ordering::Relaxed),
        }
    }

    /// Queue one item, waiting while the queue is full
    ///
    /// Fails with [`SenderError::Canceled`] once the sender is shut down;
    /// the item is dropped.
    pub async fn send(&self, item: impl Into<Bytes>) -> Result<(), SenderError> {
        self.inner.enqueue(item.into()).await
    }

    /// Start the background tasks; later calls do nothing
    pub fn start_up(&self) {
        if self.state().is_canceled() || self.inner.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut tasks = vec![
            tokio::spawn(write_loop(Arc::clone(&self.inner))),
            tokio::spawn(reconnect_loop(Arc::clone(&self.inner))),
        ];
        if let Some(interval) = self.inner.config.heartbeat_interval {
            tasks.push(tokio::spawn(heartbeat_loop(Arc::clone(&self.inner), interval)));
        }
        *self.inner.lock_tasks() = tasks;

        tracing::info!(target = %self.target(), "sender started");
    }

    /// Cancel, stop the background tasks and drain the queue
    ///
    /// Later calls do nothing.
    pub async fn shut_down(&self) {
        if self.inner.state.send_replace(ConnectionState::Canceled).is_canceled() {
            return;
        }

        let tasks = std::mem::take(&mut *self.inner.lock_tasks());
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(target = %self.target(), error = %e, "sender task failed");
            }
        }

        let mut queue = self.inner.queue_rx.lock().await;
        queue.close();
        let mut drained = 0u64;
        while queue.try_recv().is_ok() {
            drained += 1;
        }
        drop(queue);
        self.inner.close_connection().await;

        tracing::info!(target = %self.target(), drained, "sender shut down");
    }
}

impl Drop for ReliableSender {
    fn drop(&mut self) {
        // Stops any background task still holding the inner state
        self.inner.state.send_replace(ConnectionState::Canceled);
    }
}

impl Inner {
    fn target(&self) -> &str {
        self.connector.target()
    }

    fn is_canceled(&self) -> bool {
        self.state.borrow().is_canceled()
    }

    /// Apply a transition if the state machine allows it
    fn transition(&self, next: ConnectionState) -> bool {
        self.state.send_if_modified(|state| {
            if state.can_transition_to(next) {
                tracing::debug!(target = %self.connector.target(), from = %state, to = %next, "connection state");
                *state = next;
                true
            } else {
                false
            }
        })
    }

    async fn enqueue(&self, item: Bytes) -> Result<(), SenderError> {
        let mut state = self.state.subscribe();
        if state.borrow().is_canceled() {
            return Err(SenderError::Canceled);
        }

        tokio::select! {
            result = self.queue_tx.send(item) => result.map_err(|_| SenderError::Canceled),
            _ = until_canceled(&mut state) => {
                tracing::debug!(target = %self.target(), "sender canceled while queue full, item dropped");
                Err(SenderError::Canceled)
            }
        }
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Write a batch on the current connection, or discard it when there is none
    async fn write_batch(&self, batch: &mut Vec<Bytes>) {
        let count = batch.len() as u64;
        let mut connection = self.connection.lock().await;
        let Some(stream) = connection.as_mut() else {
            tracing::debug!(target = %self.target(), discarded = count, "no connection, batch discarded");
            self.counters.discarded.fetch_add(count, Ordering::Relaxed);
            batch.clear();
            return;
        };

        let mut buf = Vec::new();
        for item in batch.drain(..) {
            self.framing.frame(&item, &mut buf);
        }

        let result = timeout(self.config.write_timeout, async {
            stream.write_all(&buf).await?;
            stream.flush().await
        })
        .await;

        let error = match result {
            Ok(Ok(())) => {
                self.counters.written.fetch_add(count, Ordering::Relaxed);
                return;
            }
            Ok(Err(e)) => SenderError::Io(e),
            Err(_) => SenderError::WriteTimeout,
        };

        tracing::warn!(
            target = %self.target(),
            error = %error,
            lost = count,
            "write failed, closing connection"
        );
        self.counters.discarded.fetch_add(count, Ordering::Relaxed);
        *connection = None;
        self.transition(ConnectionState::Offline);
    }

    /// Attempt one connection; no lock is held while connecting
    async fn try_connect(&self) {
        if !self.transition(ConnectionState::Connecting) {
            return;
        }

        match self.connector.connect().await {
            Ok(stream) => {
                let mut connection = self.connection.lock().await;
                if self.is_canceled() {
                    tracing::debug!(target = %self.target(), "canceled while connecting, connection discarded");
                    return;
                }
                *connection = Some(stream);
                self.counters.connects.fetch_add(1, Ordering::Relaxed);
                self.transition(ConnectionState::Connected);
            }
            Err(e) => {
                tracing::debug!(
                    target = %self.target(),
                    error = %e,
                    retry_in_ms = self.config.reconnect_delay.as_millis() as u64,
                    "connect attempt failed"
                );
                self.transition(ConnectionState::Offline);
            }
        }
    }

    async fn close_connection(&self) {
        let stream = self.connection.lock().await.take();
        if let Some(mut stream) = stream {
            let _ = timeout(self.config.write_timeout, stream.shutdown()).await;
        }
        self.transition(ConnectionState::Offline);
    }
}

async fn write_loop(inner: Arc<Inner>) {
    let mut state = inner.state.subscribe();
    let mut queue = inner.queue_rx.lock().await;
    let mut batch = Vec::new();

    loop {
        tokio::select! {
            biased;
            _ = until_canceled(&mut state) => break,
            item = queue.recv() => match item {
                Some(item) => batch.push(item),
                None => break,
            },
        }
        while let Ok(item) = queue.try_recv() {
            batch.push(item);
        }
        tokio::select! {
            biased;
            _ = until_canceled(&mut state) => break,
            _ = inner.write_batch(&mut batch) => {}
        }
    }

    drop(queue);
    inner.close_connection().await;
    tracing::debug!(target = %inner.target(), "writer stopped");
}

async fn reconnect_loop(inner: Arc<Inner>) {
    let mut state = inner.state.subscribe();

    loop {
        let current = *state.borrow_and_update();
        match current {
            ConnectionState::Canceled => break,
            ConnectionState::Connected => {
                // Woken when the writer drops the connection
                let dropped = state.wait_for(|s| !s.is_connected()).await.is_ok();
                if !dropped {
                    break;
                }
                continue;
            }
            ConnectionState::Offline | ConnectionState::Connecting => {}
        }

        // The delay follows every attempt, so a peer that accepts and then
        // resets is not reconnected to in a tight loop
        inner.try_connect().await;
        tokio::select! {
            _ = tokio::time::sleep(inner.config.reconnect_delay) => {}
            _ = until_canceled(&mut state) => break,
        }
    }

    tracing::debug!(target = %inner.target(), "reconnect stopped");
}

async fn heartbeat_loop(inner: Arc<Inner>, interval: Duration) {
    let mut state = inner.state.subscribe();
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if inner.enqueue(Bytes::new()).await.is_err() {
                    break;
                }
                tracing::trace!(target = %inner.target(), "heartbeat queued");
            }
            _ = until_canceled(&mut state) => break,
        }
    }
}

/// Resolves once the state is canceled or the state owner is gone
async fn until_canceled(state: &mut watch::Receiver<ConnectionState>) {
    let _ = state.wait_for(ConnectionState::is_canceled).await;
}

#[cfg(test)]
#[path = "sender_tests.rs"]
mod tests;
