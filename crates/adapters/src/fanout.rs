// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fan-out dispatcher
//!
//! One shared bounded queue feeds every registered destination. The
//! dispatcher hands each item to each sender in turn, so a destination whose
//! queue is full holds back delivery to all of them.

use crate::error::SenderError;
use crate::sender::{ReliableSender, SenderConfig};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

type Senders = Arc<RwLock<BTreeMap<String, Arc<ReliableSender>>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanoutConfig {
    pub queue_capacity: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 1000,
        }
    }
}

pub struct FanoutDispatcher {
    queue_tx: mpsc::Sender<Bytes>,
    queue_rx: std::sync::Mutex<Option<mpsc::Receiver<Bytes>>>,
    senders: Senders,
    canceled: watch::Sender<bool>,
    task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl FanoutDispatcher {
    pub fn new(config: FanoutConfig) -> Self {
        let (queue_tx, queue_rx) = mpsc::channel(config.queue_capacity.max(1));
        let (canceled, _) = watch::channel(false);
        Self {
            queue_tx,
            queue_rx: std::sync::Mutex::new(Some(queue_rx)),
            senders: Arc::new(RwLock::new(BTreeMap::new())),
            canceled,
            task: std::sync::Mutex::new(None),
        }
    }

    /// Start the dispatcher task; later calls do nothing
    pub fn start_up(&self) {
        if *self.canceled.borrow() {
            return;
        }
        let Some(queue) = lock(&self.queue_rx).take() else {
            return;
        };
        let task = tokio::spawn(dispatch_loop(
            queue,
            Arc::clone(&self.senders),
            self.canceled.subscribe(),
        ));
        *lock(&self.task) = Some(task);
    }

    /// Add a TCP destination for `config.target`
    ///
    /// Returns false when the target is already registered.
    pub fn add_destination(&self, config: SenderConfig) -> bool {
        self.add_sender(ReliableSender::tcp(config))
    }

    /// Register and start `sender` unless its target is already present
    pub fn add_sender(&self, sender: ReliableSender) -> bool {
        if *self.canceled.borrow() {
            return false;
        }
        let mut senders = self.write();
        if senders.contains_key(sender.target()) {
            tracing::debug!(target = %sender.target(), "destination already registered");
            return false;
        }
        sender.start_up();
        tracing::info!(target = %sender.target(), "destination added");
        senders.insert(sender.target().to_string(), Arc::new(sender));
        true
    }

    /// Unregister and shut down the sender for `target`
    pub async fn remove_destination(&self, target: &str) -> bool {
        let removed = self.write().remove(target);
        match removed {
            Some(sender) => {
                sender.shut_down().await;
                tracing::info!(target, "destination removed");
                true
            }
            None => false,
        }
    }

    /// Registered targets, sorted
    pub fn destinations(&self) -> Vec<String> {
        self.senders
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    pub fn sender(&self, target: &str) -> Option<Arc<ReliableSender>> {
        self.senders
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(target)
            .cloned()
    }

    /// Queue one item for every destination, waiting while the queue is full
    pub async fn send(&self, item: impl Into<Bytes>) -> Result<(), SenderError> {
        let mut canceled = self.canceled.subscribe();
        if *canceled.borrow() {
            return Err(SenderError::Canceled);
        }
        tokio::select! {
            result = self.queue_tx.send(item.into()) => result.map_err(|_| SenderError::Canceled),
            _ = until_canceled(&mut canceled) => Err(SenderError::Canceled),
        }
    }

    /// Stop dispatching and shut down every sender; later calls do nothing
    pub async fn shut_down(&self) {
        if self.canceled.send_replace(true) {
            return;
        }

        // Shutting the senders down first releases a dispatcher blocked on one
        let senders: Vec<_> = std::mem::take(&mut *self.write()).into_values().collect();
        for sender in &senders {
            sender.shut_down().await;
        }

        let task = lock(&self.task).take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "dispatcher task failed");
            }
        }

        tracing::info!(destinations = senders.len(), "fan-out shut down");
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Arc<ReliableSender>>> {
        self.senders.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for FanoutDispatcher {
    fn drop(&mut self) {
        self.canceled.send_replace(true);
    }
}

fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

async fn until_canceled(canceled: &mut watch::Receiver<bool>) {
    let _ = canceled.wait_for(|c| *c).await;
}

async fn dispatch_loop(
    mut queue: mpsc::Receiver<Bytes>,
    senders: Senders,
    mut canceled: watch::Receiver<bool>,
) {
    loop {
        let item = tokio::select! {
            biased;
            _ = until_canceled(&mut canceled) => break,
            item = queue.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };

        let targets: Vec<_> = senders
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        for sender in targets {
            if let Err(e) = sender.send(item.clone()).await {
                tracing::debug!(target = %sender.target(), error = %e, "item not queued");
            }
        }
    }

    queue.close();
    let mut drained = 0u64;
    while queue.try_recv().is_ok() {
        drained += 1;
    }
    tracing::debug!(drained, "dispatcher stopped");
}

#[cfg(test)]
#[path = "fanout_tests.rs"]
mod tests;
