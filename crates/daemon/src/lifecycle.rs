// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use evl_core::{AccessEvent, LoggingEvent};
use evl_engine::IndexWatcher;
use fs2::FileExt;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{Config, ConfigError, EventKind};
use crate::ingest::Ingest;
use crate::server;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind listener at {0}: {1}")]
    BindFailed(String, std::io::Error),

    #[error("Invalid log path: {}", .0.display())]
    InvalidLogPath(std::path::PathBuf),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon state during operation
pub struct Daemon {
    config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    logging: Arc<Ingest<LoggingEvent>>,
    access: Arc<Ingest<AccessEvent>>,
    watcher: Arc<IndexWatcher>,
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    local_addrs: Vec<(EventKind, SocketAddr)>,
    start_time: Instant,
}

/// What shutdown closed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ShutdownSummary {
    pub logging_sources: usize,
    pub access_sources: usize,
}

impl Daemon {
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Bound address of every listener, in config order
    pub fn local_addrs(&self) -> &[(EventKind, SocketAddr)] {
        &self.local_addrs
    }

    pub fn local_addr(&self, kind: EventKind) -> Option<SocketAddr> {
        self.local_addrs
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, addr)| *addr)
    }

    pub fn logging(&self) -> &Ingest<LoggingEvent> {
        &self.logging
    }

    pub fn access(&self) -> &Ingest<AccessEvent> {
        &self.access
    }

    pub fn watcher(&self) -> &IndexWatcher {
        &self.watcher
    }

    /// Shutdown the daemon gracefully
    ///
    /// Stops accepting producers, stops forwarding, then closes every
    /// active store without deleting its files.
    pub async fn shutdown(self) -> ShutdownSummary {
        info!("Shutting down daemon...");

        // 1. Stop listeners, connections and the index watcher
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "daemon task failed");
            }
        }

        // 2. Stop forwarding and close stores
        let logging_active = self.logging.active_sources();
        let access_active = self.access.active_sources();
        info!(
            logging = ?logging_active,
            access = ?access_active,
            "closing active sources"
        );
        let summary = ShutdownSummary {
            logging_sources: self.logging.shut_down().await,
            access_sources: self.access.shut_down().await,
        };

        // 3. Remove PID file; the lock is released when lock_file drops
        let lock_path = self.config.lock_path();
        if lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        info!(
            logging_sources = summary.logging_sources,
            access_sources = summary.access_sources,
            uptime_secs = self.start_time.elapsed().as_secs(),
            "Daemon shutdown complete"
        );
        summary
    }
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<Daemon, LifecycleError> {
    config.validate()?;
    std::fs::create_dir_all(&config.state_dir)?;

    // Acquire lock file FIRST - prevents races
    let lock_file = acquire_lock(config)?;

    match startup_inner(config, lock_file).await {
        Ok(daemon) => Ok(daemon),
        Err(e) => {
            // Clean up any resources created before failure
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

fn acquire_lock(config: &Config) -> Result<File, LifecycleError> {
    let mut lock_file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(config.lock_path())?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    Ok(lock_file)
}

/// Inner startup logic - cleanup_on_failure called if this fails
async fn startup_inner(config: &Config, lock_file: File) -> Result<Daemon, LifecycleError> {
    let options = config.store_options();
    let watcher = Arc::new(IndexWatcher::new());

    let logging = Arc::new(Ingest::<LoggingEvent>::new(
        EventKind::Logging,
        &config.store_root(EventKind::Logging),
        options.clone(),
        Arc::clone(&watcher),
        config.fanout_config(),
    ));
    let access = Arc::new(Ingest::<AccessEvent>::new(
        EventKind::Access,
        &config.store_root(EventKind::Access),
        options,
        Arc::clone(&watcher),
        config.fanout_config(),
    ));

    // Bind every listener before anything runs (LAST fallible step)
    let mut listeners = Vec::with_capacity(config.listeners.len());
    for listener in &config.listeners {
        let bound = TcpListener::bind(&listener.bind)
            .await
            .map_err(|e| LifecycleError::BindFailed(listener.bind.clone(), e))?;
        listeners.push((listener.kind, bound));
    }

    logging.start_up(config.forwards_for(EventKind::Logging));
    access.start_up(config.forwards_for(EventKind::Access));

    let (shutdown, shutdown_rx) = watch::channel(false);
    let mut tasks = Vec::with_capacity(listeners.len() + 1);
    let mut local_addrs = Vec::with_capacity(listeners.len());

    for (kind, listener) in listeners {
        let addr = listener.local_addr()?;
        info!(%kind, %addr, "listening");
        local_addrs.push((kind, addr));

        let rx = shutdown_rx.clone();
        let task = match kind {
            EventKind::Logging => tokio::spawn(server::accept_loop(listener, Arc::clone(&logging), rx)),
            EventKind::Access => tokio::spawn(server::accept_loop(listener, Arc::clone(&access), rx)),
        };
        tasks.push(task);
    }

    tasks.push(tokio::spawn(
        Arc::clone(&watcher).run(config.index_check_interval, shutdown_rx),
    ));

    info!(
        state_dir = %config.state_dir.display(),
        listeners = local_addrs.len(),
        forwards = config.forwards.len(),
        "Daemon started"
    );

    Ok(Daemon {
        config: config.clone(),
        lock_file,
        logging,
        access,
        watcher,
        shutdown,
        tasks,
        local_addrs,
        start_time: Instant::now(),
    })
}

/// Clean up resources created during a failed startup
fn cleanup_on_failure(config: &Config) {
    let lock_path = config.lock_path();
    if lock_path.exists() {
        let _ = std::fs::remove_file(&lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
