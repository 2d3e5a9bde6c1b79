// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event ingestion daemon (evld)
//!
//! Accepts producer connections, stores each source's events and
//! forwards them to remote collectors until signalled to stop.

use std::path::PathBuf;

use evl_daemon::{config, lifecycle, Config, LifecycleError};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let config = match args.get(1) {
        Some(path) => Config::load(&PathBuf::from(path))?,
        None => default_config()?,
    };

    // Write startup marker to log (before tracing setup)
    write_startup_marker(&config)?;

    // Set up logging
    let log_guard = setup_logging(&config)?;

    info!("Starting evld in {}", config.state_dir.display());

    // Start daemon
    let daemon = match lifecycle::startup(&config).await {
        Ok(d) => d,
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    // Set up signal handlers
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    for (kind, addr) in daemon.local_addrs() {
        info!("Daemon ready, accepting {} events on {}", kind, addr);
    }

    // Signal ready for a supervising parent process
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
    }
    daemon.shutdown().await;

    info!("Daemon stopped");
    Ok(())
}

/// `<state_dir>/evld.toml` when present, otherwise a listener-less default
fn default_config() -> Result<Config, config::ConfigError> {
    let state_dir = config::default_state_dir()?;
    let path = state_dir.join("evld.toml");
    if path.exists() {
        Config::load(&path)
    } else {
        Ok(Config::default_for(state_dir))
    }
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- evld: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- evld: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let invalid = || LifecycleError::InvalidLogPath(config.log_path.clone());
    let dir = config.log_path.parent().ok_or_else(invalid)?;
    let file = config.log_path.file_name().ok_or_else(invalid)?;
    std::fs::create_dir_all(dir)?;

    let file_appender = tracing_appender::rolling::never(dir, file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Set up subscriber with env filter
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
