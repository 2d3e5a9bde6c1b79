// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration, read from a TOML file

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use evl_adapters::{FanoutConfig, SenderConfig};
use evl_storage::{Layout, StoreOptions, DEFAULT_MAX_SEQUENCE, MAX_RECORD_NUMBER};
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_INDEX_CHECK: Duration = Duration::from_secs(5);
const DEFAULT_DISPATCH_CAPACITY: usize = 1000;

/// Errors that can occur while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not determine a state directory")]
    NoStateDir,

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Payload type carried by a listener or forward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Logging,
    Access,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Logging => "logging",
            EventKind::Access => "access",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record layout of the stores the daemon creates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreLayout {
    #[default]
    Dense,
    Sparse,
}

impl From<StoreLayout> for Layout {
    fn from(layout: StoreLayout) -> Self {
        match layout {
            StoreLayout::Dense => Layout::Dense,
            StoreLayout::Sparse => Layout::Sparse,
        }
    }
}

/// One inbound TCP listener
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListenerConfig {
    pub bind: String,
    pub kind: EventKind,
}

/// One outbound forwarding destination
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForwardConfig {
    pub target: String,
    pub kind: EventKind,
    #[serde(default = "defaults::connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,
    #[serde(default = "defaults::write_timeout", with = "humantime_serde")]
    pub write_timeout: Duration,
    #[serde(default = "defaults::reconnect_delay", with = "humantime_serde")]
    pub reconnect_delay: Duration,
    #[serde(default = "defaults::queue_capacity")]
    pub queue_capacity: usize,
    /// Zero disables the heartbeat
    #[serde(default = "defaults::heartbeat_interval", with = "humantime_serde")]
    pub heartbeat_interval: Duration,
}

impl ForwardConfig {
    pub fn new(target: impl Into<String>, kind: EventKind) -> Self {
        Self {
            target: target.into(),
            kind,
            connect_timeout: defaults::connect_timeout(),
            write_timeout: defaults::write_timeout(),
            reconnect_delay: defaults::reconnect_delay(),
            queue_capacity: defaults::queue_capacity(),
            heartbeat_interval: defaults::heartbeat_interval(),
        }
    }

    pub fn sender_config(&self) -> SenderConfig {
        let heartbeat = (!self.heartbeat_interval.is_zero()).then_some(self.heartbeat_interval);
        SenderConfig::new(self.target.clone())
            .with_connect_timeout(self.connect_timeout)
            .with_write_timeout(self.write_timeout)
            .with_reconnect_delay(self.reconnect_delay)
            .with_queue_capacity(self.queue_capacity)
            .with_heartbeat_interval(heartbeat)
    }
}

mod defaults {
    use std::time::Duration;

    pub fn connect_timeout() -> Duration {
        Duration::from_secs(10)
    }

    pub fn write_timeout() -> Duration {
        Duration::from_secs(5)
    }

    pub fn reconnect_delay() -> Duration {
        Duration::from_secs(30)
    }

    pub fn queue_capacity() -> usize {
        1000
    }

    pub fn heartbeat_interval() -> Duration {
        Duration::from_secs(45)
    }
}

/// File representation; paths are resolved into [`Config`]
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    state_dir: Option<PathBuf>,
    log_path: Option<PathBuf>,
    #[serde(default, with = "humantime_serde")]
    index_check_interval: Option<Duration>,
    #[serde(default)]
    layout: StoreLayout,
    max_sequence: Option<u64>,
    dispatch_queue_capacity: Option<usize>,
    #[serde(default, rename = "listener")]
    listeners: Vec<ListenerConfig>,
    #[serde(default, rename = "forward")]
    forwards: Vec<ForwardConfig>,
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of every store and of the lock file
    pub state_dir: PathBuf,
    pub log_path: PathBuf,
    /// Tick of the shared index watcher
    pub index_check_interval: Duration,
    pub layout: StoreLayout,
    /// Highest local id a sparse store accepts
    pub max_sequence: u64,
    pub dispatch_queue_capacity: usize,
    pub listeners: Vec<ListenerConfig>,
    pub forwards: Vec<ForwardConfig>,
}

impl Config {
    /// Listener-less configuration rooted at `state_dir`
    pub fn default_for(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        Self {
            log_path: state_dir.join("evld.log"),
            state_dir,
            index_check_interval: DEFAULT_INDEX_CHECK,
            layout: StoreLayout::Dense,
            max_sequence: DEFAULT_MAX_SEQUENCE,
            dispatch_queue_capacity: DEFAULT_DISPATCH_CAPACITY,
            listeners: Vec::new(),
            forwards: Vec::new(),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        let state_dir = match file.state_dir {
            Some(dir) => dir,
            None => default_state_dir()?,
        };

        let mut config = Self::default_for(state_dir);
        if let Some(log_path) = file.log_path {
            config.log_path = log_path;
        }
        if let Some(interval) = file.index_check_interval {
            config.index_check_interval = interval;
        }
        if let Some(max) = file.max_sequence {
            config.max_sequence = max;
        }
        if let Some(capacity) = file.dispatch_queue_capacity {
            config.dispatch_queue_capacity = capacity;
        }
        config.layout = file.layout;
        config.listeners = file.listeners;
        config.forwards = file.forwards;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.index_check_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "index_check_interval must be positive".to_string(),
            ));
        }
        if self.max_sequence > MAX_RECORD_NUMBER {
            return Err(ConfigError::Invalid(format!(
                "max_sequence must be at most {MAX_RECORD_NUMBER}"
            )));
        }
        if self.dispatch_queue_capacity == 0 {
            return Err(ConfigError::Invalid(
                "dispatch_queue_capacity must be positive".to_string(),
            ));
        }

        let mut binds = HashSet::new();
        for listener in &self.listeners {
            if !binds.insert(listener.bind.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate listener bind {}",
                    listener.bind
                )));
            }
        }

        let mut targets = HashSet::new();
        for forward in &self.forwards {
            if forward.queue_capacity == 0 {
                return Err(ConfigError::Invalid(format!(
                    "forward {} has zero queue_capacity",
                    forward.target
                )));
            }
            if !targets.insert((forward.kind, forward.target.as_str())) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate {} forward to {}",
                    forward.kind, forward.target
                )));
            }
        }
        Ok(())
    }

    /// Options for every store the daemon creates
    pub fn store_options(&self) -> StoreOptions {
        StoreOptions::new(self.layout.into()).with_max_sequence(self.max_sequence)
    }

    /// Path to the lock/PID file
    pub fn lock_path(&self) -> PathBuf {
        self.state_dir.join("evld.pid")
    }

    /// Directory holding the stores of one payload kind
    pub fn store_root(&self, kind: EventKind) -> PathBuf {
        self.state_dir.join(kind.as_str())
    }

    pub fn fanout_config(&self) -> FanoutConfig {
        FanoutConfig {
            queue_capacity: self.dispatch_queue_capacity,
        }
    }

    pub fn forwards_for(&self, kind: EventKind) -> impl Iterator<Item = &ForwardConfig> {
        self.forwards.iter().filter(move |f| f.kind == kind)
    }
}

/// `<local data dir>/evl`
pub fn default_state_dir() -> Result<PathBuf, ConfigError> {
    dirs::data_local_dir()
        .map(|dir| dir.join("evl"))
        .ok_or(ConfigError::NoStateDir)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
