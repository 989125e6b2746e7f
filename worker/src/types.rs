//! Public types consumed by the engine.
//!
//! The engine builds a [`WorkerConfig`], receives [`BrokerEvent`]s and can
//! inspect the broker's [`BrokerState`].

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use lintbridge_types::Generation;

const fn default_restart_delay_ms() -> u64 {
    1_000
}

const fn default_max_restart_delay_ms() -> u64 {
    30_000
}

const fn default_request_timeout_secs() -> u64 {
    30
}

/// How to launch the worker and how patient to be with it.
///
/// ```toml
/// [worker]
/// command = "node"
/// args = ["./eslint-worker.js"]
/// restart_delay_ms = 1000
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    /// Delay before the first respawn after a crash.
    #[serde(default = "default_restart_delay_ms")]
    restart_delay_ms: u64,
    /// Upper bound for the doubling delay after repeated crashes.
    #[serde(default = "default_max_restart_delay_ms")]
    max_restart_delay_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
}

impl WorkerConfig {
    #[must_use]
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            restart_delay_ms: default_restart_delay_ms(),
            max_restart_delay_ms: default_max_restart_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    #[must_use]
    pub fn with_restart_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.restart_delay_ms = initial.as_millis() as u64;
        self.max_restart_delay_ms = max.as_millis() as u64;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_secs = timeout.as_secs().max(1);
        self
    }

    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    #[must_use]
    pub fn max_restart_delay(&self) -> Duration {
        Duration::from_millis(self.max_restart_delay_ms.max(self.restart_delay_ms))
    }

    /// Never below one second; a zero timeout would fail every request.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Why a worker generation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The worker closed its output stream.
    Exited,
    /// Reading from the worker failed.
    Failed(String),
    /// The worker never started.
    SpawnFailed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited => f.write_str("worker exited"),
            Self::Failed(msg) => write!(f, "worker channel failed: {msg}"),
            Self::SpawnFailed(msg) => write!(f, "worker failed to start: {msg}"),
        }
    }
}

/// Lifecycle notifications published by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    Started {
        generation: Generation,
    },
    /// A worker died while the broker was active; a replacement is scheduled.
    Crashed {
        generation: Generation,
        reason: StopReason,
        restart_in: Duration,
    },
}

/// Where the broker is in its supervision loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerState {
    Starting,
    Running,
    Restarting,
    Stopped,
}
