//! Restart scheduling for crashed workers.
//!
//! - First restart after `initial_delay` (1s by default)
//! - Each further crash without a successful response in between doubles it
//! - Capped at `max_delay`
//!
//! No jitter: there is only ever one worker, so there is no herd to spread.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::types::WorkerConfig;

/// Delay schedule for respawning a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RestartPolicy {
    #[must_use]
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            initial_delay: config.restart_delay(),
            max_delay: config.max_restart_delay(),
        }
    }

    /// Delay before the next respawn.
    ///
    /// `consecutive_crashes` counts crashes since the last successful
    /// response, including the one being handled (so it is at least 1).
    #[must_use]
    pub fn delay_for(&self, consecutive_crashes: u32) -> Duration {
        let exponent = consecutive_crashes.saturating_sub(1).min(16);
        self.initial_delay
            .saturating_mul(1 << exponent)
            .min(self.max_delay)
    }
}

/// How a scheduled retry ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The delay elapsed; the caller should respawn now.
    Elapsed,
    /// The broker was shut down while waiting.
    Cancelled,
}

/// A single pending respawn: a timer that can be cancelled.
#[derive(Debug)]
pub struct ScheduledRetry {
    delay: Duration,
    cancel: CancellationToken,
}

impl ScheduledRetry {
    #[must_use]
    pub fn new(delay: Duration, cancel: CancellationToken) -> Self {
        Self { delay, cancel }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait for the delay or for cancellation, whichever comes first.
    ///
    /// Cancellation wins ties: a token cancelled before the wait starts
    /// never reports `Elapsed`, even with a zero delay.
    pub async fn wait(self) -> RetryOutcome {
        if self.cancel.is_cancelled() {
            return RetryOutcome::Cancelled;
        }
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => RetryOutcome::Cancelled,
            () = tokio::time::sleep(self.delay) => RetryOutcome::Elapsed,
        }
    }
}
