use lintbridge_types::Generation;

/// Why a worker request did not produce a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkerError {
    /// The worker could not be started; every request to this handle fails.
    #[error("worker failed to start: {0}")]
    SpawnFailed(String),
    /// A replacement worker is scheduled but not running yet.
    #[error("worker is restarting, retry shortly")]
    Unavailable,
    /// The broker has been shut down.
    #[error("worker broker has been shut down")]
    Stopped,
    /// The worker exited (or its channel broke) before answering.
    #[error("worker {generation} exited before responding")]
    Disconnected { generation: Generation },
    #[error("worker did not respond within {secs}s")]
    Timeout { secs: u64 },
    /// The worker answered with an error; the message is the worker's own.
    #[error("{0}")]
    Rejected(String),
    /// The reply could not be decoded into the expected shape.
    #[error("malformed worker response: {0}")]
    Protocol(String),
}

impl WorkerError {
    /// Errors caused by worker availability rather than by the job itself.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Unavailable | Self::Disconnected { .. } | Self::Timeout { .. }
        )
    }
}
