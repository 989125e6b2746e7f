//! Worker broker for the lint bridge.
//!
//! Owns a single out-of-process lint worker and turns jobs into replies over
//! a Content-Length framed JSON-RPC channel on the worker's stdin/stdout.
//!
//! - [`WorkerBroker`] is the facade: `start`, `request`/`lint`/`fix`, `shutdown`
//! - A supervisor task respawns the worker with exponential backoff when it
//!   dies while the broker is active, publishing [`BrokerEvent`]s
//! - Each in-flight request is matched to its reply by id, so replies may
//!   arrive in any order
//! - Worker `log` notifications and stderr are forwarded to `tracing`

mod broker;
pub mod codec;
mod error;
mod process;
mod protocol;
mod retry;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
mod types;

pub use broker::WorkerBroker;
pub use error::WorkerError;
pub use process::{ProcessLauncher, WorkerIo, WorkerLauncher};
pub use retry::{RestartPolicy, RetryOutcome, ScheduledRetry};
pub use types::{BrokerEvent, BrokerState, StopReason, WorkerConfig};
