//! `WorkerBroker`, the public API consumed by the engine.
//!
//! The broker keeps exactly one worker alive and turns "send this job" into a
//! future that resolves with the worker's reply. A supervisor task watches the
//! current generation; when it dies while the broker is active, the slot moves
//! to `Restarting`, a [`BrokerEvent::Crashed`] is published and a single
//! [`ScheduledRetry`] brings up the next generation.
//!
//! ```text
//! Starting ──launch──▶ Running ──exit──▶ Restarting ──delay──▶ Starting …
//!                         │                  │
//!                         └──── shutdown ────┴──▶ Stopped
//! ```

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use lintbridge_types::{Generation, LintMessage, WorkerJob};

use crate::error::WorkerError;
use crate::process::{WorkerHandle, WorkerLauncher, WorkerStopped};
use crate::retry::{RestartPolicy, RetryOutcome, ScheduledRetry};
use crate::types::{BrokerEvent, BrokerState, StopReason, WorkerConfig};

/// Capacity of the lifecycle event channel handed to the host.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the internal stop channel. One message per generation.
const STOP_CHANNEL_CAPACITY: usize = 8;

/// What currently occupies the worker slot.
enum Slot {
    Starting,
    Running(Arc<WorkerHandle>),
    Restarting,
    Stopped,
}

impl Slot {
    fn state(&self) -> BrokerState {
        match self {
            Self::Starting => BrokerState::Starting,
            Self::Running(_) => BrokerState::Running,
            Self::Restarting => BrokerState::Restarting,
            Self::Stopped => BrokerState::Stopped,
        }
    }
}

struct BrokerInner {
    /// Cleared before anything else on shutdown, so an exit caused by the
    /// teardown itself is never mistaken for a crash.
    active: AtomicBool,
    slot: Mutex<Slot>,
    cancel: CancellationToken,
    /// Crashes since the last answered request; drives the backoff.
    consecutive_crashes: AtomicU32,
    supervisor: Mutex<Option<JoinHandle<()>>>,
}

impl BrokerInner {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Launch `generation` and put it in the slot, unless shutdown won the race.
    fn install(
        &self,
        generation: Generation,
        launcher: &dyn WorkerLauncher,
        stop_tx: &mpsc::Sender<WorkerStopped>,
        request_timeout: Duration,
        events: &mpsc::Sender<BrokerEvent>,
    ) {
        {
            let mut slot = self.slot();
            if matches!(*slot, Slot::Stopped) {
                return;
            }
            *slot = Slot::Starting;
        }

        let handle = WorkerHandle::spawn(generation, launcher, stop_tx, request_timeout);
        let live = handle.is_live();

        {
            let mut slot = self.slot();
            if matches!(*slot, Slot::Stopped) {
                return;
            }
            *slot = Slot::Running(Arc::new(handle));
        }

        if live {
            tracing::info!(%generation, "Worker started");
            publish(events, BrokerEvent::Started { generation });
        }
    }
}

fn publish(events: &mpsc::Sender<BrokerEvent>, event: BrokerEvent) {
    if let Err(e) = events.try_send(event) {
        tracing::debug!("Dropping broker event: {e}");
    }
}

/// Owner of the single long-lived worker.
///
/// Cheap to clone; all clones talk to the same worker. Requests are not
/// serialized: several may be in flight at once and each reply is matched to
/// its own request.
#[derive(Clone)]
pub struct WorkerBroker {
    inner: Arc<BrokerInner>,
}

impl WorkerBroker {
    /// Spawn the first worker and start supervising it.
    ///
    /// Must be called from within a Tokio runtime. A launch failure is not
    /// returned here: it surfaces on the first request and is retried like
    /// any other crash.
    pub fn start(
        config: &WorkerConfig,
        launcher: Arc<dyn WorkerLauncher>,
    ) -> (Self, mpsc::Receiver<BrokerEvent>) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (stop_tx, stop_rx) = mpsc::channel(STOP_CHANNEL_CAPACITY);

        let inner = Arc::new(BrokerInner {
            active: AtomicBool::new(true),
            slot: Mutex::new(Slot::Starting),
            cancel: CancellationToken::new(),
            consecutive_crashes: AtomicU32::new(0),
            supervisor: Mutex::new(None),
        });

        let generation = Generation::default().next();
        let request_timeout = config.request_timeout();
        inner.install(
            generation,
            launcher.as_ref(),
            &stop_tx,
            request_timeout,
            &event_tx,
        );

        let supervisor = Supervisor {
            inner: Arc::clone(&inner),
            launcher,
            policy: RestartPolicy::from_config(config),
            request_timeout,
            stop_tx,
            stop_rx,
            events: event_tx,
        };
        let task = tokio::spawn(supervisor.run(generation));
        *inner
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(task);

        (Self { inner }, event_rx)
    }

    #[must_use]
    pub fn state(&self) -> BrokerState {
        self.inner.slot().state()
    }

    /// Generation of the worker in the slot, if one is installed.
    #[must_use]
    pub fn generation(&self) -> Option<Generation> {
        match &*self.inner.slot() {
            Slot::Running(handle) => Some(handle.generation()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    fn current(&self) -> Result<Arc<WorkerHandle>, WorkerError> {
        if !self.inner.is_active() {
            return Err(WorkerError::Stopped);
        }
        match &*self.inner.slot() {
            Slot::Running(handle) => Ok(Arc::clone(handle)),
            Slot::Starting | Slot::Restarting => Err(WorkerError::Unavailable),
            Slot::Stopped => Err(WorkerError::Stopped),
        }
    }

    /// Send a job and wait for the raw reply.
    pub async fn request(&self, job: &WorkerJob) -> Result<serde_json::Value, WorkerError> {
        let handle = self.current()?;
        let result = handle.request(job).await;
        if matches!(result, Ok(_) | Err(WorkerError::Rejected(_))) {
            // The worker answered, so it is healthy again.
            self.inner.consecutive_crashes.store(0, Ordering::SeqCst);
        }
        result
    }

    /// Send a lint job and decode the list of messages.
    pub async fn lint(&self, job: &WorkerJob) -> Result<Vec<LintMessage>, WorkerError> {
        let reply = self.request(job).await?;
        if reply.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(reply).map_err(|e| WorkerError::Protocol(e.to_string()))
    }

    /// Send a fix job and return the worker's summary text.
    pub async fn fix(&self, job: &WorkerJob) -> Result<String, WorkerError> {
        match self.request(job).await? {
            serde_json::Value::String(summary) => Ok(summary),
            serde_json::Value::Null => Ok(String::new()),
            other => Ok(other.to_string()),
        }
    }

    /// Tear down the broker.
    ///
    /// Order: clear the active flag, cancel any scheduled restart, then
    /// release the worker. Idempotent.
    pub async fn shutdown(&self) {
        if !self.inner.active.swap(false, Ordering::SeqCst) {
            return;
        }
        self.inner.cancel.cancel();

        let previous = std::mem::replace(&mut *self.inner.slot(), Slot::Stopped);
        if let Slot::Running(handle) = previous {
            tracing::info!(generation = %handle.generation(), "Shutting down worker");
            handle.shutdown().await;
        }

        let task = self
            .inner
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

/// Background task that respawns crashed workers.
struct Supervisor {
    inner: Arc<BrokerInner>,
    launcher: Arc<dyn WorkerLauncher>,
    policy: RestartPolicy,
    request_timeout: Duration,
    stop_tx: mpsc::Sender<WorkerStopped>,
    stop_rx: mpsc::Receiver<WorkerStopped>,
    events: mpsc::Sender<BrokerEvent>,
}

impl Supervisor {
    async fn run(mut self, mut generation: Generation) {
        loop {
            let inner = Arc::clone(&self.inner);
            let reason = tokio::select! {
                biased;
                () = inner.cancel.cancelled() => break,
                reason = self.wait_for_stop(generation) => reason,
            };
            let Some(reason) = reason else { break };

            if !self.inner.is_active() {
                tracing::debug!(%generation, "Worker stopped after shutdown; not restarting");
                break;
            }

            let crashes = self.inner.consecutive_crashes.fetch_add(1, Ordering::SeqCst) + 1;
            let delay = self.policy.delay_for(crashes);
            {
                let mut slot = self.inner.slot();
                if matches!(*slot, Slot::Stopped) {
                    break;
                }
                *slot = Slot::Restarting;
            }

            tracing::warn!(
                %generation,
                %reason,
                crashes,
                restart_in_ms = delay.as_millis() as u64,
                "Worker died unexpectedly"
            );
            // Crash events must reach the host; wait for room instead of dropping.
            let crashed = BrokerEvent::Crashed {
                generation,
                reason,
                restart_in: delay,
            };
            tokio::select! {
                biased;
                () = self.inner.cancel.cancelled() => break,
                sent = self.events.send(crashed) => {
                    if sent.is_err() {
                        tracing::debug!(%generation, "Event receiver gone; crash not reported");
                    }
                }
            }

            let retry = ScheduledRetry::new(delay, self.inner.cancel.child_token());
            if retry.wait().await == RetryOutcome::Cancelled || !self.inner.is_active() {
                break;
            }

            generation = generation.next();
            self.inner.install(
                generation,
                self.launcher.as_ref(),
                &self.stop_tx,
                self.request_timeout,
                &self.events,
            );
        }
        tracing::debug!("Worker supervisor exiting");
    }

    /// Wait for the end of `generation`, skipping reports from older ones.
    async fn wait_for_stop(&mut self, generation: Generation) -> Option<StopReason> {
        while let Some(stopped) = self.stop_rx.recv().await {
            if stopped.generation == generation {
                return Some(stopped.reason);
            }
            tracing::trace!(
                stale = %stopped.generation,
                current = %generation,
                "Ignoring stop report from an old worker"
            );
        }
        None
    }
}
