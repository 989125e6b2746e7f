//! Worker handle: owns one worker incarnation and its request/response channel.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;

use lintbridge_types::{Generation, RequestId, WorkerJob};

use crate::codec::{FrameReader, FrameWriter};
use crate::error::WorkerError;
use crate::protocol::{
    self, IncomingFrame, JOB_METHOD, LOG_METHOD, LogLevel, LogParams, Notification, Request,
    SHUTDOWN_METHOD,
};
use crate::types::{StopReason, WorkerConfig};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

const WRITER_CHANNEL_CAPACITY: usize = 64;

/// The two ends of a freshly launched worker, plus the process if there is one.
pub struct WorkerIo {
    pub reader: Box<dyn AsyncRead + Send + Unpin>,
    pub writer: Box<dyn AsyncWrite + Send + Unpin>,
    pub child: Option<Child>,
}

/// Starts worker instances.
///
/// Launching is synchronous: it only has to start the process and hand back
/// its pipes. Everything after that is driven by [`WorkerHandle`].
pub trait WorkerLauncher: Send + Sync + 'static {
    fn launch(&self) -> Result<WorkerIo>;
}

/// Launches the configured command as a child process speaking framed JSON
/// over stdin/stdout.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    config: WorkerConfig,
}

impl ProcessLauncher {
    #[must_use]
    pub fn new(config: WorkerConfig) -> Self {
        Self { config }
    }
}

impl WorkerLauncher for ProcessLauncher {
    fn launch(&self) -> Result<WorkerIo> {
        let resolved = which::which(self.config.command())
            .with_context(|| format!("{} not found in PATH", self.config.command()))?;

        let mut child = Command::new(&resolved)
            .args(self.config.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning {}", self.config.command()))?;

        let stdout = child.stdout.take().context("no stdout from worker")?;
        let stdin = child.stdin.take().context("no stdin from worker")?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr));
        }

        tracing::debug!(command = %resolved.display(), pid = ?child.id(), "Worker process spawned");

        Ok(WorkerIo {
            reader: Box::new(stdout),
            writer: Box::new(stdin),
            child: Some(child),
        })
    }
}

/// Worker stderr is free-form console output; keep it in the log.
async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(target: "lintbridge::worker::stderr", "{line}");
    }
}

/// Sent to the supervisor exactly once per generation.
#[derive(Debug)]
pub(crate) struct WorkerStopped {
    pub generation: Generation,
    pub reason: StopReason,
}

type Completion = oneshot::Sender<Result<serde_json::Value, WorkerError>>;

/// Request id → completion for every request awaiting a reply.
///
/// Once closed (the worker died) nothing can be registered again, so a
/// request can never wait on a worker that will not answer.
#[derive(Default)]
pub(crate) struct PendingTable {
    entries: HashMap<RequestId, Completion>,
    closed: bool,
}

impl PendingTable {
    /// Returns `None` if the worker is already gone.
    pub fn register(
        &mut self,
        id: RequestId,
    ) -> Option<oneshot::Receiver<Result<serde_json::Value, WorkerError>>> {
        if self.closed {
            return None;
        }
        let (tx, rx) = oneshot::channel();
        self.entries.insert(id, tx);
        Some(rx)
    }

    /// Deliver an outcome. Returns false for ids nobody is waiting on.
    pub fn complete(&mut self, id: RequestId, outcome: Result<serde_json::Value, WorkerError>) -> bool {
        match self.entries.remove(&id) {
            Some(tx) => {
                let _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: RequestId) {
        self.entries.remove(&id);
    }

    /// Close the table and fail everything still waiting.
    pub fn fail_all(&mut self, generation: Generation) -> usize {
        self.closed = true;
        let failed = self.entries.len();
        for (_, tx) in self.entries.drain() {
            let _ = tx.send(Err(WorkerError::Disconnected { generation }));
        }
        failed
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

enum WriterCommand {
    Send(serde_json::Value),
    Shutdown,
}

/// A live worker incarnation.
pub(crate) struct RunningWorker {
    generation: Generation,
    writer_tx: mpsc::Sender<WriterCommand>,
    next_id: AtomicU64,
    pending: Arc<Mutex<PendingTable>>,
    request_timeout: Duration,
    child: Mutex<Option<Child>>,
    reader_handle: JoinHandle<()>,
    writer_handle: JoinHandle<()>,
}

impl RunningWorker {
    fn start(
        generation: Generation,
        io: WorkerIo,
        stop_tx: mpsc::Sender<WorkerStopped>,
        request_timeout: Duration,
    ) -> Self {
        let WorkerIo {
            reader,
            writer,
            child,
        } = io;

        let pending = Arc::new(Mutex::new(PendingTable::default()));

        let (writer_tx, mut writer_rx) = mpsc::channel::<WriterCommand>(WRITER_CHANNEL_CAPACITY);
        let writer_handle = tokio::spawn(async move {
            let mut writer = FrameWriter::new(writer);
            while let Some(cmd) = writer_rx.recv().await {
                match cmd {
                    WriterCommand::Send(frame) => {
                        if let Err(e) = writer.write_frame(&frame).await {
                            tracing::warn!(%generation, "Worker write error: {e:#}");
                            break;
                        }
                    }
                    WriterCommand::Shutdown => {
                        let _ = writer.close().await;
                        break;
                    }
                }
            }
        });

        let reader_pending = Arc::clone(&pending);
        let reader_writer_tx = writer_tx.clone();
        let reader_handle = tokio::spawn(async move {
            let mut reader = FrameReader::new(reader);
            let reason = loop {
                match reader.read_frame().await {
                    Ok(Some(frame)) => {
                        Self::dispatch_frame(&frame, &reader_pending, &reader_writer_tx, generation)
                            .await;
                    }
                    Ok(None) => {
                        tracing::info!(%generation, "Worker closed its output");
                        break StopReason::Exited;
                    }
                    Err(e) => {
                        tracing::warn!(%generation, "Worker read error: {e:#}");
                        break StopReason::Failed(format!("{e:#}"));
                    }
                }
            };

            let failed = reader_pending.lock().await.fail_all(generation);
            if failed > 0 {
                tracing::debug!(%generation, failed, "Failed in-flight requests of dead worker");
            }
            let _ = stop_tx.send(WorkerStopped { generation, reason }).await;
        });

        Self {
            generation,
            writer_tx,
            next_id: AtomicU64::new(1),
            pending,
            request_timeout,
            child: Mutex::new(child),
            reader_handle,
            writer_handle,
        }
    }

    async fn dispatch_frame(
        frame: &serde_json::Value,
        pending: &Mutex<PendingTable>,
        writer_tx: &mpsc::Sender<WriterCommand>,
        generation: Generation,
    ) {
        let Some(incoming) = protocol::parse_incoming(frame) else {
            tracing::trace!(%generation, "Ignoring malformed frame from worker");
            return;
        };

        match incoming {
            IncomingFrame::Response { id, outcome } => {
                let outcome = outcome.map_err(WorkerError::Rejected);
                if !pending.lock().await.complete(id, outcome) {
                    tracing::debug!(%generation, request_id = %id, "Response for unknown request");
                }
            }
            IncomingFrame::WorkerRequest { id, method } => {
                tracing::debug!(%generation, "Worker sent request {method}; replying method not found");
                let reply = protocol::method_not_found(&id, &method);
                let _ = writer_tx.send(WriterCommand::Send(reply)).await;
            }
            IncomingFrame::Notification { method, params } if method == LOG_METHOD => {
                match params.map(serde_json::from_value::<LogParams>) {
                    Some(Ok(log)) => log_worker_message(generation, &log),
                    _ => tracing::trace!(%generation, "Ignoring malformed log notification"),
                }
            }
            IncomingFrame::Notification { method, .. } => {
                tracing::trace!(%generation, "Ignoring notification from worker: {method}");
            }
        }
    }

    async fn request(&self, job: &WorkerJob) -> Result<serde_json::Value, WorkerError> {
        let generation = self.generation;
        let id = RequestId::new(self.next_id.fetch_add(1, Ordering::Relaxed));

        let frame = serde_json::to_value(Request::new(id, JOB_METHOD, job))
            .map_err(|e| WorkerError::Protocol(e.to_string()))?;

        let Some(rx) = self.pending.lock().await.register(id) else {
            return Err(WorkerError::Disconnected { generation });
        };

        if self.writer_tx.send(WriterCommand::Send(frame)).await.is_err() {
            self.pending.lock().await.remove(id);
            return Err(WorkerError::Disconnected { generation });
        }

        tracing::trace!(%generation, request_id = %id, kind = job.kind.as_str(), "Job sent");

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            // Completion dropped without an answer: the table went away with the worker.
            Ok(Err(_)) => Err(WorkerError::Disconnected { generation }),
            Err(_) => {
                self.pending.lock().await.remove(id);
                Err(WorkerError::Timeout {
                    secs: self.request_timeout.as_secs(),
                })
            }
        }
    }

    /// Ask the worker to stop, then make sure it does.
    async fn shutdown(&self) {
        if let Ok(frame) = serde_json::to_value(Notification::new(SHUTDOWN_METHOD, None)) {
            let _ = self.writer_tx.send(WriterCommand::Send(frame)).await;
        }
        let _ = self.writer_tx.send(WriterCommand::Shutdown).await;

        let Some(mut child) = self.child.lock().await.take() else {
            return;
        };
        if tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await.is_err() {
            tracing::debug!(generation = %self.generation, "Worker didn't exit in time, killing");
            let _ = child.kill().await;
        }
    }
}

impl Drop for RunningWorker {
    fn drop(&mut self) {
        self.reader_handle.abort();
        self.writer_handle.abort();
    }
}

fn log_worker_message(generation: Generation, log: &LogParams) {
    let message = &log.message;
    match log.level {
        LogLevel::Error => tracing::error!(%generation, "worker: {message}"),
        LogLevel::Warn => tracing::warn!(%generation, "worker: {message}"),
        LogLevel::Info => tracing::info!(%generation, "worker: {message}"),
        LogLevel::Debug => tracing::debug!(%generation, "worker: {message}"),
    }
}

/// The broker's view of one worker generation.
///
/// A launch failure still produces a handle; it simply fails every request,
/// so the failure surfaces on first use rather than at spawn time.
pub(crate) enum WorkerHandle {
    Live(RunningWorker),
    Failed {
        generation: Generation,
        reason: String,
    },
}

impl WorkerHandle {
    /// Launch a new generation. Its end (or its failure to start) is
    /// reported once on `stop_tx`.
    pub fn spawn(
        generation: Generation,
        launcher: &dyn WorkerLauncher,
        stop_tx: &mpsc::Sender<WorkerStopped>,
        request_timeout: Duration,
    ) -> Self {
        match launcher.launch() {
            Ok(io) => Self::Live(RunningWorker::start(
                generation,
                io,
                stop_tx.clone(),
                request_timeout,
            )),
            Err(e) => {
                let reason = format!("{e:#}");
                tracing::warn!(%generation, "Failed to start worker: {reason}");
                let _ = stop_tx.try_send(WorkerStopped {
                    generation,
                    reason: StopReason::SpawnFailed(reason.clone()),
                });
                Self::Failed { generation, reason }
            }
        }
    }

    pub fn generation(&self) -> Generation {
        match self {
            Self::Live(worker) => worker.generation,
            Self::Failed { generation, .. } => *generation,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }

    pub async fn request(&self, job: &WorkerJob) -> Result<serde_json::Value, WorkerError> {
        match self {
            Self::Live(worker) => worker.request(job).await,
            Self::Failed { reason, .. } => Err(WorkerError::SpawnFailed(reason.clone())),
        }
    }

    pub async fn shutdown(&self) {
        if let Self::Live(worker) = self {
            worker.shutdown().await;
        }
    }
}
