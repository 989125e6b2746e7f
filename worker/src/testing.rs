//! In-memory scripted worker for tests.
//!
//! [`ScriptedLauncher`] speaks the real framed protocol over in-process pipes,
//! so everything above the launcher (codec, pending table, supervisor) runs
//! unmodified. Replies come from a closure over the incoming [`WorkerJob`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use tokio::io::{DuplexStream, duplex};
use tokio::sync::oneshot;

use lintbridge_types::WorkerJob;

use crate::codec::{FrameReader, FrameWriter};
use crate::process::{WorkerIo, WorkerLauncher};
use crate::protocol::{JOB_METHOD, SHUTDOWN_METHOD};

const PIPE_CAPACITY: usize = 64 * 1024;

/// How the scripted worker answers a job.
#[derive(Debug, Clone)]
pub enum Reply {
    Result(serde_json::Value),
    /// JSON-RPC error with this message.
    Error(String),
    /// Never answer.
    Hang,
    /// Exit without answering, like a worker crashing mid-job.
    Exit,
}

type Handler = dyn Fn(&WorkerJob) -> Reply + Send + Sync;

/// Launcher producing in-memory workers driven by a reply closure.
pub struct ScriptedLauncher {
    handler: Arc<Handler>,
    launches: AtomicUsize,
    requests: Arc<AtomicUsize>,
    jobs: Arc<Mutex<Vec<WorkerJob>>>,
    failures_left: AtomicUsize,
    kill_switch: Mutex<Option<oneshot::Sender<()>>>,
}

impl ScriptedLauncher {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&WorkerJob) -> Reply + Send + Sync + 'static,
    {
        Arc::new(Self {
            handler: Arc::new(handler),
            launches: AtomicUsize::new(0),
            requests: Arc::new(AtomicUsize::new(0)),
            jobs: Arc::new(Mutex::new(Vec::new())),
            failures_left: AtomicUsize::new(0),
            kill_switch: Mutex::new(None),
        })
    }

    /// Launch attempts so far, failed ones included.
    #[must_use]
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    /// Jobs received across all worker instances.
    #[must_use]
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn jobs(&self) -> Vec<WorkerJob> {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn last_job(&self) -> Option<WorkerJob> {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Make the next `n` launches fail.
    pub fn fail_next_launches(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    /// Terminate the current worker. Returns false if none is running.
    pub fn kill(&self) -> bool {
        let switch = self
            .kill_switch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        switch.is_some_and(|tx| tx.send(()).is_ok())
    }
}

impl WorkerLauncher for ScriptedLauncher {
    fn launch(&self) -> Result<WorkerIo> {
        self.launches.fetch_add(1, Ordering::SeqCst);

        let should_fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            anyhow::bail!("scripted-worker not found in PATH");
        }

        let (broker_out, worker_in) = duplex(PIPE_CAPACITY);
        let (worker_out, broker_in) = duplex(PIPE_CAPACITY);
        let (kill_tx, kill_rx) = oneshot::channel();
        *self
            .kill_switch
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(kill_tx);

        let worker = ScriptedWorker {
            handler: Arc::clone(&self.handler),
            requests: Arc::clone(&self.requests),
            jobs: Arc::clone(&self.jobs),
        };
        tokio::spawn(async move {
            tokio::select! {
                Ok(()) = kill_rx => {}
                () = worker.serve(worker_in, worker_out) => {}
            }
        });

        Ok(WorkerIo {
            reader: Box::new(broker_in),
            writer: Box::new(broker_out),
            child: None,
        })
    }
}

struct ScriptedWorker {
    handler: Arc<Handler>,
    requests: Arc<AtomicUsize>,
    jobs: Arc<Mutex<Vec<WorkerJob>>>,
}

impl ScriptedWorker {
    /// Serve until shutdown, EOF or an `Exit` reply. Dropping the pipes on
    /// return is what the broker sees as the worker going away.
    async fn serve(self, input: DuplexStream, output: DuplexStream) {
        let mut reader = FrameReader::new(input);
        let mut writer = FrameWriter::new(output);

        while let Ok(Some(frame)) = reader.read_frame().await {
            let method = frame.get("method").and_then(|m| m.as_str());
            if method == Some(SHUTDOWN_METHOD) {
                return;
            }
            if method != Some(JOB_METHOD) {
                continue;
            }
            let Some(id) = frame.get("id").cloned() else {
                continue;
            };
            let Some(job) = frame
                .get("params")
                .cloned()
                .and_then(|p| serde_json::from_value::<WorkerJob>(p).ok())
            else {
                continue;
            };

            self.requests.fetch_add(1, Ordering::SeqCst);
            let reply = (self.handler)(&job);
            self.jobs
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(job);

            let response = match reply {
                Reply::Result(result) => {
                    serde_json::json!({ "jsonrpc": "2.0", "id": id, "result": result })
                }
                Reply::Error(message) => serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": 1, "message": message }
                }),
                Reply::Hang => continue,
                Reply::Exit => return,
            };
            if writer.write_frame(&response).await.is_err() {
                return;
            }
        }
    }
}
