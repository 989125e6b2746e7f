//! Fix command and fix-on-save.

use std::sync::Arc;

use tokio::sync::watch;

use lintbridge_types::WorkerJob;
use lintbridge_worker::{WorkerBroker, WorkerError};

use crate::document::Document;
use crate::notify::Notifier;
use crate::observer::ConfigSnapshot;

/// Shown when a fix is requested for a buffer with unsaved changes.
pub const SAVE_BEFORE_FIXING: &str = "Linter-ESLint: Please save before fixing";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FixError {
    #[error("no active editor")]
    NoEditor,
    #[error("editor has unsaved changes")]
    Unsaved,
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// What happened after a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Fix-on-save is off or the buffer's scope is not linted.
    Skipped,
    Fixed(String),
}

/// Runs fix jobs. The worker rewrites files on disk, so only saved buffers
/// are ever fixed.
#[derive(Clone)]
pub struct FixHandler {
    broker: WorkerBroker,
    config: watch::Receiver<Arc<ConfigSnapshot>>,
    notifier: Arc<dyn Notifier>,
}

impl FixHandler {
    #[must_use]
    pub fn new(
        broker: WorkerBroker,
        config: watch::Receiver<Arc<ConfigSnapshot>>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            broker,
            config,
            notifier,
        }
    }

    fn job_for(&self, document: &dyn Document) -> WorkerJob {
        let config = Arc::clone(&self.config.borrow());
        WorkerJob::fix(config.worker_config().clone(), document.path())
    }

    /// The explicit "fix file" command.
    ///
    /// Refuses without contacting the worker when there is no editor or it
    /// has unsaved changes. The outcome is always reported to the notifier.
    pub async fn fix_file(&self, editor: Option<&dyn Document>) -> Result<String, FixError> {
        let editor = match editor {
            Some(editor) if !editor.is_modified() => editor,
            other => {
                self.notifier.error(SAVE_BEFORE_FIXING, "");
                return Err(if other.is_some() {
                    FixError::Unsaved
                } else {
                    FixError::NoEditor
                });
            }
        };

        let job = self.job_for(editor);
        match self.broker.fix(&job).await {
            Ok(summary) => {
                self.notifier.success(&summary);
                Ok(summary)
            }
            Err(e) => {
                self.notifier.warning(&e.to_string());
                Err(e.into())
            }
        }
    }

    /// Fix a just-saved buffer when fix-on-save is on and its scope is
    /// linted. Failures are reported as warnings; success is silent.
    pub async fn on_did_save(&self, document: &dyn Document) -> Result<SaveOutcome, WorkerError> {
        let enabled = {
            let config = self.config.borrow();
            config.fix_on_save() && config.handles_scope(&document.scope_name())
        };
        if !enabled {
            return Ok(SaveOutcome::Skipped);
        }

        let job = self.job_for(document);
        match self.broker.fix(&job).await {
            Ok(summary) => {
                tracing::debug!(path = ?job.file_path, "Fixed on save");
                Ok(SaveOutcome::Fixed(summary))
            }
            Err(e) => {
                self.notifier.warning(&e.to_string());
                Err(e)
            }
        }
    }
}
