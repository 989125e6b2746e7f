//! Activation facade tying the observer, broker and handlers together.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use lintbridge_worker::{BrokerEvent, WorkerBroker, WorkerConfig, WorkerError, WorkerLauncher};

use crate::config::LinterSettings;
use crate::document::Document;
use crate::handlers::{FixError, FixHandler, SaveOutcome};
use crate::linter::{LintError, LintOutcome, Linter};
use crate::notify::Notifier;
use crate::observer::ConfigObserver;

const CRASH_TITLE: &str = "Worker died unexpectedly";
const CRASH_DETAIL: &str =
    "Check your console for more info. A new worker will be spawned shortly.";

/// What the host's linter registry needs to know about this integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinterProvider {
    pub name: &'static str,
    pub scope: &'static str,
    pub lint_on_fly: bool,
    pub grammar_scopes: Vec<String>,
}

impl LinterProvider {
    /// Whether buffers with this grammar scope should be linted.
    #[must_use]
    pub fn handles(&self, scope: &str) -> bool {
        self.grammar_scopes.iter().any(|s| s == scope)
    }
}

/// A running integration: one worker, one set of options.
pub struct Bridge {
    observer: ConfigObserver,
    broker: WorkerBroker,
    linter: Linter,
    fixer: FixHandler,
    events_task: Mutex<Option<JoinHandle<()>>>,
}

impl Bridge {
    /// Start the worker and wire everything up.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn activate(
        settings: LinterSettings,
        worker: &WorkerConfig,
        launcher: Arc<dyn WorkerLauncher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let observer = ConfigObserver::new(settings);
        let (broker, events) = WorkerBroker::start(worker, launcher);
        let linter = Linter::new(broker.clone(), observer.subscribe());
        let fixer = FixHandler::new(broker.clone(), observer.subscribe(), Arc::clone(&notifier));
        let events_task = tokio::spawn(forward_events(events, notifier));

        tracing::info!(command = worker.command(), "Lint bridge activated");
        Self {
            observer,
            broker,
            linter,
            fixer,
            events_task: Mutex::new(Some(events_task)),
        }
    }

    pub async fn lint(&self, document: &dyn Document) -> Result<LintOutcome, LintError> {
        self.linter.lint(document).await
    }

    pub async fn fix_file(&self, editor: Option<&dyn Document>) -> Result<String, FixError> {
        self.fixer.fix_file(editor).await
    }

    pub async fn on_did_save(&self, document: &dyn Document) -> Result<SaveOutcome, WorkerError> {
        self.fixer.on_did_save(document).await
    }

    pub fn apply_settings(&self, settings: LinterSettings) {
        self.observer.apply(settings);
    }

    #[must_use]
    pub fn observer(&self) -> &ConfigObserver {
        &self.observer
    }

    #[must_use]
    pub fn broker(&self) -> &WorkerBroker {
        &self.broker
    }

    /// Provider descriptor reflecting the current scope list.
    #[must_use]
    pub fn provider(&self) -> LinterProvider {
        LinterProvider {
            name: "ESLint",
            scope: "file",
            lint_on_fly: true,
            grammar_scopes: self.observer.snapshot().active_scopes().to_vec(),
        }
    }

    /// Stop the worker for good. Crashes observed afterwards are ignored.
    pub async fn deactivate(&self) {
        self.broker.shutdown().await;
        let task = self
            .events_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            // The broker's event sender is gone once shutdown returns.
            let _ = task.await;
        }
        tracing::info!("Lint bridge deactivated");
    }
}

async fn forward_events(mut events: mpsc::Receiver<BrokerEvent>, notifier: Arc<dyn Notifier>) {
    while let Some(event) = events.recv().await {
        match event {
            BrokerEvent::Started { generation } => {
                tracing::debug!(%generation, "Worker ready");
            }
            BrokerEvent::Crashed { .. } => notifier.error(CRASH_TITLE, CRASH_DETAIL),
        }
    }
}
