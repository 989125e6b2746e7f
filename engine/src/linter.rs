//! Lint orchestration: buffer snapshot → worker job → diagnostics.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::watch;

use lintbridge_types::{
    Diagnostic, Fix, LintMessage, Range, RuleOverrides, Severity, WorkerJob,
};
use lintbridge_worker::{WorkerBroker, WorkerError};

use crate::document::{Document, LineIndex};
use crate::observer::ConfigSnapshot;
use crate::render::render_message;

/// Result of a lint request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LintOutcome {
    /// Fresh diagnostics for the buffer as it is now.
    Updated(Vec<Diagnostic>),
    /// The buffer changed while the worker was busy; keep the old results.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LintError {
    #[error(
        "Cannot mark location in editor for ({rule_id}) - ({message}) at line ({line}) column ({column})"
    )]
    UnmappableLocation {
        rule_id: String,
        message: String,
        line: usize,
        column: String,
    },
    #[error(transparent)]
    Worker(#[from] WorkerError),
}

impl LintError {
    fn unmappable(message: &LintMessage) -> Self {
        Self::UnmappableLocation {
            rule_id: message.rule_id.clone().unwrap_or_else(|| "none".to_string()),
            message: message.message.clone(),
            line: message.line,
            column: message
                .column
                .map_or_else(|| "none".to_string(), |c| c.to_string()),
        }
    }
}

/// Turns buffers into diagnostics through the worker.
#[derive(Clone)]
pub struct Linter {
    broker: WorkerBroker,
    config: watch::Receiver<Arc<ConfigSnapshot>>,
}

impl Linter {
    #[must_use]
    pub fn new(broker: WorkerBroker, config: watch::Receiver<Arc<ConfigSnapshot>>) -> Self {
        Self { broker, config }
    }

    pub async fn lint(&self, document: &dyn Document) -> Result<LintOutcome, LintError> {
        let text = document.text();
        if text.is_empty() {
            return Ok(LintOutcome::Updated(Vec::new()));
        }

        let config = Arc::clone(&self.config.borrow());
        let file_path = document.path();
        let rules = if document.is_modified() && !config.ignored_rules().is_empty() {
            config.ignored_rules().clone()
        } else {
            RuleOverrides::new()
        };

        let job = WorkerJob::lint(
            config.worker_config().clone(),
            file_path.clone(),
            text.clone(),
            rules,
        );
        let messages = self.broker.lint(&job).await?;

        if document.text() != text {
            tracing::debug!(path = ?file_path, "Buffer changed during lint; discarding results");
            return Ok(LintOutcome::Stale);
        }

        let diagnostics = map_messages(&text, file_path.as_deref(), &messages, config.show_rule_id())?;
        tracing::trace!(path = ?file_path, count = diagnostics.len(), "Lint complete");
        Ok(LintOutcome::Updated(diagnostics))
    }
}

/// Map worker messages onto `text`. One unmappable location fails the batch.
pub fn map_messages(
    text: &str,
    file_path: Option<&Path>,
    messages: &[LintMessage],
    show_rule_id: bool,
) -> Result<Vec<Diagnostic>, LintError> {
    let index = LineIndex::new(text);
    messages
        .iter()
        .map(|message| {
            let range = index
                .range_for_line(message.line, message.column)
                .ok_or_else(|| LintError::unmappable(message))?;

            let diagnostic = Diagnostic::new(
                file_path.map(Path::to_path_buf),
                Severity::from_worker(message.severity),
                range,
                render_message(&message.message, message.rule_id.as_deref(), show_rule_id),
            )
            .with_rule_id(message.rule_id.clone());

            Ok(match &message.fix {
                Some(fix) => diagnostic.with_fix(Fix {
                    range: Range::new(
                        index.position_for_offset(fix.range[0]),
                        index.position_for_offset(fix.range[1]),
                    ),
                    new_text: fix.text.clone(),
                }),
                None => diagnostic,
            })
        })
        .collect()
}
