//! Editor-facing engine for lintbridge.
//!
//! Sits between an editor and the worker broker: keeps the linter options
//! (through the config observer), turns buffers into lint jobs and worker
//! messages into diagnostics, and runs the fix command and fix-on-save.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod bridge;
mod config;
mod document;
mod handlers;
mod linter;
mod notify;
mod observer;
mod render;
mod rule_docs;

pub use bridge::{Bridge, LinterProvider};
pub use config::{BridgeConfig, ConfigError, EMBEDDED_HTML_SCOPE, LinterSettings, config_path};
pub use document::{Document, LineIndex, TextBuffer, scope_for_path};
pub use handlers::{FixError, FixHandler, SAVE_BEFORE_FIXING, SaveOutcome};
pub use linter::{LintError, LintOutcome, Linter, map_messages};
pub use notify::{LogNotifier, Notifier};
pub use observer::{ConfigObserver, ConfigSnapshot};
pub use render::{escape_html, render_message};
pub use rule_docs::{RuleDocs, rule_docs};

// Re-exports for hosts that only depend on the engine
pub use lintbridge_types::{Diagnostic, DiagnosticMessage, Fix, Position, Range, Severity};
pub use lintbridge_worker::{
    BrokerEvent, BrokerState, ProcessLauncher, WorkerBroker, WorkerConfig, WorkerError,
    WorkerLauncher,
};
