//! Core domain types for lintbridge.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! It is shared by the worker broker (wire types) and the engine (editor-facing types).

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod diagnostic;
mod ids;
mod job;
mod position;

pub use diagnostic::{Diagnostic, DiagnosticMessage, Fix, Severity};
pub use ids::{Generation, RequestId};
pub use job::{JobKind, LintMessage, RuleOverrides, RuleSeverity, WorkerFix, WorkerJob, ignored_rules};
pub use position::{Position, Range};
