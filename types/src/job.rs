//! Wire types exchanged with the lint worker.
//!
//! Field names follow the worker's camelCase JSON (`filePath`, `ruleId`).

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// What the worker is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Lint,
    Fix,
}

impl JobKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lint => "lint",
            Self::Fix => "fix",
        }
    }
}

/// Severity override for a single rule. Only suppression is ever sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    Off,
}

/// Rule id → override, sent alongside a lint job.
pub type RuleOverrides = BTreeMap<String, RuleSeverity>;

/// Build the suppression mapping for a list of rule ids.
///
/// Blank ids are skipped; duplicates collapse.
#[must_use]
pub fn ignored_rules<I, S>(ids: I) -> RuleOverrides
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    ids.into_iter()
        .map(|id| id.as_ref().trim().to_string())
        .filter(|id| !id.is_empty())
        .map(|id| (id, RuleSeverity::Off))
        .collect()
}

/// A job description sent to the worker as the params of a `job` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerJob {
    #[serde(rename = "type")]
    pub kind: JobKind,
    /// Opaque settings object forwarded verbatim.
    pub config: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<RuleOverrides>,
}

impl WorkerJob {
    /// Lint job for in-memory buffer contents.
    #[must_use]
    pub fn lint(
        config: serde_json::Value,
        file_path: Option<PathBuf>,
        contents: String,
        rules: RuleOverrides,
    ) -> Self {
        Self {
            kind: JobKind::Lint,
            config,
            file_path,
            contents: Some(contents),
            rules: Some(rules),
        }
    }

    /// Fix job; the worker reads and rewrites the file on disk.
    #[must_use]
    pub fn fix(config: serde_json::Value, file_path: Option<PathBuf>) -> Self {
        Self {
            kind: JobKind::Fix,
            config,
            file_path,
            contents: None,
            rules: None,
        }
    }
}

/// A fix as reported by the worker: an offset range plus replacement text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerFix {
    pub range: [usize; 2],
    pub text: String,
}

/// One entry of a lint response.
///
/// `line` and `column` are 1-based. A missing line deserializes to `0`,
/// which never maps onto a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintMessage {
    pub message: String,
    #[serde(default)]
    pub line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    pub severity: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<WorkerFix>,
}
