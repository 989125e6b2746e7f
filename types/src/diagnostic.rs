use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::position::Range;

/// Severity of a diagnostic as shown in the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

impl Severity {
    /// Convert from the worker's numeric severity.
    ///
    /// `1` is a warning; every other value (including the usual `2`) is
    /// treated as an error so that unexpected values are never downplayed.
    #[must_use]
    pub fn from_worker(value: u8) -> Self {
        if value == 1 { Self::Warning } else { Self::Error }
    }

    #[must_use]
    pub fn is_error(self) -> bool {
        self == Self::Error
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A replacement to apply to the document, already translated to positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fix {
    pub range: Range,
    pub new_text: String,
}

/// Message body of a diagnostic.
///
/// `Html` carries pre-rendered markup (rule badge + escaped message); `Text`
/// carries the worker's message verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "value")]
pub enum DiagnosticMessage {
    Text(String),
    Html(String),
}

impl DiagnosticMessage {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(s) | Self::Html(s) => s,
        }
    }

    #[must_use]
    pub fn is_html(&self) -> bool {
        matches!(self, Self::Html(_))
    }
}

/// A single editor-displayable issue.
///
/// Fields are private; a diagnostic is built once from a worker response and
/// read through accessors afterwards. A batch of diagnostics is only valid
/// against the exact document text it was produced from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    file_path: Option<PathBuf>,
    severity: Severity,
    range: Range,
    message: DiagnosticMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rule_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fix: Option<Fix>,
}

impl Diagnostic {
    #[must_use]
    pub fn new(
        file_path: Option<PathBuf>,
        severity: Severity,
        range: Range,
        message: DiagnosticMessage,
    ) -> Self {
        Self {
            file_path,
            severity,
            range,
            message,
            rule_id: None,
            fix: None,
        }
    }

    #[must_use]
    pub fn with_rule_id(mut self, rule_id: Option<String>) -> Self {
        self.rule_id = rule_id;
        self
    }

    #[must_use]
    pub fn with_fix(mut self, fix: Fix) -> Self {
        self.fix = Some(fix);
        self
    }

    #[must_use]
    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    #[must_use]
    pub fn range(&self) -> Range {
        self.range
    }

    #[must_use]
    pub fn message(&self) -> &DiagnosticMessage {
        &self.message
    }

    /// Id of the rule that produced this diagnostic; `None` for fatal errors.
    #[must_use]
    pub fn rule_id(&self) -> Option<&str> {
        self.rule_id.as_deref()
    }

    #[must_use]
    pub fn fix(&self) -> Option<&Fix> {
        self.fix.as_ref()
    }
}
