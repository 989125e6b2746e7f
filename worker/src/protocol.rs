//! JSON-RPC message shapes spoken with the worker.

use serde::{Deserialize, Serialize};

use lintbridge_types::RequestId;

pub(crate) const JOB_METHOD: &str = "job";
pub(crate) const SHUTDOWN_METHOD: &str = "shutdown";
pub(crate) const LOG_METHOD: &str = "log";

/// JSON-RPC "method not found".
const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, Serialize)]
pub(crate) struct Request<'a, P: Serialize> {
    pub jsonrpc: &'static str,
    pub id: RequestId,
    pub method: &'static str,
    pub params: &'a P,
}

impl<'a, P: Serialize> Request<'a, P> {
    pub fn new(id: RequestId, method: &'static str, params: &'a P) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct Notification {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl Notification {
    pub fn new(method: &'static str, params: Option<serde_json::Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
        }
    }
}

/// Reply to a request the worker sent us. The broker serves no methods.
pub(crate) fn method_not_found(id: &serde_json::Value, method: &str) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": METHOD_NOT_FOUND,
            "message": format!("Method not found: {method}")
        }
    })
}

/// A decoded frame from the worker.
#[derive(Debug)]
pub(crate) enum IncomingFrame {
    /// Answer to one of our requests. `Err` holds the worker's error message.
    Response {
        id: RequestId,
        outcome: Result<serde_json::Value, String>,
    },
    /// The worker asked us something.
    WorkerRequest {
        id: serde_json::Value,
        method: String,
    },
    Notification {
        method: String,
        params: Option<serde_json::Value>,
    },
}

pub(crate) fn parse_incoming(frame: &serde_json::Value) -> Option<IncomingFrame> {
    let id = frame.get("id");
    let method = frame.get("method").and_then(|m| m.as_str()).map(String::from);
    let result = frame.get("result");
    let error = frame.get("error");

    match (id, method) {
        (Some(id), None) if result.is_some() || error.is_some() => {
            let id = RequestId::new(id.as_u64()?);
            let outcome = match error {
                Some(err) => Err(error_message(err)),
                None => Ok(result.cloned().unwrap_or(serde_json::Value::Null)),
            };
            Some(IncomingFrame::Response { id, outcome })
        }
        (Some(id), Some(method)) => Some(IncomingFrame::WorkerRequest {
            id: id.clone(),
            method,
        }),
        (None, Some(method)) => Some(IncomingFrame::Notification {
            method,
            params: frame.get("params").cloned(),
        }),
        _ => None,
    }
}

/// Workers report failures either as a JSON-RPC error object or a bare string.
fn error_message(err: &serde_json::Value) -> String {
    match err {
        serde_json::Value::String(s) => s.clone(),
        other => other
            .get("message")
            .and_then(|m| m.as_str())
            .map_or_else(|| other.to_string(), String::from),
    }
}

/// Params of a `log` notification.
#[derive(Debug, Deserialize)]
pub(crate) struct LogParams {
    #[serde(default)]
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}
