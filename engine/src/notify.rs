//! User-facing notifications.

/// Where success, warning and error messages for the user go.
///
/// Implementations must be cheap and non-blocking; they are called from
/// async handlers.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, title: &str, detail: &str);
}

/// Sends notifications to the `tracing` log. Used when no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn success(&self, message: &str) {
        tracing::info!(target: "lintbridge::notify", "{message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!(target: "lintbridge::notify", "{message}");
    }

    fn error(&self, title: &str, detail: &str) {
        tracing::error!(target: "lintbridge::notify", detail, "{title}");
    }
}
