//! Config observer: the only writer of derived linter state.
//!
//! Option changes come in through the setters (or [`ConfigObserver::apply`]
//! for a whole settings object); each change publishes a fresh immutable
//! [`ConfigSnapshot`] on a `watch` channel. Readers subscribe and never see a
//! half-applied update.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

use lintbridge_types::{RuleOverrides, ignored_rules};

use crate::config::{EMBEDDED_HTML_SCOPE, LinterSettings};

/// Derived view of the linter options at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot {
    active_scopes: Vec<String>,
    ignored_rules: RuleOverrides,
    settings: LinterSettings,
    worker_config: serde_json::Value,
}

impl ConfigSnapshot {
    fn derive(settings: &LinterSettings, active_scopes: &[String]) -> Self {
        Self {
            active_scopes: active_scopes.to_vec(),
            ignored_rules: ignored_rules(&settings.rules_to_silence_while_typing),
            worker_config: settings.to_worker_config(),
            settings: settings.clone(),
        }
    }

    /// Grammar scopes currently linted, embedded HTML scope included when on.
    #[must_use]
    pub fn active_scopes(&self) -> &[String] {
        &self.active_scopes
    }

    #[must_use]
    pub fn handles_scope(&self, scope: &str) -> bool {
        self.active_scopes.iter().any(|s| s == scope)
    }

    /// Rules switched off while a buffer is modified.
    #[must_use]
    pub fn ignored_rules(&self) -> &RuleOverrides {
        &self.ignored_rules
    }

    #[must_use]
    pub fn show_rule_id(&self) -> bool {
        self.settings.show_rule_id_in_message
    }

    #[must_use]
    pub fn fix_on_save(&self) -> bool {
        self.settings.fix_on_save
    }

    #[must_use]
    pub fn settings(&self) -> &LinterSettings {
        &self.settings
    }

    /// The options object sent with every job.
    #[must_use]
    pub fn worker_config(&self) -> &serde_json::Value {
        &self.worker_config
    }
}

struct ObserverState {
    settings: LinterSettings,
    active_scopes: Vec<String>,
    /// Whether the embedded scope in `active_scopes` was put there by the
    /// HTML toggle rather than by the user's own list.
    embedded_scope_added: bool,
}

impl ObserverState {
    fn new(settings: LinterSettings) -> Self {
        let mut state = Self {
            active_scopes: Vec::new(),
            embedded_scope_added: false,
            settings: LinterSettings {
                lint_html_files: false,
                ..settings.clone()
            },
        };
        state.replace_scopes(settings.scopes);
        state.toggle_html(settings.lint_html_files);
        state
    }

    fn replace_scopes(&mut self, scopes: Vec<String>) {
        self.active_scopes.clone_from(&scopes);
        self.settings.scopes = scopes;
        self.embedded_scope_added = false;
        if self.settings.lint_html_files {
            self.add_embedded_scope();
        }
    }

    fn toggle_html(&mut self, enabled: bool) {
        self.settings.lint_html_files = enabled;
        if enabled {
            self.add_embedded_scope();
        } else if self.embedded_scope_added {
            if let Some(index) = self
                .active_scopes
                .iter()
                .rposition(|s| s == EMBEDDED_HTML_SCOPE)
            {
                self.active_scopes.remove(index);
            }
            self.embedded_scope_added = false;
        }
    }

    fn add_embedded_scope(&mut self) {
        if !self.active_scopes.iter().any(|s| s == EMBEDDED_HTML_SCOPE) {
            self.active_scopes.push(EMBEDDED_HTML_SCOPE.to_string());
            self.embedded_scope_added = true;
        }
    }

    fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot::derive(&self.settings, &self.active_scopes)
    }
}

/// Owner of the linter options.
pub struct ConfigObserver {
    state: Mutex<ObserverState>,
    tx: watch::Sender<Arc<ConfigSnapshot>>,
}

impl ConfigObserver {
    #[must_use]
    pub fn new(settings: LinterSettings) -> Self {
        let state = ObserverState::new(settings);
        let (tx, _rx) = watch::channel(Arc::new(state.snapshot()));
        Self {
            state: Mutex::new(state),
            tx,
        }
    }

    /// Receiver that always holds the latest snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<ConfigSnapshot>> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        Arc::clone(&self.tx.borrow())
    }

    fn state(&self) -> MutexGuard<'_, ObserverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, change: impl FnOnce(&mut ObserverState)) {
        let mut state = self.state();
        change(&mut state);
        let snapshot = state.snapshot();
        tracing::debug!(scopes = ?snapshot.active_scopes(), "Linter settings updated");
        self.tx.send_replace(Arc::new(snapshot));
    }

    /// Replace the scope list wholesale.
    pub fn set_scopes(&self, scopes: Vec<String>) {
        self.update(|state| state.replace_scopes(scopes));
    }

    pub fn set_lint_html_files(&self, enabled: bool) {
        self.update(|state| state.toggle_html(enabled));
    }

    pub fn set_fix_on_save(&self, enabled: bool) {
        self.update(|state| state.settings.fix_on_save = enabled);
    }

    pub fn set_show_rule_id(&self, enabled: bool) {
        self.update(|state| state.settings.show_rule_id_in_message = enabled);
    }

    pub fn set_rules_to_silence(&self, ids: Vec<String>) {
        self.update(|state| state.settings.rules_to_silence_while_typing = ids);
    }

    /// Apply a whole settings object, firing only the changes it contains.
    pub fn apply(&self, settings: LinterSettings) {
        self.update(|state| {
            let LinterSettings {
                scopes,
                lint_html_files,
                fix_on_save,
                show_rule_id_in_message,
                rules_to_silence_while_typing,
                extra,
            } = settings;

            if state.settings.scopes != scopes {
                state.replace_scopes(scopes);
            }
            if state.settings.lint_html_files != lint_html_files {
                state.toggle_html(lint_html_files);
            }
            state.settings.fix_on_save = fix_on_save;
            state.settings.show_rule_id_in_message = show_rule_id_in_message;
            state.settings.rules_to_silence_while_typing = rules_to_silence_while_typing;
            state.settings.extra = extra;
        });
    }
}
