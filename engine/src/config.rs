use serde::{Deserialize, Serialize};
use std::{env, fs, path::PathBuf};

use lintbridge_worker::WorkerConfig;

/// Scope added to the active list while `lint_html_files` is on.
pub const EMBEDDED_HTML_SCOPE: &str = "source.js.embedded.html";

// Default value functions for serde (bool::default() is false, so only true needs a fn)
pub(crate) const fn default_true() -> bool {
    true
}

fn default_scopes() -> Vec<String> {
    [
        "source.js",
        "source.jsx",
        "source.js.jsx",
        "source.babel",
        "source.js-semantic",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_worker() -> WorkerConfig {
    WorkerConfig::new("eslint-worker", Vec::new())
}

/// The `[linter]` table.
///
/// Everything here, unknown keys included, is forwarded to the worker as the
/// job's `config` object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinterSettings {
    /// Grammar scopes this integration lints.
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// Also lint JavaScript embedded in HTML.
    #[serde(default, alias = "lint_html_files")]
    pub lint_html_files: bool,
    /// Run a fix job after each save of a linted buffer.
    #[serde(default, alias = "fix_on_save")]
    pub fix_on_save: bool,
    /// Render messages with a rule badge linking to the rule's docs.
    #[serde(default = "default_true", alias = "show_rule_id_in_message")]
    pub show_rule_id_in_message: bool,
    /// Rules turned off while a buffer has unsaved changes.
    #[serde(default, alias = "rules_to_silence_while_typing")]
    pub rules_to_silence_while_typing: Vec<String>,
    /// Worker-specific options passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for LinterSettings {
    fn default() -> Self {
        Self {
            scopes: default_scopes(),
            lint_html_files: false,
            fix_on_save: false,
            show_rule_id_in_message: true,
            rules_to_silence_while_typing: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }
}

impl LinterSettings {
    /// The settings object as the worker receives it.
    #[must_use]
    pub fn to_worker_config(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|e| {
            tracing::warn!("Failed to serialize linter settings: {e}");
            serde_json::Value::Object(serde_json::Map::new())
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub linter: LinterSettings,
    #[serde(default = "default_worker")]
    pub worker: WorkerConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            linter: LinterSettings::default(),
            worker: default_worker(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

impl BridgeConfig {
    /// Load from the default location. A missing file is not an error.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(path).map(Some)
    }

    pub fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read { path, source: err });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse { path, source: err })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }
}

/// `$LINTBRIDGE_CONFIG`, else `~/.lintbridge/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os("LINTBRIDGE_CONFIG").filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".lintbridge").join("config.toml"))
}
