//! Config file loading and scope handling

use std::io::Write;
use std::time::Duration;

use lintbridge_engine::{BridgeConfig, ConfigError, EMBEDDED_HTML_SCOPE, LinterSettings};
use lintbridge_worker::testing::Reply;
use serde_json::json;

use crate::common::Harness;

fn config_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn config_file_drives_linter_and_worker() {
    let file = config_file(
        r#"
[linter]
scopes = ["source.js", "source.ts"]
fixOnSave = true
rules_to_silence_while_typing = ["no-unused-vars", "no-console"]
eslintrcPath = "~/.eslintrc.json"

[worker]
command = "node"
args = ["/opt/eslint-worker/index.js", "--stdio"]
max_restart_delay_ms = 10000
"#,
    );

    let config = BridgeConfig::load_from(file.path().to_path_buf()).unwrap();
    assert_eq!(config.linter.scopes, vec!["source.js", "source.ts"]);
    assert!(config.linter.fix_on_save);
    assert_eq!(config.linter.rules_to_silence_while_typing.len(), 2);
    assert_eq!(config.linter.extra["eslintrcPath"], json!("~/.eslintrc.json"));
    assert_eq!(config.worker.command(), "node");
    assert_eq!(config.worker.args().len(), 2);
    assert_eq!(config.worker.restart_delay(), Duration::from_secs(1));
    assert_eq!(config.worker.max_restart_delay(), Duration::from_secs(10));
}

#[test]
fn bad_toml_is_a_parse_error() {
    let file = config_file("[worker]\ncommand = ");
    let err = BridgeConfig::load_from(file.path().to_path_buf()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(err.to_string().contains("failed to parse config"));
}

#[test]
fn worker_table_requires_a_command() {
    let file = config_file("[worker]\nargs = [\"x\"]\n");
    assert!(matches!(
        BridgeConfig::load_from(file.path().to_path_buf()),
        Err(ConfigError::Parse { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn html_toggle_round_trip_restores_provider_scopes() {
    let h = Harness::new(LinterSettings::default(), |_| Reply::Result(json!([])));
    let before = h.bridge.provider().grammar_scopes;

    h.bridge.observer().set_lint_html_files(true);
    let provider = h.bridge.provider();
    assert!(provider.handles(EMBEDDED_HTML_SCOPE));
    assert_eq!(provider.grammar_scopes.len(), before.len() + 1);

    h.bridge.observer().set_lint_html_files(false);
    assert_eq!(h.bridge.provider().grammar_scopes, before);

    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn scope_list_is_replaced_wholesale() {
    let h = Harness::new(LinterSettings::default(), |_| Reply::Result(json!([])));

    h.bridge.apply_settings(LinterSettings {
        scopes: vec!["source.ts".to_string()],
        ..LinterSettings::default()
    });
    let provider = h.bridge.provider();
    assert_eq!(provider.grammar_scopes, vec!["source.ts".to_string()]);
    assert!(!provider.handles("source.js"));

    h.bridge.deactivate().await;
}
