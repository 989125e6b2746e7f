//! Fix command and fix-on-save

use lintbridge_engine::{
    Document, FixError, LinterSettings, SAVE_BEFORE_FIXING, SaveOutcome, TextBuffer, WorkerError,
};
use lintbridge_types::JobKind;
use lintbridge_worker::testing::Reply;
use serde_json::json;

use crate::common::{Harness, Notice};

fn saved(path: &str, scope: &str) -> TextBuffer {
    TextBuffer::new(Some(path.into()), scope, "var a = 1\n")
}

fn fix_on_save() -> LinterSettings {
    LinterSettings {
        fix_on_save: true,
        ..LinterSettings::default()
    }
}

fn summary_handler(job: &lintbridge_types::WorkerJob) -> Reply {
    match job.file_path.as_deref().and_then(|p| p.to_str()) {
        Some(path) if path.ends_with("broken.js") => {
            Reply::Error("Fatal: could not parse broken.js".to_string())
        }
        _ => Reply::Result(json!("Linter-ESLint: Fix Complete.")),
    }
}

#[tokio::test(start_paused = true)]
async fn fix_file_on_modified_editor_is_refused() {
    let h = Harness::new(LinterSettings::default(), summary_handler);
    let doc = saved("/p/a.js", "source.js");
    doc.set_text("var a = 2\n");

    let err = h.bridge.fix_file(Some(&doc as &dyn Document)).await.unwrap_err();
    assert_eq!(err, FixError::Unsaved);
    assert_eq!(h.launcher.requests(), 0);
    assert_eq!(
        h.notifier.notices(),
        vec![Notice::Error {
            title: SAVE_BEFORE_FIXING.to_string(),
            detail: String::new(),
        }]
    );

    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn fix_file_without_editor_is_refused() {
    let h = Harness::new(LinterSettings::default(), summary_handler);

    let err = h.bridge.fix_file(None).await.unwrap_err();
    assert_eq!(err, FixError::NoEditor);
    assert_eq!(h.launcher.requests(), 0);
    assert_eq!(h.notifier.errors(), vec![SAVE_BEFORE_FIXING.to_string()]);

    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn fix_file_success_notifies_with_worker_text() {
    let h = Harness::new(LinterSettings::default(), summary_handler);
    let doc = saved("/p/a.js", "source.js");

    let summary = h.bridge.fix_file(Some(&doc as &dyn Document)).await.unwrap();
    assert_eq!(summary, "Linter-ESLint: Fix Complete.");
    assert_eq!(
        h.notifier.notices(),
        vec![Notice::Success("Linter-ESLint: Fix Complete.".to_string())]
    );

    let job = h.launcher.last_job().unwrap();
    assert_eq!(job.kind, JobKind::Fix);
    assert!(job.contents.is_none());
    assert!(job.rules.is_none());
    assert!(job.config.is_object());

    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn fix_file_failure_is_a_warning() {
    let h = Harness::new(LinterSettings::default(), summary_handler);
    let doc = saved("/p/broken.js", "source.js");

    let err = h.bridge.fix_file(Some(&doc as &dyn Document)).await.unwrap_err();
    assert_eq!(
        err,
        FixError::Worker(WorkerError::Rejected(
            "Fatal: could not parse broken.js".to_string()
        ))
    );
    assert_eq!(
        h.notifier.notices(),
        vec![Notice::Warning("Fatal: could not parse broken.js".to_string())]
    );

    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn save_in_linted_scope_fixes_silently() {
    let h = Harness::new(fix_on_save(), summary_handler);
    let doc = saved("/p/a.js", "source.js");

    let outcome = h.bridge.on_did_save(&doc).await.unwrap();
    assert_eq!(
        outcome,
        SaveOutcome::Fixed("Linter-ESLint: Fix Complete.".to_string())
    );
    assert_eq!(h.launcher.requests(), 1);
    assert!(h.notifier.notices().is_empty());

    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn save_outside_scopes_or_with_option_off_does_nothing() {
    let h = Harness::new(fix_on_save(), summary_handler);
    let python = saved("/p/a.py", "source.python");
    assert_eq!(
        h.bridge.on_did_save(&python).await.unwrap(),
        SaveOutcome::Skipped
    );

    let mut settings = fix_on_save();
    settings.fix_on_save = false;
    h.bridge.apply_settings(settings);
    let js = saved("/p/a.js", "source.js");
    assert_eq!(h.bridge.on_did_save(&js).await.unwrap(), SaveOutcome::Skipped);

    assert_eq!(h.launcher.requests(), 0);
    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn save_fix_failure_is_a_warning() {
    let h = Harness::new(fix_on_save(), summary_handler);
    let doc = saved("/p/broken.js", "source.js");

    assert!(h.bridge.on_did_save(&doc).await.is_err());
    assert_eq!(
        h.notifier.notices(),
        vec![Notice::Warning("Fatal: could not parse broken.js".to_string())]
    );

    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn html_files_fix_on_save_only_when_enabled() {
    let h = Harness::new(fix_on_save(), summary_handler);
    let page = saved("/p/index.html", "source.js.embedded.html");
    assert_eq!(h.bridge.on_did_save(&page).await.unwrap(), SaveOutcome::Skipped);

    h.bridge.observer().set_lint_html_files(true);
    assert!(matches!(
        h.bridge.on_did_save(&page).await.unwrap(),
        SaveOutcome::Fixed(_)
    ));

    h.bridge.deactivate().await;
}
