//! Lint path: job payload, staleness guard, diagnostic mapping

use lintbridge_engine::{
    Document, LintError, LintOutcome, LinterSettings, Position, Range, Severity, TextBuffer,
    WorkerError,
};
use lintbridge_types::JobKind;
use lintbridge_worker::testing::Reply;
use serde_json::json;

use crate::common::Harness;

fn buffer(text: &str) -> TextBuffer {
    TextBuffer::new(Some("/project/src/index.js".into()), "source.js", text)
}

fn plain_settings() -> LinterSettings {
    LinterSettings {
        show_rule_id_in_message: false,
        ..LinterSettings::default()
    }
}

fn diagnostics(outcome: LintOutcome) -> Vec<lintbridge_engine::Diagnostic> {
    match outcome {
        LintOutcome::Updated(diagnostics) => diagnostics,
        LintOutcome::Stale => panic!("expected fresh diagnostics, got Stale"),
    }
}

#[tokio::test(start_paused = true)]
async fn empty_buffer_yields_nothing_without_worker_round_trip() {
    let h = Harness::new(LinterSettings::default(), |_| Reply::Result(json!([])));

    let outcome = h.bridge.lint(&buffer("")).await.unwrap();
    assert_eq!(outcome, LintOutcome::Updated(vec![]));
    assert_eq!(h.launcher.requests(), 0);

    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn lint_job_carries_buffer_and_settings() {
    let mut settings = plain_settings();
    settings
        .extra
        .insert("disableWhenNoEslintrc".to_string(), json!(true));
    let h = Harness::new(settings, |_| Reply::Result(json!([])));

    h.bridge.lint(&buffer("var a = 1;\n")).await.unwrap();

    let job = h.launcher.last_job().unwrap();
    assert_eq!(job.kind, JobKind::Lint);
    assert_eq!(job.contents.as_deref(), Some("var a = 1;\n"));
    assert_eq!(
        job.file_path.as_deref(),
        Some(std::path::Path::new("/project/src/index.js"))
    );
    assert_eq!(job.config["disableWhenNoEslintrc"], true);
    assert_eq!(job.config["showRuleIdInMessage"], false);
    assert!(job.rules.unwrap().is_empty());

    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn buffer_edited_during_lint_is_stale() {
    let doc = buffer("var a = 1\n");
    let editor = doc.clone();
    let h = Harness::new(plain_settings(), move |_| {
        // The user keeps typing while the worker is busy.
        editor.set_text("var a = 12\n");
        Reply::Result(json!([{ "message": "Missing semicolon.", "line": 1, "column": 10, "severity": 2, "ruleId": "semi" }]))
    });

    assert_eq!(h.bridge.lint(&doc).await.unwrap(), LintOutcome::Stale);
    assert_eq!(h.launcher.requests(), 1);

    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn messages_map_to_ranges_and_severities() {
    let h = Harness::new(plain_settings(), |_| {
        Reply::Result(json!([
            { "message": "Unexpected console statement.", "line": 1, "column": 1, "severity": 1, "ruleId": "no-console" },
            { "message": "'b' is not defined.", "line": 2, "column": 3, "severity": 2, "ruleId": "no-undef" },
            { "message": "Trailing spaces not allowed.", "line": 3, "severity": 2, "ruleId": "no-trailing-spaces" }
        ]))
    });

    let doc = buffer("console.log(1);\na(b);\n   x;  \n");
    let found = diagnostics(h.bridge.lint(&doc).await.unwrap());

    assert_eq!(found.len(), 3);
    assert_eq!(found[0].severity(), Severity::Warning);
    assert_eq!(
        found[0].range(),
        Range::new(Position::new(0, 0), Position::new(0, 15))
    );
    assert_eq!(found[1].severity(), Severity::Error);
    assert_eq!(
        found[1].range(),
        Range::new(Position::new(1, 2), Position::new(1, 5))
    );
    // No column: start at the first non-blank character.
    assert_eq!(
        found[2].range(),
        Range::new(Position::new(2, 3), Position::new(2, 7))
    );
    assert_eq!(found[1].message().as_str(), "'b' is not defined.");
    assert_eq!(found[1].rule_id(), Some("no-undef"));
    assert_eq!(found[1].file_path(), doc.path().as_deref());

    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn fix_offsets_map_through_the_document() {
    let h = Harness::new(plain_settings(), |_| {
        Reply::Result(json!([{
            "message": "'a' is never reassigned. Use 'const' instead.",
            "line": 1,
            "column": 1,
            "severity": 2,
            "ruleId": "prefer-const",
            "fix": { "range": [5, 10], "text": "X" }
        }]))
    });

    let found = diagnostics(h.bridge.lint(&buffer("let\nabcdefgh\n")).await.unwrap());
    let fix = found[0].fix().expect("fix should be attached");
    assert_eq!(fix.range.start, Position::new(1, 1));
    assert_eq!(fix.range.end, Position::new(1, 6));
    assert_eq!(fix.new_text, "X");

    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn rule_badges_when_rule_ids_shown() {
    let h = Harness::new(LinterSettings::default(), |_| {
        Reply::Result(json!([
            { "message": "'foo' is not defined.", "line": 1, "column": 1, "severity": 2, "ruleId": "no-undef" },
            { "message": "Parsing error: Unexpected token <", "line": 1, "column": 1, "severity": 2 }
        ]))
    });

    let found = diagnostics(h.bridge.lint(&buffer("foo <\n")).await.unwrap());

    let linked = found[0].message();
    assert!(linked.is_html());
    assert!(linked.as_str().starts_with(
        r#"<a href="https://eslint.org/docs/rules/no-undef" class="badge badge-flexible eslint">no-undef</a>"#
    ));
    assert!(linked.as_str().ends_with("&#39;foo&#39; is not defined."));

    let fatal = found[1].message();
    assert_eq!(
        fatal.as_str(),
        r#"<span class="badge badge-flexible eslint">Fatal</span> Parsing error: Unexpected token &lt;"#
    );

    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn unmappable_location_fails_the_call() {
    let h = Harness::new(plain_settings(), |_| {
        Reply::Result(json!([{ "message": "Unexpected token", "line": 40, "column": 2, "severity": 2, "ruleId": "semi" }]))
    });

    let err = h.bridge.lint(&buffer("a\n")).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot mark location in editor for (semi) - (Unexpected token) at line (40) column (2)"
    );

    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn worker_error_is_reported_verbatim() {
    let h = Harness::new(plain_settings(), |_| {
        Reply::Error("No ESLint configuration found.".to_string())
    });

    let err = h.bridge.lint(&buffer("a\n")).await.unwrap_err();
    assert_eq!(
        err,
        LintError::Worker(WorkerError::Rejected(
            "No ESLint configuration found.".to_string()
        ))
    );
    assert_eq!(err.to_string(), "No ESLint configuration found.");

    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn silenced_rules_apply_only_to_unsaved_buffers() {
    let settings = LinterSettings {
        rules_to_silence_while_typing: vec!["no-unused-vars".to_string(), " ".to_string()],
        ..plain_settings()
    };
    let h = Harness::new(settings, |_| Reply::Result(json!([])));

    let doc = buffer("var a;\n");
    h.bridge.lint(&doc).await.unwrap();
    assert!(h.launcher.last_job().unwrap().rules.unwrap().is_empty());

    doc.set_text("var ab;\n");
    h.bridge.lint(&doc).await.unwrap();
    let rules = h.launcher.last_job().unwrap().rules.unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(json!(rules), json!({ "no-unused-vars": "off" }));

    h.bridge.deactivate().await;
}
