//! Bridge activation, provider descriptor and live settings

use lintbridge_engine::{BrokerState, Document, LintOutcome, LinterSettings, TextBuffer};
use lintbridge_worker::testing::Reply;
use serde_json::json;

use crate::common::{Harness, settle};

fn reply_with_rule() -> Reply {
    Reply::Result(json!([{ "message": "Missing semicolon.", "line": 1, "column": 10, "severity": 2, "ruleId": "semi" }]))
}

#[tokio::test(start_paused = true)]
async fn activation_starts_one_worker_and_describes_provider() {
    let h = Harness::new(LinterSettings::default(), |_| reply_with_rule());
    settle().await;

    assert_eq!(h.launcher.launches(), 1);
    assert_eq!(h.bridge.broker().state(), BrokerState::Running);

    let provider = h.bridge.provider();
    assert_eq!(provider.name, "ESLint");
    assert_eq!(provider.scope, "file");
    assert!(provider.lint_on_fly);
    assert!(provider.handles("source.js"));
    assert!(provider.handles("source.babel"));
    assert!(!provider.handles("source.python"));

    h.bridge.deactivate().await;
    assert_eq!(h.bridge.broker().state(), BrokerState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn show_rule_id_change_applies_to_next_lint() {
    let h = Harness::new(LinterSettings::default(), |_| reply_with_rule());
    let doc = TextBuffer::new(Some("/p/a.js".into()), "source.js", "var a = 1\n");

    let LintOutcome::Updated(first) = h.bridge.lint(&doc).await.unwrap() else {
        panic!("expected diagnostics");
    };
    assert!(first[0].message().is_html());

    h.bridge.observer().set_show_rule_id(false);
    let LintOutcome::Updated(second) = h.bridge.lint(&doc).await.unwrap() else {
        panic!("expected diagnostics");
    };
    assert!(!second[0].message().is_html());
    assert_eq!(second[0].message().as_str(), "Missing semicolon.");
    assert_eq!(
        h.launcher.last_job().unwrap().config["showRuleIdInMessage"],
        false
    );

    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn concurrent_lints_share_the_worker() {
    let h = Harness::new(LinterSettings::default(), |job| {
        let line_count = job.contents.as_deref().unwrap_or("").lines().count();
        Reply::Result(json!([{ "message": format!("{line_count} lines"), "line": 1, "severity": 1 }]))
    });

    let doc = |n: usize| {
        TextBuffer::new(Some(format!("/p/{n}.js").into()), "source.js", "x;\n".repeat(n))
    };
    let (one, two, three) = (doc(1), doc(2), doc(3));

    let (a, b, c) = tokio::join!(
        h.bridge.lint(&one as &dyn Document),
        h.bridge.lint(&two as &dyn Document),
        h.bridge.lint(&three as &dyn Document),
    );

    for (n, outcome) in [(1, a), (2, b), (3, c)] {
        let LintOutcome::Updated(found) = outcome.unwrap() else {
            panic!("expected diagnostics");
        };
        assert!(found[0].message().as_str().ends_with(&format!(" {n} lines")));
    }
    assert_eq!(h.launcher.launches(), 1);
    assert_eq!(h.launcher.requests(), 3);

    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn deactivate_is_idempotent() {
    let h = Harness::new(LinterSettings::default(), |_| reply_with_rule());
    h.bridge.deactivate().await;
    h.bridge.deactivate().await;
    assert!(!h.bridge.broker().is_active());
}
