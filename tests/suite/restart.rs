//! Worker crash recovery as seen through the bridge

use std::time::Duration;

use lintbridge_engine::{
    BrokerState, LintError, LintOutcome, LinterSettings, TextBuffer, WorkerError,
};
use lintbridge_types::Generation;
use lintbridge_worker::testing::Reply;
use serde_json::json;

use crate::common::{Harness, Notice, settle, worker_config};

const CRASH_TITLE: &str = "Worker died unexpectedly";

fn doc() -> TextBuffer {
    TextBuffer::new(Some("/p/a.js".into()), "source.js", "var a = 1;\n")
}

async fn wait_for_state(h: &Harness, state: BrokerState) {
    for _ in 0..1_000 {
        if h.bridge.broker().state() == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("broker never reached {state:?}");
}

#[tokio::test(start_paused = true)]
async fn crash_while_active_respawns_exactly_once() {
    let h = Harness::new(LinterSettings::default(), |_| Reply::Result(json!([])));
    settle().await;
    assert_eq!(h.launcher.launches(), 1);

    assert!(h.launcher.kill());
    wait_for_state(&h, BrokerState::Restarting).await;
    settle().await;
    assert_eq!(h.notifier.errors(), vec![CRASH_TITLE.to_string()]);
    assert!(matches!(
        h.notifier.notices()[0],
        Notice::Error { ref detail, .. } if detail.starts_with("Check your console")
    ));

    wait_for_state(&h, BrokerState::Running).await;
    assert_eq!(h.launcher.launches(), 2);
    assert_eq!(h.bridge.broker().generation(), Some(Generation::new(2)));

    // Nothing else is scheduled.
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(h.launcher.launches(), 2);
    assert_eq!(h.notifier.errors().len(), 1);

    // The replacement serves requests.
    assert_eq!(
        h.bridge.lint(&doc()).await.unwrap(),
        LintOutcome::Updated(vec![])
    );
    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn exit_after_deactivation_never_respawns() {
    let h = Harness::new(LinterSettings::default(), |_| Reply::Result(json!([])));
    settle().await;

    h.bridge.deactivate().await;
    h.launcher.kill();
    tokio::time::sleep(Duration::from_secs(300)).await;

    assert_eq!(h.launcher.launches(), 1);
    assert!(h.notifier.errors().is_empty());
    assert_eq!(h.bridge.broker().state(), BrokerState::Stopped);
    assert_eq!(
        h.bridge.lint(&doc()).await.unwrap_err(),
        LintError::Worker(WorkerError::Stopped)
    );
}

#[tokio::test(start_paused = true)]
async fn requests_during_restart_are_unavailable() {
    let h = Harness::new(LinterSettings::default(), |_| Reply::Result(json!([])));
    settle().await;

    h.launcher.kill();
    wait_for_state(&h, BrokerState::Restarting).await;

    let err = h.bridge.lint(&doc()).await.unwrap_err();
    assert_eq!(err, LintError::Worker(WorkerError::Unavailable));
    assert!(matches!(err, LintError::Worker(ref e) if e.is_transient()));

    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn worker_dying_mid_request_fails_the_request() {
    let h = Harness::new(LinterSettings::default(), |_| Reply::Exit);

    let err = h.bridge.lint(&doc()).await.unwrap_err();
    assert_eq!(
        err,
        LintError::Worker(WorkerError::Disconnected {
            generation: Generation::new(1)
        })
    );

    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn restart_delay_backs_off_and_resets() {
    let worker = worker_config()
        .with_restart_delays(Duration::from_secs(1), Duration::from_secs(3));
    let h = Harness::with_worker(LinterSettings::default(), &worker, |_| {
        Reply::Result(json!([]))
    });
    settle().await;

    // Two crashes with no successful request in between: 1s, then 2s.
    h.launcher.kill();
    wait_for_state(&h, BrokerState::Restarting).await;
    let first_crash = tokio::time::Instant::now();
    wait_for_state(&h, BrokerState::Running).await;
    let first_delay = first_crash.elapsed();

    h.launcher.kill();
    wait_for_state(&h, BrokerState::Restarting).await;
    let second_crash = tokio::time::Instant::now();
    wait_for_state(&h, BrokerState::Running).await;
    let second_delay = second_crash.elapsed();

    // Polling adds up to one tick of slack on either side.
    assert!(first_delay >= Duration::from_millis(900) && first_delay < Duration::from_millis(1_900));
    assert!(second_delay >= Duration::from_millis(1_900) && second_delay < Duration::from_millis(2_900));

    // A successful request resets the schedule.
    h.bridge.lint(&doc()).await.unwrap();
    h.launcher.kill();
    wait_for_state(&h, BrokerState::Restarting).await;
    let third_crash = tokio::time::Instant::now();
    wait_for_state(&h, BrokerState::Running).await;
    assert!(third_crash.elapsed() < Duration::from_millis(1_900));

    assert_eq!(h.launcher.launches(), 4);
    h.bridge.deactivate().await;
}

#[tokio::test(start_paused = true)]
async fn failed_relaunch_is_retried() {
    let h = Harness::new(LinterSettings::default(), |_| Reply::Result(json!([])));
    settle().await;

    h.launcher.fail_next_launches(1);
    h.launcher.kill();
    // Crash, failed relaunch after 1s, successful relaunch 2s later.
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(h.launcher.launches(), 3);
    assert_eq!(h.bridge.broker().state(), BrokerState::Running);
    assert_eq!(h.bridge.broker().generation(), Some(Generation::new(3)));
    assert_eq!(h.notifier.errors().len(), 2);
    assert!(h.bridge.lint(&doc()).await.is_ok());

    h.bridge.deactivate().await;
}
