#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{fast_config, sh};
use encvisor_core::api::{
    CancelReason, Drained, ProcessHandle, ProcessLauncher, ShutdownState, StreamSpec, Supervisor,
    SupervisorConfig, SupervisorError,
};
use encvisor_plugins::process::{DirectLauncher, DirectProcess};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn nonzero_exit_is_a_failure_with_diagnostics() {
    let mut process = DirectProcess::spawn(&sh("echo boom >&2; exit 3"), &fast_config()).unwrap();

    match process.wait().await {
        Err(SupervisorError::ProcessFailure { message, exit_code }) => {
            assert_eq!(exit_code, 3);
            assert!(message.contains("boom"), "message: {message}");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn sentinel_fails_a_zero_exit() {
    let script = "echo \"File 'out.mp4' already exists. Exiting.\" >&2; exit 0";
    let mut process = DirectProcess::spawn(&sh(script), &fast_config()).unwrap();

    let err = process.wait().await.unwrap_err();
    assert_eq!(err.exit_code(), Some(0));
}

#[tokio::test]
async fn success_returns_both_streams() {
    let mut process =
        DirectProcess::spawn(&sh("echo progress >&2; echo out"), &fast_config()).unwrap();

    let done = process.wait().await.unwrap();
    assert_eq!(done.exit_code, 0);
    assert_eq!(done.captured_output, "progress\n");
    assert_eq!(done.stdout, Drained::Text("out\n".into()));
}

#[tokio::test]
async fn framed_stdout_keeps_binary_chunks() {
    let config = SupervisorConfig {
        frame_bytes: Some(4),
        ..fast_config()
    };
    let mut process = DirectProcess::spawn(&sh("printf 'abcdefghij'"), &config).unwrap();

    let done = process.wait().await.unwrap();
    assert_eq!(
        done.stdout,
        Drained::Chunks(vec![b"abcd".to_vec(), b"efgh".to_vec(), b"ij".to_vec()])
    );
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() {
    let spec = StreamSpec::new("/nonexistent/encoder");
    let err = DirectLauncher::new()
        .launch(spec, &fast_config())
        .err()
        .unwrap();
    assert!(matches!(err, SupervisorError::Spawn(_)), "{err:?}");
}

#[tokio::test]
async fn descendant_holding_pipes_does_not_block_wait() {
    let config = SupervisorConfig {
        flush_timeout_ms: 200,
        ..fast_config()
    };
    let mut process = DirectProcess::spawn(&sh("sleep 5 & echo started; exit 0"), &config).unwrap();

    let started = Instant::now();
    let done = process.wait().await.unwrap();
    assert_eq!(done.exit_code, 0);
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn quit_stops_stdin_reader_gracefully() {
    let mut process = DirectProcess::spawn(&sh("read key; exit 0"), &fast_config()).unwrap();

    let report = process.quit(None).await.unwrap();
    assert_eq!(report.state, ShutdownState::GracefullyExited);
    assert_eq!(report.exit_code, Some(0));
    assert!(report.elapsed < Duration::from_secs(5));
}

#[tokio::test]
async fn quit_forces_a_stubborn_child_within_budget() {
    let mut process =
        DirectProcess::spawn(&sh("trap '' TERM; exec sleep 30"), &fast_config()).unwrap();
    let budget = Duration::from_millis(300);

    let started = Instant::now();
    let report = process.quit(Some(budget)).await.unwrap();
    assert_eq!(report.state, ShutdownState::ForcedTerminated);
    assert_eq!(report.exit_code, Some(-9));
    // budget + reap grace + flush timeout
    assert!(started.elapsed() < budget + Duration::from_secs(2));
}

#[tokio::test]
async fn quit_after_exit_is_harmless() {
    let mut process = DirectProcess::spawn(&sh("exit 0"), &fast_config()).unwrap();
    process.wait().await.unwrap();

    let report = process.quit(None).await.unwrap();
    assert_eq!(report.state, ShutdownState::GracefullyExited);
    assert_eq!(report.exit_code, Some(0));
}

#[tokio::test]
async fn supervisor_cancellation_stops_the_process() {
    let supervisor = Supervisor::new(Arc::new(DirectLauncher::new()), fast_config())
        .with_budget(Duration::from_millis(500));
    let token = supervisor.cancellation_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
    });

    let started = Instant::now();
    let err = supervisor
        .execute(|| async { Ok(sh("trap '' TERM; exec sleep 30")) }, None)
        .await
        .unwrap_err();
    assert!(matches!(err, SupervisorError::Cancelled(CancelReason::Requested)));
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn supervisor_runs_to_completion() {
    let supervisor = Supervisor::new(Arc::new(DirectLauncher::new()), fast_config());
    let done = supervisor
        .execute(|| async { Ok(sh("echo encoding >&2")) }, None)
        .await
        .unwrap();
    assert_eq!(done.captured_output, "encoding\n");
}
