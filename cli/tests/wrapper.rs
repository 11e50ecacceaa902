#![cfg(unix)]

use std::path::PathBuf;
use std::process::Command;
use std::time::{Duration, Instant};

use encvisor_core::api::{
    Drained, ProcessHandle, ProcessLauncher, ShutdownState, StreamSpec, SupervisorConfig,
    SupervisorError,
};
use encvisor_plugins::process::WrappedLauncher;

fn binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_encvisor"))
}

fn sh(script: &str) -> StreamSpec {
    StreamSpec::new("sh").args(["-c", script])
}

fn config(budget_ms: u64) -> SupervisorConfig {
    SupervisorConfig {
        force_termination_ms: budget_ms,
        poll_interval_ms: 10,
        reap_grace_ms: 1_000,
        flush_timeout_ms: 1_000,
        handle_signals: false,
        ..SupervisorConfig::default()
    }
}

fn launch(spec: StreamSpec, cfg: &SupervisorConfig) -> Box<dyn ProcessHandle> {
    WrappedLauncher::new(Some(binary())).launch(spec, cfg).unwrap()
}

#[tokio::test]
async fn wrapped_success_relays_diagnostics() {
    let mut handle = launch(sh("echo progress >&2; exit 0"), &config(2_000));

    let done = handle.wait().await.unwrap();
    assert_eq!(done.exit_code, 0);
    assert_eq!(done.captured_output, "progress\n");
}

#[tokio::test]
async fn wrapped_stdout_is_only_the_encoders() {
    let mut handle = launch(sh("echo hello"), &config(2_000));

    let done = handle.wait().await.unwrap();
    assert_eq!(done.stdout, Drained::Text("hello\n".into()));
}

#[tokio::test]
async fn wrapped_frames_stay_binary() {
    let cfg = SupervisorConfig {
        frame_bytes: Some(4),
        ..config(2_000)
    };
    let mut handle = launch(sh("printf 'abcd\\377\\376gh'"), &cfg);

    let done = handle.wait().await.unwrap();
    assert_eq!(
        done.stdout,
        Drained::Chunks(vec![b"abcd".to_vec(), vec![0xff, 0xfe, b'g', b'h']])
    );
}

#[tokio::test]
async fn wrapped_failure_keeps_exit_code() {
    let mut handle = launch(sh("echo boom >&2; exit 3"), &config(2_000));

    match handle.wait().await {
        Err(SupervisorError::ProcessFailure { message, exit_code }) => {
            assert_eq!(exit_code, 3);
            assert!(message.contains("boom"), "{message}");
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn wrapped_sentinel_is_detected_by_parent() {
    let script = "echo \"File 'o.mp4' already exists. Exiting.\" >&2; exit 0";
    let mut handle = launch(sh(script), &config(2_000));

    let err = handle.wait().await.unwrap_err();
    assert_eq!(err.exit_code(), Some(0));
}

#[tokio::test]
async fn wrapped_quit_reaches_the_encoder() {
    let mut handle = launch(sh("read key; exit 0"), &config(2_000));
    // Let the wrapper install its signal listener.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let report = handle.quit(None).await.unwrap();
    assert_eq!(report.state, ShutdownState::GracefullyExited);
    assert!(report.elapsed < Duration::from_secs(3));
}

#[tokio::test]
async fn wrapped_quit_escalates_inside_the_wrapper() {
    let mut handle = launch(sh("trap '' TERM; exec sleep 30"), &config(300));
    tokio::time::sleep(Duration::from_millis(500)).await;

    let started = Instant::now();
    let report = handle.quit(None).await.unwrap();
    assert!(report.state.is_terminal());
    // wrapper budget + its reap grace, well under the parent's own bound
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn run_exits_with_the_child_code() {
    let status = Command::new(binary())
        .args(["run", "--mode", "direct", "--", "sh", "-c", "exit 3"])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(3));
}

#[test]
fn run_relays_stdout() {
    let output = Command::new(binary())
        .args(["run", "--mode", "direct", "--", "sh", "-c", "echo hello"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "hello\n");
}

#[test]
fn run_wrapped_relays_only_encoder_stdout() {
    let output = Command::new(binary())
        .args(["run", "--mode", "wrapped", "--", "sh", "-c", "echo hello"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "hello\n");
}

#[test]
fn run_reads_a_job_file() {
    let dir = tempfile::tempdir().unwrap();
    let job = dir.path().join("job.toml");
    std::fs::write(&job, "program = \"sh\"\nargs = [\"-c\", \"exit 4\"]\n").unwrap();

    let status = Command::new(binary())
        .args(["run", "--mode", "direct", "--spec"])
        .arg(&job)
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(4));
}

#[test]
fn run_without_command_fails() {
    let status = Command::new(binary()).arg("run").status().unwrap();
    assert_eq!(status.code(), Some(20));
}

#[test]
fn missing_config_file_is_a_config_error() {
    let status = Command::new(binary())
        .args(["--config", "/nonexistent/encvisor.toml", "run", "--", "true"])
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(11));
}
