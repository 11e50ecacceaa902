#![allow(dead_code)]

use std::process::{Command, Stdio};

use encvisor_core::config::SupervisorConfig;
use encvisor_core::spec::StreamSpec;

pub fn sh(script: &str) -> StreamSpec {
    StreamSpec::new("sh").args(["-c", script])
}

/// Short timings so failures surface quickly.
pub fn fast_config() -> SupervisorConfig {
    SupervisorConfig {
        force_termination_ms: 5_000,
        poll_interval_ms: 10,
        reap_grace_ms: 1_000,
        flush_timeout_ms: 1_000,
        handle_signals: false,
        ..SupervisorConfig::default()
    }
}

pub fn ffmpeg_available() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// True (after saying so) when ffmpeg is not installed and the test should return.
pub fn skip_without_ffmpeg() -> bool {
    if ffmpeg_available() {
        return false;
    }
    eprintln!("ffmpeg not found on PATH, skipping");
    true
}
