use std::io::Write;
use std::sync::Arc;

use encvisor_core::config::{AppConfig, LaunchMode, SupervisorConfig};
use encvisor_core::error::{CliError, SupervisorError};
use encvisor_core::spec::StreamSpec;
use encvisor_core::supervisor::Supervisor;
use encvisor_plugins::process::wrapped::{RELAY_BEGIN, RELAY_END};
use encvisor_plugins::process::DirectLauncher;
use tracing::{debug, info};

use super::cli::WrapArgs;
use super::run::write_stdout;

/// Supervisor settings inside the wrapper.
///
/// The parent classifies the output, so the sentinel check is off here. On
/// Unix the encoder stays in the wrapper's process group for the parent's
/// group kill; on Windows it gets its own so console events reach only us.
pub fn wrapper_config(base: &SupervisorConfig, args: &WrapArgs) -> SupervisorConfig {
    SupervisorConfig {
        force_termination_ms: args.budget_ms,
        graceful_stop: args.graceful_stop.clone(),
        false_success_sentinel: None,
        frame_bytes: args.frame_bytes,
        handle_signals: true,
        launch_mode: LaunchMode::Direct,
        wrapper_program: None,
        new_process_group: cfg!(windows),
        ..base.clone()
    }
}

/// Maps a normalized child exit code onto a process exit status.
pub fn exit_status_for(code: i32) -> i32 {
    match code {
        0..=255 => code,
        -127..=-1 => 128 - code,
        _ => 1,
    }
}

pub async fn wrap(args: WrapArgs, cfg: AppConfig) -> Result<i32, CliError> {
    let config = wrapper_config(&cfg.supervisor, &args);
    let (program, rest) = args
        .command
        .split_first()
        .ok_or_else(|| CliError::Command("wrap needs a command after `--`".into()))?;
    let spec = StreamSpec::new(program.clone()).args(rest.iter().cloned());
    info!(command = ?spec.command_line(), budget_ms = args.budget_ms, "wrapper start");

    let supervisor = Supervisor::new(Arc::new(DirectLauncher::new()), config);
    match supervisor.execute(|| async move { Ok(spec) }, None).await {
        Ok(done) => {
            write_stdout(&done.stdout)?;
            relay_stderr(&done.captured_output)?;
            Ok(exit_status_for(done.exit_code))
        }
        Err(SupervisorError::ProcessFailure { message, exit_code }) => {
            relay_stderr(&message)?;
            debug!(exit_code, "wrapped child failed");
            Ok(exit_status_for(exit_code))
        }
        Err(e) => Err(e.into()),
    }
}

/// Writes the encoder's stderr as one framed block, apart from our own logs.
fn relay_stderr(text: &str) -> std::io::Result<()> {
    let mut err = std::io::stderr().lock();
    err.write_all(relay_block(text).as_bytes())?;
    err.flush()
}

fn relay_block(text: &str) -> String {
    let newline = if text.is_empty() || text.ends_with('\n') { "" } else { "\n" };
    format!("{RELAY_BEGIN}\n{text}{newline}{RELAY_END}\n")
}
