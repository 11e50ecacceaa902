use std::io;
use std::time::Duration;

use tracing::debug;

use crate::config::SupervisorConfig;
use crate::error::SupervisorError;
use crate::pipe::PipeReader;

use super::child::ChildControl;
use super::failure::classify;
use super::types::CompletionResult;

/// Polls until the child exits. Dropping the future leaves the child untouched.
///
/// A std `Child` rather than `tokio::process`: the drainer threads need the
/// pipes as blocking `Read`, so there is no async `wait` to await here.
pub async fn wait_for_exit(child: &mut dyn ChildControl, poll_interval: Duration) -> io::Result<i32> {
    loop {
        if let Some(code) = child.try_exit()? {
            return Ok(code);
        }
        tokio::time::sleep(poll_interval).await;
    }
}

/// Drains what is left in the pipes of an exited child and classifies the run.
pub async fn complete(
    reader: &mut PipeReader,
    exit_code: i32,
    config: &SupervisorConfig,
) -> Result<CompletionResult, SupervisorError> {
    complete_with(reader, exit_code, config, |stderr| stderr).await
}

/// Like [`complete`], with `diagnostics` picking the captured output out of
/// the raw stderr text before it is classified.
pub async fn complete_with<F>(
    reader: &mut PipeReader,
    exit_code: i32,
    config: &SupervisorConfig,
    diagnostics: F,
) -> Result<CompletionResult, SupervisorError>
where
    F: FnOnce(String) -> String,
{
    reader.finish_within(config.flush_timeout()).await;
    let captured_output = diagnostics(reader.read_stderr());
    let stdout = reader.read_stdout();
    debug!(
        exit_code,
        stderr_bytes = captured_output.len(),
        stdout_empty = stdout.is_empty(),
        "process output drained"
    );

    classify(exit_code, &captured_output, config.sentinel())?;
    Ok(CompletionResult {
        exit_code,
        captured_output,
        stdout,
    })
}
