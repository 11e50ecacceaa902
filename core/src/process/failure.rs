use tracing::error;

use crate::error::SupervisorError;

/// Decides whether a finished process failed.
///
/// A nonzero exit code fails. So does an exit code of 0 when `output` contains
/// the sentinel: some encoders refuse to overwrite an output yet report success.
pub fn classify(exit_code: i32, output: &str, sentinel: Option<&str>) -> Result<(), SupervisorError> {
    let sentinel_hit = sentinel.is_some_and(|s| output.contains(s));
    if exit_code == 0 && !sentinel_hit {
        return Ok(());
    }
    error!(exit_code, sentinel_hit, "process failed");
    Err(SupervisorError::ProcessFailure {
        message: output.to_string(),
        exit_code,
    })
}
