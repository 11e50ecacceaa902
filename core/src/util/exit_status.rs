use std::process::ExitStatus;

/// Normalizes an exit status to a single integer.
///
/// Signal-terminated children report the negated signal number on Unix
/// (`-15` for SIGTERM); `-1` when neither code nor signal is available.
pub fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return -sig;
        }
    }
    -1
}
