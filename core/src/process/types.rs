use std::fmt;
use std::time::Duration;

use crate::pipe::Drained;

/// Outcome of a successful [`wait`](super::ProcessHandle::wait).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResult {
    pub exit_code: i32,
    /// Decoded diagnostic (stderr) output not yet read through the handle.
    pub captured_output: String,
    /// stdout output not yet read through the handle.
    pub stdout: Drained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Running,
    QuitRequested,
    GracefullyExited,
    ForcedTerminated,
}

impl ShutdownState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::GracefullyExited | Self::ForcedTerminated)
    }
}

impl fmt::Display for ShutdownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::QuitRequested => "quit_requested",
            Self::GracefullyExited => "gracefully_exited",
            Self::ForcedTerminated => "forced_terminated",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShutdownReport {
    pub state: ShutdownState,
    /// `None` when the child could not be reaped within the grace period.
    pub exit_code: Option<i32>,
    pub elapsed: Duration,
}
