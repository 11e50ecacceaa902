use std::fmt;

/// Lifecycle of one `Supervisor::execute` call, observable through
/// `Supervisor::subscribe_state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SupervisorState {
    #[default]
    Idle,
    Starting,
    AwaitingCompletion,
    Cancelling,
    Finished,
}

impl fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Starting => "starting",
            Self::AwaitingCompletion => "awaiting_completion",
            Self::Cancelling => "cancelling",
            Self::Finished => "finished",
        };
        f.write_str(s)
    }
}
