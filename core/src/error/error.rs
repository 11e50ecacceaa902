use std::fmt;

use thiserror::Error;

/// What triggered a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM / Ctrl-Break and friends.
    Terminate,
    /// The caller cancelled through the supervisor's token.
    Requested,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Interrupt => "interrupt",
            Self::Terminate => "terminate",
            Self::Requested => "requested",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("process failed (exit code {exit_code}): {message}")]
    ProcessFailure { message: String, exit_code: i32 },
    #[error("cancelled: {0}")]
    Cancelled(CancelReason),
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("stream spec creation failed: {0}")]
    Spec(#[source] anyhow::Error),
    #[error("after-start hook failed: {0}")]
    Hook(#[source] anyhow::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SupervisorError {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ProcessFailure { exit_code, .. } => Some(*exit_code),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Errors surfaced at the binary edge; each maps to a process exit code.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Command(String),
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
