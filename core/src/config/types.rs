use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Seconds docker waits between `stop` and `kill` is 10; stay below it.
pub const DEFAULT_FORCE_TERMINATION_MS: u64 = 8_000;

/// ffmpeg reports exit code 0 (7.1+) when `-n` refuses to overwrite an output.
pub const DEFAULT_FALSE_SUCCESS_SENTINEL: &str = "already exists. Exiting";

/// Keypress ffmpeg reads from stdin to stop and finalize its outputs.
pub const DEFAULT_GRACEFUL_STOP: &str = "q";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub supervisor: SupervisorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "info" or "encvisor_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

/// How the encoder process gets launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchMode {
    /// Wrapped on Windows, direct everywhere else.
    #[default]
    Auto,
    Direct,
    Wrapped,
}

impl LaunchMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "direct" => Some(Self::Direct),
            "wrapped" => Some(Self::Wrapped),
            _ => None,
        }
    }

    pub fn resolve(self) -> Self {
        match self {
            Self::Auto if cfg!(windows) => Self::Wrapped,
            Self::Auto => Self::Direct,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Budget between the graceful stop request and the hard kill.
    #[serde(default = "default_force_termination_ms")]
    pub force_termination_ms: u64,

    /// Bytes written to the encoder's stdin to ask for an orderly stop.
    #[serde(default = "default_graceful_stop")]
    pub graceful_stop: String,

    /// Diagnostic text that marks a failure even when the exit code is 0.
    /// `None` disables the check.
    #[serde(default = "default_false_success_sentinel")]
    pub false_success_sentinel: Option<String>,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Time allowed for reaping after the hard kill.
    #[serde(default = "default_reap_grace_ms")]
    pub reap_grace_ms: u64,

    /// Time allowed for joining the drainer threads once the process is gone.
    #[serde(default = "default_flush_timeout_ms")]
    pub flush_timeout_ms: u64,

    /// Read stdout as fixed-size binary frames instead of text lines.
    #[serde(default)]
    pub frame_bytes: Option<usize>,

    /// Cancel on SIGINT/SIGTERM (Ctrl-C/Ctrl-Break on Windows) while `execute`
    /// runs. Off by default: once installed, the runtime's handlers stay
    /// registered for the life of the process, so the default action of those
    /// signals is gone even after `execute` returns.
    #[serde(default)]
    pub handle_signals: bool,

    #[serde(default)]
    pub launch_mode: LaunchMode,

    /// Wrapper executable for `LaunchMode::Wrapped`; the current executable when unset.
    #[serde(default)]
    pub wrapper_program: Option<PathBuf>,

    /// Start the encoder in its own process group.
    #[serde(default)]
    pub new_process_group: bool,
}

fn default_force_termination_ms() -> u64 {
    DEFAULT_FORCE_TERMINATION_MS
}

fn default_graceful_stop() -> String {
    DEFAULT_GRACEFUL_STOP.to_string()
}

fn default_false_success_sentinel() -> Option<String> {
    Some(DEFAULT_FALSE_SUCCESS_SENTINEL.to_string())
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_reap_grace_ms() -> u64 {
    2_000
}

fn default_flush_timeout_ms() -> u64 {
    2_000
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            force_termination_ms: default_force_termination_ms(),
            graceful_stop: default_graceful_stop(),
            false_success_sentinel: default_false_success_sentinel(),
            poll_interval_ms: default_poll_interval_ms(),
            reap_grace_ms: default_reap_grace_ms(),
            flush_timeout_ms: default_flush_timeout_ms(),
            frame_bytes: None,
            handle_signals: false,
            launch_mode: LaunchMode::default(),
            wrapper_program: None,
            new_process_group: false,
        }
    }
}

impl SupervisorConfig {
    pub fn force_termination(&self) -> Duration {
        Duration::from_millis(self.force_termination_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn reap_grace(&self) -> Duration {
        Duration::from_millis(self.reap_grace_ms)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }

    pub fn sentinel(&self) -> Option<&str> {
        self.false_success_sentinel
            .as_deref()
            .filter(|s| !s.is_empty())
    }
}
