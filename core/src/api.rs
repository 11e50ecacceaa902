//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `encvisor_core::api` instead of reaching into internal modules.

pub use crate::config::{
    apply_env_overrides, load_default, load_from_path, AppConfig, LaunchMode, LoggingConfig,
    SupervisorConfig,
};
pub use crate::error::{CancelReason, CliError, ConfigError, SupervisorError};
pub use crate::pipe::{Drained, PipeDrainer, PipeReader, ReadDiscipline};
pub use crate::process::{
    classify, complete, complete_with, wait_for_exit, AfterStart, ChildControl, ChildProcess,
    CompletionResult, ProcessHandle, ProcessLauncher, ShutdownReport, ShutdownState,
};
pub use crate::shutdown::{ShutdownCoordinator, StopRequest};
pub use crate::spec::StreamSpec;
pub use crate::supervisor::{Supervisor, SupervisorState};
pub use crate::util::{exit_code_of, ChunkQueue};
