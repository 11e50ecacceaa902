use std::time::Duration;

use async_trait::async_trait;

use crate::config::SupervisorConfig;
use crate::error::SupervisorError;
use crate::pipe::Drained;
use crate::spec::StreamSpec;

use super::types::{CompletionResult, ShutdownReport};

/// One spawned encoder process together with its drained pipes.
///
/// `wait` and `quit` take `&mut self`: a handle has a single driver.
#[async_trait]
pub trait ProcessHandle: Send + Sync {
    fn name(&self) -> &str;
    fn id(&self) -> Option<u32>;

    /// stdout buffered so far; never blocks.
    fn read_stdout(&self) -> Drained;
    /// stderr buffered so far; never blocks.
    fn read_stderr(&self) -> String;

    /// Resolves once the process has exited and its output has been drained.
    ///
    /// Fails with [`SupervisorError::ProcessFailure`] on a nonzero exit code or
    /// when the diagnostic output contains the false-success sentinel.
    async fn wait(&mut self) -> Result<CompletionResult, SupervisorError>;

    /// Stops the process, escalating to a hard kill after `budget` (the
    /// handle's configured budget when `None`).
    async fn quit(&mut self, budget: Option<Duration>) -> Result<ShutdownReport, SupervisorError>;
}

/// Creates process handles; the variant is picked per platform.
pub trait ProcessLauncher: Send + Sync {
    fn name(&self) -> &str;
    fn launch(
        &self,
        spec: StreamSpec,
        config: &SupervisorConfig,
    ) -> Result<Box<dyn ProcessHandle>, SupervisorError>;
}

/// Hook run once the process is live, e.g. to register it somewhere.
#[async_trait]
pub trait AfterStart: Send + Sync {
    async fn after_start(&self, handle: &dyn ProcessHandle) -> anyhow::Result<()>;
}
