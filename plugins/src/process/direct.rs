use std::time::Duration;

use async_trait::async_trait;
use encvisor_core::config::SupervisorConfig;
use encvisor_core::error::SupervisorError;
use encvisor_core::pipe::{Drained, PipeReader};
use encvisor_core::process::{
    complete, wait_for_exit, ChildControl, ChildProcess, CompletionResult, ProcessHandle,
    ProcessLauncher, ShutdownReport,
};
use encvisor_core::shutdown::ShutdownCoordinator;
use encvisor_core::spec::StreamSpec;
use tracing::debug;

use super::command;
use super::output::drain_after_quit;

/// Launches the encoder as a direct child of this process.
#[derive(Debug, Default)]
pub struct DirectLauncher {}

impl DirectLauncher {
    pub fn new() -> Self {
        Self {}
    }
}

impl ProcessLauncher for DirectLauncher {
    fn name(&self) -> &str {
        "direct"
    }

    fn launch(
        &self,
        spec: StreamSpec,
        config: &SupervisorConfig,
    ) -> Result<Box<dyn ProcessHandle>, SupervisorError> {
        Ok(Box::new(DirectProcess::spawn(&spec, config)?))
    }
}

/// A direct child: stop requests go in-band through its stdin.
pub struct DirectProcess {
    child: ChildProcess,
    reader: PipeReader,
    config: SupervisorConfig,
}

impl DirectProcess {
    pub fn spawn(spec: &StreamSpec, config: &SupervisorConfig) -> Result<Self, SupervisorError> {
        let mut cmd = command::command(&spec.program, &spec.args, spec, config.new_process_group);
        let child = command::spawn(&mut cmd, &spec.program)?;
        let mut child = ChildProcess::new(child);
        // On error the child is killed when `child` drops.
        let reader = PipeReader::new(child.take_stdout(), child.take_stderr(), config.frame_bytes)?;
        debug!(pid = ?child.id(), command = ?spec.command_line(), "direct process spawned");
        Ok(Self {
            child,
            reader,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl ProcessHandle for DirectProcess {
    fn name(&self) -> &str {
        "direct"
    }

    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn read_stdout(&self) -> Drained {
        self.reader.read_stdout()
    }

    fn read_stderr(&self) -> String {
        self.reader.read_stderr()
    }

    async fn wait(&mut self) -> Result<CompletionResult, SupervisorError> {
        let exit_code = wait_for_exit(&mut self.child, self.config.poll_interval()).await?;
        debug!(exit_code, "direct process exited");
        complete(&mut self.reader, exit_code, &self.config).await
    }

    async fn quit(&mut self, budget: Option<Duration>) -> Result<ShutdownReport, SupervisorError> {
        let budget = budget.unwrap_or_else(|| self.config.force_termination());
        let report = ShutdownCoordinator::in_band(budget, &self.config)
            .run(&mut self.child)
            .await;
        drain_after_quit(&mut self.reader, self.config.flush_timeout()).await;
        Ok(report)
    }
}
