use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::SupervisorConfig;
use crate::process::{wait_for_exit, ChildControl, ShutdownReport, ShutdownState};

/// How the child is asked to stop before the hard kill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopRequest {
    /// Bytes written to the child's stdin, which is then closed.
    InBand(Vec<u8>),
    /// A signal (or console event) delivered through [`ChildControl::interrupt`].
    /// The child is force-terminated even after it exits, which also takes
    /// down anything it left behind.
    Interrupt,
}

/// Graceful stop with bounded escalation to a hard kill.
///
/// `Running -> QuitRequested -> GracefullyExited | ForcedTerminated`; the
/// total time spent is the budget plus at most the reap grace.
pub struct ShutdownCoordinator {
    request: StopRequest,
    budget: Duration,
    poll_interval: Duration,
    reap_grace: Duration,
    state: ShutdownState,
}

impl ShutdownCoordinator {
    pub fn new(request: StopRequest, budget: Duration, config: &SupervisorConfig) -> Self {
        Self {
            request,
            budget,
            poll_interval: config.poll_interval(),
            reap_grace: config.reap_grace(),
            state: ShutdownState::Running,
        }
    }

    /// Coordinator writing the configured graceful-stop bytes.
    pub fn in_band(budget: Duration, config: &SupervisorConfig) -> Self {
        Self::new(
            StopRequest::InBand(config.graceful_stop.as_bytes().to_vec()),
            budget,
            config,
        )
    }

    pub fn interrupting(budget: Duration, config: &SupervisorConfig) -> Self {
        Self::new(StopRequest::Interrupt, budget, config)
    }

    pub fn state(&self) -> ShutdownState {
        self.state
    }

    pub async fn run(&mut self, child: &mut dyn ChildControl) -> ShutdownReport {
        let started = Instant::now();
        self.state = ShutdownState::QuitRequested;
        info!(pid = ?child.id(), budget_ms = self.budget.as_millis() as u64, "quit requested");

        let delivered = match &self.request {
            StopRequest::InBand(bytes) => child.request_stop(bytes),
            StopRequest::Interrupt => child.interrupt(),
        };
        if let Err(e) = delivered {
            // The child may already be gone; the timeout below still decides.
            debug!(error = %e, "stop request not delivered");
        }

        let natural = tokio::time::timeout(self.budget, wait_for_exit(child, self.poll_interval)).await;
        let (state, exit_code) = match natural {
            Ok(Ok(code)) => {
                if self.request == StopRequest::Interrupt {
                    if let Err(e) = child.force_terminate() {
                        debug!(error = %e, "terminate after exit failed");
                    }
                }
                debug!(exit_code = code, "child exited after stop request");
                (ShutdownState::GracefullyExited, Some(code))
            }
            Ok(Err(e)) => {
                warn!(error = %e, "failed to poll child, forcing termination");
                (ShutdownState::ForcedTerminated, self.force(child).await)
            }
            Err(_) => {
                warn!(
                    budget_ms = self.budget.as_millis() as u64,
                    "child still running after budget, forcing termination"
                );
                (ShutdownState::ForcedTerminated, self.force(child).await)
            }
        };

        self.state = state;
        let elapsed = started.elapsed();
        info!(%state, exit_code = ?exit_code, elapsed_ms = elapsed.as_millis() as u64, "quit finished");
        ShutdownReport {
            state,
            exit_code,
            elapsed,
        }
    }

    async fn force(&self, child: &mut dyn ChildControl) -> Option<i32> {
        if let Err(e) = child.force_terminate() {
            warn!(error = %e, "force terminate failed");
        }
        match tokio::time::timeout(self.reap_grace, wait_for_exit(child, self.poll_interval)).await {
            Ok(Ok(code)) => Some(code),
            Ok(Err(e)) => {
                warn!(error = %e, "failed to reap child");
                None
            }
            Err(_) => {
                warn!(
                    grace_ms = self.reap_grace.as_millis() as u64,
                    "child not reaped after kill"
                );
                None
            }
        }
    }
}
