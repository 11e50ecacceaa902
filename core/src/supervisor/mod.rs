mod signals;
mod state;

pub use state::SupervisorState;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::SupervisorConfig;
use crate::error::{CancelReason, SupervisorError};
use crate::process::{AfterStart, CompletionResult, ProcessHandle, ProcessLauncher};
use crate::spec::StreamSpec;

use signals::SignalListener;

/// Runs one encoder process to completion or cancellation.
///
/// A termination signal (when `handle_signals` is set) or a cancelled
/// [`CancellationToken`] turns into a single bounded `quit` of the running
/// process, after which `execute` fails with [`SupervisorError::Cancelled`].
pub struct Supervisor {
    launcher: Arc<dyn ProcessLauncher>,
    config: SupervisorConfig,
    cancel: CancellationToken,
    state: watch::Sender<SupervisorState>,
}

enum Interrupted<T> {
    Done(T),
    Cancelled(CancelReason),
}

impl Supervisor {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, config: SupervisorConfig) -> Self {
        let (state, _) = watch::channel(SupervisorState::Idle);
        Self {
            launcher,
            config,
            cancel: CancellationToken::new(),
            state,
        }
    }

    /// Overrides the force-termination budget.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.config.force_termination_ms = budget.as_millis() as u64;
        self
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    /// Token that cancels the current and any later `execute` call.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn state(&self) -> SupervisorState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SupervisorState> {
        self.state.subscribe()
    }

    /// Creates the stream spec, launches it, runs `after_start` and waits.
    pub async fn execute<F, Fut>(
        &self,
        create_spec: F,
        after_start: Option<&dyn AfterStart>,
    ) -> Result<CompletionResult, SupervisorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<StreamSpec>>,
    {
        debug!(launcher = self.launcher.name(), "supervisor start");
        let result = self.run(create_spec, after_start).await;
        match &result {
            Ok(done) => info!(exit_code = done.exit_code, "process completed"),
            Err(SupervisorError::Cancelled(reason)) => info!(%reason, "process cancelled"),
            Err(e) => error!(error = %e, "process supervision failed"),
        }
        self.set_state(SupervisorState::Finished);
        debug!("supervisor finish");
        result
    }

    async fn run<F, Fut>(
        &self,
        create_spec: F,
        after_start: Option<&dyn AfterStart>,
    ) -> Result<CompletionResult, SupervisorError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<StreamSpec>>,
    {
        self.set_state(SupervisorState::Starting);
        let (signal_tx, mut signal_rx) = watch::channel(None);
        let _listener = if self.config.handle_signals {
            Some(SignalListener::install(signal_tx)?)
        } else {
            None
        };

        let spec = tokio::select! {
            biased;
            reason = self.cancelled(&mut signal_rx) => return Err(SupervisorError::Cancelled(reason)),
            spec = create_spec() => spec.map_err(SupervisorError::Spec)?,
        };
        debug!(command = ?spec.command_line(), "stream spec ready");

        let mut handle = self.launcher.launch(spec, &self.config)?;
        info!(launcher = handle.name(), pid = ?handle.id(), "process started");

        if let Some(hook) = after_start {
            debug!("running after-start hook");
            let hooked = tokio::select! {
                biased;
                reason = self.cancelled(&mut signal_rx) => Interrupted::Cancelled(reason),
                outcome = hook.after_start(handle.as_ref()) => Interrupted::Done(outcome),
            };
            match hooked {
                Interrupted::Done(Ok(())) => {}
                Interrupted::Done(Err(e)) => {
                    warn!(error = %e, "after-start hook failed, stopping process");
                    self.quit(handle.as_mut()).await;
                    return Err(SupervisorError::Hook(e));
                }
                Interrupted::Cancelled(reason) => return self.cancel_running(handle.as_mut(), reason).await,
            }
        }

        self.set_state(SupervisorState::AwaitingCompletion);
        let waited = tokio::select! {
            biased;
            reason = self.cancelled(&mut signal_rx) => Interrupted::Cancelled(reason),
            outcome = handle.wait() => Interrupted::Done(outcome),
        };
        match waited {
            Interrupted::Done(outcome) => outcome,
            Interrupted::Cancelled(reason) => self.cancel_running(handle.as_mut(), reason).await,
        }
    }

    /// Resolves once a signal was recorded or the token was cancelled.
    async fn cancelled(&self, signal_rx: &mut watch::Receiver<Option<CancelReason>>) -> CancelReason {
        let signalled = async {
            loop {
                if let Some(reason) = *signal_rx.borrow_and_update() {
                    return reason;
                }
                if signal_rx.changed().await.is_err() {
                    // No listener installed.
                    std::future::pending::<()>().await;
                }
            }
        };
        tokio::select! {
            reason = signalled => reason,
            _ = self.cancel.cancelled() => CancelReason::Requested,
        }
    }

    async fn cancel_running(
        &self,
        handle: &mut dyn ProcessHandle,
        reason: CancelReason,
    ) -> Result<CompletionResult, SupervisorError> {
        info!(%reason, "cancellation requested, stopping process");
        self.set_state(SupervisorState::Cancelling);
        self.quit(handle).await;
        Err(SupervisorError::Cancelled(reason))
    }

    async fn quit(&self, handle: &mut dyn ProcessHandle) {
        debug!("process quit start");
        match handle.quit(Some(self.config.force_termination())).await {
            Ok(report) => debug!(
                state = %report.state,
                exit_code = ?report.exit_code,
                elapsed_ms = report.elapsed.as_millis() as u64,
                "process quit finish"
            ),
            Err(e) => error!(error = %e, "process quit failed"),
        }
    }

    fn set_state(&self, state: SupervisorState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = %previous, to = %state, "supervisor state");
        }
    }
}
