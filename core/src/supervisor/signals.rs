use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::CancelReason;

/// Records the first termination signal received while installed.
///
/// The listener only publishes the reason; the supervisor decides what to do.
/// Dropping the guard uninstalls it.
pub(crate) struct SignalListener {
    task: JoinHandle<()>,
}

impl SignalListener {
    #[cfg(unix)]
    pub(crate) fn install(tx: watch::Sender<Option<CancelReason>>) -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut interrupt = signal(SignalKind::interrupt())?;
        let mut terminate = signal(SignalKind::terminate())?;
        let task = tokio::spawn(async move {
            let reason = tokio::select! {
                _ = interrupt.recv() => CancelReason::Interrupt,
                _ = terminate.recv() => CancelReason::Terminate,
            };
            debug!(%reason, "termination signal received");
            tx.send_replace(Some(reason));
        });
        Ok(Self { task })
    }

    #[cfg(windows)]
    pub(crate) fn install(tx: watch::Sender<Option<CancelReason>>) -> std::io::Result<Self> {
        use tokio::signal::windows::{ctrl_break, ctrl_c, ctrl_close, ctrl_shutdown};

        let mut interrupt = ctrl_c()?;
        let mut brk = ctrl_break()?;
        let mut close = ctrl_close()?;
        let mut shutdown = ctrl_shutdown()?;
        let task = tokio::spawn(async move {
            let reason = tokio::select! {
                _ = interrupt.recv() => CancelReason::Interrupt,
                _ = brk.recv() => CancelReason::Terminate,
                _ = close.recv() => CancelReason::Terminate,
                _ = shutdown.recv() => CancelReason::Terminate,
            };
            debug!(%reason, "console control event received");
            tx.send_replace(Some(reason));
        });
        Ok(Self { task })
    }
}

impl Drop for SignalListener {
    fn drop(&mut self) {
        self.task.abort();
    }
}
