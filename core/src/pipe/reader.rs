use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::SupervisorError;

use super::drainer::{Drained, PipeDrainer, ReadDiscipline};

/// The stdout/stderr drainer pair of one child, sharing a stop flag.
///
/// stderr is always read as text lines (encoders log there); stdout is read as
/// binary frames when a frame size is given and as text lines otherwise.
pub struct PipeReader {
    stop: Arc<AtomicBool>,
    stdout: PipeDrainer,
    stderr: PipeDrainer,
}

impl PipeReader {
    pub fn new<O, E>(
        stdout: Option<O>,
        stderr: Option<E>,
        frame_bytes: Option<usize>,
    ) -> Result<Self, SupervisorError>
    where
        O: Read + Send + 'static,
        E: Read + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stdout_discipline = match frame_bytes {
            Some(frame_bytes) => ReadDiscipline::Chunked { frame_bytes },
            None => ReadDiscipline::Lines,
        };
        let stderr =
            PipeDrainer::spawn_with_stop(stderr, "stderr", ReadDiscipline::Lines, stop.clone())?;
        let stdout = PipeDrainer::spawn_with_stop(stdout, "stdout", stdout_discipline, stop.clone())?;
        Ok(Self {
            stop,
            stdout,
            stderr,
        })
    }

    pub fn read_stdout(&self) -> Drained {
        self.stdout.read()
    }

    pub fn read_stderr(&self) -> String {
        self.stderr.read_text()
    }

    /// Waits up to `limit` for both workers to reach EOF.
    ///
    /// Used once the child is gone, when its ends of the pipes are closed. If a
    /// descendant still holds a pipe open the workers are signalled and left
    /// detached; returns whether they finished in time.
    pub async fn finish_within(&mut self, limit: Duration) -> bool {
        let workers: Vec<_> = [self.stderr.take_worker(), self.stdout.take_worker()]
            .into_iter()
            .flatten()
            .collect();
        if workers.is_empty() {
            return true;
        }

        // A plain thread rather than the blocking pool: a stuck join must not
        // hold up runtime shutdown.
        let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
        let spawned = std::thread::Builder::new()
            .name("drain-join".into())
            .spawn(move || {
                for worker in workers {
                    if worker.join().is_err() {
                        warn!("drainer thread panicked");
                    }
                }
                let _ = done_tx.send(());
            });
        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn drainer join thread");
            self.stop.store(true, Ordering::SeqCst);
            return false;
        }

        match tokio::time::timeout(limit, done_rx).await {
            Ok(_) => {
                debug!("pipe drainers finished");
                true
            }
            Err(_) => {
                warn!(
                    limit_ms = limit.as_millis() as u64,
                    "pipe drainers still running, detaching"
                );
                self.stop.store(true, Ordering::SeqCst);
                false
            }
        }
    }
}
