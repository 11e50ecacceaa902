//! Background draining of one child pipe.
//!
//! Each drainer owns a dedicated OS thread that keeps reading its pipe so the
//! child never stalls on a full pipe buffer, independent of how busy the async
//! runtime is. Whatever was read is parked in a [`ChunkQueue`] and handed out
//! by [`PipeDrainer::read`] without blocking.

use std::io::{self, BufRead, BufReader, ErrorKind, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use crate::error::SupervisorError;
use crate::util::ChunkQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadDiscipline {
    /// Binary frames of `frame_bytes` (the last frame may be shorter).
    Chunked { frame_bytes: usize },
    /// `\n`-delimited text, each line logged as it arrives.
    Lines,
}

/// Snapshot returned by [`PipeDrainer::read`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drained {
    Chunks(Vec<Vec<u8>>),
    Text(String),
}

impl Drained {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Chunks(c) => c.is_empty(),
            Self::Text(t) => t.is_empty(),
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Chunks(c) => String::from_utf8_lossy(&c.concat()).into_owned(),
            Self::Text(t) => t,
        }
    }
}

pub struct PipeDrainer {
    label: &'static str,
    discipline: ReadDiscipline,
    queue: Arc<ChunkQueue>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl PipeDrainer {
    /// Starts draining `pipe` right away.
    ///
    /// Fails with [`SupervisorError::InvalidArgument`] when the pipe is absent
    /// (the child was spawned without piping this stream).
    pub fn spawn<R>(
        pipe: Option<R>,
        label: &'static str,
        discipline: ReadDiscipline,
    ) -> Result<Self, SupervisorError>
    where
        R: Read + Send + 'static,
    {
        Self::spawn_with_stop(pipe, label, discipline, Arc::new(AtomicBool::new(false)))
    }

    /// Like [`PipeDrainer::spawn`] but observes an externally owned stop flag.
    pub fn spawn_with_stop<R>(
        pipe: Option<R>,
        label: &'static str,
        discipline: ReadDiscipline,
        stop: Arc<AtomicBool>,
    ) -> Result<Self, SupervisorError>
    where
        R: Read + Send + 'static,
    {
        let pipe = pipe.ok_or_else(|| {
            SupervisorError::InvalidArgument(format!("{label} pipe is not available"))
        })?;
        if let ReadDiscipline::Chunked { frame_bytes: 0 } = discipline {
            return Err(SupervisorError::InvalidArgument(
                "frame_bytes must be greater than zero".into(),
            ));
        }

        let queue = ChunkQueue::new();
        let worker = thread::Builder::new()
            .name(format!("drain-{label}"))
            .spawn({
                let queue = queue.clone();
                let stop = stop.clone();
                move || {
                    match discipline {
                        ReadDiscipline::Chunked { frame_bytes } => {
                            drain_chunks(pipe, frame_bytes, &queue, &stop, label)
                        }
                        ReadDiscipline::Lines => drain_lines(pipe, &queue, &stop, label),
                    }
                    debug!(stream = label, "drainer thread exiting");
                }
            })?;

        Ok(Self {
            label,
            discipline,
            queue,
            stop,
            worker: Some(worker),
        })
    }

    /// Everything buffered since the previous call; never waits for more.
    pub fn read(&self) -> Drained {
        let chunks = self.queue.drain();
        match self.discipline {
            ReadDiscipline::Chunked { .. } => Drained::Chunks(chunks),
            ReadDiscipline::Lines => {
                let text = chunks
                    .iter()
                    .map(|c| String::from_utf8_lossy(c))
                    .collect::<String>();
                Drained::Text(text)
            }
        }
    }

    pub fn read_text(&self) -> String {
        self.read().into_text()
    }

    /// Requests the worker to stop and waits for it to exit.
    ///
    /// The flag is checked between reads, so a read already in flight is
    /// allowed to finish (or to hit EOF) first.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.join();
    }

    /// Waits for the worker to reach EOF without signalling it.
    #[cfg(test)]
    fn join_eof(&mut self) {
        self.join();
    }

    #[cfg(test)]
    fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, JoinHandle::is_finished)
    }

    pub(crate) fn take_worker(&mut self) -> Option<JoinHandle<()>> {
        self.worker.take()
    }

    fn join(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!(stream = self.label, "drainer thread panicked");
            }
        }
    }
}

impl Drop for PipeDrainer {
    fn drop(&mut self) {
        // Detach: the thread ends on EOF once the child side closes.
        self.stop.store(true, Ordering::SeqCst);
    }
}

fn drain_chunks<R: Read>(
    mut pipe: R,
    frame_bytes: usize,
    queue: &ChunkQueue,
    stop: &AtomicBool,
    label: &'static str,
) {
    loop {
        if stop.load(Ordering::SeqCst) {
            debug!(stream = label, "stop requested");
            break;
        }
        match read_frame(&mut pipe, frame_bytes) {
            Ok(frame) if frame.is_empty() => break,
            Ok(frame) => {
                let short = frame.len() < frame_bytes;
                queue.push(frame);
                if short {
                    break;
                }
            }
            // The child closing its end while we read is part of normal shutdown.
            Err(e) => {
                debug!(stream = label, error = %e, "pipe read failed");
                break;
            }
        }
    }
}

/// Fills one frame; shorter than `frame_bytes` only at EOF or after an error.
fn read_frame<R: Read>(pipe: &mut R, frame_bytes: usize) -> io::Result<Vec<u8>> {
    let mut frame = vec![0u8; frame_bytes];
    let mut filled = 0;
    while filled < frame_bytes {
        match pipe.read(&mut frame[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) if filled > 0 => break,
            Err(e) => return Err(e),
        }
    }
    frame.truncate(filled);
    Ok(frame)
}

fn drain_lines<R: Read>(pipe: R, queue: &ChunkQueue, stop: &AtomicBool, label: &'static str) {
    let mut reader = BufReader::new(pipe);
    let mut buf: Vec<u8> = Vec::with_capacity(1024);

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                info!(stream = label, "{}", display_line(&buf));
                queue.push(buf.clone());
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!(stream = label, error = %e, "pipe read failed");
                break;
            }
        }
        if stop.load(Ordering::SeqCst) {
            debug!(stream = label, "stop requested");
            break;
        }
    }
}

fn display_line(buf: &[u8]) -> String {
    let mut end = buf.len();
    while end > 0 && matches!(buf[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    String::from_utf8_lossy(&buf[..end]).into_owned()
}
