use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Thread-safe FIFO of byte chunks shared between a drainer thread and its readers.
#[derive(Debug, Default)]
pub struct ChunkQueue {
    inner: Mutex<VecDeque<Vec<u8>>>,
}

impl ChunkQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, chunk: Vec<u8>) {
        if chunk.is_empty() {
            return;
        }
        self.lock().push_back(chunk);
    }

    /// Takes everything queued so far without waiting for more.
    pub fn drain(&self) -> Vec<Vec<u8>> {
        let mut g = self.lock();
        g.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panicking writer cannot leave a half-pushed chunk behind, so a poisoned
    // lock still guards a consistent deque.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Vec<u8>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
