use std::io::{self, Write};
use std::process::{Child, ChildStderr, ChildStdin, ChildStdout};

use tracing::debug;

use crate::util::exit_code_of;

/// The operations shutdown needs from a live child.
pub trait ChildControl: Send {
    fn id(&self) -> Option<u32>;

    /// Non-blocking exit check; returns the normalized exit code once exited.
    fn try_exit(&mut self) -> io::Result<Option<i32>>;

    /// Writes the in-band stop request and closes the input channel.
    fn request_stop(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Out-of-band stop request for children that cannot read one in-band.
    fn interrupt(&mut self) -> io::Result<()> {
        Ok(())
    }

    /// Hard kill; a no-op once the child has exited.
    fn force_terminate(&mut self) -> io::Result<()>;
}

/// A spawned child with its stdin kept for the stop request.
pub struct ChildProcess {
    child: Child,
    stdin: Option<ChildStdin>,
    exit_code: Option<i32>,
}

impl ChildProcess {
    pub fn new(mut child: Child) -> Self {
        let stdin = child.stdin.take();
        Self {
            child,
            stdin,
            exit_code: None,
        }
    }

    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Exit code observed so far, if the child has been reaped.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }
}

impl ChildControl for ChildProcess {
    fn id(&self) -> Option<u32> {
        Some(self.child.id())
    }

    fn try_exit(&mut self) -> io::Result<Option<i32>> {
        if let Some(code) = self.exit_code {
            return Ok(Some(code));
        }
        match self.child.try_wait()? {
            Some(status) => {
                let code = exit_code_of(status);
                self.exit_code = Some(code);
                self.stdin = None;
                Ok(Some(code))
            }
            None => Ok(None),
        }
    }

    fn request_stop(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut stdin = self
            .stdin
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "stdin is not available"))?;
        stdin.write_all(bytes)?;
        stdin.flush()
    }

    fn force_terminate(&mut self) -> io::Result<()> {
        if self.exit_code.is_some() {
            return Ok(());
        }
        match self.child.kill() {
            Ok(()) => Ok(()),
            // Already exited but not yet reaped.
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if self.exit_code.is_some() {
            return;
        }
        if let Ok(None) = self.child.try_wait() {
            debug!(pid = self.child.id(), "killing child on drop");
            let _ = self.child.kill();
            let _ = self.child.try_wait();
        }
    }
}
