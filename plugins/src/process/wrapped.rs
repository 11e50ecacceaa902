use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use encvisor_core::config::SupervisorConfig;
use encvisor_core::error::SupervisorError;
use encvisor_core::pipe::{Drained, PipeReader};
use encvisor_core::process::{
    complete_with, wait_for_exit, ChildControl, ChildProcess, CompletionResult, ProcessHandle,
    ProcessLauncher, ShutdownReport,
};
use encvisor_core::shutdown::ShutdownCoordinator;
use encvisor_core::spec::StreamSpec;
use tracing::debug;

use super::command;
use super::output::drain_after_quit;

/// Subcommand of the wrapper executable that supervises the real target.
pub const WRAP_SUBCOMMAND: &str = "wrap";

/// Lines framing the encoder's stderr when the wrapper relays it on exit.
/// Anything else on the wrapper's stderr is the wrapper's own logging.
pub const RELAY_BEGIN: &str = "--- encvisor: encoder stderr ---";
pub const RELAY_END: &str = "--- encvisor: end encoder stderr ---";

/// The encoder's stderr out of the wrapper's stderr text, when relayed.
pub fn relayed_stderr(raw: &str) -> Option<&str> {
    let begin = raw.rfind(&format!("{RELAY_BEGIN}\n"))? + RELAY_BEGIN.len() + 1;
    let body = &raw[begin..];
    let end = body.rfind(&format!("{RELAY_END}\n"))?;
    Some(&body[..end])
}

/// Launches the encoder behind an auxiliary wrapper process.
///
/// The wrapper runs the encoder as its own direct child and translates a
/// signal (or console event) into the in-band stop request, for platforms
/// where the parent cannot deliver that request reliably.
#[derive(Debug, Default)]
pub struct WrappedLauncher {
    program: Option<PathBuf>,
}

impl WrappedLauncher {
    pub fn new(program: Option<PathBuf>) -> Self {
        Self { program }
    }

    fn wrapper_program(&self, config: &SupervisorConfig) -> Result<PathBuf, SupervisorError> {
        if let Some(p) = config.wrapper_program.as_ref().or(self.program.as_ref()) {
            return Ok(p.clone());
        }
        std::env::current_exe().map_err(|e| {
            SupervisorError::Spawn(format!("cannot locate wrapper executable: {e}"))
        })
    }
}

impl ProcessLauncher for WrappedLauncher {
    fn name(&self) -> &str {
        "wrapped"
    }

    fn launch(
        &self,
        spec: StreamSpec,
        config: &SupervisorConfig,
    ) -> Result<Box<dyn ProcessHandle>, SupervisorError> {
        let wrapper = self.wrapper_program(config)?;
        Ok(Box::new(WrappedProcess::spawn(&wrapper, &spec, config)?))
    }
}

/// Arguments for `<wrapper> wrap … -- program args…`.
pub fn wrapper_args(spec: &StreamSpec, config: &SupervisorConfig) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        WRAP_SUBCOMMAND.into(),
        "--budget-ms".into(),
        config.force_termination_ms.to_string().into(),
        "--graceful-stop".into(),
        config.graceful_stop.clone().into(),
    ];
    if let Some(frame_bytes) = config.frame_bytes {
        args.push("--frame-bytes".into());
        args.push(frame_bytes.to_string().into());
    }
    args.push("--".into());
    args.push(spec.program.clone().into());
    args.extend(spec.args.iter().map(OsString::from));
    args
}

/// The wrapper child: interrupted out-of-band, killed together with its
/// process group on Unix.
struct WrapperChild {
    inner: ChildProcess,
}

impl ChildControl for WrapperChild {
    fn id(&self) -> Option<u32> {
        self.inner.id()
    }

    fn try_exit(&mut self) -> io::Result<Option<i32>> {
        self.inner.try_exit()
    }

    fn request_stop(&mut self, _bytes: &[u8]) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "the wrapper takes no in-band stop request",
        ))
    }

    fn interrupt(&mut self) -> io::Result<()> {
        if self.inner.exit_code().is_some() {
            return Ok(());
        }
        match self.inner.id() {
            Some(pid) => interrupt_wrapper(pid),
            None => Ok(()),
        }
    }

    fn force_terminate(&mut self) -> io::Result<()> {
        #[cfg(unix)]
        if let Some(pid) = self.inner.id() {
            kill_group(pid)?;
        }
        self.inner.force_terminate()
    }
}

impl Drop for WrapperChild {
    fn drop(&mut self) {
        #[cfg(unix)]
        if self.inner.exit_code().is_none() {
            if let Some(pid) = self.inner.id() {
                let _ = kill_group(pid);
            }
        }
    }
}

#[cfg(unix)]
fn interrupt_wrapper(pid: u32) -> io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    kill(Pid::from_raw(pid as i32), Signal::SIGTERM).map_err(io::Error::from)
}

#[cfg(windows)]
fn interrupt_wrapper(pid: u32) -> io::Result<()> {
    use windows::Win32::System::Console::{GenerateConsoleCtrlEvent, CTRL_BREAK_EVENT};

    // SAFETY: plain FFI call; the wrapper was started with
    // CREATE_NEW_PROCESS_GROUP so its pid names its own process group.
    unsafe { GenerateConsoleCtrlEvent(CTRL_BREAK_EVENT, pid) }.map_err(io::Error::other)
}

#[cfg(not(any(unix, windows)))]
fn interrupt_wrapper(_pid: u32) -> io::Result<()> {
    Ok(())
}

/// SIGKILL to the wrapper's group, which the encoder shares.
#[cfg(unix)]
fn kill_group(pid: u32) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(e) => Err(io::Error::from(e)),
    }
}

pub struct WrappedProcess {
    child: WrapperChild,
    reader: PipeReader,
    config: SupervisorConfig,
}

impl WrappedProcess {
    pub fn spawn(
        wrapper: &Path,
        spec: &StreamSpec,
        config: &SupervisorConfig,
    ) -> Result<Self, SupervisorError> {
        let mut cmd = command::command(wrapper, wrapper_args(spec, config), spec, true);
        cmd.stdin(std::process::Stdio::null());
        let program = wrapper.display().to_string();
        let child = command::spawn(&mut cmd, &program)?;
        let mut inner = ChildProcess::new(child);
        // The wrapper's stdout carries only the encoder's stdout, frames included.
        let reader =
            PipeReader::new(inner.take_stdout(), inner.take_stderr(), config.frame_bytes)?;
        debug!(
            pid = ?inner.id(),
            wrapper = %program,
            command = ?spec.command_line(),
            "wrapped process spawned"
        );
        Ok(Self {
            child: WrapperChild { inner },
            reader,
            config: config.clone(),
        })
    }
}

#[async_trait]
impl ProcessHandle for WrappedProcess {
    fn name(&self) -> &str {
        "wrapped"
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
        debug!(exit_code, "wrapper exited");
        // Without a relayed block (the wrapper died early) keep everything.
        complete_with(&mut self.reader, exit_code, &self.config, |raw| {
            relayed_stderr(&raw).map(str::to_owned).unwrap_or(raw)
        })
        .await
    }

    /// The wrapper escalates on its own after the launch-time budget; the
    /// extra reap grace lets it finish that before it is killed here.
    async fn quit(&mut self, budget: Option<Duration>) -> Result<ShutdownReport, SupervisorError> {
        let budget = budget.unwrap_or_else(|| self.config.force_termination());
        let report = ShutdownCoordinator::interrupting(budget + self.config.reap_grace(), &self.config)
            .run(&mut self.child)
            .await;
        drain_after_quit(&mut self.reader, self.config.flush_timeout()).await;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wrapper_args_carry_budget_and_command() {
        let spec = StreamSpec::new("ffmpeg").args(["-i", "in.mp4", "out.mp4"]);
        let config = SupervisorConfig {
            force_termination_ms: 1500,
            ..SupervisorConfig::default()
        };
        let args: Vec<String> = wrapper_args(&spec, &config)
            .into_iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "wrap",
                "--budget-ms",
                "1500",
                "--graceful-stop",
                "q",
                "--",
                "ffmpeg",
                "-i",
                "in.mp4",
                "out.mp4"
            ]
        );
    }

    #[test]
    fn wrapper_args_forward_frame_size() {
        let spec = StreamSpec::new("ffmpeg");
        let config = SupervisorConfig {
            frame_bytes: Some(4096),
            ..SupervisorConfig::default()
        };
        let args = wrapper_args(&spec, &config);
        let pos = args.iter().position(|a| a == "--frame-bytes").unwrap();
        assert_eq!(args[pos + 1], "4096");
        assert!(pos < args.iter().position(|a| a == "--").unwrap());
    }

    #[test]
    fn relayed_stderr_skips_wrapper_logs() {
        let raw = format!(
            "INFO wrapper start\n{RELAY_BEGIN}\nframe=1\nframe=2\n{RELAY_END}\nINFO done\n"
        );
        assert_eq!(relayed_stderr(&raw), Some("frame=1\nframe=2\n"));
    }

    #[test]
    fn relayed_stderr_may_be_empty_or_missing() {
        let empty = format!("{RELAY_BEGIN}\n{RELAY_END}\n");
        assert_eq!(relayed_stderr(&empty), Some(""));
        assert_eq!(relayed_stderr("INFO wrapper start\n"), None);
        assert_eq!(relayed_stderr(&format!("{RELAY_BEGIN}\nframe=1\n")), None);
    }

    #[test]
    fn configured_wrapper_wins() {
        let launcher = WrappedLauncher::new(Some(PathBuf::from("/opt/a")));
        let config = SupervisorConfig {
            wrapper_program: Some(PathBuf::from("/opt/b")),
            ..SupervisorConfig::default()
        };
        assert_eq!(launcher.wrapper_program(&config).unwrap(), PathBuf::from("/opt/b"));
        assert_eq!(
            launcher.wrapper_program(&SupervisorConfig::default()).unwrap(),
            PathBuf::from("/opt/a")
        );
    }
}
