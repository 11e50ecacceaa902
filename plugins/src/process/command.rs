use std::ffi::OsStr;
use std::process::{Child, Command, Stdio};

use encvisor_core::error::SupervisorError;
use encvisor_core::spec::StreamSpec;

/// `program args` with the job's environment and working directory, every
/// stdio piped.
pub(crate) fn command<P, I, S>(program: P, args: I, spec: &StreamSpec, new_process_group: bool) -> Command
where
    P: AsRef<OsStr>,
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args)
        .envs(&spec.envs)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }
    if new_process_group {
        set_new_process_group(&mut cmd);
    }
    cmd
}

pub(crate) fn spawn(cmd: &mut Command, program: &str) -> Result<Child, SupervisorError> {
    cmd.spawn()
        .map_err(|e| SupervisorError::Spawn(format!("failed to spawn {program}: {e}")))
}

/// Keeps terminal-generated signals (Ctrl-C) away from the child.
#[cfg(unix)]
fn set_new_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(windows)]
fn set_new_process_group(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    use windows::Win32::System::Threading::CREATE_NEW_PROCESS_GROUP;
    cmd.creation_flags(CREATE_NEW_PROCESS_GROUP.0);
}

#[cfg(not(any(unix, windows)))]
fn set_new_process_group(_cmd: &mut Command) {}
