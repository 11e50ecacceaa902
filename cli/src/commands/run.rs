use std::io::Write;

use encvisor_core::config::AppConfig;
use encvisor_core::error::CliError;
use encvisor_core::pipe::Drained;
use encvisor_core::spec::StreamSpec;
use encvisor_core::supervisor::Supervisor;
use encvisor_plugins::factory::build_launcher;
use tracing::info;

use super::cli::RunArgs;

/// Job from `--spec` or from the trailing command line.
pub fn resolve_spec(args: &RunArgs) -> Result<StreamSpec, CliError> {
    if let Some(path) = &args.spec {
        return Ok(StreamSpec::load(path)?);
    }
    let (program, rest) = args
        .command
        .split_first()
        .ok_or_else(|| CliError::Command("either --spec or `-- program args…` is required".into()))?;
    Ok(StreamSpec::new(program.clone()).args(rest.iter().cloned()))
}

/// Folds command-line flags into the loaded configuration.
///
/// The binary owns its process, so termination signals always cancel the job.
pub fn apply_run_args(cfg: &mut AppConfig, args: &RunArgs) {
    let sup = &mut cfg.supervisor;
    sup.handle_signals = true;
    if let Some(ms) = args.budget_ms {
        sup.force_termination_ms = ms;
    }
    if let Some(mode) = args.mode {
        sup.launch_mode = mode.into();
    }
    if args.frame_bytes.is_some() {
        sup.frame_bytes = args.frame_bytes;
    }
    if args.no_sentinel {
        sup.false_success_sentinel = None;
    }
}

pub async fn run(args: RunArgs, mut cfg: AppConfig) -> Result<i32, CliError> {
    let spec = resolve_spec(&args)?;
    apply_run_args(&mut cfg, &args);

    let launcher = build_launcher(&cfg.supervisor);
    info!(
        launcher = launcher.name(),
        command = ?spec.command_line(),
        budget_ms = cfg.supervisor.force_termination_ms,
        "run start"
    );
    let supervisor = Supervisor::new(launcher, cfg.supervisor);
    let done = supervisor.execute(|| async move { Ok(spec) }, None).await?;

    write_stdout(&done.stdout)?;
    Ok(done.exit_code)
}

/// Relays what the encoder wrote to stdout.
pub fn write_stdout(stdout: &Drained) -> std::io::Result<()> {
    let mut out = std::io::stdout().lock();
    match stdout {
        Drained::Text(text) => out.write_all(text.as_bytes())?,
        Drained::Chunks(chunks) => {
            for chunk in chunks {
                out.write_all(chunk)?;
            }
        }
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::cli::ModeArg;
    use encvisor_core::config::LaunchMode;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn run_args(command: &[&str]) -> RunArgs {
        RunArgs {
            spec: None,
            budget_ms: None,
            mode: None,
            frame_bytes: None,
            no_sentinel: false,
            command: command.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn trailing_command_becomes_spec() {
        let spec = resolve_spec(&run_args(&["ffmpeg", "-i", "a.mp4", "b.mp4"])).unwrap();
        assert_eq!(spec, StreamSpec::new("ffmpeg").args(["-i", "a.mp4", "b.mp4"]));
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(matches!(
            resolve_spec(&run_args(&[])),
            Err(CliError::Command(_))
        ));
    }

    #[test]
    fn missing_spec_file_is_a_config_error() {
        let mut args = run_args(&[]);
        args.spec = Some(PathBuf::from("/nonexistent/job.toml"));
        assert!(matches!(resolve_spec(&args), Err(CliError::Config(_))));
    }

    #[test]
    fn flags_override_config() {
        let mut cfg = AppConfig::default();
        let mut args = run_args(&["ffmpeg"]);
        args.budget_ms = Some(1200);
        args.mode = Some(ModeArg::Wrapped);
        args.frame_bytes = Some(188);
        args.no_sentinel = true;

        apply_run_args(&mut cfg, &args);
        assert_eq!(cfg.supervisor.force_termination_ms, 1200);
        assert_eq!(cfg.supervisor.launch_mode, LaunchMode::Wrapped);
        assert_eq!(cfg.supervisor.frame_bytes, Some(188));
        assert_eq!(cfg.supervisor.sentinel(), None);
    }

    #[test]
    fn run_always_handles_signals() {
        let mut cfg = AppConfig::default();
        assert!(!cfg.supervisor.handle_signals);
        apply_run_args(&mut cfg, &run_args(&["ffmpeg"]));
        assert!(cfg.supervisor.handle_signals);
    }
}
