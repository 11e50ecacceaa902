use clap::Parser;
use encvisor::commands::{cli, run, wrap};
use encvisor_core::config::{self, LoggingConfig};
use encvisor_core::error::{CancelReason, CliError, SupervisorError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

static LOG_GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
    std::sync::OnceLock::new();

#[tokio::main]
async fn main() {
    let exit = match real_main().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e}");
            exit_code_for_error(&e)
        }
    };

    std::process::exit(exit);
}

async fn real_main() -> Result<i32, CliError> {
    let args = cli::Args::parse();
    let cfg = match &args.config {
        Some(path) => {
            let mut cfg = config::load_from_path(path)?;
            config::apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
            cfg
        }
        None => config::load_default()?,
    };

    // Console logs go to stderr in both modes: a wrapper's stdout belongs to
    // the encoder it relays.
    init_tracing(&cfg.logging).map_err(CliError::Command)?;

    match args.command {
        cli::Commands::Run(run_args) => run::run(run_args, cfg).await,
        cli::Commands::Wrap(wrap_args) => wrap::wrap(wrap_args, cfg).await,
    }
}

fn exit_code_for_error(e: &CliError) -> i32 {
    // 11: config error
    // 20: spawn / IO error
    // 50: internal/uncategorized
    // 130 / 143: cancelled by interrupt / terminate
    // otherwise the failed child's own exit code
    match e {
        CliError::Config(_) => 11,
        CliError::Supervisor(se) => match se {
            SupervisorError::ProcessFailure { exit_code, .. } => match *exit_code {
                code @ 1..=255 => code,
                _ => 1,
            },
            SupervisorError::Cancelled(CancelReason::Interrupt) => 130,
            SupervisorError::Cancelled(_) => 143,
            SupervisorError::Spawn(_) => 20,
            SupervisorError::Io(_) => 20,
            SupervisorError::InvalidArgument(_)
            | SupervisorError::Spec(_)
            | SupervisorError::Hook(_) => 50,
        },
        CliError::Io(_) => 20,
        CliError::Command(_) => 20,
        CliError::Anyhow(_) => 50,
    }
}

fn init_tracing(logging: &LoggingConfig) -> Result<(), String> {
    if !logging.enabled {
        return Ok(());
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(v) if !v.trim().is_empty() => EnvFilter::from_default_env(),
        _ => EnvFilter::try_new(logging.level.clone()).map_err(|e| e.to_string())?,
    };

    let mut maybe_writer = None;

    if logging.file {
        let dir = match logging
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(d) => std::path::PathBuf::from(d),
            None => std::env::temp_dir().join("encvisor"),
        };

        std::fs::create_dir_all(&dir).map_err(|e| format!("create log dir failed: {e}"))?;
        let file_name = format!("encvisor.{}.log", std::process::id());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        let _ = LOG_GUARD.set(guard);
        maybe_writer = Some(non_blocking);
    }

    if !logging.console && maybe_writer.is_none() {
        return Err("logging disabled for both console and file".to_string());
    }

    let console_layer = logging.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
    });

    let file_layer = maybe_writer.map(|w| {
        tracing_subscriber::fmt::layer()
            .with_writer(w)
            .with_ansi(false)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}
