use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use encvisor_core::config::{LaunchMode, DEFAULT_GRACEFUL_STOP};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeArg {
    Auto,
    Direct,
    Wrapped,
}

impl From<ModeArg> for LaunchMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Auto => LaunchMode::Auto,
            ModeArg::Direct => LaunchMode::Direct,
            ModeArg::Wrapped => LaunchMode::Wrapped,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "encvisor", version, about = "Run and supervise a single encoder process")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file; defaults to $ENCVISOR_CONFIG, then ./encvisor.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    /// Job file (TOML: program, args, envs, cwd).
    #[arg(long, conflicts_with = "command")]
    pub spec: Option<PathBuf>,

    /// Budget between the graceful stop request and the hard kill.
    #[arg(long)]
    pub budget_ms: Option<u64>,

    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Read stdout as fixed-size binary frames.
    #[arg(long)]
    pub frame_bytes: Option<usize>,

    /// Disable the false-success sentinel check.
    #[arg(long, default_value_t = false)]
    pub no_sentinel: bool,

    /// Program and arguments, after `--`.
    #[arg(last = true)]
    pub command: Vec<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct WrapArgs {
    #[arg(long)]
    pub budget_ms: u64,

    #[arg(long, default_value = DEFAULT_GRACEFUL_STOP)]
    pub graceful_stop: String,

    #[arg(long)]
    pub frame_bytes: Option<usize>,

    #[arg(last = true, required = true)]
    pub command: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one encoding job to completion.
    Run(RunArgs),
    /// Supervise a child on behalf of a parent encvisor.
    #[command(hide = true)]
    Wrap(WrapArgs),
}
