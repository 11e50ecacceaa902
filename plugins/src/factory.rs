use std::sync::Arc;

use encvisor_core::config::{LaunchMode, SupervisorConfig};
use encvisor_core::process::ProcessLauncher;

use crate::process::{DirectLauncher, WrappedLauncher};

/// Launcher for the configured mode; `auto` resolves per platform.
pub fn build_launcher(cfg: &SupervisorConfig) -> Arc<dyn ProcessLauncher> {
    match cfg.launch_mode.resolve() {
        LaunchMode::Wrapped => Arc::new(WrappedLauncher::new(cfg.wrapper_program.clone())),
        LaunchMode::Direct | LaunchMode::Auto => Arc::new(DirectLauncher::new()),
    }
}
