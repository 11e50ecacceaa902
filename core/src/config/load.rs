use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::types::{AppConfig, LaunchMode};

pub const CONFIG_ENV: &str = "ENCVISOR_CONFIG";
pub const LOCAL_CONFIG_FILE: &str = "encvisor.toml";

pub fn load_from_path(path: &Path) -> Result<AppConfig, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str::<AppConfig>(&s).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

pub fn load_default() -> Result<AppConfig, ConfigError> {
    // Priority 1: $ENCVISOR_CONFIG
    // Priority 2: ./encvisor.toml (current directory)
    let explicit = std::env::var(CONFIG_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);
    let local = Path::new(LOCAL_CONFIG_FILE);

    let mut cfg = match explicit {
        Some(path) => load_from_path(&path)?,
        None if local.exists() => load_from_path(local)?,
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok())?;
    Ok(cfg)
}

/// Environment variable overrides (highest priority).
pub fn apply_env_overrides<F>(cfg: &mut AppConfig, get: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| get(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("ENCVISOR_FORCE_TERMINATION_MS") {
        cfg.supervisor.force_termination_ms =
            v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "ENCVISOR_FORCE_TERMINATION_MS",
                value: v.clone(),
            })?;
    }
    if let Some(v) = get("ENCVISOR_LAUNCH_MODE") {
        cfg.supervisor.launch_mode =
            LaunchMode::parse(&v).ok_or_else(|| ConfigError::InvalidValue {
                key: "ENCVISOR_LAUNCH_MODE",
                value: v.clone(),
            })?;
    }
    if let Some(v) = get("ENCVISOR_WRAPPER") {
        cfg.supervisor.wrapper_program = Some(PathBuf::from(v));
    }
    if let Some(v) = get("ENCVISOR_LOG_LEVEL") {
        cfg.logging.level = v;
    }
    Ok(())
}
