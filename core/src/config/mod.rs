mod load;
mod types;

pub use load::{apply_env_overrides, load_default, load_from_path, CONFIG_ENV, LOCAL_CONFIG_FILE};
pub use types::{
    AppConfig, LaunchMode, LoggingConfig, SupervisorConfig, DEFAULT_FALSE_SUCCESS_SENTINEL,
    DEFAULT_FORCE_TERMINATION_MS, DEFAULT_GRACEFUL_STOP,
};
