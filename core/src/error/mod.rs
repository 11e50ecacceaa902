#[allow(clippy::module_inception)]
pub mod error;

pub use error::{CancelReason, CliError, ConfigError, SupervisorError};
