mod command;
mod output;
pub mod direct;
pub mod wrapped;

pub use direct::{DirectLauncher, DirectProcess};
pub use wrapped::{WrappedLauncher, WrappedProcess};
