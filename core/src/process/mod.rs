mod child;
mod failure;
mod traits;
mod types;
mod waiter;

pub use child::{ChildControl, ChildProcess};
pub use failure::classify;
pub use traits::{AfterStart, ProcessHandle, ProcessLauncher};
pub use types::{CompletionResult, ShutdownReport, ShutdownState};
pub use waiter::{complete, complete_with, wait_for_exit};
