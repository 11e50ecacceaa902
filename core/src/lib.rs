pub mod api;
pub mod config;
pub mod error;
pub mod pipe;
pub mod process;
pub mod shutdown;
pub mod spec;
pub mod supervisor;
pub mod util;
