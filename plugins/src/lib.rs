pub mod factory;
pub mod process;
