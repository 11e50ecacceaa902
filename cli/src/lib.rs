//! encvisor binary internals, exposed for tests.

pub mod commands;
