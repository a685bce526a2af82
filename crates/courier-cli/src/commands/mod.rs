//! Subcommand implementations.

pub mod refresh;
pub mod request;
pub mod session;
