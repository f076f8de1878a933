//! I/O helpers: configuration, environment, and cluster query processes.

pub mod config;
pub mod env;
pub mod process;
pub mod query;
