//! gattfuzz CLI library
//!
//! Argument parsing, layered configuration and the command handlers behind
//! the `gattfuzz` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::{Cli, Commands, FuzzArgs};
pub use commands::CommandDispatcher;
pub use config::{CliAppConfig, ConfigError, LogConfig, Overrides};
pub use error::{CliError, Result};
