//! Thin wrapper around external command execution.

mod command;
mod runner;

pub use command::{CommandOutput, CommandSpec};
pub use runner::{CommandRunner, DryRunCommandRunner, SystemCommandRunner};
