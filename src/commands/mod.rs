//! Command implementations for scribe.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations.

pub mod compose;
pub mod deps;
pub mod init;
pub mod watch;

use crate::cli::Command;
use crate::error::Result;

/// Dispatch a command to its implementation.
pub fn dispatch(command: Command) -> Result<()> {
    match command {
        Command::Init(args) => init::cmd_init(args),
        Command::Compose(args) => compose::cmd_compose(args),
        Command::Deps(args) => deps::cmd_deps(args),
    }
}
