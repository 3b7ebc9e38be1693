//! Exit code constants for the scribe CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, CLI misuse)
//! - 2: Configuration failure (missing/unreadable/malformed config)
//! - 3: Composition failure (agent-level errors)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid invocation.
pub const USER_ERROR: i32 = 1;

/// Configuration failure: config file missing, unreadable, or malformed.
pub const CONFIG_FAILURE: i32 = 2;

/// Composition failure: an agent could not be composed.
pub const COMPOSE_FAILURE: i32 = 3;
