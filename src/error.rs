//! Error types for the scribe CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error
//! messages. Load-time configuration errors are fatal for the whole run;
//! composition-time errors are scoped to a single agent and the caller
//! decides whether to abort or continue with the remaining agents.

use crate::exit_codes;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for scribe operations.
#[derive(Error, Debug)]
pub enum ScribeError {
    /// The configuration file does not exist.
    #[error("configuration file not found at '{}'", .path.display())]
    ConfigNotFound {
        /// The path that was checked.
        path: PathBuf,
    },

    /// The configuration file exists but is not valid YAML.
    #[error("failed to parse configuration '{}': {message}", .path.display())]
    ConfigParse {
        /// Path to the offending config file.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read configuration '{}': {message}", .path.display())]
    ConfigIo {
        /// Path to the offending config file.
        path: PathBuf,
        /// Underlying I/O diagnostic.
        message: String,
    },

    /// The requested agent is not present in the configuration.
    #[error("agent '{agent}' not found in configuration")]
    AgentNotFound {
        /// The requested agent name.
        agent: String,
    },

    /// Neither the agent nor the global settings define a template.
    #[error("agent '{agent}' has no assembly steps and no template (set 'template' on the agent or in settings)")]
    MissingTemplate {
        /// The agent being composed.
        agent: String,
    },

    /// Recursive variable expansion exceeded the depth bound.
    #[error("variable expansion exceeded depth {limit} in {context} (circular reference?)")]
    SubstitutionDepthExceeded {
        /// The configured depth bound.
        limit: usize,
        /// Human-readable location (file or "configuration").
        context: String,
    },

    /// The template renderer failed.
    #[error("template '{template}' failed to render: {message}")]
    TemplateRender {
        /// The template identifier.
        template: String,
        /// Renderer diagnostic.
        message: String,
    },

    /// A referenced file could not be read (for reasons other than absence).
    #[error("failed to read file '{}': {message}", .path.display())]
    FileRead {
        /// The file that could not be read.
        path: PathBuf,
        /// Underlying I/O diagnostic.
        message: String,
    },

    /// User provided invalid arguments or the invocation cannot proceed.
    #[error("{0}")]
    UserError(String),
}

impl ScribeError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ScribeError::ConfigNotFound { .. }
            | ScribeError::ConfigParse { .. }
            | ScribeError::ConfigIo { .. } => exit_codes::CONFIG_FAILURE,
            ScribeError::AgentNotFound { .. }
            | ScribeError::MissingTemplate { .. }
            | ScribeError::SubstitutionDepthExceeded { .. }
            | ScribeError::TemplateRender { .. }
            | ScribeError::FileRead { .. } => exit_codes::COMPOSE_FAILURE,
            ScribeError::UserError(_) => exit_codes::USER_ERROR,
        }
    }
}

/// Result type alias for scribe operations.
pub type Result<T> = std::result::Result<T, ScribeError>;
