//! Project context resolution for scribe.
//!
//! Finds the configuration file from a user-supplied path (which may be the
//! file itself or a directory containing a `.scribe/` project) and derives
//! the paths every command needs: the config directory that relative paths
//! resolve against, and the machine-local state directory.

use crate::error::{Result, ScribeError};
use std::path::{Path, PathBuf};

/// Default project directory name.
pub const DEFAULT_PROJECT_DIR: &str = ".scribe";

/// Default configuration file name within the project directory.
pub const DEFAULT_CONFIG_FILE: &str = "prompts.yml";

/// State directory name within the project directory (event log and other
/// machine-local files; never watched, never composed).
pub const STATE_DIR: &str = ".state";

/// Resolved paths for one scribe project.
///
/// All paths are absolute.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    /// Absolute path to the configuration file.
    pub config_path: PathBuf,

    /// Directory containing the configuration file; all relative paths in
    /// the configuration resolve against it.
    pub base_dir: PathBuf,
}

impl ProjectContext {
    /// Resolve the project context from a config argument.
    ///
    /// `config_arg` may point at the configuration file directly, or at a
    /// directory that contains `.scribe/prompts.yml`.
    pub fn resolve<P: AsRef<Path>>(config_arg: P) -> Result<Self> {
        let arg = config_arg.as_ref();

        let candidate = if arg.is_dir() {
            arg.join(DEFAULT_PROJECT_DIR).join(DEFAULT_CONFIG_FILE)
        } else {
            arg.to_path_buf()
        };

        let config_path = candidate
            .canonicalize()
            .map_err(|_| ScribeError::ConfigNotFound {
                path: candidate.clone(),
            })?;

        let base_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                ScribeError::UserError(format!(
                    "configuration path '{}' has no parent directory",
                    config_path.display()
                ))
            })?;

        Ok(Self {
            config_path,
            base_dir,
        })
    }

    /// Machine-local state directory for this project.
    pub fn state_dir(&self) -> PathBuf {
        self.base_dir.join(STATE_DIR)
    }

    /// Path to the append-only event log.
    pub fn events_file(&self) -> PathBuf {
        self.state_dir().join("events.ndjson")
    }
}
