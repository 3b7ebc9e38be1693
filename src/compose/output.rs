//! Output location resolution and persistence.
//!
//! The output directory and filename are both templates: they run through
//! the substitution engine before resolution, so destinations can depend on
//! variables (`{{ _agent_name }}.md`, a per-project output root, etc.).
//! A filename containing a path separator is treated as a full path
//! relative to the config directory rather than a bare name under the
//! output directory.

use crate::compose::subst::{Expander, SubstContext};
use crate::config::{AgentConfig, Settings};
use crate::error::Result;
use crate::fs as fsutil;
use std::path::{Path, PathBuf};

/// Resolve the output file path for one agent.
pub fn resolve_output_path(
    agent: &str,
    agent_cfg: &AgentConfig,
    settings: &Settings,
    exp: &mut Expander<'_>,
    ctx: &SubstContext<'_>,
) -> Result<PathBuf> {
    let dir_text = exp.expand(&settings.output_dir, ctx)?;
    let output_dir = fsutil::resolve_relative(exp.base_dir(), &dir_text);

    let file_template = agent_cfg
        .output_file
        .as_ref()
        .or(settings.output_file.as_ref());

    match file_template {
        Some(template) => {
            let name = exp.expand(template, ctx)?;
            if name.contains('/') || name.contains('\\') {
                Ok(fsutil::resolve_relative(exp.base_dir(), &name))
            } else {
                Ok(output_dir.join(name))
            }
        }
        None => Ok(output_dir.join(format!("{}.md", agent))),
    }
}

/// Persist composed text, creating parent directories and overwriting any
/// existing file.
pub fn write_output(path: &Path, text: &str) -> Result<()> {
    fsutil::atomic_write_file(path, text)
}
