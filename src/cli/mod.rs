//! CLI argument parsing for scribe.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default config path argument, relative to the current directory.
pub const DEFAULT_CONFIG_ARG: &str = ".scribe/prompts.yml";

/// Scribe: template-based prompt composer for crafting and managing
/// complex agent instructions.
///
/// A project is a `.scribe/` directory holding a `prompts.yml`
/// configuration plus the templates and includes it references. Each
/// configured agent composes into one output document.
#[derive(Parser, Debug)]
#[command(name = "scribe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse arguments from the process environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Available commands for scribe.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initialize a new scribe project.
    ///
    /// Creates the project directory with a starter configuration,
    /// templates, includes, and personas.
    Init(InitArgs),

    /// Compose agent prompts from the configuration.
    ///
    /// Composes the named agents, or every configured agent when none are
    /// given. With --watch, keeps running and recomposes agents whose
    /// dependencies change.
    Compose(ComposeArgs),

    /// Show the files each agent depends on.
    ///
    /// Runs a dry composition of every agent (nothing is written) and
    /// prints the dependency map, or the reverse file-to-agents view.
    Deps(DepsArgs),
}

/// Arguments for the `init` command.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Directory to initialize. The default creates `.scribe/` in the
    /// current directory; a custom path gets a `.scribe/` subdirectory.
    #[arg(default_value = ".scribe")]
    pub path: PathBuf,

    /// Overwrite existing files instead of skipping them.
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the `compose` command.
#[derive(Parser, Debug)]
pub struct ComposeArgs {
    /// Specific agent(s) to compose. If empty, all agents are composed.
    pub agents: Vec<String>,

    /// Path to the prompts.yml configuration file, or to a directory
    /// containing a `.scribe/` project.
    #[arg(short, long, default_value = DEFAULT_CONFIG_ARG)]
    pub config: PathBuf,

    /// Watch dependencies and recompose automatically on changes.
    #[arg(short, long)]
    pub watch: bool,
}

/// Arguments for the `deps` command.
#[derive(Parser, Debug)]
pub struct DepsArgs {
    /// Path to the prompts.yml configuration file, or to a directory
    /// containing a `.scribe/` project.
    #[arg(short, long, default_value = DEFAULT_CONFIG_ARG)]
    pub config: PathBuf,

    /// Print the reverse view: each file and the agents it affects.
    #[arg(short, long)]
    pub reverse: bool,
}
