//! The composition engine.
//!
//! A [`Composer`] owns one loaded configuration and composes agents from
//! it: resolve the agent's variable mapping, run the selected assembly
//! strategy through the substitution engine (recording every file
//! consulted), then persist the result. Dry-run composition executes the
//! full pipeline without writing anything — it exists purely to populate
//! dependency sets for the watch driver.
//!
//! Composition is synchronous and single-threaded; agents composed in one
//! session share only the read-only configuration and the accumulated
//! dependency tracker.

pub mod assembly;
pub mod deps;
pub mod headings;
pub mod output;
pub mod scanner;
pub mod subst;
pub mod template;
pub mod vars;

pub use deps::DependencyTracker;
pub use subst::{Expander, MAX_SUBSTITUTION_DEPTH, SubstContext};
pub use template::{FileTemplateRenderer, TemplateRenderer};

use crate::config::{AgentConfig, Config};
use crate::context::ProjectContext;
use crate::error::{Result, ScribeError};
use crate::fs as fsutil;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// The result of composing one agent.
#[derive(Debug)]
pub struct Composition {
    /// The agent that was composed.
    pub agent: String,
    /// The final composed text.
    pub text: String,
    /// Where the text was written; `None` for dry runs.
    pub output_path: Option<PathBuf>,
    /// Non-fatal warnings surfaced during composition.
    pub warnings: Vec<String>,
}

/// Composes agent prompts from one loaded configuration.
pub struct Composer {
    project: ProjectContext,
    config: Config,
    renderer: Box<dyn TemplateRenderer>,
    tracker: DependencyTracker,
}

impl Composer {
    /// Load the configuration and build a composer for it.
    ///
    /// The configuration is read once; call `load` again to pick up edits.
    pub fn load(project: &ProjectContext) -> Result<Self> {
        let config = Config::load(&project.config_path)?;
        let templates_dir =
            fsutil::resolve_relative(&project.base_dir, &config.settings.templates_dir);

        Ok(Self {
            project: project.clone(),
            config,
            renderer: Box::new(FileTemplateRenderer::new(templates_dir)),
            tracker: DependencyTracker::default(),
        })
    }

    /// Replace the template renderer (the pluggable-engine seam).
    pub fn with_renderer(mut self, renderer: Box<dyn TemplateRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// The loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The resolved project paths.
    pub fn project(&self) -> &ProjectContext {
        &self.project
    }

    /// All configured agent names, in declaration order.
    pub fn agent_names(&self) -> Vec<String> {
        self.config.agents.names()
    }

    /// Compose one agent.
    ///
    /// With `dry_run` the full pipeline runs (populating the dependency
    /// tracker) but nothing is written and `output_path` is `None`.
    pub fn compose_agent(&mut self, agent: &str, dry_run: bool) -> Result<Composition> {
        let Some(agent_cfg) = self.config.agents.get(agent).cloned() else {
            return Err(ScribeError::AgentNotFound {
                agent: agent.to_string(),
            });
        };

        let warn_on_missing = agent_cfg
            .warn_on_missing_variables
            .unwrap_or(self.config.settings.warn_on_missing_variables);
        let substitute_in_includes = agent_cfg
            .substitute_in_included_files
            .unwrap_or(self.config.settings.substitute_in_included_files);

        let mut dep_set = deps::new_set(&self.project.config_path);
        let mut warnings = Vec::new();

        let result = self.compose_text(
            agent,
            &agent_cfg,
            warn_on_missing,
            substitute_in_includes,
            &mut dep_set,
            &mut warnings,
            dry_run,
        );

        // Record even partial sets from failed compositions: the watcher
        // reacts to the files consulted before the failure.
        self.tracker.record(agent, dep_set);

        let (text, output_path) = result?;
        Ok(Composition {
            agent: agent.to_string(),
            text,
            output_path,
            warnings,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn compose_text(
        &self,
        agent: &str,
        agent_cfg: &AgentConfig,
        warn_on_missing: bool,
        substitute_in_includes: bool,
        dep_set: &mut BTreeSet<PathBuf>,
        warnings: &mut Vec<String>,
        dry_run: bool,
    ) -> Result<(String, Option<PathBuf>)> {
        let mut exp = Expander::new(&self.project.base_dir, dep_set, warnings);

        let extra = vars::settings_context(warn_on_missing, substitute_in_includes);
        let resolved = vars::resolve_variables(
            &self.config,
            agent,
            extra,
            &mut exp,
            warn_on_missing,
            substitute_in_includes,
            &self.project.config_path,
        )?;

        let ctx = SubstContext::new(&resolved, warn_on_missing, substitute_in_includes)
            .with_file(&self.project.config_path);

        let text = match &agent_cfg.assembly {
            Some(steps) => assembly::run_assembly(steps, &mut exp, &ctx)?,
            None => template::run_template(
                agent,
                agent_cfg,
                &self.config.settings,
                self.renderer.as_ref(),
                &mut exp,
                &ctx,
            )?,
        };

        if dry_run {
            return Ok((text, None));
        }

        let path = output::resolve_output_path(
            agent,
            agent_cfg,
            &self.config.settings,
            &mut exp,
            &ctx,
        )?;
        output::write_output(&path, &text)?;
        Ok((text, Some(path)))
    }

    /// Dry-run every agent to populate the dependency tracker.
    ///
    /// Per-agent failures are tolerated with a warning; partial dependency
    /// information is better than none for deciding what to watch.
    pub fn analyze_dependencies(&mut self) {
        for agent in self.agent_names() {
            if let Err(e) = self.compose_agent(&agent, true) {
                eprintln!(
                    "warning: could not fully analyze dependencies for agent '{}': {}",
                    agent, e
                );
            }
        }
    }

    /// The dependency set recorded for one agent.
    pub fn agent_dependencies(&self, agent: &str) -> Option<&BTreeSet<PathBuf>> {
        self.tracker.agent_dependencies(agent)
    }

    /// Union of every composed agent's dependencies.
    pub fn all_dependencies(&self) -> BTreeSet<PathBuf> {
        self.tracker.all_dependencies()
    }

    /// Reverse view: file path to the agents whose output it affects.
    pub fn reverse_dependencies(&self) -> BTreeMap<PathBuf, Vec<String>> {
        self.tracker.reverse_dependencies()
    }
}
