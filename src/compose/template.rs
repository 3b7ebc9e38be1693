//! Template-render composition strategy.
//!
//! The core depends only on the [`TemplateRenderer`] capability: given a
//! template identifier, a variable mapping (via the substitution context)
//! and the file-reading helper capability (the [`Expander`]), produce the
//! final text. The built-in [`FileTemplateRenderer`] loads templates from
//! the configured templates directory and feeds them through the engine,
//! which gives template bodies the same `{{ var }}` / `{{ read_file(...) }}`
//! semantics as every other substituted string. Any conforming engine can
//! be swapped in without touching the composer.

use crate::compose::subst::{Expander, SubstContext};
use crate::config::{AgentConfig, Settings};
use crate::error::{Result, ScribeError};
use std::path::PathBuf;

/// A pluggable template rendering capability.
pub trait TemplateRenderer {
    /// The file backing `name`, when the renderer is file-based. Used for
    /// dependency tracking.
    fn template_path(&self, name: &str) -> Option<PathBuf>;

    /// Render the named template. `ctx` carries the resolved variables;
    /// `exp` is the `read_file` / `read_file_raw` helper capability and
    /// records dependencies for every file consulted.
    fn render(&self, name: &str, exp: &mut Expander<'_>, ctx: &SubstContext<'_>)
    -> Result<String>;
}

/// The built-in renderer: templates are files under a directory, rendered
/// by the substitution engine.
pub struct FileTemplateRenderer {
    templates_dir: PathBuf,
}

impl FileTemplateRenderer {
    /// Create a renderer rooted at `templates_dir` (an absolute path).
    pub fn new(templates_dir: PathBuf) -> Self {
        Self { templates_dir }
    }
}

impl TemplateRenderer for FileTemplateRenderer {
    fn template_path(&self, name: &str) -> Option<PathBuf> {
        Some(self.templates_dir.join(name))
    }

    fn render(
        &self,
        name: &str,
        exp: &mut Expander<'_>,
        ctx: &SubstContext<'_>,
    ) -> Result<String> {
        let path = self.templates_dir.join(name);
        let source =
            std::fs::read_to_string(&path).map_err(|e| ScribeError::TemplateRender {
                template: name.to_string(),
                message: format!("{}: {}", path.display(), e),
            })?;

        exp.expand(&source, &ctx.clone().with_file(path))
    }
}

/// Compose an agent via template rendering.
///
/// The template name prefers the agent's own setting and falls back to the
/// global default; the name itself may contain variable references. The
/// resolved template file is recorded as a dependency.
pub fn run_template(
    agent: &str,
    agent_cfg: &AgentConfig,
    settings: &Settings,
    renderer: &dyn TemplateRenderer,
    exp: &mut Expander<'_>,
    ctx: &SubstContext<'_>,
) -> Result<String> {
    let template_ref = agent_cfg
        .template
        .as_ref()
        .or(settings.template.as_ref())
        .ok_or_else(|| ScribeError::MissingTemplate {
            agent: agent.to_string(),
        })?;

    let name = exp.expand(template_ref, ctx)?;

    if let Some(path) = renderer.template_path(&name) {
        exp.record_dependency(path);
    }

    renderer.render(&name, exp, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{VarMap, VarValue};
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        deps: BTreeSet<PathBuf>,
        warnings: Vec<String>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                temp: TempDir::new().unwrap(),
                deps: BTreeSet::new(),
                warnings: Vec::new(),
            }
        }

        fn templates_dir(&self) -> PathBuf {
            let dir = self.temp.path().join("templates");
            fs::create_dir_all(&dir).unwrap();
            dir
        }

        fn write_template(&self, name: &str, content: &str) {
            fs::write(self.templates_dir().join(name), content).unwrap();
        }
    }

    fn vars(pairs: &[(&str, &str)]) -> VarMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), VarValue::from(*v)))
            .collect()
    }

    #[test]
    fn missing_template_everywhere_fails() {
        let mut fx = Fixture::new();
        let renderer = FileTemplateRenderer::new(fx.templates_dir());
        let map = VarMap::new();
        let ctx = SubstContext::new(&map, true, true);
        let base = fx.temp.path().to_path_buf();
        let mut exp = Expander::new(&base, &mut fx.deps, &mut fx.warnings);

        let err = run_template(
            "writer",
            &AgentConfig::default(),
            &Settings::default(),
            &renderer,
            &mut exp,
            &ctx,
        )
        .unwrap_err();

        assert!(matches!(err, ScribeError::MissingTemplate { agent } if agent == "writer"));
    }

    #[test]
    fn agent_template_preferred_over_global() {
        let mut fx = Fixture::new();
        fx.write_template("agent.md", "from agent");
        fx.write_template("global.md", "from global");
        let renderer = FileTemplateRenderer::new(fx.templates_dir());
        let map = VarMap::new();
        let ctx = SubstContext::new(&map, true, true);
        let base = fx.temp.path().to_path_buf();
        let mut exp = Expander::new(&base, &mut fx.deps, &mut fx.warnings);

        let agent_cfg = AgentConfig {
            template: Some("agent.md".to_string()),
            ..Default::default()
        };
        let settings = Settings {
            template: Some("global.md".to_string()),
            ..Default::default()
        };

        let text = run_template("w", &agent_cfg, &settings, &renderer, &mut exp, &ctx).unwrap();

        assert_eq!(text, "from agent");
    }

    #[test]
    fn global_template_is_the_fallback() {
        let mut fx = Fixture::new();
        fx.write_template("global.md", "fallback");
        let renderer = FileTemplateRenderer::new(fx.templates_dir());
        let map = VarMap::new();
        let ctx = SubstContext::new(&map, true, true);
        let base = fx.temp.path().to_path_buf();
        let mut exp = Expander::new(&base, &mut fx.deps, &mut fx.warnings);

        let settings = Settings {
            template: Some("global.md".to_string()),
            ..Default::default()
        };

        let text = run_template(
            "w",
            &AgentConfig::default(),
            &settings,
            &renderer,
            &mut exp,
            &ctx,
        )
        .unwrap();

        assert_eq!(text, "fallback");
    }

    #[test]
    fn template_renders_variables_and_helpers() {
        let mut fx = Fixture::new();
        fx.write_template("main.md", "# {{ title }}\n\n{{ read_file(\"body.md\") }}");
        fs::write(fx.temp.path().join("body.md"), "the body").unwrap();
        let renderer = FileTemplateRenderer::new(fx.templates_dir());
        let map = vars(&[("title", "Doc")]);
        let ctx = SubstContext::new(&map, true, true);
        let base = fx.temp.path().to_path_buf();
        let mut exp = Expander::new(&base, &mut fx.deps, &mut fx.warnings);

        let agent_cfg = AgentConfig {
            template: Some("main.md".to_string()),
            ..Default::default()
        };

        let text = run_template(
            "w",
            &agent_cfg,
            &Settings::default(),
            &renderer,
            &mut exp,
            &ctx,
        )
        .unwrap();

        assert_eq!(text, "# Doc\n\nthe body");
    }

    #[test]
    fn template_path_is_recorded_as_dependency() {
        let mut fx = Fixture::new();
        fx.write_template("main.md", "content");
        let templates_dir = fx.templates_dir();
        let renderer = FileTemplateRenderer::new(templates_dir.clone());
        let map = VarMap::new();
        let ctx = SubstContext::new(&map, true, true);
        let base = fx.temp.path().to_path_buf();
        let mut exp = Expander::new(&base, &mut fx.deps, &mut fx.warnings);

        let agent_cfg = AgentConfig {
            template: Some("main.md".to_string()),
            ..Default::default()
        };
        run_template(
            "w",
            &agent_cfg,
            &Settings::default(),
            &renderer,
            &mut exp,
            &ctx,
        )
        .unwrap();

        assert!(fx.deps.contains(&templates_dir.join("main.md")));
    }

    #[test]
    fn template_name_is_expanded() {
        let mut fx = Fixture::new();
        fx.write_template("writer.md", "named template");
        let renderer = FileTemplateRenderer::new(fx.templates_dir());
        let map = vars(&[("_agent_name", "writer")]);
        let ctx = SubstContext::new(&map, true, true);
        let base = fx.temp.path().to_path_buf();
        let mut exp = Expander::new(&base, &mut fx.deps, &mut fx.warnings);

        let agent_cfg = AgentConfig {
            template: Some("{{ _agent_name }}.md".to_string()),
            ..Default::default()
        };

        let text = run_template(
            "writer",
            &agent_cfg,
            &Settings::default(),
            &renderer,
            &mut exp,
            &ctx,
        )
        .unwrap();

        assert_eq!(text, "named template");
    }

    #[test]
    fn unreadable_template_is_render_error() {
        let mut fx = Fixture::new();
        let renderer = FileTemplateRenderer::new(fx.templates_dir());
        let map = VarMap::new();
        let ctx = SubstContext::new(&map, true, true);
        let base = fx.temp.path().to_path_buf();
        let mut exp = Expander::new(&base, &mut fx.deps, &mut fx.warnings);

        let agent_cfg = AgentConfig {
            template: Some("absent.md".to_string()),
            ..Default::default()
        };

        let err = run_template(
            "w",
            &agent_cfg,
            &Settings::default(),
            &renderer,
            &mut exp,
            &ctx,
        )
        .unwrap_err();

        assert!(matches!(err, ScribeError::TemplateRender { template, .. } if template == "absent.md"));
    }
}
