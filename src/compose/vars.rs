//! Variable resolution for one agent.
//!
//! Merges global and agent-scoped variables, injects the composition
//! context (`_agent_name`, `_settings`), and expands every string value
//! through the substitution engine. Each value is expanded against the
//! raw merged mapping, never against other values' expanded output, so
//! resolution is independent of key order.

use crate::compose::subst::{Expander, SubstContext};
use crate::config::{Config, VarMap, VarValue};
use crate::error::Result;
use std::collections::BTreeMap;
use std::path::Path;

/// Build the `_settings` context mapping from the effective flags.
pub fn settings_context(warn_on_missing: bool, substitute_in_includes: bool) -> VarMap {
    let mut settings = BTreeMap::new();
    settings.insert(
        "warn_on_missing".to_string(),
        VarValue::Bool(warn_on_missing),
    );
    settings.insert(
        "substitute_in_includes".to_string(),
        VarValue::Bool(substitute_in_includes),
    );

    let mut extra = VarMap::new();
    extra.insert("_settings".to_string(), VarValue::Map(settings));
    extra
}

/// Resolve the flat variable mapping for `agent_name`.
///
/// Unknown agents resolve to globals only; callers that need the agent to
/// exist check before composing. `extra` is overlaid last and wins over
/// everything.
pub fn resolve_variables(
    config: &Config,
    agent_name: &str,
    extra: VarMap,
    exp: &mut Expander<'_>,
    warn_on_missing: bool,
    substitute_in_includes: bool,
    config_path: &Path,
) -> Result<VarMap> {
    let mut merged = config.variables.clone();
    if let Some(agent) = config.agents.get(agent_name) {
        merged.extend(agent.variables.clone());
    }
    merged.insert(
        "_agent_name".to_string(),
        VarValue::String(agent_name.to_string()),
    );
    merged.extend(extra);

    let ctx = SubstContext::new(&merged, warn_on_missing, substitute_in_includes)
        .with_file(config_path);

    let mut resolved = VarMap::new();
    for (key, value) in &merged {
        let expanded = match value {
            VarValue::String(s) => VarValue::String(exp.expand(s, &ctx)?),
            other => other.clone(),
        };
        resolved.insert(key.clone(), expanded);
    }
    Ok(resolved)
}
