//! Configuration model for scribe.
//!
//! This module defines the structures behind `prompts.yml`: global settings,
//! global variables, and the per-agent definitions. Parsing is
//! forward-compatible (unknown fields are ignored) and applies sensible
//! defaults for optional fields, following the usual YAML-config
//! conventions. No semantic validation happens at load time; a missing
//! template or assembly is detected lazily when the agent is composed.

use crate::error::{Result, ScribeError};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// A configuration variable value.
///
/// Variables are loosely typed in the YAML; the union keeps them tagged so
/// that coercion to text happens in exactly one place
/// ([`VarValue::render`]) at substitution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    /// Boolean scalar.
    Bool(bool),
    /// Integer scalar.
    Int(i64),
    /// Floating-point scalar.
    Float(f64),
    /// Text scalar (the common case).
    String(String),
    /// Sequence of values.
    List(Vec<VarValue>),
    /// Nested mapping.
    Map(BTreeMap<String, VarValue>),
}

impl VarValue {
    /// Coerce the value to text for substitution.
    ///
    /// Strings pass through; scalars use their display form; lists join
    /// their rendered items with `", "`; mappings render as compact JSON.
    pub fn render(&self) -> String {
        match self {
            VarValue::Bool(b) => b.to_string(),
            VarValue::Int(n) => n.to_string(),
            VarValue::Float(n) => n.to_string(),
            VarValue::String(s) => s.clone(),
            VarValue::List(items) => items
                .iter()
                .map(VarValue::render)
                .collect::<Vec<_>>()
                .join(", "),
            VarValue::Map(_) => serde_json::to_string(self).unwrap_or_default(),
        }
    }

    /// Returns the string content if this is a text scalar.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            VarValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the boolean content if this is a boolean scalar.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            VarValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for VarValue {
    fn from(s: &str) -> Self {
        VarValue::String(s.to_string())
    }
}

impl From<String> for VarValue {
    fn from(s: String) -> Self {
        VarValue::String(s)
    }
}

impl From<bool> for VarValue {
    fn from(b: bool) -> Self {
        VarValue::Bool(b)
    }
}

/// A flat name-to-value variable mapping.
pub type VarMap = BTreeMap<String, VarValue>;

/// Global behavior settings.
///
/// All fields have defaults, so an empty `settings:` block (or none at all)
/// is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Output directory template, resolved against the config directory.
    pub output_dir: String,

    /// Directory containing template files, resolved against the config
    /// directory.
    pub templates_dir: String,

    /// Default template name for agents without `assembly` or their own
    /// `template`.
    pub template: Option<String>,

    /// Default output filename template. When it contains a path separator
    /// it is treated as a full path instead of a bare filename.
    pub output_file: Option<String>,

    /// Warn when a referenced variable is not defined.
    pub warn_on_missing_variables: bool,

    /// Expand variable references inside included file content.
    pub substitute_in_included_files: bool,
}

// Default value functions for serde
fn default_output_dir() -> String {
    "composed_prompts".to_string()
}
fn default_templates_dir() -> String {
    "templates".to_string()
}
fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            templates_dir: default_templates_dir(),
            template: None,
            output_file: None,
            warn_on_missing_variables: default_true(),
            substitute_in_included_files: default_true(),
        }
    }
}

/// Per-agent configuration.
///
/// Exactly one of `assembly` (step-sequence composition) or a resolvable
/// template (agent or global) must hold at composition time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent-local variables; override globals on name collision.
    pub variables: VarMap,

    /// Ordered assembly steps. Presence selects step-sequence composition.
    /// Steps are kept as raw YAML values and parsed leniently at
    /// composition time so unknown step keys never fail the load.
    pub assembly: Option<Vec<serde_yaml::Value>>,

    /// Template name for template-render composition.
    pub template: Option<String>,

    /// Output filename or path template; overrides the global setting.
    pub output_file: Option<String>,

    /// Per-agent override of `settings.warn_on_missing_variables`.
    pub warn_on_missing_variables: Option<bool>,

    /// Per-agent override of `settings.substitute_in_included_files`.
    pub substitute_in_included_files: Option<bool>,
}

/// Insertion-ordered agent map.
///
/// YAML mapping order determines the default composition order, so agents
/// cannot live in a plain `HashMap`/`BTreeMap`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentMap(Vec<(String, AgentConfig)>);

impl AgentMap {
    /// Look up an agent by name.
    pub fn get(&self, name: &str) -> Option<&AgentConfig> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, c)| c)
    }

    /// Agent names in declaration order.
    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|(n, _)| n.clone()).collect()
    }

    /// Iterate `(name, config)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &AgentConfig)> {
        self.0.iter().map(|(n, c)| (n, c))
    }

    /// Number of configured agents.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no agents are configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Insert or replace an agent, preserving the original position on
    /// replacement.
    pub fn insert(&mut self, name: impl Into<String>, config: AgentConfig) {
        let name = name.into();
        if let Some(slot) = self.0.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = config;
        } else {
            self.0.push((name, config));
        }
    }
}

impl Serialize for AgentMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, config) in &self.0 {
            map.serialize_entry(name, config)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AgentMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct AgentMapVisitor;

        impl<'de> Visitor<'de> for AgentMapVisitor {
            type Value = AgentMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping of agent names to agent configurations")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut agents = AgentMap::default();
                while let Some((name, config)) = access.next_entry::<String, AgentConfig>()? {
                    agents.insert(name, config);
                }
                Ok(agents)
            }
        }

        deserializer.deserialize_map(AgentMapVisitor)
    }
}

/// The root configuration object, loaded once per composer lifetime.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Global behavior settings.
    pub settings: Settings,

    /// Global variables, visible to every agent.
    pub variables: VarMap,

    /// Agent definitions, in declaration order.
    pub agents: AgentMap,
}

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward
    /// compatibility.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScribeError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| ScribeError::ConfigIo {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        serde_yaml::from_str(&content).map_err(|e| ScribeError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| ScribeError::ConfigParse {
            path: Path::new("<inline>").to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Serialize config to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| ScribeError::UserError(format!("failed to serialize config: {}", e)))
    }
}
