//! Step-sequence composition strategy.
//!
//! An agent with an `assembly` list is composed by evaluating its steps in
//! declaration order. Each step is a single-key mapping; malformed steps
//! are skipped with a warning and unknown keys are ignored, so one bad
//! step never sinks the whole document. Fragments are trimmed, empty
//! fragments are dropped, and the survivors are joined with a blank line.

use crate::compose::scanner::IncludeCall;
use crate::compose::subst::{Expander, SubstContext};
use crate::error::Result;

/// A recognized assembly step.
#[derive(Debug, Clone, PartialEq)]
enum Step {
    Include {
        path: String,
        raw: bool,
        fit_headings: Option<u8>,
    },
    Content(String),
    Separator(String),
    Heading {
        level: u8,
        text: String,
    },
}

/// Run the step sequence and return the assembled text.
pub fn run_assembly(
    steps: &[serde_yaml::Value],
    exp: &mut Expander<'_>,
    ctx: &SubstContext<'_>,
) -> Result<String> {
    let mut parts: Vec<String> = Vec::new();

    for raw_step in steps {
        let step = match parse_step(raw_step) {
            Ok(Some(step)) => step,
            Ok(None) => continue,
            Err(message) => {
                exp.warn(message);
                continue;
            }
        };

        let fragment = match step {
            Step::Include {
                path,
                raw,
                fit_headings,
            } => {
                let call = IncludeCall {
                    path,
                    raw,
                    fit_headings,
                };
                exp.read_include(&call, ctx)?
            }
            Step::Content(text) | Step::Separator(text) => exp.expand(&text, ctx)?,
            Step::Heading { level, text } => {
                let expanded = exp.expand(&text, ctx)?;
                format!("{} {}", "#".repeat(level as usize), expanded)
            }
        };
        parts.push(fragment);
    }

    Ok(parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n"))
}

/// Parse one raw step value.
///
/// `Ok(None)` means the step contributes nothing (empty mapping, unknown
/// key); `Err` carries a warning for a step that looks intended but is
/// malformed.
fn parse_step(value: &serde_yaml::Value) -> std::result::Result<Option<Step>, String> {
    let Some(mapping) = value.as_mapping() else {
        return Err(format!("skipping non-mapping assembly step: {:?}", value));
    };
    let Some((key, step_value)) = mapping.iter().next() else {
        return Ok(None);
    };
    let Some(key) = key.as_str() else {
        return Err(format!("skipping assembly step with non-string key: {:?}", key));
    };

    match key {
        "include" | "include_raw" => {
            let raw = key == "include_raw";
            let (path, fit_headings) = parse_include_value(step_value)
                .map_err(|reason| format!("skipping invalid {} step: {}", key, reason))?;
            Ok(Some(Step::Include {
                path,
                raw,
                fit_headings,
            }))
        }
        "content" => Ok(Some(Step::Content(scalar_text(key, step_value)?))),
        "separator" => Ok(Some(Step::Separator(scalar_text(key, step_value)?))),
        _ => {
            if let Some(level) = heading_key_level(key) {
                Ok(Some(Step::Heading {
                    level,
                    text: scalar_text(key, step_value)?,
                }))
            } else {
                // Unknown keys are ignored.
                Ok(None)
            }
        }
    }
}

/// Parse an include step's value: a path string, or a mapping with `path`
/// and optional `fit_headings`.
fn parse_include_value(
    value: &serde_yaml::Value,
) -> std::result::Result<(String, Option<u8>), String> {
    if let Some(path) = value.as_str() {
        if path.trim().is_empty() {
            return Err("empty path".to_string());
        }
        return Ok((path.to_string(), None));
    }

    let Some(mapping) = value.as_mapping() else {
        return Err(format!("expected a path or mapping, got {:?}", value));
    };

    let path = mapping
        .get(&serde_yaml::Value::from("path"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| "missing or empty 'path'".to_string())?;

    let fit_headings = match mapping.get(&serde_yaml::Value::from("fit_headings")) {
        None => None,
        Some(v) => {
            let level = v
                .as_u64()
                .filter(|n| *n >= 1 && *n <= 6)
                .ok_or_else(|| format!("fit_headings must be 1..=6, got {:?}", v))?;
            Some(level as u8)
        }
    };

    Ok((path, fit_headings))
}

/// Coerce a scalar step value to text.
fn scalar_text(key: &str, value: &serde_yaml::Value) -> std::result::Result<String, String> {
    match value {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Null => Ok(String::new()),
        other => Err(format!(
            "skipping '{}' step with non-scalar value: {:?}",
            key, other
        )),
    }
}

/// `h1`..`h6` keys select a Markdown heading level.
fn heading_key_level(key: &str) -> Option<u8> {
    let digits = key.strip_prefix('h')?;
    let level: u8 = digits.parse().ok()?;
    (1..=6).contains(&level).then_some(level)
}
