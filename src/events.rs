//! Event logging subsystem for scribe.
//!
//! Appends one JSON object per line (NDJSON) to
//! `.scribe/.state/events.ndjson`, recording composition activity for
//! auditing. Event writes are best-effort: callers warn on failure and
//! carry on, and dry-run compositions never log at all.
//!
//! Each event carries:
//! - `ts`: RFC3339 timestamp
//! - `action`: what happened (init, compose, ...)
//! - `actor`: the invoking user (`user@host`)
//! - `agent`: optional agent name for per-agent events
//! - `details`: freeform object with action-specific fields

use crate::context::ProjectContext;
use crate::error::{Result, ScribeError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;

/// Actions that can be logged as events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventAction {
    /// Project scaffolding created
    Init,
    /// Agent composed and written
    Compose,
    /// Agent composition failed
    ComposeFailed,
    /// Watch session started
    WatchStart,
    /// Agent recomposed by the watcher
    Recompose,
}

impl std::fmt::Display for EventAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventAction::Init => write!(f, "init"),
            EventAction::Compose => write!(f, "compose"),
            EventAction::ComposeFailed => write!(f, "compose_failed"),
            EventAction::WatchStart => write!(f, "watch_start"),
            EventAction::Recompose => write!(f, "recompose"),
        }
    }
}

/// An event record for the audit log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// RFC3339 timestamp when the event occurred.
    pub ts: DateTime<Utc>,

    /// The action that was performed.
    pub action: EventAction,

    /// The actor who performed the action (e.g., `user@host`).
    pub actor: String,

    /// Optional agent name for agent-specific events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,

    /// Freeform details object with action-specific information.
    pub details: Value,
}

impl Event {
    /// Create a new event with the given action, stamped with the current
    /// time and the invoking user.
    pub fn new(action: EventAction) -> Self {
        Self {
            ts: Utc::now(),
            action,
            actor: actor_string(),
            agent: None,
            details: Value::Object(serde_json::Map::new()),
        }
    }

    /// Set the agent name for this event.
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    /// Set the details object for this event.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Serialize the event to a single-line JSON string.
    pub fn to_ndjson_line(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| ScribeError::UserError(format!("failed to serialize event: {}", e)))
    }
}

/// Get the actor string for event metadata.
fn actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}

/// Append an event to the project's event log.
///
/// Creates the state directory and the log file on first use. Each append
/// writes exactly one line and syncs it to disk.
pub fn append_event(ctx: &ProjectContext, event: &Event) -> Result<()> {
    let events_file = ctx.events_file();
    let json_line = event.to_ndjson_line()?;

    let state_dir = ctx.state_dir();
    if !state_dir.exists() {
        fs::create_dir_all(&state_dir).map_err(|e| {
            ScribeError::UserError(format!(
                "failed to create state directory '{}': {}",
                state_dir.display(),
                e
            ))
        })?;
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&events_file)
        .map_err(|e| {
            ScribeError::UserError(format!(
                "failed to open events file '{}': {}",
                events_file.display(),
                e
            ))
        })?;

    writeln!(file, "{}", json_line).map_err(|e| {
        ScribeError::UserError(format!(
            "failed to write event to '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    file.sync_all().map_err(|e| {
        ScribeError::UserError(format!(
            "failed to sync events file '{}': {}",
            events_file.display(),
            e
        ))
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn make_context() -> (TempDir, ProjectContext) {
        let temp_dir = TempDir::new().unwrap();
        let project = temp_dir.path().join(".scribe");
        fs::create_dir_all(&project).unwrap();
        let config = project.join("prompts.yml");
        fs::write(&config, "agents: {}\n").unwrap();
        let ctx = ProjectContext::resolve(&config).unwrap();
        (temp_dir, ctx)
    }

    #[test]
    fn event_serializes_to_single_line() {
        let event = Event::new(EventAction::Compose)
            .with_agent("writer")
            .with_details(json!({"output": "out/writer.md"}));

        let line = event.to_ndjson_line().unwrap();

        assert!(!line.contains('\n'));
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["action"], "compose");
        assert_eq!(parsed["agent"], "writer");
        assert_eq!(parsed["details"]["output"], "out/writer.md");
        assert!(parsed["ts"].is_string());
    }

    #[test]
    fn agent_field_is_omitted_when_absent() {
        let event = Event::new(EventAction::WatchStart);
        let line = event.to_ndjson_line().unwrap();
        assert!(!line.contains("\"agent\""));
    }

    #[test]
    fn append_creates_state_dir_and_accumulates_lines() {
        let (_temp, ctx) = make_context();

        append_event(&ctx, &Event::new(EventAction::Init)).unwrap();
        append_event(
            &ctx,
            &Event::new(EventAction::Compose).with_agent("writer"),
        )
        .unwrap();

        let content = fs::read_to_string(ctx.events_file()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let parsed: Value = serde_json::from_str(line).unwrap();
            assert!(parsed["actor"].as_str().unwrap().contains('@'));
        }
    }

    #[test]
    #[serial]
    fn actor_uses_user_env_var() {
        let original = std::env::var("USER").ok();

        unsafe {
            std::env::set_var("USER", "tester");
        }
        let actor = actor_string();
        assert!(actor.starts_with("tester@"));

        unsafe {
            match original {
                Some(v) => std::env::set_var("USER", v),
                None => std::env::remove_var("USER"),
            }
        }
    }

    #[test]
    fn action_display_matches_serialization() {
        for action in [
            EventAction::Init,
            EventAction::Compose,
            EventAction::ComposeFailed,
            EventAction::WatchStart,
            EventAction::Recompose,
        ] {
            let display = action.to_string();
            let serialized = serde_json::to_string(&action).unwrap();
            assert_eq!(serialized, format!("\"{}\"", display));
        }
    }
}
