//! Implementation of watch mode (`scribe compose --watch`).
//!
//! Keeps an eye on every directory that holds a dependency of some agent
//! and recomposes synchronously when one changes. The driver sits entirely
//! outside the engine: everything it knows about the project comes from
//! the composer's dependency-query interface.
//!
//! Session structure:
//! - events from the debounced watcher arrive over an mpsc channel
//! - a change to a tracked dependency recomposes the affected agents
//!   (with a freshly loaded configuration, so variable edits take effect)
//! - a change to the config file reloads it, recomposes agents whose
//!   effective configuration changed, and restarts the watcher when the
//!   watch-directory set changed
//! - changes under the output and state directories are ignored, as are
//!   files no agent depends on

use crate::compose::Composer;
use crate::config::Config;
use crate::error::{Result, ScribeError};
use crate::events::{Event, EventAction, append_event};
use crate::fs as fsutil;
use notify_debouncer_full::notify::{EventKind, RecursiveMode};
use notify_debouncer_full::{DebounceEventResult, new_debouncer};
use serde_json::json;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

const DEBOUNCE: Duration = Duration::from_millis(500);

/// Run watch mode until the process is interrupted.
pub fn cmd_watch(mut composer: Composer, requested: Vec<String>) -> Result<()> {
    eprintln!("initial dependency analysis for watch mode...");
    composer.analyze_dependencies();

    let event = Event::new(EventAction::WatchStart).with_details(json!({
        "agents": if requested.is_empty() { composer.agent_names() } else { requested.clone() },
    }));
    if let Err(e) = append_event(composer.project(), &event) {
        eprintln!("warning: failed to log watch_start event: {}", e);
    }

    let mut current = composer;
    loop {
        match run_session(current, &requested)? {
            SessionEnd::Restart(next) => {
                eprintln!("watch paths changed; restarting watcher");
                current = *next;
            }
            SessionEnd::Exit => break,
        }
    }

    eprintln!("watcher stopped");
    Ok(())
}

enum SessionEnd {
    /// The watch-directory set changed; start over with this composer.
    Restart(Box<Composer>),
    /// The event channel closed.
    Exit,
}

enum ConfigReload {
    /// Watch directories changed; the session must restart.
    Restart(Box<Composer>),
    /// Same directories; keep watching with the fresh composer.
    Swap(Box<Composer>),
}

/// Run a single watcher instance until it needs a restart.
fn run_session(mut composer: Composer, requested: &[String]) -> Result<SessionEnd> {
    let watch_dirs = watch_dirs(&composer);
    let mut ignore = ignore_roots(&composer);
    let mut reverse = composer.reverse_dependencies();

    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(DEBOUNCE, None, move |result: DebounceEventResult| {
        let _ = tx.send(result);
    })
    .map_err(|e| ScribeError::UserError(format!("failed to start file watcher: {}", e)))?;

    for dir in &watch_dirs {
        if dir.exists()
            && let Err(e) = debouncer.watch(dir, RecursiveMode::Recursive)
        {
            eprintln!("warning: cannot watch '{}': {}", dir.display(), e);
        }
    }
    eprintln!(
        "watching {} directories for changes... press Ctrl+C to stop",
        watch_dirs.len()
    );

    loop {
        let batch = match rx.recv() {
            Ok(batch) => batch,
            Err(_) => return Ok(SessionEnd::Exit),
        };

        let events = match batch {
            Ok(events) => events,
            Err(errors) => {
                for e in errors {
                    eprintln!("warning: watcher error: {}", e);
                }
                continue;
            }
        };

        let mut changed: BTreeSet<PathBuf> = BTreeSet::new();
        for event in &events {
            if !matches!(
                event.kind,
                EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
            ) {
                continue;
            }
            for path in &event.paths {
                let path = fsutil::normalize(path);
                if ignore.iter().any(|root| path.starts_with(root)) {
                    continue;
                }
                changed.insert(path);
            }
        }
        if changed.is_empty() {
            continue;
        }

        if changed.contains(&composer.project().config_path) {
            match reload_config(&composer, requested) {
                Ok(ConfigReload::Restart(next)) => return Ok(SessionEnd::Restart(next)),
                Ok(ConfigReload::Swap(next)) => {
                    composer = *next;
                    reverse = composer.reverse_dependencies();
                    ignore = ignore_roots(&composer);
                }
                Err(e) => {
                    eprintln!("error: reloading configuration failed: {}", e);
                }
            }
            continue;
        }

        let mut affected: Vec<String> = Vec::new();
        for path in &changed {
            if let Some(agents) = reverse.get(path) {
                eprintln!("change detected in '{}'", path.display());
                for agent in agents {
                    if !affected.contains(agent) {
                        affected.push(agent.clone());
                    }
                }
            }
        }
        if affected.is_empty() {
            // Not a dependency of any agent; nothing to do.
            continue;
        }

        eprintln!("recomposing affected agents: {}", affected.join(", "));
        // Reload so variable edits that shape include paths take effect.
        match Composer::load(composer.project()) {
            Ok(mut fresh) => recompose(&mut fresh, &affected),
            Err(e) => eprintln!("error: failed to reload configuration: {}", e),
        }
    }
}

/// Handle a change to the configuration file itself.
fn reload_config(composer: &Composer, requested: &[String]) -> Result<ConfigReload> {
    eprintln!("configuration file changed; analyzing...");

    let old_dirs = watch_dirs(composer);

    let mut fresh = Composer::load(composer.project())?;
    fresh.analyze_dependencies();
    let new_dirs = watch_dirs(&fresh);

    let to_rebuild = find_changed_agents(composer.config(), fresh.config(), requested);
    if to_rebuild.is_empty() {
        eprintln!("no effective changes in agent configurations");
    } else {
        eprintln!("recomposing agents affected by config change: {}", to_rebuild.join(", "));
        recompose(&mut fresh, &to_rebuild);
    }

    if old_dirs == new_dirs {
        Ok(ConfigReload::Swap(Box::new(fresh)))
    } else {
        Ok(ConfigReload::Restart(Box::new(fresh)))
    }
}

/// Recompose agents, reporting but never propagating per-agent failures.
fn recompose(composer: &mut Composer, agents: &[String]) {
    for agent in agents {
        match composer.compose_agent(agent, false) {
            Ok(composition) => {
                if let Some(path) = &composition.output_path {
                    println!("recomposed '{}' -> '{}'", agent, path.display());
                }
                let event = Event::new(EventAction::Recompose)
                    .with_agent(agent)
                    .with_details(json!({
                        "warnings": composition.warnings.len(),
                    }));
                if let Err(e) = append_event(composer.project(), &event) {
                    eprintln!("warning: failed to log recompose event: {}", e);
                }
            }
            Err(e) => eprintln!("error: failed to recompose agent '{}': {}", agent, e),
        }
    }
}

/// The set of directories to observe: the parents of every dependency,
/// falling back to the config directory when nothing is tracked yet.
fn watch_dirs(composer: &Composer) -> BTreeSet<PathBuf> {
    let mut dirs: BTreeSet<PathBuf> = composer
        .all_dependencies()
        .iter()
        .filter_map(|path| path.parent().map(|p| p.to_path_buf()))
        .collect();

    if dirs.is_empty() {
        dirs.insert(composer.project().base_dir.clone());
    }
    dirs
}

/// Directories whose events are never acted on: composed outputs and the
/// machine-local state directory (both live under watched parents).
fn ignore_roots(composer: &Composer) -> Vec<PathBuf> {
    let settings = &composer.config().settings;
    let output_dir = fsutil::resolve_relative(&composer.project().base_dir, &settings.output_dir);
    vec![output_dir, composer.project().state_dir()]
}

/// Decide which agents need recomposition after a config edit.
///
/// A change to global settings or variables rebuilds every requested
/// agent; otherwise only agents whose own configuration differs. Agents
/// removed by the edit are not rebuilt.
fn find_changed_agents(old: &Config, new: &Config, requested: &[String]) -> Vec<String> {
    if old.settings != new.settings || old.variables != new.variables {
        eprintln!("global settings or variables changed; rebuilding all watched agents");
        return if requested.is_empty() {
            new.agents.names()
        } else {
            requested.to_vec()
        };
    }

    let mut changed: Vec<String> = new
        .agents
        .names()
        .into_iter()
        .filter(|name| old.agents.get(name) != new.agents.get(name))
        .collect();

    if !requested.is_empty() {
        changed.retain(|name| requested.contains(name));
    }
    changed
}
