//! Implementation of the `scribe compose` command.
//!
//! Composes the requested agents (or every configured agent) and writes
//! their outputs. Error policy: a failure for an explicitly named agent
//! aborts immediately; when composing all agents, failures are reported
//! and the remaining agents are still attempted, with a nonzero exit at
//! the end if anything failed.

use crate::cli::ComposeArgs;
use crate::compose::{Composer, Composition};
use crate::context::ProjectContext;
use crate::error::{Result, ScribeError};
use crate::events::{Event, EventAction, append_event};
use serde_json::json;

pub fn cmd_compose(args: ComposeArgs) -> Result<()> {
    let project = ProjectContext::resolve(&args.config)?;
    let mut composer = Composer::load(&project)?;

    compose_agents(&mut composer, &args.agents)?;

    if args.watch {
        super::watch::cmd_watch(composer, args.agents)?;
    }

    Ok(())
}

/// Compose a list of agents, or all configured agents when the list is
/// empty.
pub(crate) fn compose_agents(composer: &mut Composer, requested: &[String]) -> Result<()> {
    let explicit = !requested.is_empty();
    let targets = if explicit {
        requested.to_vec()
    } else {
        composer.agent_names()
    };

    if targets.is_empty() {
        eprintln!("warning: no agents found in configuration; nothing to compose");
        return Ok(());
    }

    let mut failed = 0usize;
    for agent in &targets {
        match composer.compose_agent(agent, false) {
            Ok(composition) => report_success(composer, &composition),
            Err(e) => {
                log_failure(composer, agent, &e);
                if explicit {
                    return Err(e);
                }
                eprintln!("error: failed to compose agent '{}': {}", agent, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(ScribeError::UserError(format!(
            "{} of {} agent(s) failed to compose",
            failed,
            targets.len()
        )));
    }
    Ok(())
}

fn report_success(composer: &Composer, composition: &Composition) {
    if let Some(path) = &composition.output_path {
        println!(
            "composed '{}' -> '{}'",
            composition.agent,
            path.display()
        );
    }

    let event = Event::new(EventAction::Compose)
        .with_agent(&composition.agent)
        .with_details(json!({
            "output": composition.output_path.as_ref().map(|p| p.display().to_string()),
            "warnings": composition.warnings.len(),
        }));
    if let Err(e) = append_event(composer.project(), &event) {
        eprintln!("warning: failed to log compose event: {}", e);
    }
}

fn log_failure(composer: &Composer, agent: &str, error: &ScribeError) {
    let event = Event::new(EventAction::ComposeFailed)
        .with_agent(agent)
        .with_details(json!({ "error": error.to_string() }));
    if let Err(e) = append_event(composer.project(), &event) {
        eprintln!("warning: failed to log compose_failed event: {}", e);
    }
}
