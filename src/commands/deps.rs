//! Implementation of the `scribe deps` command.
//!
//! Dry-runs every agent to populate the dependency tracker, then prints
//! either the forward view (agent -> files) or the reverse view
//! (file -> agents). Nothing is written; this is the same analysis the
//! watch driver performs at startup.

use crate::cli::DepsArgs;
use crate::compose::Composer;
use crate::context::ProjectContext;
use crate::error::Result;

pub fn cmd_deps(args: DepsArgs) -> Result<()> {
    let project = ProjectContext::resolve(&args.config)?;
    let mut composer = Composer::load(&project)?;

    composer.analyze_dependencies();

    if args.reverse {
        print_reverse(&composer);
    } else {
        print_forward(&composer);
    }
    Ok(())
}

fn print_forward(composer: &Composer) {
    let names = composer.agent_names();
    if names.is_empty() {
        println!("No agents configured.");
        return;
    }

    for agent in names {
        println!("{}:", agent);
        match composer.agent_dependencies(&agent) {
            Some(deps) => {
                for path in deps {
                    println!("  {}", path.display());
                }
            }
            None => println!("  (no dependencies recorded)"),
        }
        println!();
    }
}

fn print_reverse(composer: &Composer) {
    let reverse = composer.reverse_dependencies();
    if reverse.is_empty() {
        println!("No dependencies recorded.");
        return;
    }

    println!("Files and the agents they affect:");
    println!();
    for (path, agents) in reverse {
        println!("  {}", path.display());
        println!("    -> {}", agents.join(", "));
    }
}
