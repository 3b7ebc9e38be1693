//! Implementation of the `scribe init` command.
//!
//! Scaffolds a new project: the `.scribe/` directory, a starter
//! `prompts.yml` demonstrating both composition strategies, and the
//! `templates/`, `includes/` and `personas/` directories with sample
//! content. Existing files are skipped unless `--force` is given.

use crate::cli::InitArgs;
use crate::context::{DEFAULT_CONFIG_FILE, DEFAULT_PROJECT_DIR, ProjectContext};
use crate::error::{Result, ScribeError};
use crate::events::{Event, EventAction, append_event};
use crate::fs::atomic_write_file;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

const STARTER_CONFIG: &str = r#"# Scribe prompt composition project.
#
# settings:  global behavior (output location, default template, flags)
# variables: values shared by every agent; agents may override them
# agents:    one entry per composed document

settings:
  output_dir: composed_prompts
  templates_dir: templates
  template: default.md

variables:
  project: My Project

agents:
  # Step-sequence composition: an ordered list of fragments.
  assistant:
    assembly:
      - include: personas/assistant.md
      - h2: Guidelines
      - include: includes/guidelines.md
      - content: "You are working on {{ project }}."

  # Template composition: renders templates/default.md.
  briefing: {}
"#;

const STARTER_TEMPLATE: &str = r#"# {{ project }} — {{ _agent_name }}

{{ read_file("personas/assistant.md") }}

## Guidelines

{{ read_file("includes/guidelines.md") }}
"#;

const STARTER_GUIDELINES: &str = r#"- Be concise.
- Prefer concrete examples.
- Ask before assuming.
"#;

const STARTER_PERSONA: &str = r#"# Assistant

You are a careful, helpful assistant.
"#;

pub fn cmd_init(args: InitArgs) -> Result<()> {
    // The default path is used as the project directory itself; a custom
    // path gets a `.scribe/` subdirectory so projects stay discoverable.
    let project_dir = if args.path == Path::new(DEFAULT_PROJECT_DIR) {
        args.path.clone()
    } else {
        args.path.join(DEFAULT_PROJECT_DIR)
    };

    for dir in ["templates", "includes", "personas"] {
        let path = project_dir.join(dir);
        fs::create_dir_all(&path).map_err(|e| {
            ScribeError::UserError(format!(
                "failed to create directory '{}': {}",
                path.display(),
                e
            ))
        })?;
    }

    let files: [(PathBuf, &str); 4] = [
        (project_dir.join(DEFAULT_CONFIG_FILE), STARTER_CONFIG),
        (project_dir.join("templates/default.md"), STARTER_TEMPLATE),
        (
            project_dir.join("includes/guidelines.md"),
            STARTER_GUIDELINES,
        ),
        (project_dir.join("personas/assistant.md"), STARTER_PERSONA),
    ];

    let mut written = 0usize;
    for (path, content) in &files {
        if path.exists() && !args.force {
            println!("skipping existing file: {}", path.display());
            continue;
        }
        atomic_write_file(path, content)?;
        written += 1;
    }

    // Best-effort audit entry; the project is usable either way.
    if let Ok(ctx) = ProjectContext::resolve(project_dir.join(DEFAULT_CONFIG_FILE)) {
        let event = Event::new(EventAction::Init).with_details(json!({
            "project_dir": project_dir.display().to_string(),
            "files_written": written,
            "force": args.force,
        }));
        if let Err(e) = append_event(&ctx, &event) {
            eprintln!("warning: failed to log init event: {}", e);
        }
    }

    println!("initialized scribe project at '{}'", project_dir.display());
    println!(
        "next steps: edit '{}' and run 'scribe compose'",
        project_dir.join(DEFAULT_CONFIG_FILE).display()
    );
    Ok(())
}
