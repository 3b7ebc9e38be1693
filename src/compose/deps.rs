//! Per-agent dependency tracking.
//!
//! Every file consulted while composing an agent (the config file, included
//! files, the template file) lands in that agent's dependency set. The
//! tracker accumulates sets across a session and exposes the two views the
//! watch driver needs: the union of all watched files, and the reverse
//! mapping from a file to the agents it affects.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// A single composition's dependency set, seeded with the config file.
pub fn new_set(config_path: &Path) -> BTreeSet<PathBuf> {
    let mut set = BTreeSet::new();
    set.insert(config_path.to_path_buf());
    set
}

/// Accumulated dependency sets for all composed agents.
#[derive(Debug, Default)]
pub struct DependencyTracker {
    by_agent: BTreeMap<String, BTreeSet<PathBuf>>,
}

impl DependencyTracker {
    /// Record an agent's dependency set, replacing any previous one.
    ///
    /// Partial sets from failed compositions are recorded too: the watcher
    /// must react to the files that were consulted before the failure.
    pub fn record(&mut self, agent: &str, deps: BTreeSet<PathBuf>) {
        self.by_agent.insert(agent.to_string(), deps);
    }

    /// The dependency set recorded for one agent.
    pub fn agent_dependencies(&self, agent: &str) -> Option<&BTreeSet<PathBuf>> {
        self.by_agent.get(agent)
    }

    /// Union of every tracked agent's dependencies.
    pub fn all_dependencies(&self) -> BTreeSet<PathBuf> {
        self.by_agent.values().flatten().cloned().collect()
    }

    /// Invert the tracked sets into `path -> [agents]`.
    ///
    /// Agent lists come out in deterministic (sorted) order.
    pub fn reverse_dependencies(&self) -> BTreeMap<PathBuf, Vec<String>> {
        let mut reverse: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();
        for (agent, paths) in &self.by_agent {
            for path in paths {
                reverse
                    .entry(path.clone())
                    .or_default()
                    .push(agent.clone());
            }
        }
        reverse
    }
}
