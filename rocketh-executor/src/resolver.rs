//! Dependency resolution
//!
//! Turns the initial selection into the ordered set of scripts to run.
//! A script is registered only after everything its dependency tags point
//! to; scripts flagged `run_at_the_end` go to a second queue that runs after
//! all others.

use rocketh_core::domain::script::ScriptMetadata;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::error::{ExecutorError, Result};
use crate::tags::TagIndex;

/// Ordered scripts of a run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunSet {
    pub primary: Vec<PathBuf>,
    pub deferred: Vec<PathBuf>,
}

impl RunSet {
    /// Execution order: primary scripts, then deferred ones
    pub fn order(&self) -> impl Iterator<Item = &PathBuf> {
        self.primary.iter().chain(self.deferred.iter())
    }

    pub fn len(&self) -> usize {
        self.primary.len() + self.deferred.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.deferred.is_empty()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.order().any(|p| p == path)
    }
}

/// Picks the scripts a run starts from
///
/// With no tag filter every script is selected; otherwise the scripts
/// carrying at least one of the tags. Discovery order is kept.
pub fn initial_selection<'a>(scripts: &[&'a ScriptMetadata], tags: &[String]) -> Vec<&'a Path> {
    scripts
        .iter()
        .filter(|s| tags.is_empty() || tags.iter().any(|t| s.has_tag(t)))
        .map(|s| s.path.as_path())
        .collect()
}

pub struct DependencyResolver<'a> {
    scripts: HashMap<&'a Path, &'a ScriptMetadata>,
    index: &'a TagIndex,
}

#[derive(Default)]
struct Visit<'a> {
    registered: HashSet<&'a Path>,
    in_progress: HashSet<&'a Path>,
    run_set: RunSet,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(scripts: &[&'a ScriptMetadata], index: &'a TagIndex) -> Self {
        Self {
            scripts: scripts.iter().map(|s| (s.path.as_path(), *s)).collect(),
            index,
        }
    }

    /// Resolves the selection into a [`RunSet`]
    ///
    /// Each script appears at most once. A dependency tag nobody carries
    /// contributes nothing.
    ///
    /// # Errors
    /// Returns [`ExecutorError::CyclicDependency`] when a script depends,
    /// directly or not, on itself.
    pub fn resolve(&self, selection: &[&'a Path]) -> Result<RunSet> {
        let mut visit = Visit::default();
        for &path in selection {
            self.visit(path, &mut visit)?;
        }
        Ok(visit.run_set)
    }

    fn visit(&self, path: &'a Path, visit: &mut Visit<'a>) -> Result<()> {
        if visit.registered.contains(path) {
            return Ok(());
        }
        let Some(script) = self.scripts.get(path).copied() else {
            return Ok(());
        };
        if !visit.in_progress.insert(path) {
            return Err(ExecutorError::CyclicDependency {
                path: path.to_path_buf(),
            });
        }

        for tag in &script.dependencies {
            for dependency in self.index.paths(tag) {
                self.visit(dependency, visit)?;
            }
        }

        visit.in_progress.remove(path);
        visit.registered.insert(path);
        if script.run_at_the_end {
            visit.run_set.deferred.push(path.to_path_buf());
        } else {
            visit.run_set.primary.push(path.to_path_buf());
        }
        Ok(())
    }
}
