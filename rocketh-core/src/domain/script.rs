//! Deploy script domain types

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Scheduling metadata of a deploy script
///
/// This is the part of a script that can be reasoned about without running
/// it: where it lives, which tags it declares, which tags it depends on and
/// whether it must run after everything else. The executable parts (body,
/// skip predicate) live in the Lua layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptMetadata {
    /// Absolute path of the script file; identifies the script
    pub path: PathBuf,
    pub tags: Vec<String>,
    /// Tag names whose scripts must run first
    pub dependencies: Vec<String>,
    pub run_at_the_end: bool,
    /// Migration id, required for scripts that return `true`
    pub id: Option<String>,
    pub has_skip: bool,
}

impl ScriptMetadata {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tags: Vec::new(),
            dependencies: Vec::new(),
            run_at_the_end: false,
            id: None,
            has_skip: false,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn run_at_the_end(mut self, value: bool) -> Self {
        self.run_at_the_end = value;
        self
    }

    /// Returns true if the script declares the given tag
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// File name of the script, used in user-facing messages
    pub fn file_name(&self) -> String {
        file_name(&self.path)
    }
}

/// Returns the final component of a path as a displayable string
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
