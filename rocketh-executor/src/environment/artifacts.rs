//! Artifact lookup
//!
//! Artifacts come from the context: either a table of artifacts keyed by
//! name, or a directory holding `<Name>.json` files.

use rocketh_core::domain::artifact::Artifact;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{ExecutorError, Result};

#[derive(Debug, Clone)]
pub enum ArtifactSource {
    Inline(BTreeMap<String, Artifact>),
    Directory(PathBuf),
}

impl Default for ArtifactSource {
    fn default() -> Self {
        Self::Inline(BTreeMap::new())
    }
}

impl ArtifactSource {
    /// Looks up the artifact `name`
    ///
    /// Directory artifacts are read on every lookup.
    pub fn get(&self, name: &str) -> Result<Artifact> {
        match self {
            Self::Inline(artifacts) => artifacts
                .get(name)
                .cloned()
                .ok_or_else(|| ExecutorError::environment(format!("no artifact named '{}'", name))),
            Self::Directory(dir) => {
                if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
                    return Err(ExecutorError::environment(format!(
                        "invalid artifact name '{}'",
                        name
                    )));
                }
                let path = dir.join(format!("{}.json", name));
                let content = std::fs::read_to_string(&path).map_err(|e| {
                    ExecutorError::environment(format!(
                        "no artifact named '{}' ({}: {})",
                        name,
                        path.display(),
                        e
                    ))
                })?;
                serde_json::from_str(&content)
                    .map_err(|source| ExecutorError::Record { path, source })
            }
        }
    }
}
