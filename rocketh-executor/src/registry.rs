//! Script registry
//!
//! Discovers script files under the scripts root, evaluates each one in the
//! run's sandbox and keeps the resulting definitions keyed by absolute path.

use mlua::{Lua, Table};
use rocketh_lua::{ModuleRegistry, ScriptDefinition, create_sandbox, parse_script_definition};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ExecutorError, Result};

/// Scripts loaded for one run
#[derive(Debug)]
pub struct ScriptRegistry {
    lua: Lua,
    root: PathBuf,
    scripts: HashMap<PathBuf, ScriptDefinition>,
    /// Discovery order
    order: Vec<PathBuf>,
}

impl ScriptRegistry {
    /// Creates an empty registry with a fresh sandbox rooted at `root`
    pub fn new(root: &Path, modules: &ModuleRegistry) -> Result<Self> {
        let root = absolute(root)?;
        let lua = create_sandbox(&root, modules).map_err(ExecutorError::Sandbox)?;
        Ok(Self {
            lua,
            root,
            scripts: HashMap::new(),
            order: Vec::new(),
        })
    }

    /// Lists the script files under `root`, recursively
    ///
    /// Files whose name starts with `_` are helpers meant for `import` and
    /// are not scripts. Paths are absolute and sorted lexicographically. A
    /// missing root yields no scripts.
    pub fn discover(root: &Path) -> Result<Vec<PathBuf>> {
        let root = absolute(root)?;
        let mut files = Vec::new();
        if root.is_dir() {
            collect_files(&root, &mut files)?;
        }
        files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
        Ok(files)
    }

    /// Evaluates a script file and registers its definition
    ///
    /// Loading a path again replaces the previous definition.
    pub fn load(&mut self, path: &Path) -> Result<&ScriptDefinition> {
        let path = absolute(path)?;
        let source = std::fs::read_to_string(&path).map_err(|e| ExecutorError::Load {
            path: path.clone(),
            source: e.into(),
        })?;

        let definition =
            parse_script_definition(&self.lua, &path, &source).map_err(|e| ExecutorError::Load {
                path: path.clone(),
                source: e.into(),
            })?;

        debug!(
            "loaded {} (tags: {:?}, dependencies: {:?})",
            path.display(),
            definition.metadata.tags,
            definition.metadata.dependencies
        );

        if self.scripts.insert(path.clone(), definition).is_none() {
            self.order.push(path.clone());
        }
        Ok(&self.scripts[&path])
    }

    /// Discovers and loads every script under the root
    ///
    /// # Errors
    /// Fails on the first script that cannot be loaded, or with
    /// [`ExecutorError::ConfigurationConflict`] on the first script whose
    /// context differs from the one of the first loaded script.
    pub fn load_all(&mut self) -> Result<()> {
        for path in Self::discover(&self.root)? {
            self.load(&path)?;
            let loaded = &self.scripts[&path];
            let conflict = self
                .scripts()
                .next()
                .is_some_and(|first| !first.shares_context_with(loaded));
            if conflict {
                return Err(ExecutorError::ConfigurationConflict { path });
            }
        }
        Ok(())
    }

    /// The context shared by the loaded scripts
    ///
    /// # Errors
    /// Returns [`ExecutorError::NoContext`] when no loaded script declares one.
    pub fn provided_context(&self) -> Result<Table> {
        self.scripts()
            .find_map(|s| s.provided_context.clone())
            .ok_or(ExecutorError::NoContext)
    }

    /// Loaded scripts, in discovery order
    pub fn scripts(&self) -> impl Iterator<Item = &ScriptDefinition> {
        self.order.iter().filter_map(|p| self.scripts.get(p))
    }

    pub fn get(&self, path: &Path) -> Option<&ScriptDefinition> {
        self.scripts.get(path)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The sandbox the scripts were evaluated in
    pub fn lua(&self) -> &Lua {
        &self.lua
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|source| ExecutorError::Store {
        path: path.to_path_buf(),
        source,
    })
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = std::fs::read_dir(dir).map_err(|source| ExecutorError::Store {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| ExecutorError::Store {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else if !entry.file_name().to_string_lossy().starts_with('_') {
            files.push(path);
        }
    }
    Ok(())
}
