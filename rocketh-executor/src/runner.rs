//! Script runner
//!
//! Runs resolved scripts one at a time, each body awaited to completion
//! before the next starts. The first failure stops the run.

use mlua::{Lua, Table, Value};
use rocketh_lua::ScriptDefinition;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::environment::Environment;
use crate::error::{ExecutorError, Result};
use crate::lua::{create_env_table, to_lua};
use crate::observer::{RunObserver, SkipReason};

/// Scripts a runner went through
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub executed: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

pub struct ScriptRunner {
    environment: Arc<Environment>,
    env_table: Table,
    args: Value,
    observer: Arc<dyn RunObserver>,
}

impl ScriptRunner {
    /// Creates a runner for scripts evaluated in `lua`
    ///
    /// Every script receives the same `env` table and `args` value.
    pub fn new(
        lua: &Lua,
        environment: Arc<Environment>,
        args: Option<&serde_json::Value>,
        observer: Arc<dyn RunObserver>,
    ) -> Result<Self> {
        let env_table = create_env_table(lua, environment.clone()).map_err(ExecutorError::Sandbox)?;
        let args = match args {
            Some(args) => to_lua(lua, args).map_err(ExecutorError::Sandbox)?,
            None => Value::Nil,
        };
        Ok(Self {
            environment,
            env_table,
            args,
            observer,
        })
    }

    /// Runs the scripts in order
    pub async fn run<'a, I>(&self, scripts: I) -> Result<RunOutcome>
    where
        I: IntoIterator<Item = &'a ScriptDefinition>,
    {
        let mut outcome = RunOutcome::default();
        for script in scripts {
            let path = script.metadata.path.clone();
            match self.run_script(script).await {
                Ok(true) => outcome.executed.push(path),
                Ok(false) => outcome.skipped.push(path),
                Err(e) => {
                    self.observer.script_failed(&script.metadata, &e);
                    return Err(e);
                }
            }
        }
        Ok(outcome)
    }

    /// Runs one script, returning false when it was skipped
    async fn run_script(&self, script: &ScriptDefinition) -> Result<bool> {
        let metadata = &script.metadata;
        self.observer.script_started(metadata);

        if let Some(id) = &metadata.id {
            if self.environment.has_migration(id)? {
                self.observer
                    .script_skipped(metadata, &SkipReason::Migrated(id.clone()));
                return Ok(false);
            }
        }

        if let Some(skip) = &script.skip {
            let skip: bool = skip
                .call_async((self.env_table.clone(), self.args.clone()))
                .await
                .map_err(|source| ExecutorError::SkipPredicate {
                    path: metadata.path.clone(),
                    source,
                })?;
            if skip {
                self.observer.script_skipped(metadata, &SkipReason::Predicate);
                return Ok(false);
            }
        }

        let result: Value = script
            .func
            .call_async((self.env_table.clone(), self.args.clone()))
            .await
            .map_err(|source| ExecutorError::ScriptExecution {
                path: metadata.path.clone(),
                source,
            })?;

        if let Value::Boolean(true) = result {
            let id = metadata
                .id
                .as_deref()
                .ok_or_else(|| ExecutorError::MissingMigrationId {
                    path: metadata.path.clone(),
                })?;
            self.environment.record_migration(id)?;
            debug!("recorded migration '{}'", id);
        }

        self.observer.script_succeeded(metadata);
        Ok(true)
    }
}
