//! Deploy runs
//!
//! A run goes through two phases:
//! 1. [`DeployPlan::prepare`] loads the scripts, indexes their tags and
//!    resolves the run order. It never touches the network, so load and
//!    resolution errors surface before anything is sent.
//! 2. [`DeployPlan::execute`] connects the environment, recovers pending
//!    transactions and runs the scripts.

use rocketh_core::domain::deployment::Deployment;
use rocketh_core::domain::script::ScriptMetadata;
use rocketh_lua::{LogModule, ModuleRegistry, ScriptDefinition};
use rocketh_rpc::Provider;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::environment::{Environment, RecoveryReport};
use crate::error::Result;
use crate::lua::{TracingLogSink, provided_context};
use crate::observer::RunObserver;
use crate::registry::ScriptRegistry;
use crate::resolver::{DependencyResolver, RunSet, initial_selection};
use crate::runner::ScriptRunner;
use crate::tags::TagIndex;

/// Result of a completed run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub recovery: RecoveryReport,
    pub executed: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
    /// Finalized deployments of the network after the run
    pub deployments: BTreeMap<String, Deployment>,
}

/// Loaded scripts and their resolved run order
#[derive(Debug)]
pub struct DeployPlan {
    registry: ScriptRegistry,
    index: TagIndex,
    run_set: RunSet,
}

impl DeployPlan {
    /// Prepares a run with the default modules (`log` routed to `tracing`)
    pub fn prepare(config: &Config) -> Result<Self> {
        let mut modules = ModuleRegistry::new();
        modules.register(LogModule::new(TracingLogSink));
        Self::prepare_with_modules(config, &modules)
    }

    /// Prepares a run, registering `modules` in the sandbox
    ///
    /// # Errors
    /// Load errors, [`ConfigurationConflict`], [`InvalidTag`], [`NoContext`]
    /// and [`CyclicDependency`], in that order.
    ///
    /// [`ConfigurationConflict`]: crate::ExecutorError::ConfigurationConflict
    /// [`InvalidTag`]: crate::ExecutorError::InvalidTag
    /// [`NoContext`]: crate::ExecutorError::NoContext
    /// [`CyclicDependency`]: crate::ExecutorError::CyclicDependency
    pub fn prepare_with_modules(config: &Config, modules: &ModuleRegistry) -> Result<Self> {
        let mut registry = ScriptRegistry::new(&config.scripts, modules)?;
        registry.load_all()?;

        let scripts: Vec<&ScriptMetadata> = registry.scripts().map(|s| &s.metadata).collect();
        let index = TagIndex::build(scripts.iter().copied())?;
        registry.provided_context()?;

        let selection = initial_selection(&scripts, &config.tags);
        let run_set = DependencyResolver::new(&scripts, &index).resolve(&selection)?;
        info!(
            "{} of {} scripts to run from {}",
            run_set.len(),
            scripts.len(),
            registry.root().display()
        );

        Ok(Self {
            registry,
            index,
            run_set,
        })
    }

    pub fn run_set(&self) -> &RunSet {
        &self.run_set
    }

    pub fn index(&self) -> &TagIndex {
        &self.index
    }

    /// Scripts to run, in order
    pub fn scripts(&self) -> impl Iterator<Item = &ScriptMetadata> {
        self.definitions().map(|s| &s.metadata)
    }

    /// Every loaded script, in discovery order
    pub fn all_scripts(&self) -> impl Iterator<Item = &ScriptMetadata> {
        self.registry.scripts().map(|s| &s.metadata)
    }

    pub fn script(&self, path: &Path) -> Option<&ScriptMetadata> {
        self.registry.get(path).map(|s| &s.metadata)
    }

    fn definitions(&self) -> impl Iterator<Item = &ScriptDefinition> {
        self.run_set.order().filter_map(|p| self.registry.get(p))
    }

    /// Runs the plan against the network behind `provider`
    ///
    /// Pending transactions of previous runs are resolved before the first
    /// script starts.
    pub async fn execute(
        &self,
        config: &Config,
        provider: Arc<dyn Provider>,
        args: Option<&serde_json::Value>,
        observer: Arc<dyn RunObserver>,
    ) -> Result<RunSummary> {
        let lua = self.registry.lua();
        let context = provided_context(lua, &self.registry.provided_context()?)?;
        let environment = Arc::new(Environment::create(config, provider, context).await?);

        let recovery = environment.recover_transactions_if_any().await?;
        if !recovery.pending.is_empty() {
            warn!(
                "{} deployments are still pending: {}",
                recovery.pending.len(),
                recovery.pending.join(", ")
            );
        }

        let runner = ScriptRunner::new(lua, environment.clone(), args, observer)?;
        let outcome = runner.run(self.definitions()).await?;

        Ok(RunSummary {
            recovery,
            executed: outcome.executed,
            skipped: outcome.skipped,
            deployments: environment.deployments()?,
        })
    }
}

/// Prepares and executes a run
pub async fn execute_deploy_scripts(
    config: &Config,
    provider: Arc<dyn Provider>,
    args: Option<&serde_json::Value>,
    observer: Arc<dyn RunObserver>,
) -> Result<RunSummary> {
    DeployPlan::prepare(config)?
        .execute(config, provider, args, observer)
        .await
}
