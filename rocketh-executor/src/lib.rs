//! Rocketh Executor
//!
//! Orchestrates deploy scripts against an EVM network:
//! - Script discovery and loading ([`ScriptRegistry`])
//! - Tag indexing and dependency resolution ([`TagIndex`], [`DependencyResolver`])
//! - The execution environment scripts act on ([`Environment`]), backed by a
//!   per-network deployment store ([`DeploymentStore`])
//! - Recovery of deployments left pending by an interrupted run
//! - Sequential script execution ([`ScriptRunner`])
//!
//! Most callers only need [`DeployPlan`] or [`execute_deploy_scripts`].

pub mod config;
pub mod deploy;
pub mod environment;
pub mod error;
pub mod lua;
pub mod observer;
pub mod registry;
pub mod resolver;
pub mod runner;
pub mod store;
pub mod tags;

#[cfg(test)]
mod testing;

pub use config::{Config, ConfigOptions};
pub use deploy::{DeployPlan, RunSummary, execute_deploy_scripts};
pub use environment::{Environment, RecoveryReport};
pub use error::{ExecutorError, FailureReason, Result};
pub use observer::{RunObserver, SkipReason, TracingObserver};
pub use registry::ScriptRegistry;
pub use resolver::{DependencyResolver, RunSet};
pub use runner::{RunOutcome, ScriptRunner};
pub use store::DeploymentStore;
pub use tags::TagIndex;
