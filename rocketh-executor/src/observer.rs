//! Run lifecycle events
//!
//! The runner reports each script's progress to a [`RunObserver`]. The
//! default [`TracingObserver`] logs them; the CLI and tests plug in their
//! own.

use rocketh_core::domain::script::ScriptMetadata;
use tracing::{error, info};

use crate::error::ExecutorError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The migration id is already in the ledger
    Migrated(String),
    /// The skip predicate returned true
    Predicate,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Migrated(id) => write!(f, "migration '{}' already applied", id),
            Self::Predicate => f.write_str("skip condition met"),
        }
    }
}

pub trait RunObserver: Send + Sync {
    fn script_started(&self, _script: &ScriptMetadata) {}

    fn script_skipped(&self, _script: &ScriptMetadata, _reason: &SkipReason) {}

    fn script_succeeded(&self, _script: &ScriptMetadata) {}

    fn script_failed(&self, _script: &ScriptMetadata, _error: &ExecutorError) {}
}

/// Observer logging lifecycle events through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn script_started(&self, script: &ScriptMetadata) {
        info!("executing {}", script.file_name());
    }

    fn script_skipped(&self, script: &ScriptMetadata, reason: &SkipReason) {
        info!("skipping {}: {}", script.file_name(), reason);
    }

    fn script_succeeded(&self, script: &ScriptMetadata) {
        info!("{} completed", script.file_name());
    }

    fn script_failed(&self, script: &ScriptMetadata, err: &ExecutorError) {
        error!("{} failed: {}", script.file_name(), err);
    }
}
