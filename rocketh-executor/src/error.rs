//! Executor errors
//!
//! Every failure of a deploy run surfaces as an [`ExecutorError`]. Errors
//! raised inside Lua callbacks are wrapped with `mlua::Error::external` and
//! come back out through [`ExecutorError::ScriptExecution`].

use rocketh_rpc::RpcError;
use std::path::PathBuf;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a deployment transaction did not produce a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Mined, but the receipt reports a revert
    Reverted,
    /// The node no longer knows the transaction
    Dropped,
    /// Mined, but the receipt carries no contract address
    NoContractAddress,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            Self::Reverted => "transaction reverted",
            Self::Dropped => "transaction dropped by the node",
            Self::NoContractAddress => "receipt has no contract address",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("could not import {}: {source}", .path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error(
        "context between 2 scripts is different, please share the same across them ({})",
        .path.display()
    )]
    ConfigurationConflict { path: PathBuf },

    #[error("tag '{tag}' of {} cannot contain commas", .path.display())]
    InvalidTag { path: PathBuf, tag: String },

    #[error("no context loaded")]
    NoContext,

    #[error("cyclic dependency detected at {}", .path.display())]
    CyclicDependency { path: PathBuf },

    #[error("skip check of {} failed: {source}", .path.display())]
    SkipPredicate {
        path: PathBuf,
        #[source]
        source: mlua::Error,
    },

    #[error("{} failed: {source}", .path.display())]
    ScriptExecution {
        path: PathBuf,
        #[source]
        source: mlua::Error,
    },

    #[error(
        "{} returned true to not be executed again, but does not provide an id",
        .path.display()
    )]
    MissingMigrationId { path: PathBuf },

    #[error("could not check pending transaction {tx_hash} of '{name}': {source}")]
    Recovery {
        name: String,
        tx_hash: String,
        #[source]
        source: RpcError,
    },

    #[error("deployment '{name}' ({tx_hash}) failed: {reason}")]
    TransactionFailed {
        name: String,
        tx_hash: String,
        reason: FailureReason,
    },

    #[error(
        "deployments of network '{network}' belong to chain {expected}, but the node reports chain {actual}"
    )]
    ChainMismatch {
        network: String,
        expected: String,
        actual: String,
    },

    #[error("deployment store error at {}: {source}", .path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", .path.display())]
    Record {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("failed to create sandbox: {0}")]
    Sandbox(#[source] mlua::Error),

    #[error("{0}")]
    Environment(String),
}

pub type Result<T> = std::result::Result<T, ExecutorError>;

impl ExecutorError {
    pub(crate) fn environment(message: impl Into<String>) -> Self {
        Self::Environment(message.into())
    }

    /// Path of the script the error is attributed to, if any
    pub fn script_path(&self) -> Option<&PathBuf> {
        match self {
            Self::Load { path, .. }
            | Self::ConfigurationConflict { path }
            | Self::InvalidTag { path, .. }
            | Self::CyclicDependency { path }
            | Self::SkipPredicate { path, .. }
            | Self::ScriptExecution { path, .. }
            | Self::MissingMigrationId { path } => Some(path),
            _ => None,
        }
    }
}

/// Converts an executor error into a Lua error raised from a callback
pub(crate) fn into_lua(error: ExecutorError) -> mlua::Error {
    mlua::Error::external(error)
}
