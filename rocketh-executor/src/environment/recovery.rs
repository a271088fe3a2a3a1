//! Pending transaction recovery
//!
//! A run interrupted between submitting a deployment and confirming it
//! leaves a pending record behind. Before any script runs, every pending
//! record is checked against the node:
//! - mined with a contract address: promoted to a deployment
//! - reverted or dropped: removed, reported as failed
//! - still unknown after the recovery timeout: left pending

use tracing::{info, warn};

use super::{Environment, TransactionOutcome, finalize};
use crate::error::{ExecutorError, FailureReason, Result};

/// What recovery did with each pending record
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    pub promoted: Vec<String>,
    pub failed: Vec<(String, FailureReason)>,
    /// Still pending; `env.get` does not return these
    pub pending: Vec<String>,
}

impl RecoveryReport {
    pub fn is_empty(&self) -> bool {
        self.promoted.is_empty() && self.failed.is_empty() && self.pending.is_empty()
    }
}

impl Environment {
    /// Resolves pending deployments left by previous runs
    ///
    /// # Errors
    /// Returns [`ExecutorError::Recovery`] when the node cannot be queried;
    /// the run must not proceed without knowing the state of its
    /// deployments.
    pub async fn recover_transactions_if_any(&self) -> Result<RecoveryReport> {
        let pending = self.store()?.pending();
        let mut report = RecoveryReport::default();
        if pending.is_empty() {
            return Ok(report);
        }

        info!("checking {} pending deployments", pending.len());
        for (name, deployment) in pending {
            let tx_hash = deployment.transaction.hash.clone();
            let outcome = self
                .wait_for_transaction(&tx_hash, self.recovery_timeout())
                .await
                .map_err(|source| ExecutorError::Recovery {
                    name: name.clone(),
                    tx_hash: tx_hash.clone(),
                    source,
                })?;

            let result = match outcome {
                TransactionOutcome::Mined(receipt) => finalize(deployment, &receipt),
                TransactionOutcome::Failed(reason) => Err(reason),
                TransactionOutcome::Pending => {
                    warn!("'{}' is still pending ({})", name, tx_hash);
                    report.pending.push(name);
                    continue;
                }
            };

            match result {
                Ok(deployment) => {
                    info!("recovered '{}' at {}", name, deployment.address);
                    self.store()?.save(&name, deployment)?;
                    report.promoted.push(name);
                }
                Err(reason) => {
                    warn!("dropping pending '{}' ({}): {}", name, tx_hash, reason);
                    self.store()?.remove(&name)?;
                    report.failed.push((name, reason));
                }
            }
        }

        Ok(report)
    }
}
