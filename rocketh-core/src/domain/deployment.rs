//! Deployment domain types
//!
//! A deployment goes through two states:
//! - pending: the creation transaction was submitted but is not yet mined
//! - deployed: the transaction was mined and the contract address is known
//!
//! Both states are persisted through the same [`DeploymentRecord`] shape so a
//! crash between submission and confirmation leaves a readable trace on disk.

use serde::{Deserialize, Serialize};

/// Transaction that created (or is creating) a deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    pub hash: String,
    pub origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// Receipt data kept once a deployment transaction is mined
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptInfo {
    pub block_number: u64,
    pub block_hash: String,
    pub gas_used: u64,
}

/// Everything known about a deployment before its address is confirmed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialDeployment {
    pub abi: serde_json::Value,
    pub bytecode: String,
    /// Encoded constructor arguments appended to the bytecode
    #[serde(default)]
    pub args_data: String,
}

/// Deployment whose transaction was broadcast but not yet confirmed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDeployment {
    pub partial_deployment: PartialDeployment,
    pub transaction: TransactionInfo,
}

impl PendingDeployment {
    /// Promotes the pending deployment once its transaction is mined
    pub fn promote(self, address: String, receipt: ReceiptInfo) -> Deployment {
        Deployment {
            address,
            abi: self.partial_deployment.abi,
            bytecode: self.partial_deployment.bytecode,
            args_data: self.partial_deployment.args_data,
            transaction: self.transaction,
            receipt,
        }
    }
}

/// Finalized deployment
///
/// Immutable once written; keyed by its logical name within a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub address: String,
    pub abi: serde_json::Value,
    pub bytecode: String,
    #[serde(default)]
    pub args_data: String,
    pub transaction: TransactionInfo,
    pub receipt: ReceiptInfo,
}

/// On-disk shape of a deployment, pending or final
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub address: Option<String>,
    pub abi: serde_json::Value,
    pub bytecode: String,
    #[serde(default)]
    pub args_data: String,
    pub transaction: TransactionInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<ReceiptInfo>,
    #[serde(default)]
    pub pending: bool,
}

impl DeploymentRecord {
    /// Returns the finalized deployment, or `None` if the record is still pending
    pub fn deployment(&self) -> Option<Deployment> {
        if self.pending {
            return None;
        }
        Some(Deployment {
            address: self.address.clone()?,
            abi: self.abi.clone(),
            bytecode: self.bytecode.clone(),
            args_data: self.args_data.clone(),
            transaction: self.transaction.clone(),
            receipt: self.receipt.clone()?,
        })
    }

    /// Returns the pending deployment, or `None` if the record is final
    pub fn pending_deployment(&self) -> Option<PendingDeployment> {
        if !self.pending {
            return None;
        }
        Some(PendingDeployment {
            partial_deployment: PartialDeployment {
                abi: self.abi.clone(),
                bytecode: self.bytecode.clone(),
                args_data: self.args_data.clone(),
            },
            transaction: self.transaction.clone(),
        })
    }
}

impl From<Deployment> for DeploymentRecord {
    fn from(deployment: Deployment) -> Self {
        Self {
            address: Some(deployment.address),
            abi: deployment.abi,
            bytecode: deployment.bytecode,
            args_data: deployment.args_data,
            transaction: deployment.transaction,
            receipt: Some(deployment.receipt),
            pending: false,
        }
    }
}

impl From<PendingDeployment> for DeploymentRecord {
    fn from(pending: PendingDeployment) -> Self {
        Self {
            address: None,
            abi: pending.partial_deployment.abi,
            bytecode: pending.partial_deployment.bytecode,
            args_data: pending.partial_deployment.args_data,
            transaction: pending.transaction,
            receipt: None,
            pending: true,
        }
    }
}
