//! JSON-RPC wire types
//!
//! Only the fields the deployer reads are modelled; nodes return more.

use rocketh_core::domain::deployment::ReceiptInfo;
use rocketh_core::hex::parse_quantity;
use serde::{Deserialize, Serialize};

/// Result of `eth_getTransactionReceipt`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub block_number: String,
    pub block_hash: String,
    #[serde(default)]
    pub contract_address: Option<String>,
    /// `0x1` on success, `0x0` on revert; absent on pre-byzantium chains
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub gas_used: Option<String>,
}

impl TransactionReceipt {
    /// True unless the receipt explicitly reports a revert
    pub fn is_success(&self) -> bool {
        match self.status.as_deref() {
            Some(status) => parse_quantity(status) != Some(0),
            None => true,
        }
    }

    /// Receipt data kept on a finalized deployment
    pub fn info(&self) -> ReceiptInfo {
        ReceiptInfo {
            block_number: parse_quantity(&self.block_number).unwrap_or_default(),
            block_hash: self.block_hash.clone(),
            gas_used: self
                .gas_used
                .as_deref()
                .and_then(parse_quantity)
                .unwrap_or_default(),
        }
    }
}

/// Result of `eth_getTransactionByHash`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: String,
    pub from: String,
    #[serde(default)]
    pub nonce: Option<String>,
    #[serde(default)]
    pub block_number: Option<String>,
}

/// Parameters of `eth_sendTransaction`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub from: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}
