//! Provider abstraction
//!
//! The executor never talks HTTP directly; it only sees [`Provider`]. The
//! typed `eth_*` helpers are default methods so any transport (or a test
//! double) only has to implement [`Provider::request`].

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::error::{Result, RpcError};
use crate::types::{Transaction, TransactionReceipt, TransactionRequest};

/// Raw JSON-RPC access to a node
#[async_trait]
pub trait Provider: Send + Sync {
    /// Performs a JSON-RPC call and returns the `result` member
    ///
    /// # Errors
    /// Returns `RpcError::Rpc` when the node answers with an error object,
    /// or a transport error when the node cannot be reached.
    async fn request(&self, method: &str, params: Value) -> Result<Value>;

    /// Chain id as returned by the node (hex quantity)
    async fn chain_id(&self) -> Result<String> {
        let value = self.request("eth_chainId", json!([])).await?;
        decode("eth_chainId", value)
    }

    /// Accounts managed by the node
    async fn accounts(&self) -> Result<Vec<String>> {
        let value = self.request("eth_accounts", json!([])).await?;
        decode("eth_accounts", value)
    }

    /// Receipt of a mined transaction, `None` while it is not mined
    async fn get_transaction_receipt(&self, hash: &str) -> Result<Option<TransactionReceipt>> {
        let value = self
            .request("eth_getTransactionReceipt", json!([hash]))
            .await?;
        decode("eth_getTransactionReceipt", value)
    }

    /// Transaction as known by the node, `None` if the node never saw it or dropped it
    async fn get_transaction_by_hash(&self, hash: &str) -> Result<Option<Transaction>> {
        let value = self
            .request("eth_getTransactionByHash", json!([hash]))
            .await?;
        decode("eth_getTransactionByHash", value)
    }

    /// Submits a transaction signed by the node, returning its hash
    async fn send_transaction(&self, tx: &TransactionRequest) -> Result<String> {
        let value = self.request("eth_sendTransaction", json!([tx])).await?;
        decode("eth_sendTransaction", value)
    }
}

fn decode<T: DeserializeOwned>(method: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| RpcError::ParseError(format!("Unexpected result for {}: {}", method, e)))
}
