//! Rocketh JSON-RPC Client
//!
//! A small, type-safe HTTP client for talking to an Ethereum-compatible node.
//!
//! The executor consumes the network through the [`Provider`] trait only;
//! [`JsonRpcClient`] is the HTTP implementation used by the CLI.
//!
//! # Example
//!
//! ```no_run
//! use rocketh_rpc::{JsonRpcClient, Provider};
//!
//! #[tokio::main]
//! async fn main() -> rocketh_rpc::Result<()> {
//!     let client = JsonRpcClient::new("http://127.0.0.1:8545");
//!     let chain_id = client.chain_id().await?;
//!     println!("connected to chain {}", chain_id);
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod provider;
pub mod types;

// Re-export commonly used types
pub use error::{Result, RpcError};
pub use provider::Provider;
pub use types::{Transaction, TransactionReceipt, TransactionRequest};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// HTTP JSON-RPC client
#[derive(Debug)]
pub struct JsonRpcClient {
    /// Node URL (e.g., "http://127.0.0.1:8545")
    url: String,
    /// HTTP client instance
    client: Client,
    /// Monotonic request id
    next_id: AtomicU64,
}

/// JSON-RPC response envelope
#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ErrorObject>,
}

#[derive(Debug, Deserialize)]
struct ErrorObject {
    code: i64,
    message: String,
}

impl JsonRpcClient {
    /// Create a new client for the given node URL
    ///
    /// # Example
    /// ```
    /// use rocketh_rpc::JsonRpcClient;
    ///
    /// let client = JsonRpcClient::new("http://127.0.0.1:8545");
    /// ```
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(url: impl Into<String>, client: Client) -> Self {
        let url = url.into();
        Self {
            url: url.trim_end_matches('/').to_string(),
            client,
            next_id: AtomicU64::new(1),
        }
    }

    /// Get the node URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Handle an HTTP response and unwrap the JSON-RPC envelope
    async fn handle_response(&self, method: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RpcError::http_error(status.as_u16(), error_text));
        }

        let envelope: Response = response
            .json()
            .await
            .map_err(|e| RpcError::ParseError(format!("Failed to parse JSON response: {}", e)))?;

        if let Some(error) = envelope.error {
            return Err(RpcError::Rpc {
                method: method.to_string(),
                code: error.code,
                message: error.message,
            });
        }

        Ok(envelope.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl Provider for JsonRpcClient {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        if !params.is_array() && !params.is_null() {
            return Err(RpcError::InvalidRequest(format!(
                "params for {} must be an array",
                method
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": if params.is_null() { json!([]) } else { params },
        });

        debug!(method, id, "json-rpc request");
        let response = self.client.post(&self.url).json(&body).send().await?;

        self.handle_response(method, response).await
    }
}
