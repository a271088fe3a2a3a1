//! Error types for the JSON-RPC client

use thiserror::Error;

/// Result type alias for RPC operations
pub type Result<T> = std::result::Result<T, RpcError>;

/// Errors that can occur while talking to a node
#[derive(Debug, Error)]
pub enum RpcError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Node answered with a non-success HTTP status
    #[error("HTTP error (status {status}): {message}")]
    HttpError {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Node answered with a JSON-RPC error object
    #[error("RPC error {code} in {method}: {message}")]
    Rpc {
        method: String,
        code: i64,
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RpcError {
    /// Create an HTTP error from status code and body
    pub fn http_error(status: u16, message: impl Into<String>) -> Self {
        Self::HttpError {
            status,
            message: message.into(),
        }
    }

    /// Check if the node rejected the call itself (as opposed to a transport failure)
    pub fn is_rpc_error(&self) -> bool {
        matches!(self, Self::Rpc { .. })
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::HttpError { status, .. } if *status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_predicates() {
        let rpc = RpcError::Rpc {
            method: "eth_call".to_string(),
            code: -32000,
            message: "execution reverted".to_string(),
        };
        assert!(rpc.is_rpc_error());
        assert!(!rpc.is_server_error());

        assert!(RpcError::http_error(502, "bad gateway").is_server_error());
        assert!(!RpcError::http_error(404, "not found").is_server_error());
        assert!(!RpcError::ParseError("eof".to_string()).is_rpc_error());
    }

    #[test]
    fn test_rpc_error_display() {
        let err = RpcError::Rpc {
            method: "eth_chainId".to_string(),
            code: -32601,
            message: "method not found".to_string(),
        };
        assert_eq!(err.to_string(), "RPC error -32601 in eth_chainId: method not found");
    }
}
