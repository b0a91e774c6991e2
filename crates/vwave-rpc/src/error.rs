//! RPC error types.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// Error object returned by the node or wallet endpoint.
    #[error("RPC error {code}: {message}")]
    Rpc {
        code: i64,
        message: String,
        /// `error.data.message`, set by some providers for reverts.
        data_message: Option<String>,
    },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("ABI decode failed: {0}")]
    Decode(String),
}

impl RpcError {
    /// The most specific provider message: `data.message`, else `message`.
    pub fn provider_message(&self) -> String {
        match self {
            RpcError::Rpc {
                data_message: Some(data),
                ..
            } if !data.is_empty() => data.clone(),
            RpcError::Rpc { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type RpcResult<T> = Result<T, RpcError>;
