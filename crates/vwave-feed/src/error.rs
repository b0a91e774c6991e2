//! Feed error types.

use thiserror::Error;
use vwave_rpc::RpcError;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("GraphQL error: {0}")]
    GraphQl(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FeedResult<T> = Result<T, FeedError>;
