//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Core error: {0}")]
    Core(#[from] vwave_core::CoreError),

    #[error("RPC error: {0}")]
    Rpc(#[from] vwave_rpc::RpcError),

    #[error("Feed error: {0}")]
    Feed(#[from] vwave_feed::FeedError),

    #[error("Transaction error: {0}")]
    Tx(#[from] vwave_tx::TxError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] vwave_telemetry::TelemetryError),

    #[error("Preferences error: {0}")]
    Prefs(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;
