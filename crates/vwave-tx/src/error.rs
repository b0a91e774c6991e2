//! Transaction error types.

use crate::classify::TxFailure;
use thiserror::Error;
use vwave_rpc::RpcError;

#[derive(Debug, Error)]
pub enum TxError {
    /// Order parameters the order book would reject.
    #[error("Invalid order: {0}")]
    InvalidOrder(String),

    /// A submission for the same action is still awaiting the wallet.
    #[error("Transaction already in progress: {0}")]
    InFlight(String),

    /// Gas estimation or submission failed; carries the user-facing message.
    #[error("{}", .0.user_message)]
    Failed(TxFailure),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

impl TxError {
    pub fn failure(&self) -> Option<&TxFailure> {
        match self {
            TxError::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

pub type TxResult<T> = Result<T, TxError>;
