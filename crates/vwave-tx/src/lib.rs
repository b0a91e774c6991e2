//! Transactions for the VWAVE client.
//!
//! Builds order book, reward router, vester and ERC-20 calls, prices them
//! and submits them through the wallet endpoint.
//!
//! # Key Components
//!
//! - [`TxRequest`]: encoded call plus its sent/success/failure messages
//! - [`Submitter`]: gas estimation, pricing, submission and pending receipts
//! - [`TxFailure`]: provider error classified into a user-facing message
//! - [`TxSender`]: wallet seam (`eth_sendTransaction` or a mock)

pub mod classify;
pub mod error;
pub mod gas;
pub mod orders;
pub mod request;
pub mod sender;
pub mod staking;
pub mod submit;

pub use classify::{extract_error, TxErrorKind, TxFailure};
pub use error::{TxError, TxResult};
pub use gas::{
    buffered_gas_limit, fetch_gas_price, fetch_min_execution_fee, min_execution_fee, select_gas_price,
    ExecutionFeeQuote, GasPrice,
};
pub use orders::{DecreaseOrderParams, IncreaseOrderParams, SwapOrderParams};
pub use request::{TxMessages, TxRequest};
pub use sender::{DynTxSender, MockTxSender, PreparedTx, RpcTxSender, TxSender};
pub use staking::{RewardOptions, StakeToken, VesterKind};
pub use submit::{fetch_receipt_status, PendingTxn, SubmitOutcome, Submitter, TxStatus};
