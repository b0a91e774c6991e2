//! Transaction sender trait.
//!
//! Signing is delegated to the wallet endpoint behind
//! `eth_sendTransaction`; this crate never holds keys.

use crate::gas::GasPrice;
use alloy::primitives::{Address, Bytes, B256, U256};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use vwave_rpc::{to_quantity, BoxFuture, DynTransport, RpcError, RpcResult};

/// A fully priced transaction ready for the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTx {
    pub from: Address,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub gas_limit: U256,
    pub gas_price: GasPrice,
}

impl PreparedTx {
    pub fn to_json(&self) -> Value {
        let mut tx = Map::new();
        tx.insert("from".to_string(), Value::String(self.from.to_string()));
        tx.insert("to".to_string(), Value::String(self.to.to_string()));
        tx.insert("data".to_string(), Value::String(self.data.to_string()));
        tx.insert("value".to_string(), Value::String(to_quantity(self.value)));
        tx.insert("gas".to_string(), Value::String(to_quantity(self.gas_limit)));
        self.gas_price.write_json(&mut tx);
        Value::Object(tx)
    }
}

/// Trait for handing transactions to a wallet.
pub trait TxSender: Send + Sync {
    /// Submit and return the transaction hash.
    fn send(&self, tx: PreparedTx) -> BoxFuture<'_, RpcResult<B256>>;
}

/// Arc wrapper for TxSender trait objects.
pub type DynTxSender = Arc<dyn TxSender>;

/// Sends through `eth_sendTransaction` on a wallet-backed transport.
pub struct RpcTxSender {
    transport: DynTransport,
}

impl RpcTxSender {
    pub fn new(transport: DynTransport) -> Self {
        Self { transport }
    }
}

impl TxSender for RpcTxSender {
    fn send(&self, tx: PreparedTx) -> BoxFuture<'_, RpcResult<B256>> {
        Box::pin(async move {
            let result = self
                .transport
                .request("eth_sendTransaction", json!([tx.to_json()]))
                .await?;
            let hash = result
                .as_str()
                .ok_or_else(|| RpcError::InvalidResponse(format!("expected tx hash, got {result}")))?;
            hash.parse::<B256>()
                .map_err(|e| RpcError::InvalidResponse(format!("bad tx hash {hash}: {e}")))
        })
    }
}

/// Mock sender for testing.
#[derive(Debug)]
pub struct MockTxSender {
    sends: Mutex<Vec<PreparedTx>>,
    next_result: Mutex<Option<RpcError>>,
    hash: B256,
}

impl Default for MockTxSender {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTxSender {
    pub fn new() -> Self {
        Self {
            sends: Mutex::new(Vec::new()),
            next_result: Mutex::new(None),
            hash: B256::repeat_byte(0xab),
        }
    }

    /// Fail the next send with `error`.
    pub fn fail_next(&self, error: RpcError) {
        *self.next_result.lock() = Some(error);
    }

    pub fn hash(&self) -> B256 {
        self.hash
    }

    /// Get recorded sends.
    pub fn get_sends(&self) -> Vec<PreparedTx> {
        self.sends.lock().clone()
    }
}

impl TxSender for MockTxSender {
    fn send(&self, tx: PreparedTx) -> BoxFuture<'_, RpcResult<B256>> {
        Box::pin(async move {
            self.sends.lock().push(tx);
            match self.next_result.lock().take() {
                Some(error) => Err(error),
                None => Ok(self.hash),
            }
        })
    }
}
