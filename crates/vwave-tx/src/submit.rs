//! Transaction submission.
//!
//! `Submitter::submit` estimates gas, prices the transaction and hands it
//! to the wallet. Only one submission per action may be awaiting the wallet
//! at a time; a second one is rejected rather than queued. Failed writes are
//! never retried.

use crate::classify::TxFailure;
use crate::error::{TxError, TxResult};
use crate::gas::{estimate_gas_limit, fetch_gas_price};
use crate::request::TxRequest;
use crate::sender::{DynTxSender, PreparedTx};
use alloy::primitives::{Address, B256};
use chrono::{DateTime, Utc};
use dashmap::DashSet;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vwave_core::chain::tx_url;
use vwave_core::ChainConfig;
use vwave_rpc::{ContractReader, RpcError, RpcResult};
use vwave_telemetry::Metrics;

/// A sent transaction awaiting its receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTxn {
    pub hash: B256,
    /// Shown once the transaction is mined successfully.
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub hash: B256,
    pub sent_message: String,
    pub tx_url: String,
}

/// Receipt state of a pending transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    Pending,
    Succeeded,
    Reverted,
}

/// Clears an action's in-flight mark when dropped.
struct InFlightGuard<'a> {
    in_flight: &'a DashSet<&'static str>,
    action: &'static str,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(in_flight: &'a DashSet<&'static str>, action: &'static str) -> Option<Self> {
        if !in_flight.insert(action) {
            return None;
        }
        Metrics::tx_in_flight_inc(action);
        Some(Self { in_flight, action })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(self.action);
        Metrics::tx_in_flight_dec(self.action);
    }
}

pub struct Submitter {
    reader: ContractReader,
    sender: DynTxSender,
    chain: Arc<ChainConfig>,
    account: Address,
    in_flight: DashSet<&'static str>,
    pending: Mutex<Vec<PendingTxn>>,
}

impl Submitter {
    pub fn new(reader: ContractReader, sender: DynTxSender, chain: Arc<ChainConfig>, account: Address) -> Self {
        Self {
            reader,
            sender,
            chain,
            account,
            in_flight: DashSet::new(),
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn account(&self) -> Address {
        self.account
    }

    pub fn is_in_flight(&self, action: &str) -> bool {
        self.in_flight.contains(action)
    }

    async fn prepare(&self, request: &TxRequest) -> RpcResult<PreparedTx> {
        let gas_limit = match request.gas_limit {
            Some(limit) => limit,
            None => estimate_gas_limit(&self.reader, &request.call_request(self.account)).await?,
        };
        let gas_price = fetch_gas_price(&self.reader, &self.chain.gas).await?;
        Ok(PreparedTx {
            from: self.account,
            to: request.to,
            data: request.data.clone(),
            value: request.value,
            gas_limit,
            gas_price,
        })
    }

    async fn prepare_and_send(&self, request: &TxRequest) -> RpcResult<B256> {
        let tx = self.prepare(request).await?;
        debug!(action = request.action, to = %tx.to, gas_limit = %tx.gas_limit, "Sending transaction");
        self.sender.send(tx).await
    }

    /// Submit `request`; its in-flight mark is held until the wallet answers.
    pub async fn submit(&self, request: TxRequest) -> TxResult<SubmitOutcome> {
        let action = request.action;
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, action) else {
            Metrics::tx_failed(action, "in_flight");
            return Err(TxError::InFlight(action.to_string()));
        };

        match self.prepare_and_send(&request).await {
            Ok(hash) => {
                Metrics::tx_submitted(action);
                let hash_hex = hash.to_string();
                info!(action, hash = %hash_hex, "Transaction sent");
                self.pending.lock().push(PendingTxn {
                    hash,
                    message: request.messages.success().to_string(),
                    sent_at: Utc::now(),
                });
                Ok(SubmitOutcome {
                    hash,
                    sent_message: request.messages.sent().to_string(),
                    tx_url: tx_url(self.chain.chain_id, &hash_hex),
                })
            }
            Err(e) => {
                let failure = TxFailure::from_rpc(&e, request.messages.fail());
                Metrics::tx_failed(action, failure.reason());
                warn!(action, reason = failure.reason(), error = %e, "Transaction failed");
                Err(TxError::Failed(failure))
            }
        }
    }

    pub fn pending_txns(&self) -> Vec<PendingTxn> {
        self.pending.lock().clone()
    }

    /// Poll receipts; mined transactions are removed from the pending list
    /// and returned with their status.
    pub async fn check_pending(&self) -> Vec<(PendingTxn, TxStatus)> {
        let mut resolved = Vec::new();
        for txn in self.pending_txns() {
            match fetch_receipt_status(&self.reader, txn.hash).await {
                Ok(TxStatus::Pending) => {}
                Ok(status) => {
                    info!(hash = %txn.hash, ?status, "Transaction mined");
                    resolved.push((txn, status));
                }
                Err(e) => debug!(hash = %txn.hash, error = %e, "Receipt lookup failed"),
            }
        }
        if !resolved.is_empty() {
            self.pending
                .lock()
                .retain(|p| !resolved.iter().any(|(r, _)| r.hash == p.hash));
        }
        resolved
    }
}

/// Receipt state of any transaction; `Pending` until it is mined.
pub async fn fetch_receipt_status(reader: &ContractReader, hash: B256) -> RpcResult<TxStatus> {
    let receipt = reader
        .transport()
        .request("eth_getTransactionReceipt", json!([hash.to_string()]))
        .await?;
    if receipt.is_null() {
        return Ok(TxStatus::Pending);
    }
    match receipt.get("status").and_then(Value::as_str) {
        Some("0x1") => Ok(TxStatus::Succeeded),
        Some("0x0") => Ok(TxStatus::Reverted),
        other => Err(RpcError::InvalidResponse(format!("unexpected receipt status {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::MockTxSender;
    use crate::staking::{stake, StakeToken};
    use alloy::primitives::U256;
    use std::time::Duration;
    use vwave_core::ContractAddresses;
    use vwave_rpc::{DynTransport, MockTransport};

    fn chain() -> Arc<ChainConfig> {
        Arc::new(ChainConfig {
            chain_id: vwave_core::constants::AURORA,
            native_symbol: "ETH".to_string(),
            contracts: ContractAddresses {
                reward_router: Address::repeat_byte(0xa1),
                ..Default::default()
            },
            tokens: vec![],
            execution_fees: Default::default(),
            gas: vwave_core::GasPolicy {
                max_gas_price: None,
                ..Default::default()
            },
        })
    }

    fn setup() -> (Arc<MockTransport>, Arc<MockTxSender>, Submitter) {
        let transport = Arc::new(MockTransport::default());
        transport.set_default("eth_estimateGas", json!("0x7530"));
        transport.set_default("eth_gasPrice", json!("0x3b9aca00"));
        let sender = Arc::new(MockTxSender::new());
        let submitter = Submitter::new(
            ContractReader::new(transport.clone() as DynTransport),
            sender.clone() as DynTxSender,
            chain(),
            Address::repeat_byte(0x11),
        );
        (transport, sender, submitter)
    }

    #[tokio::test]
    async fn test_submit_records_pending() {
        let (_transport, sender, submitter) = setup();
        let outcome = submitter
            .submit(stake(&chain(), StakeToken::Vwave, U256::from(10)))
            .await
            .unwrap();

        assert_eq!(outcome.sent_message, "Stake submitted!");
        assert!(outcome.tx_url.ends_with(&sender.hash().to_string()));

        let sent = sender.get_sends();
        assert_eq!(sent.len(), 1);
        // 30000 * 1.1
        assert_eq!(sent[0].gas_limit, U256::from(33_000));

        let pending = submitter.pending_txns();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].message, "Transaction completed!");
        assert!(!submitter.is_in_flight("stakeVwave"));
    }

    #[tokio::test]
    async fn test_submit_classifies_failure() {
        let (_transport, sender, submitter) = setup();
        sender.fail_next(RpcError::Rpc {
            code: 4001,
            message: "MetaMask Tx Signature: User denied transaction signature.".to_string(),
            data_message: None,
        });

        let err = submitter
            .submit(stake(&chain(), StakeToken::Vwave, U256::from(10)))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Transaction was cancelled.");
        assert!(submitter.pending_txns().is_empty());
        assert!(!submitter.is_in_flight("stakeVwave"));
    }

    #[tokio::test]
    async fn test_estimate_failure_uses_fail_message() {
        let (transport, _sender, submitter) = setup();
        transport.push_response(
            "eth_estimateGas",
            Err(RpcError::Rpc {
                code: -32000,
                message: "execution reverted: RewardTracker: invalid amount".to_string(),
                data_message: None,
            }),
        );
        let err = submitter
            .submit(stake(&chain(), StakeToken::Vwave, U256::ZERO))
            .await
            .unwrap_err();
        let failure = err.failure().unwrap();
        assert_eq!(failure.user_message, "Stake failed.");
        assert_eq!(failure.detail(), Some("execution reverted: RewardTracker: invalid amount"));
    }

    #[tokio::test]
    async fn test_duplicate_submission_rejected() {
        let transport = Arc::new(MockTransport::default());
        transport.set_default("eth_estimateGas", json!("0x7530"));
        transport.set_default("eth_gasPrice", json!("0x1"));
        transport.set_delay(Some(Duration::from_millis(100)));
        let submitter = Arc::new(Submitter::new(
            ContractReader::new(transport as DynTransport),
            Arc::new(MockTxSender::new()) as DynTxSender,
            chain(),
            Address::repeat_byte(0x11),
        ));

        let first = {
            let submitter = submitter.clone();
            tokio::spawn(async move {
                submitter
                    .submit(stake(&chain(), StakeToken::Vwave, U256::from(1)))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(submitter.is_in_flight("stakeVwave"));

        let second = submitter
            .submit(stake(&chain(), StakeToken::Vwave, U256::from(1)))
            .await;
        assert!(matches!(second, Err(TxError::InFlight(_))));

        // other actions are independent
        assert!(!submitter.is_in_flight("stakeEsVwave"));

        assert!(first.await.unwrap().is_ok());
        assert!(!submitter.is_in_flight("stakeVwave"));
    }

    #[tokio::test]
    async fn test_check_pending_resolves_mined() {
        let (transport, _sender, submitter) = setup();
        submitter
            .submit(stake(&chain(), StakeToken::Vwave, U256::from(10)))
            .await
            .unwrap();

        transport.push_response("eth_getTransactionReceipt", Ok(Value::Null));
        assert!(submitter.check_pending().await.is_empty());
        assert_eq!(submitter.pending_txns().len(), 1);

        transport.push_response("eth_getTransactionReceipt", Ok(json!({ "status": "0x1" })));
        let resolved = submitter.check_pending().await;
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].1, TxStatus::Succeeded);
        assert!(submitter.pending_txns().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_receipt_status() {
        let transport = Arc::new(MockTransport::default());
        let reader = ContractReader::new(transport.clone() as DynTransport);
        let hash = B256::repeat_byte(0x42);

        transport.push_response("eth_getTransactionReceipt", Ok(Value::Null));
        transport.push_response("eth_getTransactionReceipt", Ok(json!({ "status": "0x0" })));
        transport.push_response("eth_getTransactionReceipt", Ok(json!({ "status": "0x7" })));

        assert_eq!(fetch_receipt_status(&reader, hash).await.unwrap(), TxStatus::Pending);
        assert_eq!(fetch_receipt_status(&reader, hash).await.unwrap(), TxStatus::Reverted);
        assert!(fetch_receipt_status(&reader, hash).await.is_err());
    }
}
