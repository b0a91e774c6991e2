//! Unsigned contract calls and their user-facing messages.

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;
use vwave_rpc::CallRequest;

pub const DEFAULT_SENT_MESSAGE: &str = "Transaction sent.";
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Transaction completed!";

/// Messages shown when a transaction is sent, confirmed or fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxMessages {
    pub sent: Option<String>,
    pub success: Option<String>,
    pub fail: Option<String>,
}

impl TxMessages {
    pub fn new(sent: &str, success: Option<&str>, fail: &str) -> Self {
        Self {
            sent: Some(sent.to_string()),
            success: success.map(str::to_string),
            fail: Some(fail.to_string()),
        }
    }

    pub fn sent(&self) -> &str {
        self.sent.as_deref().unwrap_or(DEFAULT_SENT_MESSAGE)
    }

    pub fn success(&self) -> &str {
        self.success.as_deref().unwrap_or(DEFAULT_SUCCESS_MESSAGE)
    }

    pub fn fail(&self) -> Option<&str> {
        self.fail.as_deref()
    }
}

/// A contract call to be signed by the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    /// Contract function name; also the in-flight key and metric label.
    pub action: &'static str,
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    /// Skips estimation when set.
    pub gas_limit: Option<U256>,
    pub messages: TxMessages,
}

impl TxRequest {
    pub fn new<C: SolCall>(to: Address, call: &C) -> Self {
        Self {
            action: C::SIGNATURE.split('(').next().unwrap_or(C::SIGNATURE),
            to,
            data: call.abi_encode().into(),
            value: U256::ZERO,
            gas_limit: None,
            messages: TxMessages::default(),
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    #[must_use]
    pub fn with_gas_limit(mut self, gas_limit: U256) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    #[must_use]
    pub fn with_messages(mut self, messages: TxMessages) -> Self {
        self.messages = messages;
        self
    }

    /// Estimation parameters for `from`.
    pub fn call_request(&self, from: Address) -> CallRequest {
        CallRequest::new(self.to, self.data.clone())
            .from(from)
            .value(self.value)
    }
}
