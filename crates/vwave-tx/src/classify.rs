//! Provider error classification.
//!
//! Wallet and node errors are free text. A few known substrings map to a
//! canned message; anything else is reported with the caller's failure
//! message and the raw provider text attached.

use vwave_rpc::RpcError;

pub const DEFAULT_FAIL_MESSAGE: &str = "Transaction failed";

/// Known provider failure buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxErrorKind {
    NotEnoughFunds,
    UserDenied,
    Slippage,
}

impl TxErrorKind {
    pub const ALL: [TxErrorKind; 3] = [TxErrorKind::NotEnoughFunds, TxErrorKind::UserDenied, TxErrorKind::Slippage];

    /// Substrings that identify this bucket.
    pub fn patterns(&self) -> &'static [&'static str] {
        match self {
            TxErrorKind::NotEnoughFunds => &[
                "not enough funds for gas",
                "failed to execute call with revert code InsufficientGasFunds",
            ],
            TxErrorKind::UserDenied => &["User denied transaction signature"],
            TxErrorKind::Slippage => &[
                "Router: mark price lower than limit",
                "Router: mark price higher than limit",
            ],
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            TxErrorKind::NotEnoughFunds => "There is not enough ETH in your account on Aurora to send this transaction.",
            TxErrorKind::UserDenied => "Transaction was cancelled.",
            TxErrorKind::Slippage => {
                "The mark price has changed, consider increasing your Allowed Slippage in the trade settings."
            }
        }
    }

    /// Metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            TxErrorKind::NotEnoughFunds => "not_enough_funds",
            TxErrorKind::UserDenied => "user_denied",
            TxErrorKind::Slippage => "slippage",
        }
    }
}

/// First bucket whose pattern occurs in `message`.
pub fn extract_error(message: &str) -> Option<TxErrorKind> {
    TxErrorKind::ALL
        .into_iter()
        .find(|kind| kind.patterns().iter().any(|p| message.contains(p)))
}

/// A classified failure, ready to show to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxFailure {
    pub kind: Option<TxErrorKind>,
    /// Raw provider message.
    pub message: String,
    pub user_message: String,
}

impl TxFailure {
    pub fn from_message(message: impl Into<String>, fail_message: Option<&str>) -> Self {
        let message = message.into();
        let kind = extract_error(&message);
        let user_message = match kind {
            Some(kind) => kind.message().to_string(),
            None => fail_message.unwrap_or(DEFAULT_FAIL_MESSAGE).to_string(),
        };
        Self {
            kind,
            message,
            user_message,
        }
    }

    /// Classify using `error.data.message` when present, else `error.message`.
    pub fn from_rpc(error: &RpcError, fail_message: Option<&str>) -> Self {
        Self::from_message(error.provider_message(), fail_message)
    }

    pub fn reason(&self) -> &'static str {
        self.kind.map(|k| k.as_str()).unwrap_or("other")
    }

    /// Raw message for the expandable detail view; only generic failures
    /// carry one.
    pub fn detail(&self) -> Option<&str> {
        match self.kind {
            None if !self.message.is_empty() => Some(&self.message),
            _ => None,
        }
    }
}
