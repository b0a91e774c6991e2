//! Order book order types.

use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order book queue an order lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderKind {
    Swap,
    Increase,
    Decrease,
}

impl OrderKind {
    pub const ALL: [OrderKind; 3] = [OrderKind::Swap, OrderKind::Increase, OrderKind::Decrease];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Swap => "Swap",
            OrderKind::Increase => "Increase",
            OrderKind::Decrease => "Decrease",
        }
    }

    /// Lowercase name used by the backend and subgraph.
    pub fn as_lower(&self) -> &'static str {
        match self {
            OrderKind::Swap => "swap",
            OrderKind::Increase => "increase",
            OrderKind::Decrease => "decrease",
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderKind {
    type Err = crate::CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "swap" => Ok(OrderKind::Swap),
            "increase" => Ok(OrderKind::Increase),
            "decrease" => Ok(OrderKind::Decrease),
            other => Err(crate::CoreError::InvalidConfig(format!(
                "unknown order type: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapOrder {
    /// Swap path with zero-address padding removed.
    pub path: Vec<Address>,
    pub amount_in: U256,
    pub min_out: U256,
    pub trigger_ratio: U256,
    pub trigger_above_threshold: bool,
    pub should_unwrap: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncreaseOrder {
    pub purchase_token: Address,
    pub collateral_token: Address,
    pub index_token: Address,
    pub purchase_token_amount: U256,
    pub size_delta: U256,
    pub is_long: bool,
    pub trigger_price: U256,
    pub trigger_above_threshold: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecreaseOrder {
    pub collateral_token: Address,
    pub index_token: Address,
    pub collateral_delta: U256,
    pub size_delta: U256,
    pub is_long: bool,
    pub trigger_price: U256,
    pub trigger_above_threshold: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderDetails {
    Swap(SwapOrder),
    Increase(IncreaseOrder),
    Decrease(DecreaseOrder),
}

/// An open order of one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub account: Address,
    pub index: u64,
    pub details: OrderDetails,
}

impl Order {
    pub fn kind(&self) -> OrderKind {
        match self.details {
            OrderDetails::Swap(_) => OrderKind::Swap,
            OrderDetails::Increase(_) => OrderKind::Increase,
            OrderDetails::Decrease(_) => OrderKind::Decrease,
        }
    }

    pub fn key(&self) -> String {
        order_key(self.kind(), self.account, self.index)
    }

    /// Every token address the order touches.
    pub fn tokens(&self) -> Vec<Address> {
        match &self.details {
            OrderDetails::Swap(o) => o.path.clone(),
            OrderDetails::Increase(o) => vec![o.purchase_token, o.collateral_token, o.index_token],
            OrderDetails::Decrease(o) => vec![o.collateral_token, o.index_token],
        }
    }
}

/// `"{kind}-{account}-{index}"`.
pub fn order_key(kind: OrderKind, account: Address, index: u64) -> String {
    format!("{kind}-{account}-{index}")
}
