//! Core domain types for the VWAVE trading client.
//!
//! This crate provides fundamental types used by every other crate:
//! - `TokenSpec`, `TokenInfo`, `InfoTokens`: token metadata and pool state
//! - `Position`, `Order`: read-only projections of vault and order book state
//! - `ChainConfig`: contract addresses and fee constants per chain
//! - Fixed-point helpers and display formatting on `U256`

pub mod amount;
pub mod chain;
pub mod constants;
pub mod error;
pub mod format;
pub mod order;
pub mod position;
pub mod token;

pub use alloy::primitives::{Address, B256, U256};
pub use chain::{ChainConfig, ContractAddresses, ExecutionFees, GasPolicy};
pub use error::{CoreError, Result};
pub use order::{DecreaseOrder, IncreaseOrder, Order, OrderDetails, OrderKind, SwapOrder};
pub use position::{position_contract_key, position_key, Position};
pub use token::{FundingRates, InfoTokens, PoolCapacity, PriceBand, TokenInfo, TokenSpec, VaultTokenState};
