//! Per-chain deployment data: contract addresses, tokens and fee constants.

use crate::constants::{AURORA, AURORA_TESTNET};
use crate::error::{CoreError, Result};
use crate::token::TokenSpec;
use alloy::primitives::{Address, U256};
use std::str::FromStr;

/// Parse a `0x`-prefixed hex address.
pub fn parse_address(value: &str) -> Result<Address> {
    Address::from_str(value.trim()).map_err(|e| CoreError::InvalidAddress(format!("{value}: {e}")))
}

/// Parse a base-10 integer amount.
pub fn parse_u256(value: &str) -> Result<U256> {
    U256::from_str_radix(value.trim(), 10)
        .map_err(|e| CoreError::InvalidAmount(format!("{value}: {e}")))
}

pub fn chain_name(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        AURORA => Some("Aurora"),
        AURORA_TESTNET => Some("Aurora Testnet"),
        _ => None,
    }
}

pub fn is_supported_chain(chain_id: u64) -> bool {
    chain_id == AURORA
}

/// Block explorer base URL, with trailing slash.
pub fn explorer_url(chain_id: u64) -> &'static str {
    match chain_id {
        AURORA_TESTNET => "https://testnet.aurorascan.dev/",
        AURORA => "https://aurorascan.dev/",
        _ => "https://etherscan.io/",
    }
}

pub fn tx_url(chain_id: u64, hash: &str) -> String {
    format!("{}tx/{hash}", explorer_url(chain_id))
}

pub fn account_url(chain_id: u64, account: &str) -> String {
    format!("{}address/{account}", explorer_url(chain_id))
}

/// Addresses of the deployed protocol contracts on one chain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractAddresses {
    pub vault: Address,
    pub vault_reader: Address,
    pub reader: Address,
    pub reward_reader: Address,
    pub router: Address,
    pub order_book: Address,
    pub order_book_reader: Address,
    pub position_router: Address,
    pub position_manager: Address,
    pub reward_router: Address,
    pub vlp_manager: Address,
    pub usdg: Address,
    /// Wrapped native token (WETH on Aurora).
    pub native_token: Address,
    pub vwave: Address,
    pub es_vwave: Address,
    pub bn_vwave: Address,
    pub vlp: Address,
    pub staked_vwave_tracker: Address,
    pub bonus_vwave_tracker: Address,
    pub fee_vwave_tracker: Address,
    pub staked_vlp_tracker: Address,
    pub fee_vlp_tracker: Address,
    pub vwave_vester: Address,
    pub vlp_vester: Address,
    pub staked_vwave_distributor: Address,
    pub staked_vlp_distributor: Address,
}

/// Keeper execution fees attached to order creation, in wei.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionFees {
    pub swap: U256,
    pub increase: U256,
    /// The contract requires strictly greater than the minimum here.
    pub decrease: U256,
}

impl Default for ExecutionFees {
    fn default() -> Self {
        // 0.0003 ETH, 0.0003 ETH, 0.000300001 ETH
        Self {
            swap: U256::from(300_000_000_000_000u64),
            increase: U256::from(300_000_000_000_000u64),
            decrease: U256::from(300_001_000_000_000u64),
        }
    }
}

/// Gas pricing policy for outgoing transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasPolicy {
    /// Added to the node's gas price or priority fee.
    pub premium: U256,
    /// Enables EIP-1559 pricing with this fee cap when set.
    pub max_gas_price: Option<U256>,
    /// Gas used by a keeper execution, for the execution fee estimate.
    pub execution_gas_multiplier: u64,
    /// Execution fee above this USD amount is flagged as high.
    pub high_execution_fee_usd: u64,
}

impl Default for GasPolicy {
    fn default() -> Self {
        Self {
            premium: U256::ZERO,
            max_gas_price: Some(U256::from(200_000_000_000u64)),
            execution_gas_multiplier: 700_000,
            high_execution_fee_usd: 3,
        }
    }
}

/// Everything the client needs to know about one chain deployment.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub native_symbol: String,
    pub contracts: ContractAddresses,
    /// All listed tokens, including the native token at the zero address.
    pub tokens: Vec<TokenSpec>,
    pub execution_fees: ExecutionFees,
    pub gas: GasPolicy,
}

impl ChainConfig {
    pub fn name(&self) -> &'static str {
        chain_name(self.chain_id).unwrap_or("Unknown")
    }

    /// Tokens accepted by the vault, in the order the reader expects.
    ///
    /// The native token is represented by its wrapped address in reader
    /// calls, so it is not filtered out here.
    pub fn whitelisted_tokens(&self) -> &[TokenSpec] {
        &self.tokens
    }

    pub fn token(&self, address: &Address) -> Option<&TokenSpec> {
        self.tokens.iter().find(|t| &t.address == address)
    }

    pub fn token_by_symbol(&self, symbol: &str) -> Result<&TokenSpec> {
        self.tokens
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
            .ok_or_else(|| CoreError::UnknownToken(symbol.to_string()))
    }

    pub fn is_valid_token(&self, address: &Address) -> bool {
        self.token(address).is_some()
    }

    pub fn native_token(&self) -> Option<&TokenSpec> {
        self.tokens.iter().find(|t| t.is_native)
    }

    pub fn wrapped_token(&self) -> Option<&TokenSpec> {
        self.tokens.iter().find(|t| t.is_wrapped)
    }

    /// Substitute the wrapped native address for the zero address.
    pub fn reader_address(&self, token: &TokenSpec) -> Address {
        if token.address == Address::ZERO {
            self.contracts.native_token
        } else {
            token.address
        }
    }
}
