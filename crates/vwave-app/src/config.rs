//! Application configuration.
//!
//! Addresses and wei amounts are strings in the file and are parsed into
//! chain types by `AppConfig::chain_config`.

use crate::error::{AppError, AppResult};
use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use vwave_core::amount::amount_from_decimal;
use vwave_core::chain::{is_supported_chain, parse_address, parse_u256};
use vwave_core::constants::{DEFAULT_CHAIN_ID, USD_DECIMALS};
use vwave_core::{ChainConfig, ContractAddresses, ExecutionFees, GasPolicy, TokenSpec};
use vwave_math::FeeSchedule;
use vwave_rpc::DEFAULT_PRIMARY_TIMEOUT;

/// Shortest allowed polling interval.
pub const MIN_POLL_INTERVAL_MS: u64 = 500;
/// Longest allowed polling interval.
pub const MAX_POLL_INTERVAL_MS: u64 = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub primary_url: String,
    /// Retried once when the primary fails or times out.
    #[serde(default)]
    pub fallback_url: Option<String>,
    /// Wallet endpoint answering `eth_sendTransaction`. Required for writes.
    #[serde(default)]
    pub wallet_url: Option<String>,
    #[serde(default = "default_primary_timeout_ms")]
    pub primary_timeout_ms: u64,
}

fn default_primary_timeout_ms() -> u64 {
    DEFAULT_PRIMARY_TIMEOUT.as_millis() as u64
}

impl RpcConfig {
    pub fn primary_timeout(&self) -> Duration {
        Duration::from_millis(self.primary_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubgraphConfig {
    #[serde(default)]
    pub stats: Option<String>,
    #[serde(default)]
    pub trades: Option<String>,
    #[serde(default)]
    pub referrals: Option<String>,
}

/// Polling intervals per data source, clamped to 0.5-10 s.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_index_prices_ms")]
    pub index_prices_ms: u64,
    #[serde(default = "default_vault_ms")]
    pub vault_ms: u64,
    #[serde(default = "default_staking_ms")]
    pub staking_ms: u64,
    #[serde(default = "default_orders_ms")]
    pub orders_ms: u64,
}

fn default_index_prices_ms() -> u64 {
    500
}

fn default_vault_ms() -> u64 {
    5_000
}

fn default_staking_ms() -> u64 {
    10_000
}

fn default_orders_ms() -> u64 {
    5_000
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            index_prices_ms: default_index_prices_ms(),
            vault_ms: default_vault_ms(),
            staking_ms: default_staking_ms(),
            orders_ms: default_orders_ms(),
        }
    }
}

fn clamp_interval(ms: u64) -> Duration {
    Duration::from_millis(ms.clamp(MIN_POLL_INTERVAL_MS, MAX_POLL_INTERVAL_MS))
}

impl PollingConfig {
    pub fn index_prices(&self) -> Duration {
        clamp_interval(self.index_prices_ms)
    }

    pub fn vault(&self) -> Duration {
        clamp_interval(self.vault_ms)
    }

    pub fn staking(&self) -> Duration {
        clamp_interval(self.staking_ms)
    }

    pub fn orders(&self) -> Duration {
        clamp_interval(self.orders_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GasConfig {
    #[serde(default = "default_premium_wei")]
    pub premium_wei: String,
    /// Enables EIP-1559 pricing with this fee cap.
    #[serde(default)]
    pub max_gas_price_wei: Option<String>,
    #[serde(default = "default_execution_gas_multiplier")]
    pub execution_gas_multiplier: u64,
    #[serde(default = "default_high_execution_fee_usd")]
    pub high_execution_fee_usd: u64,
}

fn default_premium_wei() -> String {
    "0".to_string()
}

fn default_execution_gas_multiplier() -> u64 {
    GasPolicy::default().execution_gas_multiplier
}

fn default_high_execution_fee_usd() -> u64 {
    GasPolicy::default().high_execution_fee_usd
}

impl Default for GasConfig {
    fn default() -> Self {
        Self {
            premium_wei: default_premium_wei(),
            max_gas_price_wei: None,
            execution_gas_multiplier: default_execution_gas_multiplier(),
            high_execution_fee_usd: default_high_execution_fee_usd(),
        }
    }
}

/// Keeper fees in wei; unset values use the protocol defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionFeesConfig {
    #[serde(default)]
    pub swap_wei: Option<String>,
    #[serde(default)]
    pub increase_wei: Option<String>,
    #[serde(default)]
    pub decrease_wei: Option<String>,
}

/// Deployed contract addresses. Missing entries are the zero address.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractsConfig {
    pub vault: String,
    pub vault_reader: String,
    pub reader: String,
    pub reward_reader: String,
    pub router: String,
    pub order_book: String,
    pub order_book_reader: String,
    pub position_router: String,
    pub position_manager: String,
    pub reward_router: String,
    pub vlp_manager: String,
    pub usdg: String,
    pub native_token: String,
    pub vwave: String,
    pub es_vwave: String,
    pub bn_vwave: String,
    pub vlp: String,
    pub staked_vwave_tracker: String,
    pub bonus_vwave_tracker: String,
    pub fee_vwave_tracker: String,
    pub staked_vlp_tracker: String,
    pub fee_vlp_tracker: String,
    pub vwave_vester: String,
    pub vlp_vester: String,
    pub staked_vwave_distributor: String,
    pub staked_vlp_distributor: String,
}

fn address_or_zero(value: &str, name: &str) -> AppResult<Address> {
    if value.trim().is_empty() {
        return Ok(Address::ZERO);
    }
    parse_address(value).map_err(|e| AppError::Config(format!("contracts.{name}: {e}")))
}

impl ContractsConfig {
    pub fn parse(&self) -> AppResult<ContractAddresses> {
        Ok(ContractAddresses {
            vault: address_or_zero(&self.vault, "vault")?,
            vault_reader: address_or_zero(&self.vault_reader, "vault_reader")?,
            reader: address_or_zero(&self.reader, "reader")?,
            reward_reader: address_or_zero(&self.reward_reader, "reward_reader")?,
            router: address_or_zero(&self.router, "router")?,
            order_book: address_or_zero(&self.order_book, "order_book")?,
            order_book_reader: address_or_zero(&self.order_book_reader, "order_book_reader")?,
            position_router: address_or_zero(&self.position_router, "position_router")?,
            position_manager: address_or_zero(&self.position_manager, "position_manager")?,
            reward_router: address_or_zero(&self.reward_router, "reward_router")?,
            vlp_manager: address_or_zero(&self.vlp_manager, "vlp_manager")?,
            usdg: address_or_zero(&self.usdg, "usdg")?,
            native_token: address_or_zero(&self.native_token, "native_token")?,
            vwave: address_or_zero(&self.vwave, "vwave")?,
            es_vwave: address_or_zero(&self.es_vwave, "es_vwave")?,
            bn_vwave: address_or_zero(&self.bn_vwave, "bn_vwave")?,
            vlp: address_or_zero(&self.vlp, "vlp")?,
            staked_vwave_tracker: address_or_zero(&self.staked_vwave_tracker, "staked_vwave_tracker")?,
            bonus_vwave_tracker: address_or_zero(&self.bonus_vwave_tracker, "bonus_vwave_tracker")?,
            fee_vwave_tracker: address_or_zero(&self.fee_vwave_tracker, "fee_vwave_tracker")?,
            staked_vlp_tracker: address_or_zero(&self.staked_vlp_tracker, "staked_vlp_tracker")?,
            fee_vlp_tracker: address_or_zero(&self.fee_vlp_tracker, "fee_vlp_tracker")?,
            vwave_vester: address_or_zero(&self.vwave_vester, "vwave_vester")?,
            vlp_vester: address_or_zero(&self.vlp_vester, "vlp_vester")?,
            staked_vwave_distributor: address_or_zero(&self.staked_vwave_distributor, "staked_vwave_distributor")?,
            staked_vlp_distributor: address_or_zero(&self.staked_vlp_distributor, "staked_vlp_distributor")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub address: String,
    pub symbol: String,
    #[serde(default)]
    pub name: Option<String>,
    pub decimals: u8,
    #[serde(default)]
    pub is_stable: bool,
    #[serde(default)]
    pub is_native: bool,
    #[serde(default)]
    pub is_wrapped: bool,
    #[serde(default)]
    pub is_shortable: bool,
}

impl TokenConfig {
    pub fn parse(&self) -> AppResult<TokenSpec> {
        let address = parse_address(&self.address)
            .map_err(|e| AppError::Config(format!("token {}: {e}", self.symbol)))?;
        Ok(TokenSpec {
            address,
            symbol: self.symbol.clone(),
            name: self.name.clone().unwrap_or_else(|| self.symbol.clone()),
            decimals: self.decimals,
            is_stable: self.is_stable,
            is_native: self.is_native,
            is_wrapped: self.is_wrapped,
            is_shortable: self.is_shortable,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default = "default_native_symbol")]
    pub native_symbol: String,
    pub server_url: String,
    pub rpc: RpcConfig,
    #[serde(default)]
    pub subgraphs: SubgraphConfig,
    /// Account whose balances, orders and positions are polled.
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default = "default_prefs_path")]
    pub prefs_path: String,
    /// When set, `run` rewrites this file with the Prometheus text
    /// exposition on every status tick (node-exporter textfile style).
    #[serde(default)]
    pub metrics_path: Option<String>,
    /// Overrides the backend VWAVE price (USD).
    #[serde(default)]
    pub vwave_price_usd: Option<Decimal>,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub fees: FeeSchedule,
    #[serde(default)]
    pub gas: GasConfig,
    #[serde(default)]
    pub execution_fees: ExecutionFeesConfig,
    #[serde(default)]
    pub contracts: ContractsConfig,
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
}

fn default_chain_id() -> u64 {
    DEFAULT_CHAIN_ID
}

fn default_native_symbol() -> String {
    "ETH".to_string()
}

fn default_prefs_path() -> String {
    "data/prefs.json".to_string()
}

fn wei(value: &str, name: &str) -> AppResult<U256> {
    parse_u256(value).map_err(|e| AppError::Config(format!("{name}: {e}")))
}

impl AppConfig {
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config
            .fees
            .validate()
            .map_err(|e| AppError::Config(format!("fees: {e}")))?;
        Ok(config)
    }

    pub fn account(&self) -> AppResult<Option<Address>> {
        self.account
            .as_deref()
            .map(|a| parse_address(a).map_err(|e| AppError::Config(format!("account: {e}"))))
            .transpose()
    }

    /// VWAVE price override with 30 decimals.
    pub fn vwave_price(&self) -> AppResult<Option<U256>> {
        self.vwave_price_usd
            .map(|p| amount_from_decimal(p, USD_DECIMALS).map_err(AppError::from))
            .transpose()
    }

    pub fn gas_policy(&self) -> AppResult<GasPolicy> {
        Ok(GasPolicy {
            premium: wei(&self.gas.premium_wei, "gas.premium_wei")?,
            max_gas_price: self
                .gas
                .max_gas_price_wei
                .as_deref()
                .map(|v| wei(v, "gas.max_gas_price_wei"))
                .transpose()?,
            execution_gas_multiplier: self.gas.execution_gas_multiplier,
            high_execution_fee_usd: self.gas.high_execution_fee_usd,
        })
    }

    pub fn execution_fees(&self) -> AppResult<ExecutionFees> {
        let defaults = ExecutionFees::default();
        let fees = &self.execution_fees;
        let pick = |value: &Option<String>, default: U256, name: &str| -> AppResult<U256> {
            value.as_deref().map(|v| wei(v, name)).unwrap_or(Ok(default))
        };
        Ok(ExecutionFees {
            swap: pick(&fees.swap_wei, defaults.swap, "execution_fees.swap_wei")?,
            increase: pick(&fees.increase_wei, defaults.increase, "execution_fees.increase_wei")?,
            decrease: pick(&fees.decrease_wei, defaults.decrease, "execution_fees.decrease_wei")?,
        })
    }

    /// Parse every address and amount into a `ChainConfig`.
    pub fn chain_config(&self) -> AppResult<ChainConfig> {
        if !is_supported_chain(self.chain_id) {
            tracing::warn!(chain_id = self.chain_id, "Chain is not supported for trading");
        }
        let tokens = self
            .tokens
            .iter()
            .map(TokenConfig::parse)
            .collect::<AppResult<Vec<_>>>()?;
        if tokens.iter().filter(|t| t.is_native).count() > 1 {
            return Err(AppError::Config("more than one native token".to_string()));
        }
        Ok(ChainConfig {
            chain_id: self.chain_id,
            native_symbol: self.native_symbol.clone(),
            contracts: self.contracts.parse()?,
            tokens,
            execution_fees: self.execution_fees()?,
            gas: self.gas_policy()?,
        })
    }
}
