//! Gas limit, gas price and keeper execution fee.

use alloy::primitives::{Address, U256};
use serde_json::{Map, Value};
use tracing::debug;
use vwave_core::amount::expand_decimals;
use vwave_core::constants::USD_DECIMALS;
use vwave_core::{ChainConfig, GasPolicy, InfoTokens};
use vwave_math::{usd_value, OrderOption};
use vwave_rpc::abi::IPositionRouter;
use vwave_rpc::{to_quantity, CallRequest, ContractReader, RpcResult};

/// Floor applied to node estimates (21000 base + 1000).
pub const MIN_GAS_LIMIT: u64 = 22_000;
pub const GAS_LIMIT_BUFFER_BPS: u64 = 11_000;

pub const HIGH_EXECUTION_FEE_MESSAGE: &str = "The network cost to send transactions is high at the moment, please check the \"Execution Fee\" value before proceeding.";

/// Estimate floored at `MIN_GAS_LIMIT`, plus 10%.
pub fn buffered_gas_limit(estimate: U256) -> U256 {
    estimate.max(U256::from(MIN_GAS_LIMIT)) * U256::from(GAS_LIMIT_BUFFER_BPS) / U256::from(10_000u64)
}

pub async fn estimate_gas_limit(reader: &ContractReader, request: &CallRequest) -> RpcResult<U256> {
    let estimate = reader.estimate_gas(request).await?;
    Ok(buffered_gas_limit(estimate))
}

/// Pricing fields attached to a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GasPrice {
    Legacy {
        gas_price: U256,
    },
    Eip1559 {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
}

impl GasPrice {
    pub fn write_json(&self, tx: &mut Map<String, Value>) {
        match self {
            GasPrice::Legacy { gas_price } => {
                tx.insert("gasPrice".to_string(), Value::String(to_quantity(*gas_price)));
            }
            GasPrice::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                tx.insert("maxFeePerGas".to_string(), Value::String(to_quantity(*max_fee_per_gas)));
                tx.insert(
                    "maxPriorityFeePerGas".to_string(),
                    Value::String(to_quantity(*max_priority_fee_per_gas)),
                );
            }
        }
    }
}

/// EIP-1559 when the chain has a fee cap and the provider reports a
/// priority fee, legacy `gasPrice + premium` otherwise. A node gas price
/// above the cap raises the cap.
pub fn select_gas_price(policy: &GasPolicy, gas_price: U256, priority_fee: Option<U256>) -> GasPrice {
    if let (Some(max_gas_price), Some(priority_fee)) = (policy.max_gas_price, priority_fee) {
        return GasPrice::Eip1559 {
            max_fee_per_gas: max_gas_price.max(gas_price),
            max_priority_fee_per_gas: priority_fee + policy.premium,
        };
    }
    GasPrice::Legacy {
        gas_price: gas_price + policy.premium,
    }
}

pub async fn fetch_gas_price(reader: &ContractReader, policy: &GasPolicy) -> RpcResult<GasPrice> {
    let gas_price = reader.gas_price().await?;
    let priority_fee = if policy.max_gas_price.is_some() {
        match reader.max_priority_fee_per_gas().await {
            Ok(fee) => Some(fee),
            Err(e) => {
                debug!(error = %e, "No priority fee from provider, using legacy gas price");
                None
            }
        }
    } else {
        None
    };
    Ok(select_gas_price(policy, gas_price, priority_fee))
}

/// Execution fee the keeper needs, with its USD value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionFeeQuote {
    pub fee: U256,
    pub fee_usd: Option<U256>,
    pub is_high: bool,
}

impl ExecutionFeeQuote {
    pub fn error_message(&self) -> Option<&'static str> {
        self.is_high.then_some(HIGH_EXECUTION_FEE_MESSAGE)
    }
}

/// The larger of the position router minimum and `gas_price * multiplier`,
/// valued in USD at the wrapped native token's min price.
pub fn min_execution_fee(
    contract_min: Option<U256>,
    gas_price: Option<U256>,
    policy: &GasPolicy,
    native_token_address: Address,
    info_tokens: &InfoTokens,
) -> Option<ExecutionFeeQuote> {
    let contract_min = contract_min?;
    let fee = match gas_price {
        Some(gas_price) => contract_min.max(gas_price * U256::from(policy.execution_gas_multiplier)),
        None => contract_min,
    };
    let fee_usd = usd_value(
        Some(fee),
        &native_token_address,
        false,
        info_tokens,
        OrderOption::Market,
        None,
    );
    let threshold = expand_decimals(policy.high_execution_fee_usd, USD_DECIMALS);
    Some(ExecutionFeeQuote {
        fee,
        fee_usd,
        is_high: fee_usd.is_some_and(|usd| usd > threshold),
    })
}

pub async fn fetch_min_execution_fee(
    reader: &ContractReader,
    chain: &ChainConfig,
    info_tokens: &InfoTokens,
) -> RpcResult<Option<ExecutionFeeQuote>> {
    let (contract_min, gas_price) = tokio::join!(
        reader.call(chain.contracts.position_router, &IPositionRouter::minExecutionFeeCall {}),
        reader.gas_price()
    );
    let contract_min = contract_min?._0;
    let gas_price = match gas_price {
        Ok(price) => Some(price),
        Err(e) => {
            debug!(error = %e, "Gas price unavailable, using contract minimum");
            None
        }
    };
    Ok(min_execution_fee(
        Some(contract_min),
        gas_price,
        &chain.gas,
        chain.contracts.native_token,
        info_tokens,
    ))
}
