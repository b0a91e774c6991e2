//! Token info aggregation.
//!
//! Merges three independent sources into one `InfoTokens` map:
//! 1. Vault state from `VaultReader.getVaultTokenInfoV4` (15 props per token)
//! 2. Funding rates from `Reader.getFundingRates` (2 props per token)
//! 3. Account balances from `Reader.getTokenBalances`
//!
//! and then re-centres prices on the backend's index prices. A source that
//! failed leaves its fields `None`; building never fails.

use crate::server::{IndexPrices, ServerClient};
use alloy::primitives::{Address, U256};
use std::sync::Arc;
use tracing::{debug, warn};
use vwave_core::amount::pow10;
use vwave_core::constants::{
    default_max_usdg_amount, BASIS_POINTS_DIVISOR, FUNDING_RATE_PROPS_LENGTH,
    MAX_PRICE_DEVIATION_BASIS_POINTS, USDG_DECIMALS, VAULT_PROPS_LENGTH,
};
use vwave_core::{
    ChainConfig, FundingRates, InfoTokens, PoolCapacity, PriceBand, TokenInfo, TokenSpec,
    VaultTokenState,
};
use vwave_math::PoolTotals;
use vwave_rpc::abi::{IReader, IVault, IVaultReader, IERC20};
use vwave_rpc::{ContractReader, RpcResult};

/// Spread above which only one side of the price is moved to the index.
const ONE_SIDED_SPREAD_BPS: u64 = MAX_PRICE_DEVIATION_BASIS_POINTS - 50;

/// Raw source data for one refresh. Each field is `None` when its read failed.
#[derive(Debug, Clone, Copy, Default)]
pub struct InfoTokenSources<'a> {
    pub balances: Option<&'a [U256]>,
    pub vault_token_info: Option<&'a [U256]>,
    pub funding_rates: Option<&'a [U256]>,
    pub index_prices: Option<&'a IndexPrices>,
}

/// Split one token's vault props into state and the contract price band.
///
/// `props` must hold at least `VAULT_PROPS_LENGTH` values.
pub fn parse_vault_token_state(props: &[U256]) -> (VaultTokenState, PriceBand) {
    let state = VaultTokenState {
        pool_amount: props[0],
        reserved_amount: props[1],
        usdg_amount: props[2],
        redemption_amount: props[3],
        weight: props[4],
        buffer_amount: props[5],
        max_usdg_amount: if props[6].is_zero() {
            default_max_usdg_amount()
        } else {
            props[6]
        },
        global_short_size: props[7],
        max_global_short_size: props[8],
        max_global_long_size: props[9],
        guaranteed_usd: props[12],
        primary_price: PriceBand::new(props[14], props[13]),
    };
    (state, PriceBand::new(props[10], props[11]))
}

/// Capacity figures for the trade and pool views.
pub fn pool_capacity(spec: &TokenSpec, state: &VaultTokenState, min_price: U256) -> PoolCapacity {
    let unit = pow10(spec.decimals);
    let available_amount = state.pool_amount.saturating_sub(state.reserved_amount);
    let available_usd = if spec.is_stable {
        state.pool_amount * min_price / unit
    } else {
        available_amount * min_price / unit
    };

    let has_max_available_short = !state.max_global_short_size.is_zero();
    let max_available_short = if state.max_global_short_size > state.global_short_size {
        state.max_global_short_size - state.global_short_size
    } else {
        U256::ZERO
    };

    let has_max_available_long = !state.max_global_long_size.is_zero();
    let max_available_long = if !has_max_available_long {
        available_usd
    } else if state.max_global_long_size > state.guaranteed_usd {
        (state.max_global_long_size - state.guaranteed_usd).min(available_usd)
    } else {
        U256::ZERO
    };

    let max_long_capacity = if has_max_available_long && state.max_global_long_size < available_usd {
        state.max_global_long_size
    } else {
        available_usd
    };

    let managed_usd = available_usd + state.guaranteed_usd;
    let managed_amount = if min_price.is_zero() {
        U256::ZERO
    } else {
        managed_usd * unit / min_price
    };

    PoolCapacity {
        available_amount,
        available_usd,
        max_available_long,
        has_max_available_long,
        max_available_short,
        has_max_available_short,
        max_long_capacity,
        managed_usd,
        managed_amount,
    }
}

/// Re-centre `info.price` on the backend index price.
///
/// Wide contract spreads keep one side: the max side moves when the index is
/// above the primary min price, the min side otherwise. Narrow spreads move
/// both sides around the index by half the spread.
pub fn set_token_using_index_prices(info: &mut TokenInfo, index_prices: &IndexPrices, native_token_address: Address) {
    let key = if info.spec.is_native {
        native_token_address
    } else {
        info.address()
    };
    let Some(index_price) = index_prices.get(&key).copied().filter(|p| !p.is_zero()) else {
        return;
    };
    let Some(band) = info.price else {
        return;
    };
    let mid = band.mid();
    if mid.is_zero() {
        return;
    }

    let divisor = U256::from(BASIS_POINTS_DIVISOR);
    let spread_bps = band.spread() * divisor / mid;

    if spread_bps > U256::from(ONE_SIDED_SPREAD_BPS) {
        let min_primary = info.vault.as_ref().map(|v| v.primary_price.min).unwrap_or_default();
        let mut updated = band;
        if index_price > min_primary {
            updated.max = index_price;
        } else {
            updated.min = index_price;
        }
        info.price = Some(updated);
        return;
    }

    let half_spread_bps = spread_bps / U256::from(2);
    info.price = Some(PriceBand::new(
        index_price * (divisor - half_spread_bps) / divisor,
        index_price * (divisor + half_spread_bps) / divisor,
    ));
}

/// Assemble `InfoTokens` for every listed token of `chain`.
pub fn build_info_tokens(chain: &ChainConfig, sources: &InfoTokenSources<'_>) -> InfoTokens {
    let native_token_address = chain.contracts.native_token;
    let mut tokens = InfoTokens::new();

    for (i, spec) in chain.whitelisted_tokens().iter().enumerate() {
        let mut info = TokenInfo::new(spec.clone());
        info.balance = sources.balances.and_then(|b| b.get(i).copied());

        let vault_props = sources
            .vault_token_info
            .and_then(|v| v.get(i * VAULT_PROPS_LENGTH..(i + 1) * VAULT_PROPS_LENGTH));
        if let Some(props) = vault_props {
            let (state, contract_price) = parse_vault_token_state(props);
            info.capacity = Some(pool_capacity(spec, &state, contract_price.min));
            info.vault = Some(state);
            info.contract_price = Some(contract_price);
            info.price = Some(contract_price);
            if let Some(prices) = sources.index_prices {
                set_token_using_index_prices(&mut info, prices, native_token_address);
            }
        } else if sources.vault_token_info.is_some() {
            warn!(token = %spec.symbol, "Vault token info shorter than token list");
        }

        let funding_props = sources
            .funding_rates
            .and_then(|f| f.get(i * FUNDING_RATE_PROPS_LENGTH..(i + 1) * FUNDING_RATE_PROPS_LENGTH));
        if let Some(props) = funding_props {
            info.funding = Some(FundingRates {
                funding_rate: props[0],
                cumulative_funding_rate: props[1],
            });
        }

        tokens.insert(info);
    }
    tokens
}

/// Reads the three on-chain sources and the index prices for one refresh.
pub struct InfoTokensLoader {
    reader: ContractReader,
    server: Arc<ServerClient>,
    chain: Arc<ChainConfig>,
}

impl InfoTokensLoader {
    pub fn new(reader: ContractReader, server: Arc<ServerClient>, chain: Arc<ChainConfig>) -> Self {
        Self { reader, server, chain }
    }

    fn token_addresses(&self) -> Vec<Address> {
        self.chain.whitelisted_tokens().iter().map(|t| t.address).collect()
    }

    pub async fn fetch_vault_token_info(&self) -> RpcResult<Vec<U256>> {
        let contracts = &self.chain.contracts;
        let call = IVaultReader::getVaultTokenInfoV4Call {
            vault: contracts.vault,
            positionRouter: contracts.position_router,
            weth: contracts.native_token,
            usdgAmount: pow10(USDG_DECIMALS),
            tokens: self.token_addresses(),
        };
        Ok(self.reader.call(contracts.vault_reader, &call).await?._0)
    }

    pub async fn fetch_funding_rates(&self) -> RpcResult<Vec<U256>> {
        let contracts = &self.chain.contracts;
        let call = IReader::getFundingRatesCall {
            vault: contracts.vault,
            weth: contracts.native_token,
            tokens: self.token_addresses(),
        };
        Ok(self.reader.call(contracts.reader, &call).await?._0)
    }

    pub async fn fetch_balances(&self, account: Address) -> RpcResult<Vec<U256>> {
        let call = IReader::getTokenBalancesCall {
            account,
            tokens: self.token_addresses(),
        };
        Ok(self.reader.call(self.chain.contracts.reader, &call).await?._0)
    }

    /// USDG supply and total token weights, the inputs of dynamic fees.
    pub async fn fetch_pool_totals(&self) -> RpcResult<PoolTotals> {
        let contracts = &self.chain.contracts;
        let (supply, weights) = tokio::try_join!(
            self.reader.call(contracts.usdg, &IERC20::totalSupplyCall {}),
            self.reader.call(contracts.vault, &IVault::totalTokenWeightsCall {}),
        )?;
        Ok(PoolTotals::new(supply._0, weights._0))
    }

    /// Vault state and funding only, for the slower poll.
    pub async fn load_vault(&self, account: Option<Address>) -> VaultSnapshot {
        let balances = async {
            match account {
                Some(account) => self.fetch_balances(account).await.map(Some),
                None => Ok(None),
            }
        };
        let (vault, funding, balances) = tokio::join!(
            self.fetch_vault_token_info(),
            self.fetch_funding_rates(),
            balances
        );

        VaultSnapshot {
            vault_token_info: log_failure("vault token info", vault),
            funding_rates: log_failure("funding rates", funding),
            balances: log_failure("balances", balances).flatten(),
        }
    }

    pub async fn load_index_prices(&self) -> Option<IndexPrices> {
        match self.server.fetch_index_prices().await {
            Ok(prices) => Some(prices),
            Err(e) => {
                warn!(error = %e, "Failed to fetch index prices");
                None
            }
        }
    }

    /// One full refresh of every source.
    pub async fn load(&self, account: Option<Address>) -> InfoTokens {
        let (snapshot, prices) = tokio::join!(self.load_vault(account), self.load_index_prices());
        let tokens = snapshot.build(&self.chain, prices.as_ref());
        debug!(tokens = tokens.len(), "Info tokens rebuilt");
        tokens
    }
}

fn log_failure<T>(source: &str, result: RpcResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(source, error = %e, "Failed to read {source}");
            None
        }
    }
}

/// Last successful on-chain reads, kept so fast index-price polls can
/// rebuild prices without re-reading the chain.
#[derive(Debug, Clone, Default)]
pub struct VaultSnapshot {
    pub vault_token_info: Option<Vec<U256>>,
    pub funding_rates: Option<Vec<U256>>,
    pub balances: Option<Vec<U256>>,
}

impl VaultSnapshot {
    pub fn build(&self, chain: &ChainConfig, index_prices: Option<&IndexPrices>) -> InfoTokens {
        build_info_tokens(
            chain,
            &InfoTokenSources {
                balances: self.balances.as_deref(),
                vault_token_info: self.vault_token_info.as_deref(),
                funding_rates: self.funding_rates.as_deref(),
                index_prices,
            },
        )
    }
}
