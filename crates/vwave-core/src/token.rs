//! Token metadata and per-refresh pool state.

use alloy::primitives::{Address, U256};
use std::collections::HashMap;

/// Static token metadata, known before any chain read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSpec {
    /// Token address. The zero address denotes the chain's native token.
    pub address: Address,
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub is_stable: bool,
    pub is_native: bool,
    pub is_wrapped: bool,
    pub is_shortable: bool,
}

impl TokenSpec {
    /// Create a non-stable, non-native ERC-20 spec.
    pub fn erc20(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        let symbol = symbol.into();
        Self {
            address,
            name: symbol.clone(),
            symbol,
            decimals,
            is_stable: false,
            is_native: false,
            is_wrapped: false,
            is_shortable: false,
        }
    }

    pub fn stable(mut self) -> Self {
        self.is_stable = true;
        self
    }

    pub fn native(mut self) -> Self {
        self.is_native = true;
        self
    }

    pub fn wrapped(mut self) -> Self {
        self.is_wrapped = true;
        self
    }

    pub fn shortable(mut self) -> Self {
        self.is_shortable = true;
        self
    }
}

/// Min/max price pair in USD with 30 decimals.
///
/// Both sides are always present together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceBand {
    pub min: U256,
    pub max: U256,
}

impl PriceBand {
    pub fn new(min: U256, max: U256) -> Self {
        Self { min, max }
    }

    /// Same price on both sides.
    pub fn flat(price: U256) -> Self {
        Self {
            min: price,
            max: price,
        }
    }

    /// `max - min`, zero if the band is inverted.
    pub fn spread(&self) -> U256 {
        self.max.saturating_sub(self.min)
    }

    /// `(max + min) / 2`.
    pub fn mid(&self) -> U256 {
        (self.max + self.min) / U256::from(2)
    }

    /// Select the max side when `max` is set, otherwise the min side.
    pub fn side(&self, max: bool) -> U256 {
        if max {
            self.max
        } else {
            self.min
        }
    }
}

/// Raw vault state for one whitelisted token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultTokenState {
    pub pool_amount: U256,
    pub reserved_amount: U256,
    pub usdg_amount: U256,
    pub redemption_amount: U256,
    pub weight: U256,
    pub buffer_amount: U256,
    pub max_usdg_amount: U256,
    pub global_short_size: U256,
    pub max_global_short_size: U256,
    pub max_global_long_size: U256,
    pub guaranteed_usd: U256,
    /// Primary (oracle) price band, without spread from secondary feeds.
    pub primary_price: PriceBand,
}

/// Capacity figures derived from vault state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolCapacity {
    /// `pool_amount - reserved_amount`.
    pub available_amount: U256,
    pub available_usd: U256,
    pub max_available_long: U256,
    pub has_max_available_long: bool,
    pub max_available_short: U256,
    pub has_max_available_short: bool,
    pub max_long_capacity: U256,
    pub managed_usd: U256,
    pub managed_amount: U256,
}

/// Funding rate pair from the reader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FundingRates {
    pub funding_rate: U256,
    pub cumulative_funding_rate: U256,
}

/// Token view assembled from all data sources.
///
/// Every source-dependent field is optional and stays `None` until that
/// source has produced a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub spec: TokenSpec,
    pub balance: Option<U256>,
    pub vault: Option<VaultTokenState>,
    pub capacity: Option<PoolCapacity>,
    /// Display price, possibly re-centred on the off-chain index price.
    pub price: Option<PriceBand>,
    /// Price exactly as reported by the vault contract.
    pub contract_price: Option<PriceBand>,
    pub funding: Option<FundingRates>,
}

impl TokenInfo {
    pub fn new(spec: TokenSpec) -> Self {
        Self {
            spec,
            balance: None,
            vault: None,
            capacity: None,
            price: None,
            contract_price: None,
            funding: None,
        }
    }

    pub fn address(&self) -> Address {
        self.spec.address
    }

    pub fn decimals(&self) -> u8 {
        self.spec.decimals
    }

    pub fn usdg_amount(&self) -> Option<U256> {
        self.vault.as_ref().map(|v| v.usdg_amount)
    }

    pub fn weight(&self) -> Option<U256> {
        self.vault.as_ref().map(|v| v.weight)
    }

    pub fn min_price(&self) -> Option<U256> {
        self.price.map(|p| p.min)
    }

    pub fn max_price(&self) -> Option<U256> {
        self.price.map(|p| p.max)
    }

    pub fn available_amount(&self) -> Option<U256> {
        self.capacity.as_ref().map(|c| c.available_amount)
    }

    pub fn cumulative_funding_rate(&self) -> Option<U256> {
        self.funding.map(|f| f.cumulative_funding_rate)
    }
}

/// Token views keyed by address.
#[derive(Debug, Clone, Default)]
pub struct InfoTokens {
    tokens: HashMap<Address, TokenInfo>,
}

impl InfoTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, info: TokenInfo) {
        self.tokens.insert(info.address(), info);
    }

    pub fn get(&self, address: &Address) -> Option<&TokenInfo> {
        self.tokens.get(address)
    }

    pub fn get_mut(&mut self, address: &Address) -> Option<&mut TokenInfo> {
        self.tokens.get_mut(address)
    }

    /// Look up a token, mapping the wrapped native address to the native entry.
    pub fn get_replacing_native(
        &self,
        address: &Address,
        native_token_address: &Address,
    ) -> Option<&TokenInfo> {
        if address == native_token_address {
            return self.tokens.get(&Address::ZERO);
        }
        self.tokens.get(address)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.tokens.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &TokenInfo)> {
        self.tokens.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &TokenInfo> {
        self.tokens.values()
    }
}

impl FromIterator<TokenInfo> for InfoTokens {
    fn from_iter<I: IntoIterator<Item = TokenInfo>>(iter: I) -> Self {
        let mut tokens = Self::new();
        for info in iter {
            tokens.insert(info);
        }
        tokens
    }
}
