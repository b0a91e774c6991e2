//! Shared state written by the pollers.
//!
//! Each poller overwrites its own slot; the last write wins and readers
//! get clones. There is no ordering between slots, so a consumer may see
//! fresh prices next to an older vault snapshot.

use crate::info_tokens::VaultSnapshot;
use crate::server::IndexPrices;
use crate::staking::{processed_data, ProcessedData, StakingInputs};
use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::trace;
use vwave_core::{ChainConfig, InfoTokens, Order, Position, TokenInfo};
use vwave_telemetry::Metrics;

/// Data sources tracked by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    IndexPrices,
    Vault,
    Staking,
    Orders,
    Positions,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::IndexPrices => "index_prices",
            Source::Vault => "vault",
            Source::Staking => "staking",
            Source::Orders => "orders",
            Source::Positions => "positions",
        }
    }
}

#[derive(Default)]
pub struct FeedStore {
    tokens: DashMap<Address, TokenInfo>,
    vault: RwLock<VaultSnapshot>,
    index_prices: RwLock<Option<IndexPrices>>,
    staking: RwLock<StakingInputs>,
    orders: RwLock<Vec<Order>>,
    positions: RwLock<HashMap<String, Position>>,
    updated_at: DashMap<Source, DateTime<Utc>>,
}

impl FeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn touch(&self, source: Source) {
        trace!(source = source.as_str(), "Store updated");
        self.updated_at.insert(source, Utc::now());
    }

    /// Replace the token map; tokens missing from `tokens` are removed.
    pub fn replace_info_tokens(&self, tokens: InfoTokens) {
        self.tokens.retain(|address, _| tokens.contains(address));
        for info in tokens.values() {
            self.tokens.insert(info.address(), info.clone());
        }
        Metrics::info_tokens(self.tokens.len());
    }

    pub fn info_tokens(&self) -> InfoTokens {
        self.tokens.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn token(&self, address: &Address) -> Option<TokenInfo> {
        self.tokens.get(address).map(|entry| entry.value().clone())
    }

    pub fn set_vault_snapshot(&self, snapshot: VaultSnapshot) {
        *self.vault.write() = snapshot;
        self.touch(Source::Vault);
    }

    pub fn vault_snapshot(&self) -> VaultSnapshot {
        self.vault.read().clone()
    }

    pub fn set_index_prices(&self, prices: IndexPrices) {
        *self.index_prices.write() = Some(prices);
        self.touch(Source::IndexPrices);
    }

    pub fn index_prices(&self) -> Option<IndexPrices> {
        self.index_prices.read().clone()
    }

    /// Rebuild the token map from the latest vault snapshot and prices.
    pub fn rebuild_info_tokens(&self, chain: &ChainConfig) {
        let snapshot = self.vault_snapshot();
        let prices = self.index_prices();
        self.replace_info_tokens(snapshot.build(chain, prices.as_ref()));
    }

    pub fn set_staking(&self, inputs: StakingInputs) {
        *self.staking.write() = inputs;
        self.touch(Source::Staking);
    }

    pub fn staking(&self) -> StakingInputs {
        self.staking.read().clone()
    }

    pub fn processed_staking(&self) -> Option<ProcessedData> {
        processed_data(&self.staking.read())
    }

    pub fn set_orders(&self, orders: Vec<Order>) {
        *self.orders.write() = orders;
        self.touch(Source::Orders);
    }

    pub fn orders(&self) -> Vec<Order> {
        self.orders.read().clone()
    }

    pub fn set_positions(&self, positions: HashMap<String, Position>) {
        *self.positions.write() = positions;
        self.touch(Source::Positions);
    }

    pub fn positions(&self) -> HashMap<String, Position> {
        self.positions.read().clone()
    }

    pub fn last_update(&self, source: Source) -> Option<DateTime<Utc>> {
        self.updated_at.get(&source).map(|entry| *entry.value())
    }
}
