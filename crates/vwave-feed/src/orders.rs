//! Open order discovery for one account.
//!
//! The backend knows most order indexes but can lag the chain, so the
//! known indexes are merged with the newest on-chain indexes (up to
//! `RECENT_INDEX_LIMIT` below the order book's next index) before the order
//! book reader is queried.

use crate::server::ServerClient;
use alloy::primitives::{Address, U256};
use std::sync::Arc;
use tracing::debug;
use vwave_core::amount::to_u64_saturating;
use vwave_core::{ChainConfig, DecreaseOrder, IncreaseOrder, Order, OrderDetails, OrderKind, SwapOrder};
use vwave_rpc::abi::{IOrderBook, IOrderBookReader};
use vwave_rpc::{ContractReader, RpcResult};

/// Newest on-chain indexes scanned beyond the backend's list.
pub const RECENT_INDEX_LIMIT: u64 = 10;

const UINT_PROPS_LENGTH: usize = 5;

/// Indexes `to - 1` down to `from`, newest first.
///
/// `from` defaults to `to - RECENT_INDEX_LIMIT` (floored at zero).
pub fn index_range(to: u64, from: Option<u64>) -> Vec<u64> {
    let from = from
        .filter(|f| *f > 0)
        .unwrap_or_else(|| to.saturating_sub(RECENT_INDEX_LIMIT));
    (from..to).rev().collect()
}

/// Known indexes followed by every newer index up to `last_index`.
pub fn merge_indexes(known: &[u64], last_index: u64) -> Vec<u64> {
    match known.last() {
        None => index_range(last_index, None),
        Some(newest) => {
            let mut indexes = known.to_vec();
            indexes.extend(index_range(last_index, Some(newest + 1)));
            indexes
        }
    }
}

fn is_set(value: &U256) -> bool {
    *value == U256::from(1)
}

/// Turn reader output into orders.
///
/// Rows are `address_props` addresses followed by five uints. Rows whose
/// first two addresses are zero are empty slots and skipped; rows
/// referencing tokens unknown to `chain` are dropped.
pub fn parse_orders(
    chain: &ChainConfig,
    kind: OrderKind,
    account: Address,
    indexes: &[u64],
    uints: &[U256],
    addresses: &[Address],
) -> Vec<Order> {
    let address_props = match kind {
        OrderKind::Decrease => 2,
        OrderKind::Swap | OrderKind::Increase => 3,
    };

    let rows = uints
        .chunks_exact(UINT_PROPS_LENGTH)
        .zip(addresses.chunks_exact(address_props))
        .zip(indexes);

    let mut orders = Vec::new();
    for ((u, a), index) in rows {
        if a[0] == Address::ZERO && a[1] == Address::ZERO {
            continue;
        }

        let details = match kind {
            OrderKind::Swap => OrderDetails::Swap(SwapOrder {
                path: a.iter().copied().filter(|t| *t != Address::ZERO).collect(),
                amount_in: u[0],
                min_out: u[1],
                trigger_ratio: u[2],
                trigger_above_threshold: is_set(&u[3]),
                should_unwrap: is_set(&u[4]),
            }),
            OrderKind::Increase => OrderDetails::Increase(IncreaseOrder {
                purchase_token: a[0],
                collateral_token: a[1],
                index_token: a[2],
                purchase_token_amount: u[0],
                size_delta: u[1],
                is_long: is_set(&u[2]),
                trigger_price: u[3],
                trigger_above_threshold: is_set(&u[4]),
            }),
            OrderKind::Decrease => OrderDetails::Decrease(DecreaseOrder {
                collateral_token: a[0],
                index_token: a[1],
                collateral_delta: u[0],
                size_delta: u[1],
                is_long: is_set(&u[2]),
                trigger_price: u[3],
                trigger_above_threshold: is_set(&u[4]),
            }),
        };

        let order = Order {
            account,
            index: *index,
            details,
        };
        if order.tokens().iter().all(|t| chain.is_valid_token(t)) {
            orders.push(order);
        } else {
            debug!(key = %order.key(), "Dropping order with unknown token");
        }
    }
    orders
}

/// Next order index of each order book queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LastIndexes {
    pub swap: u64,
    pub increase: u64,
    pub decrease: u64,
}

impl LastIndexes {
    pub fn get(&self, kind: OrderKind) -> u64 {
        match kind {
            OrderKind::Swap => self.swap,
            OrderKind::Increase => self.increase,
            OrderKind::Decrease => self.decrease,
        }
    }
}

/// Reads open orders of one account.
pub struct OrdersLoader {
    reader: ContractReader,
    server: Arc<ServerClient>,
    chain: Arc<ChainConfig>,
}

impl OrdersLoader {
    pub fn new(reader: ContractReader, server: Arc<ServerClient>, chain: Arc<ChainConfig>) -> Self {
        Self { reader, server, chain }
    }

    /// Next order index per queue, from the order book.
    pub async fn fetch_last_indexes(&self, account: Address) -> RpcResult<LastIndexes> {
        let order_book = self.chain.contracts.order_book;
        let swap_call = IOrderBook::swapOrdersIndexCall { account };
        let increase_call = IOrderBook::increaseOrdersIndexCall { account };
        let decrease_call = IOrderBook::decreaseOrdersIndexCall { account };
        let (swap, increase, decrease) = tokio::try_join!(
            self.reader.call(order_book, &swap_call),
            self.reader.call(order_book, &increase_call),
            self.reader.call(order_book, &decrease_call),
        )?;
        Ok(LastIndexes {
            swap: to_u64_saturating(swap._0),
            increase: to_u64_saturating(increase._0),
            decrease: to_u64_saturating(decrease._0),
        })
    }

    async fn fetch_kind(&self, kind: OrderKind, account: Address, indexes: Vec<u64>) -> RpcResult<Vec<Order>> {
        if indexes.is_empty() {
            return Ok(Vec::new());
        }
        let contracts = &self.chain.contracts;
        let indices: Vec<U256> = indexes.iter().map(|i| U256::from(*i)).collect();
        let (uints, addresses) = match kind {
            OrderKind::Swap => {
                let call = IOrderBookReader::getSwapOrdersCall {
                    orderBook: contracts.order_book,
                    account,
                    indices,
                };
                let r = self.reader.call(contracts.order_book_reader, &call).await?;
                (r._0, r._1)
            }
            OrderKind::Increase => {
                let call = IOrderBookReader::getIncreaseOrdersCall {
                    orderBook: contracts.order_book,
                    account,
                    indices,
                };
                let r = self.reader.call(contracts.order_book_reader, &call).await?;
                (r._0, r._1)
            }
            OrderKind::Decrease => {
                let call = IOrderBookReader::getDecreaseOrdersCall {
                    orderBook: contracts.order_book,
                    account,
                    indices,
                };
                let r = self.reader.call(contracts.order_book_reader, &call).await?;
                (r._0, r._1)
            }
        };
        Ok(parse_orders(&self.chain, kind, account, &indexes, &uints, &addresses))
    }

    /// Swap, then increase, then decrease orders.
    pub async fn load(&self, account: Address) -> RpcResult<Vec<Order>> {
        let (known, last) = tokio::join!(
            self.server.fetch_order_indexes(account),
            self.fetch_last_indexes(account)
        );
        let last = last?;
        let indexes_for = |kind: OrderKind| merge_indexes(known.get(kind), last.get(kind));

        let (swap, increase, decrease) = tokio::try_join!(
            self.fetch_kind(OrderKind::Swap, account, indexes_for(OrderKind::Swap)),
            self.fetch_kind(OrderKind::Increase, account, indexes_for(OrderKind::Increase)),
            self.fetch_kind(OrderKind::Decrease, account, indexes_for(OrderKind::Decrease)),
        )?;

        let mut orders = swap;
        orders.extend(increase);
        orders.extend(decrease);
        debug!(account = %account, count = orders.len(), "Account orders loaded");
        Ok(orders)
    }
}
