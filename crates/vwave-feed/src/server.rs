//! REST client for the application backend.
//!
//! Endpoints:
//! - `/prices`: off-chain index prices, USD with 30 decimals, keyed by token address
//! - `/actions[?account=]`: trade history
//! - `/orders_indices?account=`: order book indexes known to the backend
//! - `/vwave_supply`: circulating VWAVE supply as plain text

use crate::error::{FeedError, FeedResult};
use alloy::primitives::{Address, U256};
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};
use vwave_core::chain::{parse_address, parse_u256};
use vwave_core::OrderKind;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Index prices by token address.
pub type IndexPrices = HashMap<Address, U256>;

/// One entry of the trade history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeAction {
    pub id: String,
    /// Raw action payload; `timestamp` and `blockNumber` live in here.
    #[serde(default)]
    pub data: Value,
}

fn loose_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl TradeAction {
    pub fn action(&self) -> Option<&str> {
        self.data.get("action").and_then(Value::as_str)
    }

    /// Unix seconds, or 0 when absent.
    pub fn timestamp(&self) -> i64 {
        loose_int(self.data.get("timestamp")).unwrap_or(0)
    }

    pub fn block_number(&self) -> Option<i64> {
        loose_int(self.data.get("blockNumber"))
    }

    pub fn time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.timestamp(), 0).single()
    }
}

/// Newest first: timestamp descending, then block descending with unknown
/// blocks last.
pub fn sort_trades(trades: &mut [TradeAction]) {
    trades.sort_by(|a, b| {
        b.timestamp()
            .cmp(&a.timestamp())
            .then_with(|| match (a.block_number(), b.block_number()) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(x), Some(y)) => y.cmp(&x),
            })
    });
}

/// Order indexes per order book queue, ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderIndexes {
    pub swap: Vec<u64>,
    pub increase: Vec<u64>,
    pub decrease: Vec<u64>,
}

impl OrderIndexes {
    pub fn get(&self, kind: OrderKind) -> &[u64] {
        match kind {
            OrderKind::Swap => &self.swap,
            OrderKind::Increase => &self.increase,
            OrderKind::Decrease => &self.decrease,
        }
    }

    fn get_mut(&mut self, kind: OrderKind) -> &mut Vec<u64> {
        match kind {
            OrderKind::Swap => &mut self.swap,
            OrderKind::Increase => &mut self.increase,
            OrderKind::Decrease => &mut self.decrease,
        }
    }
}

#[derive(Debug, Deserialize)]
struct IndexEntry {
    value: Value,
}

/// Parse `{"Swap": [{"value": "3"}, ...], ...}`; keys are case-insensitive.
pub fn parse_order_indexes(body: &Value) -> FeedResult<OrderIndexes> {
    let object = body
        .as_object()
        .ok_or_else(|| FeedError::InvalidData("orders_indices is not an object".to_string()))?;

    let mut indexes = OrderIndexes::default();
    for (key, entries) in object {
        let Ok(kind) = key.parse::<OrderKind>() else {
            debug!(key = %key, "Ignoring unknown order index key");
            continue;
        };
        let entries: Vec<IndexEntry> = serde_json::from_value(entries.clone())?;
        let list = indexes.get_mut(kind);
        for entry in entries {
            let index = loose_int(Some(&entry.value))
                .and_then(|i| u64::try_from(i).ok())
                .ok_or_else(|| FeedError::InvalidData(format!("bad order index: {}", entry.value)))?;
            list.push(index);
        }
        list.sort_unstable();
    }
    Ok(indexes)
}

/// Parse `{"0xabc...": "1500000000000000000000000000000000", ...}`.
pub fn parse_index_prices(body: &Value) -> FeedResult<IndexPrices> {
    let object = body
        .as_object()
        .ok_or_else(|| FeedError::InvalidData("prices is not an object".to_string()))?;

    let mut prices = IndexPrices::with_capacity(object.len());
    for (key, value) in object {
        let address = parse_address(key).map_err(|e| FeedError::InvalidData(e.to_string()))?;
        let price = match value {
            Value::String(s) => parse_u256(s).map_err(|e| FeedError::InvalidData(e.to_string()))?,
            Value::Number(n) => U256::from(
                n.as_u64()
                    .ok_or_else(|| FeedError::InvalidData(format!("bad price for {key}: {n}")))?,
            ),
            other => return Err(FeedError::InvalidData(format!("bad price for {key}: {other}"))),
        };
        prices.insert(address, price);
    }
    Ok(prices)
}

/// Client for the application backend.
pub struct ServerClient {
    client: Client,
    base_url: String,
}

impl ServerClient {
    /// Create a new backend client.
    ///
    /// # Arguments
    /// * `base_url` - Backend root without trailing slash (e.g., "https://api.vwave.exchange")
    pub fn new(base_url: impl Into<String>) -> FeedResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| FeedError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> FeedResult<reqwest::Response> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| FeedError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::HttpClient(format!("HTTP {status} for {path}: {body}")));
        }
        Ok(response)
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> FeedResult<Value> {
        self.get(path, query)
            .await?
            .json()
            .await
            .map_err(|e| FeedError::HttpClient(format!("Failed to parse response: {e}")))
    }

    pub async fn fetch_index_prices(&self) -> FeedResult<IndexPrices> {
        let body = self.get_json("/prices", &[]).await?;
        let prices = parse_index_prices(&body)?;
        debug!(count = prices.len(), "Index prices received");
        Ok(prices)
    }

    /// Trade history, newest first. `None` fetches all accounts.
    pub async fn fetch_trades(&self, account: Option<Address>) -> FeedResult<Vec<TradeAction>> {
        let query: Vec<(&str, String)> = account
            .map(|a| vec![("account", a.to_string())])
            .unwrap_or_default();
        let body = self.get_json("/actions", &query).await?;
        let mut trades: Vec<TradeAction> = serde_json::from_value(body)?;
        sort_trades(&mut trades);
        Ok(trades)
    }

    /// Order indexes the backend has seen for `account`.
    ///
    /// Any failure yields empty lists; callers still scan recent on-chain
    /// indexes.
    pub async fn fetch_order_indexes(&self, account: Address) -> OrderIndexes {
        let result = async {
            let body = self
                .get_json("/orders_indices", &[("account", account.to_string())])
                .await?;
            parse_order_indexes(&body)
        }
        .await;

        match result {
            Ok(indexes) => indexes,
            Err(e) => {
                warn!(account = %account, error = %e, "Failed to fetch order indexes");
                OrderIndexes::default()
            }
        }
    }

    /// Circulating VWAVE supply (18 decimals).
    pub async fn fetch_vwave_supply(&self) -> FeedResult<U256> {
        let text = self
            .get("/vwave_supply", &[])
            .await?
            .text()
            .await
            .map_err(|e| FeedError::HttpClient(format!("Failed to read response: {e}")))?;
        parse_u256(&text).map_err(|e| FeedError::InvalidData(e.to_string()))
    }
}
