//! GraphQL subgraph queries.
//!
//! Three subgraphs are used: `stats` (order/user stats, liquidations, open
//! orders), `trades` (aggregated open positions) and `referrals`.

use crate::error::{FeedError, FeedResult};
use alloy::primitives::{Address, U256};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Subgraph `BigInt` values arrive as decimal strings.
fn de_u256<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::String(s) => U256::from_str_radix(s, 10).map_err(serde::de::Error::custom),
        Value::Number(n) => n
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| serde::de::Error::custom(format!("not an unsigned integer: {n}"))),
        other => Err(serde::de::Error::custom(format!("expected BigInt, got {other}"))),
    }
}

fn de_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::String(s) => s.parse().map_err(serde::de::Error::custom),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| serde::de::Error::custom(format!("not an unsigned integer: {n}"))),
        other => Err(serde::de::Error::custom(format!("expected integer, got {other}"))),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStats {
    pub open_swap: u64,
    pub open_increase: u64,
    pub open_decrease: u64,
    pub executed_swap: u64,
    pub executed_increase: u64,
    pub executed_decrease: u64,
    pub cancelled_swap: u64,
    pub cancelled_increase: u64,
    pub cancelled_decrease: u64,
}

impl OrderStats {
    pub fn open_total(&self) -> u64 {
        self.open_swap + self.open_increase + self.open_decrease
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub id: String,
    pub unique_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidatedPosition {
    pub key: String,
    #[serde(deserialize_with = "de_u64")]
    pub timestamp: u64,
    #[serde(deserialize_with = "de_u256")]
    pub borrow_fee: U256,
    #[serde(deserialize_with = "de_u256")]
    pub loss: U256,
    #[serde(deserialize_with = "de_u256")]
    pub collateral: U256,
    #[serde(deserialize_with = "de_u256")]
    pub size: U256,
    #[serde(deserialize_with = "de_u256")]
    pub mark_price: U256,
    /// `full` or `partial`.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Open order as indexed by the subgraph.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedOrder {
    /// Lowercase order type: `swap`, `increase`, `decrease`.
    #[serde(rename = "type")]
    pub kind: String,
    pub account: Address,
    #[serde(deserialize_with = "de_u64")]
    pub index: u64,
    pub status: String,
    #[serde(deserialize_with = "de_u64")]
    pub created_timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialPosition {
    pub index_token: Address,
    pub collateral_token: Address,
    pub is_long: bool,
    #[serde(deserialize_with = "de_u256")]
    pub size_delta: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SizeDelta {
    #[serde(deserialize_with = "de_u256")]
    pub size_delta: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedTradeOpen {
    pub account: Address,
    pub initial_position: InitialPosition,
    #[serde(default)]
    pub increase_list: Vec<SizeDelta>,
    #[serde(default)]
    pub decrease_list: Vec<SizeDelta>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReferralCode {
    /// bytes32 code as hex.
    pub code: String,
}

#[derive(Debug, Deserialize)]
struct GraphResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorEntry {
    message: String,
}

/// Client for one subgraph endpoint.
pub struct GraphClient {
    client: Client,
    url: String,
}

impl GraphClient {
    pub fn new(url: impl Into<String>) -> FeedResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| FeedError::HttpClient(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Run `query` and decode its `data` object.
    pub async fn query<T: DeserializeOwned>(&self, query: &str) -> FeedResult<T> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(|e| FeedError::HttpClient(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::HttpClient(format!("HTTP {status}: {body}")));
        }

        let body: GraphResponse<T> = response
            .json()
            .await
            .map_err(|e| FeedError::GraphQl(format!("Failed to parse response: {e}")))?;

        if !body.errors.is_empty() {
            let messages: Vec<String> = body.errors.into_iter().map(|e| e.message).collect();
            return Err(FeedError::GraphQl(messages.join("; ")));
        }
        debug!(url = %self.url, "GraphQL query answered");
        body.data
            .ok_or_else(|| FeedError::GraphQl("response without data".to_string()))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderStatData {
    order_stat: Option<OrderStats>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserStatData {
    user_stat: Option<UserStats>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiquidationsData {
    liquidated_positions: Vec<LiquidatedPosition>,
}

#[derive(Deserialize)]
struct OrdersData {
    orders: Vec<IndexedOrder>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TradeOpensData {
    aggregated_trade_opens: Vec<AggregatedTradeOpen>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReferralCodesData {
    referral_codes: Vec<ReferralCode>,
}

pub const ORDER_STATS_QUERY: &str = r#"{
  orderStat(id: "total") {
    openSwap
    openIncrease
    openDecrease
    executedSwap
    executedIncrease
    executedDecrease
    cancelledSwap
    cancelledIncrease
    cancelledDecrease
  }
}"#;

pub const USER_STATS_QUERY: &str = r#"{
  userStat(id: "total") {
    id
    uniqueCount
  }
}"#;

pub const OPEN_ORDERS_QUERY: &str = r#"{
  orders(
    first: 1000,
    orderBy: createdTimestamp,
    orderDirection: desc,
    where: {status: "open"}
  ) {
    type
    account
    index
    status
    createdTimestamp
  }
}"#;

pub const TRADE_OPENS_QUERY: &str = r#"{
  aggregatedTradeOpens(first: 1000) {
    account
    initialPosition {
      indexToken
      collateralToken
      isLong
      sizeDelta
    }
    increaseList {
      sizeDelta
    }
    decreaseList {
      sizeDelta
    }
  }
}"#;

/// Liquidations of `account`, newest first, at most 100.
pub fn liquidations_query(account: Address) -> String {
    format!(
        r#"{{
  liquidatedPositions(
    where: {{account: "{}"}}
    first: 100
    orderBy: timestamp
    orderDirection: desc
  ) {{
    key
    timestamp
    borrowFee
    loss
    collateral
    size
    markPrice
    type
  }}
}}"#,
        account.to_string().to_lowercase()
    )
}

pub fn referral_codes_query(owner: Address) -> String {
    format!(
        r#"{{
  referralCodes(first: 1000, where: {{owner: "{}"}}) {{
    code
  }}
}}"#,
        owner.to_string().to_lowercase()
    )
}

/// The three subgraphs of one chain.
pub struct Subgraphs {
    pub stats: GraphClient,
    pub trades: GraphClient,
    pub referrals: GraphClient,
}

impl Subgraphs {
    pub fn new(stats_url: &str, trades_url: &str, referrals_url: &str) -> FeedResult<Self> {
        Ok(Self {
            stats: GraphClient::new(stats_url)?,
            trades: GraphClient::new(trades_url)?,
            referrals: GraphClient::new(referrals_url)?,
        })
    }

    pub async fn order_stats(&self) -> FeedResult<Option<OrderStats>> {
        Ok(self.stats.query::<OrderStatData>(ORDER_STATS_QUERY).await?.order_stat)
    }

    pub async fn user_stats(&self) -> FeedResult<Option<UserStats>> {
        Ok(self.stats.query::<UserStatData>(USER_STATS_QUERY).await?.user_stat)
    }

    pub async fn liquidations(&self, account: Address) -> FeedResult<Vec<LiquidatedPosition>> {
        Ok(self
            .stats
            .query::<LiquidationsData>(&liquidations_query(account))
            .await?
            .liquidated_positions)
    }

    pub async fn open_orders(&self) -> FeedResult<Vec<IndexedOrder>> {
        Ok(self.stats.query::<OrdersData>(OPEN_ORDERS_QUERY).await?.orders)
    }

    pub async fn aggregated_trade_opens(&self) -> FeedResult<Vec<AggregatedTradeOpen>> {
        Ok(self
            .trades
            .query::<TradeOpensData>(TRADE_OPENS_QUERY)
            .await?
            .aggregated_trade_opens)
    }

    pub async fn referral_codes(&self, owner: Address) -> FeedResult<Vec<ReferralCode>> {
        Ok(self
            .referrals
            .query::<ReferralCodesData>(&referral_codes_query(owner))
            .await?
            .referral_codes)
    }
}
