//! Data feeds for the VWAVE trading client.
//!
//! Loads vault, price, staking, order and position state from the chain,
//! the REST backend and the subgraphs, and keeps the latest values in a
//! shared `FeedStore`.

pub mod error;
pub mod graph;
pub mod info_tokens;
pub mod orders;
pub mod positions;
pub mod server;
pub mod staking;
pub mod store;

pub use error::{FeedError, FeedResult};
pub use graph::{GraphClient, Subgraphs};
pub use info_tokens::{build_info_tokens, InfoTokenSources, InfoTokensLoader, VaultSnapshot};
pub use orders::{LastIndexes, OrdersLoader};
pub use positions::{fetch_positions, position_query, PositionQuery};
pub use server::{IndexPrices, OrderIndexes, ServerClient, TradeAction};
pub use staking::{processed_data, ProcessedData, StakingInputs, StakingLoader};
pub use store::{FeedStore, Source};
