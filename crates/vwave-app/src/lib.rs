//! Headless VWAVE trading client.
//!
//! Wires the feed, math and transaction crates into one application:
//! - Configuration loading (TOML)
//! - Polling tasks for index prices, vault state, staking and account orders
//! - Persisted user preferences
//! - One-shot quotes, position summaries and order cancellation

pub mod app;
pub mod config;
pub mod error;
pub mod prefs;

pub use app::{Application, Feeds, OrderSummary, PositionSummary, SwapPreview};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use prefs::{PrefKey, Preferences};
