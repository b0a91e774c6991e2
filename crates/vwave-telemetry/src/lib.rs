//! Prometheus metrics and structured logging for the VWAVE client.
//!
//! - `init_logging`: tracing subscriber with JSON output in production
//! - `Metrics`: RPC fallback, polling and transaction counters

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
