//! Integration tests for vwave-app.
//!
//! These tests run the application against a local mock backend:
//! - JSON-RPC node (eth_call by selector, gas, wallet)
//! - REST index prices and order indexes
//! - Primary/fallback provider switching

pub mod common;
