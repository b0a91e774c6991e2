//! Shared fixtures for integration tests.

pub mod fixtures;
pub mod mock_backend;
