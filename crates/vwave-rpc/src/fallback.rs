//! Timeout + fallback combinator over two transports.
//!
//! Each call goes to the primary first. If it errors or does not answer
//! within the timeout, the primary future is dropped and the call is sent
//! once to the fallback. Without a fallback the primary's error is
//! returned unchanged.

use crate::error::{RpcError, RpcResult};
use crate::transport::{BoxFuture, DynTransport, RpcTransport};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::warn;
use vwave_telemetry::Metrics;

/// Primary response deadline before switching to the fallback.
pub const DEFAULT_PRIMARY_TIMEOUT: Duration = Duration::from_secs(2);

pub struct FallbackTransport {
    primary: DynTransport,
    fallback: Option<DynTransport>,
    timeout: Duration,
    fallback_calls: AtomicU64,
}

impl FallbackTransport {
    pub fn new(primary: DynTransport, fallback: Option<DynTransport>) -> Self {
        Self {
            primary,
            fallback,
            timeout: DEFAULT_PRIMARY_TIMEOUT,
            fallback_calls: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of calls that were sent to the fallback.
    pub fn fallback_calls(&self) -> u64 {
        self.fallback_calls.load(Ordering::Relaxed)
    }

    pub fn has_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    async fn call_primary(&self, method: &str, params: Value) -> RpcResult<Value> {
        match tokio::time::timeout(self.timeout, self.primary.request(method, params)).await {
            Ok(result) => result,
            Err(_) => Err(RpcError::Timeout(self.timeout)),
        }
    }
}

impl RpcTransport for FallbackTransport {
    fn request<'a>(&'a self, method: &'a str, params: Value) -> BoxFuture<'a, RpcResult<Value>> {
        Box::pin(async move {
            let primary_error = match self.call_primary(method, params.clone()).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            Metrics::rpc_error(method, "primary");

            let Some(fallback) = &self.fallback else {
                return Err(primary_error);
            };

            warn!(
                method,
                provider = fallback.name(),
                error = %primary_error,
                "Using fallback provider for {method}"
            );
            self.fallback_calls.fetch_add(1, Ordering::Relaxed);
            Metrics::rpc_fallback(method);

            fallback.request(method, params).await.map_err(|e| {
                Metrics::rpc_error(method, "fallback");
                e
            })
        })
    }

    fn name(&self) -> &str {
        self.primary.name()
    }
}
