//! JSON-RPC 2.0 transports.
//!
//! `RpcTransport` is the seam every higher layer talks to. `HttpTransport`
//! posts to a node URL; `MockTransport` serves canned responses in tests.

use crate::error::{RpcError, RpcResult};
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Default timeout for a single HTTP round trip.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A JSON-RPC endpoint.
pub trait RpcTransport: Send + Sync {
    /// Send one request and return its `result` value.
    fn request<'a>(&'a self, method: &'a str, params: Value) -> BoxFuture<'a, RpcResult<Value>>;

    /// Short label for logs and metrics.
    fn name(&self) -> &str;
}

/// Arc wrapper for RpcTransport trait objects.
pub type DynTransport = Arc<dyn RpcTransport>;

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

impl RpcErrorObject {
    fn into_error(self) -> RpcError {
        let data_message = self
            .data
            .as_ref()
            .and_then(|d| d.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string);
        RpcError::Rpc {
            code: self.code,
            message: self.message,
            data_message,
        }
    }
}

/// Parse a JSON-RPC response envelope.
pub(crate) fn parse_response(body: Value) -> RpcResult<Value> {
    let response: RpcResponse = serde_json::from_value(body)
        .map_err(|e| RpcError::InvalidResponse(format!("Malformed JSON-RPC envelope: {e}")))?;
    if let Some(error) = response.error {
        return Err(error.into_error());
    }
    Ok(response.result.unwrap_or(Value::Null))
}

/// JSON-RPC over HTTP POST.
pub struct HttpTransport {
    client: Client,
    url: String,
    label: String,
    next_id: AtomicU64,
}

impl HttpTransport {
    /// Create a transport for `url`.
    ///
    /// # Arguments
    /// * `url` - Node endpoint (e.g., "https://mainnet.aurora.dev")
    /// * `label` - Name used in logs and metric labels
    pub fn new(url: impl Into<String>, label: impl Into<String>) -> RpcResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| RpcError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
            label: label.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RpcTransport for HttpTransport {
    fn request<'a>(&'a self, method: &'a str, params: Value) -> BoxFuture<'a, RpcResult<Value>> {
        Box::pin(async move {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let body = json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            });
            trace!(provider = %self.label, method, id, "Sending JSON-RPC request");

            let response = self
                .client
                .post(&self.url)
                .json(&body)
                .send()
                .await
                .map_err(|e| RpcError::HttpClient(format!("HTTP request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(RpcError::HttpClient(format!("HTTP {status}: {text}")));
            }

            let value: Value = response
                .json()
                .await
                .map_err(|e| RpcError::InvalidResponse(format!("Failed to parse response: {e}")))?;

            debug!(provider = %self.label, method, id, "JSON-RPC response received");
            parse_response(value)
        })
    }

    fn name(&self) -> &str {
        &self.label
    }
}

/// Mock transport for testing.
///
/// Responses are queued per method; a method with an empty queue returns
/// the default response, or an error when none is set.
#[derive(Debug)]
pub struct MockTransport {
    label: String,
    responses: Mutex<HashMap<String, VecDeque<RpcResult<Value>>>>,
    defaults: Mutex<HashMap<String, Value>>,
    calls: Mutex<Vec<(String, Value)>>,
    delay: Mutex<Option<Duration>>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new("mock")
    }
}

impl MockTransport {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            responses: Mutex::new(HashMap::new()),
            defaults: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
        }
    }

    /// Queue a one-shot response for `method`.
    pub fn push_response(&self, method: &str, response: RpcResult<Value>) {
        self.responses
            .lock()
            .entry(method.to_string())
            .or_default()
            .push_back(response);
    }

    /// Answer every `method` call with `value` once the queue is drained.
    pub fn set_default(&self, method: &str, value: Value) {
        self.defaults.lock().insert(method.to_string(), value);
    }

    /// Delay every response, e.g. to trigger a caller's timeout.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    /// Get recorded calls.
    pub fn get_calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|(m, _)| m == method).count()
    }
}

impl RpcTransport for MockTransport {
    fn request<'a>(&'a self, method: &'a str, params: Value) -> BoxFuture<'a, RpcResult<Value>> {
        Box::pin(async move {
            self.calls.lock().push((method.to_string(), params));
            let delay = *self.delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let queued = self
                .responses
                .lock()
                .get_mut(method)
                .and_then(VecDeque::pop_front);
            if let Some(response) = queued {
                return response;
            }
            self.defaults
                .lock()
                .get(method)
                .cloned()
                .ok_or_else(|| RpcError::InvalidResponse(format!("no mock response for {method}")))
        })
    }

    fn name(&self) -> &str {
        &self.label
    }
}
