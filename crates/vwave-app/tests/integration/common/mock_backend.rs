//! Mock backend for integration tests.
//!
//! One axum server answering both surfaces the client talks to:
//! - `POST /rpc`: JSON-RPC; `eth_call` is answered by function selector,
//!   other methods from a fixed table, everything else is an RPC error
//! - `GET /prices`, `/orders_indices`, `/vwave_supply`: backend REST

use alloy::sol_types::SolCall;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[derive(Default)]
struct BackendState {
    calls: Mutex<HashMap<[u8; 4], Vec<u8>>>,
    methods: Mutex<HashMap<String, Value>>,
    requests: Mutex<Vec<(String, Value)>>,
    prices: Mutex<Value>,
    order_indexes: Mutex<Value>,
    vwave_supply: Mutex<String>,
    rpc_down: AtomicBool,
}

/// A mock node plus REST backend.
pub struct MockBackend {
    addr: SocketAddr,
    state: Arc<BackendState>,
    shutdown_tx: oneshot::Sender<()>,
}

impl MockBackend {
    /// Start on an available port.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(BackendState::default());
        *state.prices.lock() = json!({});
        *state.order_indexes.lock() = json!({});
        *state.vwave_supply.lock() = "0".to_string();

        let router = Router::new()
            .route("/rpc", post(handle_rpc))
            .route("/prices", get(handle_prices))
            .route("/orders_indices", get(handle_order_indexes))
            .route("/vwave_supply", get(handle_vwave_supply))
            .with_state(state.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx,
        }
    }

    pub fn rpc_url(&self) -> String {
        format!("http://{}/rpc", self.addr)
    }

    pub fn server_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Answer every `eth_call` of `C` with ABI-encoded `returns`.
    pub fn on_call<C: SolCall>(&self, returns: Vec<u8>) {
        self.state.calls.lock().insert(C::SELECTOR, returns);
    }

    /// Answer a non-`eth_call` method with a fixed result.
    pub fn on_method(&self, method: &str, result: Value) {
        self.state.methods.lock().insert(method.to_string(), result);
    }

    pub fn set_prices(&self, prices: Value) {
        *self.state.prices.lock() = prices;
    }

    pub fn set_order_indexes(&self, indexes: Value) {
        *self.state.order_indexes.lock() = indexes;
    }

    /// Fail every JSON-RPC request with an internal error.
    pub fn set_rpc_down(&self, down: bool) {
        self.state.rpc_down.store(down, Ordering::SeqCst);
    }

    /// Received JSON-RPC requests as (method, params).
    pub fn rpc_requests(&self) -> Vec<(String, Value)> {
        self.state.requests.lock().clone()
    }

    pub fn rpc_count(&self, method: &str) -> usize {
        self.state.requests.lock().iter().filter(|(m, _)| m == method).count()
    }

    /// Shutdown the server.
    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}

fn rpc_error(id: &Value, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

fn eth_call_result(state: &BackendState, params: &Value) -> Option<Value> {
    let data = params[0]["data"].as_str()?;
    let bytes = hex::decode(data.trim_start_matches("0x")).ok()?;
    let selector: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
    let returns = state.calls.lock().get(&selector).cloned()?;
    Some(json!(format!("0x{}", hex::encode(returns))))
}

async fn handle_rpc(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    let id = body["id"].clone();
    let method = body["method"].as_str().unwrap_or_default().to_string();
    let params = body["params"].clone();
    state.requests.lock().push((method.clone(), params.clone()));

    if state.rpc_down.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "node unavailable").into_response();
    }

    let result = if method == "eth_call" {
        eth_call_result(&state, &params)
    } else {
        state.methods.lock().get(&method).cloned()
    };

    let response = match result {
        Some(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        None if method == "eth_call" => rpc_error(&id, -32000, "execution reverted"),
        None => rpc_error(&id, -32601, "method not found"),
    };
    Json(response).into_response()
}

async fn handle_prices(State(state): State<Arc<BackendState>>) -> Json<Value> {
    Json(state.prices.lock().clone())
}

async fn handle_order_indexes(State(state): State<Arc<BackendState>>) -> Json<Value> {
    Json(state.order_indexes.lock().clone())
}

async fn handle_vwave_supply(State(state): State<Arc<BackendState>>) -> String {
    state.vwave_supply.lock().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_backend_starts() {
        let backend = MockBackend::start().await;
        assert!(backend.rpc_url().starts_with("http://127.0.0.1:"));
        assert!(backend.rpc_url().ends_with("/rpc"));
        backend.shutdown();
    }
}
