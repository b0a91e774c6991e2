//! Application integration tests.
//!
//! Runs the application against a mock node and backend:
//! - Vault reads and index price overlay through the pollers
//! - Primary/fallback provider switching
//! - Positions and order cancellation for the configured account
//! - Order book approval, keeper execution and receipt lookup

mod integration;
use integration::common::fixtures::{address, test_config, usd, vault_props, ACCOUNT, WETH};
use integration::common::mock_backend::MockBackend;

use alloy::primitives::{B256, U256};
use alloy::sol_types::{SolCall, SolValue};
use serde_json::json;
use std::time::Duration;
use tokio::time::timeout;
use vwave_app::Application;
use vwave_feed::Source;
use vwave_rpc::abi::{IOrderBook, IPositionManager, IPositionRouter, IReader, IRouter, IVaultReader};
use vwave_tx::TxStatus;

fn funding_rates() -> Vec<U256> {
    [U256::from(100), U256::from(1_000)].repeat(3)
}

fn mock_vault(backend: &MockBackend) {
    backend.on_call::<IVaultReader::getVaultTokenInfoV4Call>((vault_props(usd(1_999), usd(2_001)),).abi_encode_params());
    backend.on_call::<IReader::getFundingRatesCall>((funding_rates(),).abi_encode_params());
    backend.on_call::<IReader::getTokenBalancesCall>((vec![U256::ZERO; 3],).abi_encode_params());
}

/// Vault prices are re-centred on the backend index price.
#[tokio::test]
async fn test_vault_and_index_prices_build_info_tokens() {
    let backend = MockBackend::start().await;
    mock_vault(&backend);
    backend.set_prices(json!({ WETH: usd(2_100).to_string() }));

    let app = Application::new(test_config(&backend.rpc_url(), None, &backend.server_url())).unwrap();
    assert!(app.feeds().refresh_vault().await);
    assert!(app.feeds().refresh_index_prices().await);

    let store = app.store();
    assert_eq!(store.info_tokens().len(), 3);
    assert!(store.last_update(Source::Vault).is_some());

    // 10 bps contract spread, re-centred on 2100
    let weth = store.token(&address(WETH)).unwrap();
    assert_eq!(weth.min_price(), Some(usd(2_100) * U256::from(9_995) / U256::from(10_000)));
    assert_eq!(weth.max_price(), Some(usd(2_100) * U256::from(10_005) / U256::from(10_000)));
    assert_eq!(weth.contract_price.unwrap().min, usd(1_999));

    // the native token is priced by its wrapped address
    let eth = store.token(&alloy::primitives::Address::ZERO).unwrap();
    assert_eq!(eth.max_price(), weth.max_price());

    backend.shutdown();
}

/// A failed index price poll keeps the last vault-derived prices.
#[tokio::test]
async fn test_failed_index_poll_keeps_vault_prices() {
    let backend = MockBackend::start().await;
    mock_vault(&backend);
    backend.set_prices(json!("not an object"));

    let app = Application::new(test_config(&backend.rpc_url(), None, &backend.server_url())).unwrap();
    assert!(app.feeds().refresh_vault().await);
    assert!(!app.feeds().refresh_index_prices().await);

    let weth = app.store().token(&address(WETH)).unwrap();
    assert_eq!(weth.min_price(), Some(usd(1_999)));
    backend.shutdown();
}

/// Reads go to the fallback when the primary node errors.
#[tokio::test]
async fn test_fallback_provider_serves_reads() {
    let primary = MockBackend::start().await;
    primary.set_rpc_down(true);
    let fallback = MockBackend::start().await;
    let contract_min = U256::from(300_000_000_000_000u64);
    fallback.on_call::<IPositionRouter::minExecutionFeeCall>((contract_min,).abi_encode_params());
    fallback.on_method("eth_gasPrice", json!("0x3b9aca00"));

    let config = test_config(&primary.rpc_url(), Some(&fallback.rpc_url()), &fallback.server_url());
    let app = Application::new(config).unwrap();
    let quote = app.execution_fee().await.unwrap().unwrap();

    // 1 gwei * 700000 gas exceeds the contract minimum
    assert_eq!(quote.fee, U256::from(700_000_000_000_000u64));
    // no vault prices from either node
    assert_eq!(quote.fee_usd, None);
    assert!(primary.rpc_count("eth_call") >= 1);
    assert_eq!(fallback.rpc_count("eth_gasPrice"), 1);
    assert!(app.rpc_fallback_calls() >= 2);

    primary.shutdown();
    fallback.shutdown();
}

/// Without a fallback the primary's error surfaces.
#[tokio::test]
async fn test_primary_error_without_fallback() {
    let primary = MockBackend::start().await;
    primary.set_rpc_down(true);

    let app = Application::new(test_config(&primary.rpc_url(), None, &primary.server_url())).unwrap();
    assert!(app.execution_fee().await.is_err());
    assert_eq!(app.rpc_fallback_calls(), 0);
    primary.shutdown();
}

#[tokio::test]
async fn test_positions_summary() {
    let backend = MockBackend::start().await;
    mock_vault(&backend);
    // long ETH 10x at 2000, then an empty short slot
    let mut raw = vec![U256::ZERO; 18];
    raw[0] = usd(10_000);
    raw[1] = usd(1_000);
    raw[2] = usd(2_000);
    raw[3] = U256::from(1_000);
    backend.on_call::<IReader::getPositionsCall>((raw,).abi_encode_params());

    let app = Application::new(test_config(&backend.rpc_url(), None, &backend.server_url())).unwrap();
    let positions = app.positions().await.unwrap();

    assert_eq!(positions.len(), 1);
    let summary = &positions[0];
    assert!(summary.position.is_long);
    assert_eq!(summary.position.index_token, address(WETH));
    assert_eq!(summary.leverage, Some(U256::from(100_000)));
    // longs are marked at the min price
    assert_eq!(summary.mark_price, Some(usd(1_999)));
    assert!(!summary.delta.unwrap().has_profit);
    assert!(summary.liquidation_price.is_some());
    backend.shutdown();
}

#[tokio::test]
async fn test_cancel_orders_sends_cancel_multiple() {
    let backend = MockBackend::start().await;
    backend.on_method("eth_estimateGas", json!("0x7530"));
    backend.on_method("eth_gasPrice", json!("0x3b9aca00"));
    let hash = B256::repeat_byte(0xab);
    backend.on_method("eth_sendTransaction", json!(hash.to_string()));

    let app = Application::new(test_config(&backend.rpc_url(), None, &backend.server_url())).unwrap();
    let submitter = app.submitter().unwrap();
    let outcome = app
        .cancel_orders(&submitter, &["Swap-3".to_string(), "Decrease-7".to_string()])
        .await
        .unwrap();

    assert_eq!(outcome.hash, hash);
    assert!(outcome.tx_url.ends_with(&hash.to_string()));
    assert_eq!(submitter.pending_txns().len(), 1);

    let requests = backend.rpc_requests();
    let (_, params) = requests
        .iter()
        .find(|(method, _)| method == "eth_sendTransaction")
        .unwrap();
    let tx = &params[0];
    assert_eq!(tx["from"].as_str().unwrap().to_lowercase(), ACCOUNT);
    let selector = hex::encode(IOrderBook::cancelMultipleCall::SELECTOR);
    assert!(tx["data"].as_str().unwrap().starts_with(&format!("0x{selector}")));
    assert_eq!(tx["gas"], "0x80e8");
    backend.shutdown();
}

#[tokio::test]
async fn test_cancel_orders_rejects_bad_key() {
    let backend = MockBackend::start().await;
    let app = Application::new(test_config(&backend.rpc_url(), None, &backend.server_url())).unwrap();
    let submitter = app.submitter().unwrap();

    assert!(app.cancel_orders(&submitter, &["Limit-1".to_string()]).await.is_err());
    assert!(app.cancel_orders(&submitter, &[]).await.is_err());
    assert_eq!(backend.rpc_count("eth_sendTransaction"), 0);
    backend.shutdown();
}

fn mock_wallet(backend: &MockBackend, hash: B256) {
    backend.on_method("eth_estimateGas", json!("0x7530"));
    backend.on_method("eth_gasPrice", json!("0x3b9aca00"));
    backend.on_method("eth_sendTransaction", json!(hash.to_string()));
}

fn sent_tx(backend: &MockBackend) -> serde_json::Value {
    let requests = backend.rpc_requests();
    let (_, params) = requests
        .iter()
        .find(|(method, _)| method == "eth_sendTransaction")
        .unwrap();
    params[0].clone()
}

#[tokio::test]
async fn test_enable_orders_approves_order_book() {
    let backend = MockBackend::start().await;
    backend.on_call::<IRouter::approvedPluginsCall>((false,).abi_encode_params());
    let hash = B256::repeat_byte(0xcd);
    mock_wallet(&backend, hash);

    let app = Application::new(test_config(&backend.rpc_url(), None, &backend.server_url())).unwrap();
    let submitter = app.submitter().unwrap();
    let outcome = app.enable_orders(&submitter).await.unwrap().unwrap();
    assert_eq!(outcome.hash, hash);
    assert_eq!(outcome.sent_message, "Enable orders sent.");

    let tx = sent_tx(&backend);
    assert_eq!(tx["to"].as_str().unwrap().to_lowercase(), "0x0000000000000000000000000000000000000008");
    let selector = hex::encode(IRouter::approvePluginCall::SELECTOR);
    let data = tx["data"].as_str().unwrap();
    assert!(data.starts_with(&format!("0x{selector}")));
    assert!(data.ends_with("0000000000000000000000000000000000000005"));
    backend.shutdown();
}

#[tokio::test]
async fn test_enable_orders_skips_when_approved() {
    let backend = MockBackend::start().await;
    backend.on_call::<IRouter::approvedPluginsCall>((true,).abi_encode_params());

    let app = Application::new(test_config(&backend.rpc_url(), None, &backend.server_url())).unwrap();
    let submitter = app.submitter().unwrap();
    assert!(app.enable_orders(&submitter).await.unwrap().is_none());
    assert_eq!(backend.rpc_count("eth_sendTransaction"), 0);
    backend.shutdown();
}

#[tokio::test]
async fn test_execute_order_pays_submitter_by_default() {
    let backend = MockBackend::start().await;
    let hash = B256::repeat_byte(0xef);
    mock_wallet(&backend, hash);
    let owner = address("0x2222222222222222222222222222222222222222");

    let app = Application::new(test_config(&backend.rpc_url(), None, &backend.server_url())).unwrap();
    let submitter = app.submitter().unwrap();
    let outcome = app.execute_order(&submitter, "Increase-4", owner, None).await.unwrap();
    assert_eq!(outcome.hash, hash);

    let tx = sent_tx(&backend);
    assert_eq!(tx["to"].as_str().unwrap().to_lowercase(), "0x0000000000000000000000000000000000000009");
    let data = hex::decode(tx["data"].as_str().unwrap().trim_start_matches("0x")).unwrap();
    let call = IPositionManager::executeIncreaseOrderCall::abi_decode(&data, true).unwrap();
    assert_eq!(call.account, owner);
    assert_eq!(call.orderIndex, U256::from(4));
    assert_eq!(call.feeReceiver, address(ACCOUNT));

    assert!(app.execute_order(&submitter, "Limit-4", owner, None).await.is_err());
    backend.shutdown();
}

#[tokio::test]
async fn test_tx_status_and_wait_for_pending() {
    let backend = MockBackend::start().await;
    let hash = B256::repeat_byte(0xab);
    mock_wallet(&backend, hash);
    backend.on_method("eth_getTransactionReceipt", json!({ "status": "0x1" }));

    let app = Application::new(test_config(&backend.rpc_url(), None, &backend.server_url())).unwrap();
    assert_eq!(app.tx_status(hash).await.unwrap(), TxStatus::Succeeded);

    let submitter = app.submitter().unwrap();
    app.cancel_orders(&submitter, &["Swap-3".to_string()]).await.unwrap();
    let resolved = app.wait_for_pending(&submitter, Duration::from_secs(5)).await;
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].0.hash, hash);
    assert_eq!(resolved[0].1, TxStatus::Succeeded);
    assert!(submitter.pending_txns().is_empty());
    backend.shutdown();
}

/// Pollers write into the store and stop on shutdown.
#[tokio::test]
async fn test_run_polls_until_shutdown() {
    let backend = MockBackend::start().await;
    mock_vault(&backend);
    backend.set_prices(json!({ WETH: usd(2_000).to_string() }));

    let app = Application::new(test_config(&backend.rpc_url(), None, &backend.server_url())).unwrap();
    let store = app.store().clone();
    let shutdown = app.shutdown_token();
    let handle = tokio::spawn(app.run());

    let populated = timeout(Duration::from_secs(3), async {
        loop {
            if store.last_update(Source::IndexPrices).is_some() && store.last_update(Source::Vault).is_some() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    assert!(populated.is_ok(), "pollers should populate the store");
    assert_eq!(store.info_tokens().len(), 3);

    shutdown.cancel();
    let stopped = timeout(Duration::from_secs(3), handle).await;
    assert!(stopped.is_ok(), "run should return after shutdown");
    tokio_test::assert_ok!(stopped.unwrap().unwrap());
    backend.shutdown();
}
