//! Main application orchestration.
//!
//! Builds the transports and loaders from configuration, runs one polling
//! task per data source against a shared `FeedStore`, and exposes the
//! one-shot queries and writes used by the CLI.

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use alloy::primitives::{Address, B256, U256};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vwave_core::amount::amount_from_decimal;
use vwave_core::{ChainConfig, InfoTokens, Order, Position, TokenSpec};
use vwave_feed::{
    fetch_positions, FeedStore, InfoTokensLoader, OrdersLoader, ServerClient, Source, StakingLoader, Subgraphs,
};
use vwave_math::{
    leverage, liquidation_price, next_from_amount, next_to_amount, order_error, position_delta, position_for_order,
    FeeSchedule, LeverageInput, LiquidationInput, OrderValidationError, PositionDelta, SwapParams, SwapQuote,
};
use vwave_rpc::{ContractReader, DynTransport, FallbackTransport, HttpTransport};
use vwave_telemetry::Metrics;
use vwave_tx::orders::{approve_order_book, cancel_multiple, execute_order, is_plugin_approved, parse_cancel_key};
use vwave_tx::{
    fetch_min_execution_fee, fetch_receipt_status, DynTxSender, ExecutionFeeQuote, PendingTxn, RpcTxSender,
    SubmitOutcome, Submitter, TxStatus,
};

/// Interval of the status line logged by `run`.
const STATUS_INTERVAL: Duration = Duration::from_secs(30);

/// Interval between receipt polls while waiting on pending transactions.
const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Both sides of a swap preview.
#[derive(Debug, Clone)]
pub struct SwapPreview {
    pub from_token: TokenSpec,
    pub to_token: TokenSpec,
    pub from_amount: U256,
    pub to_amount: U256,
    pub fee_basis_points: u32,
}

/// Open position with its derived figures at the current price.
#[derive(Debug, Clone)]
pub struct PositionSummary {
    pub key: String,
    pub position: Position,
    pub mark_price: Option<U256>,
    pub leverage: Option<U256>,
    pub liquidation_price: Option<U256>,
    pub delta: Option<PositionDelta>,
}

/// Open order with its validation result against current positions.
#[derive(Debug, Clone)]
pub struct OrderSummary {
    pub order: Order,
    pub error: Option<OrderValidationError>,
}

/// Loaders and the store they write into. Shared by every poller.
pub struct Feeds {
    chain: Arc<ChainConfig>,
    account: Option<Address>,
    reader: ContractReader,
    store: Arc<FeedStore>,
    info: InfoTokensLoader,
    staking: StakingLoader,
    orders: OrdersLoader,
}

impl Feeds {
    pub fn new(
        chain: Arc<ChainConfig>,
        account: Option<Address>,
        reader: ContractReader,
        server: Arc<ServerClient>,
        vwave_price: Option<U256>,
    ) -> Self {
        Self {
            info: InfoTokensLoader::new(reader.clone(), server.clone(), chain.clone()),
            staking: StakingLoader::new(reader.clone(), server.clone(), chain.clone()).with_vwave_price(vwave_price),
            orders: OrdersLoader::new(reader.clone(), server, chain.clone()),
            chain,
            account,
            reader,
            store: Arc::new(FeedStore::new()),
        }
    }

    pub fn store(&self) -> &Arc<FeedStore> {
        &self.store
    }

    /// Index prices only; rebuilds tokens from the last vault snapshot.
    pub async fn refresh_index_prices(&self) -> bool {
        match self.info.load_index_prices().await {
            Some(prices) => {
                self.store.set_index_prices(prices);
                self.store.rebuild_info_tokens(&self.chain);
                true
            }
            None => false,
        }
    }

    pub async fn refresh_vault(&self) -> bool {
        let snapshot = self.info.load_vault(self.account).await;
        let ok = snapshot.vault_token_info.is_some();
        self.store.set_vault_snapshot(snapshot);
        self.store.rebuild_info_tokens(&self.chain);
        ok
    }

    pub async fn refresh_staking(&self) -> bool {
        let inputs = self.staking.load(self.account).await;
        self.store.set_staking(inputs);
        self.store.processed_staking().is_some()
    }

    /// Orders and positions of the configured account; a no-op without one.
    pub async fn refresh_account(&self) -> bool {
        let Some(account) = self.account else {
            return true;
        };
        let (orders, positions) = tokio::join!(
            self.orders.load(account),
            fetch_positions(&self.reader, &self.chain, account)
        );
        let mut ok = true;
        match orders {
            Ok(orders) => self.store.set_orders(orders),
            Err(e) => {
                warn!(error = %e, "Failed to load orders");
                ok = false;
            }
        }
        match positions {
            Ok(positions) => self.store.set_positions(positions),
            Err(e) => {
                warn!(error = %e, "Failed to load positions");
                ok = false;
            }
        }
        ok
    }

    /// One round of every source.
    pub async fn refresh_all(&self) {
        let (prices, vault, staking, account) = tokio::join!(
            self.info.load_index_prices(),
            self.info.load_vault(self.account),
            self.refresh_staking(),
            self.refresh_account()
        );
        if let Some(prices) = prices {
            self.store.set_index_prices(prices);
        }
        self.store.set_vault_snapshot(vault);
        self.store.rebuild_info_tokens(&self.chain);
        debug!(staking, account, tokens = self.store.info_tokens().len(), "Full refresh done");
    }
}

/// Run `poll` every `period` until `shutdown` fires. Each round is timed and
/// counted as failed when `poll` returns false.
fn spawn_poller<F, Fut>(source: Source, period: Duration, shutdown: CancellationToken, mut poll: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(source = source.as_str(), period_ms = period.as_millis() as u64, "Poller started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let started = Instant::now();
                    let ok = poll().await;
                    Metrics::poll_duration(source.as_str(), started.elapsed().as_secs_f64() * 1000.0);
                    if !ok {
                        Metrics::poll_failed(source.as_str());
                    }
                }
            }
        }
        debug!(source = source.as_str(), "Poller stopped");
    })
}

/// Main application.
pub struct Application {
    config: AppConfig,
    chain: Arc<ChainConfig>,
    account: Option<Address>,
    transport: Arc<FallbackTransport>,
    reader: ContractReader,
    server: Arc<ServerClient>,
    subgraphs: Option<Subgraphs>,
    feeds: Arc<Feeds>,
    shutdown: CancellationToken,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let chain = Arc::new(config.chain_config()?);
        let account = config.account()?;

        let primary: DynTransport = Arc::new(HttpTransport::new(&config.rpc.primary_url, "primary")?);
        let fallback = match &config.rpc.fallback_url {
            Some(url) => Some(Arc::new(HttpTransport::new(url, "fallback")?) as DynTransport),
            None => None,
        };
        let transport =
            Arc::new(FallbackTransport::new(primary, fallback).with_timeout(config.rpc.primary_timeout()));
        let reader = ContractReader::new(transport.clone() as DynTransport);
        let server = Arc::new(ServerClient::new(&config.server_url)?);

        let subgraphs = match (&config.subgraphs.stats, &config.subgraphs.trades, &config.subgraphs.referrals) {
            (Some(stats), Some(trades), Some(referrals)) => Some(Subgraphs::new(stats, trades, referrals)?),
            _ => {
                debug!("Subgraph endpoints not fully configured");
                None
            }
        };

        let feeds = Arc::new(Feeds::new(
            chain.clone(),
            account,
            reader.clone(),
            server.clone(),
            config.vwave_price()?,
        ));

        info!(
            chain_id = chain.chain_id,
            chain = chain.name(),
            tokens = chain.tokens.len(),
            account = ?account,
            fallback = transport.has_fallback(),
            "Application initialized"
        );

        Ok(Self {
            config,
            chain,
            account,
            transport,
            reader,
            server,
            subgraphs,
            feeds,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn chain(&self) -> &Arc<ChainConfig> {
        &self.chain
    }

    pub fn feeds(&self) -> &Arc<Feeds> {
        &self.feeds
    }

    pub fn store(&self) -> &Arc<FeedStore> {
        self.feeds.store()
    }

    pub fn server(&self) -> &Arc<ServerClient> {
        &self.server
    }

    pub fn subgraphs(&self) -> Option<&Subgraphs> {
        self.subgraphs.as_ref()
    }

    /// Reads that were answered by the fallback provider.
    pub fn rpc_fallback_calls(&self) -> u64 {
        self.transport.fallback_calls()
    }

    /// Token used to stop `run` from another task.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    fn spawn_pollers(&self) -> Vec<JoinHandle<()>> {
        let polling = &self.config.polling;
        let feeds = &self.feeds;
        let mut handles = Vec::new();

        let f = feeds.clone();
        handles.push(spawn_poller(Source::IndexPrices, polling.index_prices(), self.shutdown.clone(), move || {
            let f = f.clone();
            async move { f.refresh_index_prices().await }
        }));
        let f = feeds.clone();
        handles.push(spawn_poller(Source::Vault, polling.vault(), self.shutdown.clone(), move || {
            let f = f.clone();
            async move { f.refresh_vault().await }
        }));
        let f = feeds.clone();
        handles.push(spawn_poller(Source::Staking, polling.staking(), self.shutdown.clone(), move || {
            let f = f.clone();
            async move { f.refresh_staking().await }
        }));
        if self.account.is_some() {
            let f = feeds.clone();
            handles.push(spawn_poller(Source::Orders, polling.orders(), self.shutdown.clone(), move || {
                let f = f.clone();
                async move { f.refresh_account().await }
            }));
        }
        handles
    }

    fn log_status(&self) {
        if let Some(path) = &self.config.metrics_path {
            if let Err(e) = write_metrics(Path::new(path)) {
                warn!(path = %path, error = %e, "Failed to write metrics");
            }
        }
        let store = self.store();
        info!(
            tokens = store.info_tokens().len(),
            orders = store.orders().len(),
            positions = store.positions().len(),
            staking_ready = store.processed_staking().is_some(),
            rpc_fallbacks = self.transport.fallback_calls(),
            "Status"
        );
    }

    /// Poll until Ctrl-C or the shutdown token fires.
    pub async fn run(self) -> AppResult<()> {
        info!("Starting pollers");
        let handles = self.spawn_pollers();

        let mut status_interval = tokio::time::interval(STATUS_INTERVAL);
        status_interval.tick().await;

        loop {
            tokio::select! {
                _ = status_interval.tick() => self.log_status(),
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    self.shutdown.cancel();
                    break;
                }
            }
        }

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Poller task ended abnormally");
            }
        }
        info!("Application stopped");
        Ok(())
    }

    /// Swap preview. With `reverse` the amount is the desired output.
    pub async fn quote_swap(
        &self,
        from_symbol: &str,
        to_symbol: &str,
        amount: Decimal,
        reverse: bool,
    ) -> AppResult<SwapPreview> {
        let from_token = self.chain.token_by_symbol(from_symbol)?.clone();
        let to_token = self.chain.token_by_symbol(to_symbol)?.clone();

        let (info_tokens, pool) = tokio::join!(
            self.feeds.info.load(self.account),
            self.feeds.info.fetch_pool_totals()
        );
        let pool = pool
            .map_err(|e| warn!(error = %e, "Pool totals unavailable, using base fees"))
            .ok();

        let params = SwapParams {
            from_token: from_token.address,
            to_token: to_token.address,
            info_tokens: &info_tokens,
            pool: pool.as_ref(),
            fees: &self.config.fees,
            ratio: None,
            to_token_price_usd: None,
            for_swap: true,
        };

        let (from_amount, to_amount, SwapQuote { fee_basis_points, .. }) = if reverse {
            let to_amount = amount_from_decimal(amount, to_token.decimals)?;
            let quote = next_from_amount(to_amount, &params);
            (quote.amount, to_amount, quote)
        } else {
            let from_amount = amount_from_decimal(amount, from_token.decimals)?;
            let quote = next_to_amount(from_amount, &params);
            (from_amount, quote.amount, quote)
        };

        Ok(SwapPreview {
            from_token,
            to_token,
            from_amount,
            to_amount,
            fee_basis_points,
        })
    }

    fn require_account(&self) -> AppResult<Address> {
        self.account
            .ok_or_else(|| AppError::Config("no account configured".to_string()))
    }

    /// Positions of the configured account with leverage, liquidation price
    /// and PnL at the current mark price.
    pub async fn positions(&self) -> AppResult<Vec<PositionSummary>> {
        let account = self.require_account()?;
        let (info_tokens, positions) = tokio::join!(
            self.feeds.info.load(Some(account)),
            fetch_positions(&self.reader, &self.chain, account)
        );
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        let mut summaries: Vec<_> = positions?
            .into_iter()
            .filter(|(_, p)| p.is_open())
            .map(|(key, position)| summarize_position(key, position, &info_tokens, &self.config.fees, now))
            .collect();
        summaries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(summaries)
    }

    /// Open orders of the configured account, validated against positions.
    pub async fn orders(&self) -> AppResult<Vec<OrderSummary>> {
        let account = self.require_account()?;
        let (orders, positions) = tokio::join!(
            self.feeds.orders.load(account),
            fetch_positions(&self.reader, &self.chain, account)
        );
        let positions: HashMap<String, Position> = positions?;
        let native = self.chain.contracts.native_token;
        Ok(orders?
            .into_iter()
            .map(|order| {
                let error = order_error(&order, position_for_order(&order, &positions, native));
                OrderSummary { order, error }
            })
            .collect())
    }

    pub async fn execution_fee(&self) -> AppResult<Option<ExecutionFeeQuote>> {
        let info_tokens = self.feeds.info.load(None).await;
        Ok(fetch_min_execution_fee(&self.reader, &self.chain, &info_tokens).await?)
    }

    /// Submitter sending through the configured wallet endpoint.
    pub fn submitter(&self) -> AppResult<Submitter> {
        let account = self.require_account()?;
        let wallet_url = self
            .config
            .rpc
            .wallet_url
            .as_deref()
            .ok_or_else(|| AppError::Config("rpc.wallet_url is required to send transactions".to_string()))?;
        let wallet: DynTransport = Arc::new(HttpTransport::new(wallet_url, "wallet")?);
        let sender: DynTxSender = Arc::new(RpcTxSender::new(wallet));
        Ok(Submitter::new(self.reader.clone(), sender, self.chain.clone(), account))
    }

    /// Cancel orders by key (`Swap-3` or `Swap-0xabc...-3`) in one call.
    pub async fn cancel_orders(&self, submitter: &Submitter, keys: &[String]) -> AppResult<SubmitOutcome> {
        if keys.is_empty() {
            return Err(AppError::Config("no orders to cancel".to_string()));
        }
        let orders = keys
            .iter()
            .map(|key| parse_cancel_key(key))
            .collect::<Result<Vec<_>, _>>()?;
        let request = cancel_multiple(&self.chain, &orders);
        Ok(submitter.submit(request).await?)
    }

    /// Approve the order book as a router plugin. Returns `None` when the
    /// account already approved it.
    pub async fn enable_orders(&self, submitter: &Submitter) -> AppResult<Option<SubmitOutcome>> {
        let order_book = self.chain.contracts.order_book;
        if is_plugin_approved(&self.reader, &self.chain, submitter.account(), order_book).await? {
            info!(plugin = %order_book, "Orders already enabled");
            return Ok(None);
        }
        Ok(Some(submitter.submit(approve_order_book(&self.chain)).await?))
    }

    /// Execute another account's order through the position manager.
    /// Fees go to the submitting account unless `fee_receiver` is given.
    pub async fn execute_order(
        &self,
        submitter: &Submitter,
        key: &str,
        account: Address,
        fee_receiver: Option<Address>,
    ) -> AppResult<SubmitOutcome> {
        let (kind, index) = parse_cancel_key(key)?;
        let receiver = fee_receiver.unwrap_or_else(|| submitter.account());
        let request = execute_order(&self.chain, kind, account, index, receiver);
        Ok(submitter.submit(request).await?)
    }

    /// Receipt state of a transaction by hash.
    pub async fn tx_status(&self, hash: B256) -> AppResult<TxStatus> {
        Ok(fetch_receipt_status(&self.reader, hash).await?)
    }

    /// Poll receipts until every pending transaction of `submitter` is mined,
    /// or until `timeout` or shutdown. Returns the resolved transactions.
    pub async fn wait_for_pending(
        &self,
        submitter: &Submitter,
        timeout: Duration,
    ) -> Vec<(PendingTxn, TxStatus)> {
        let deadline = Instant::now() + timeout;
        let mut resolved = Vec::new();
        loop {
            resolved.extend(submitter.check_pending().await);
            if submitter.pending_txns().is_empty() {
                break;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                warn!(pending = submitter.pending_txns().len(), "Gave up waiting for receipts");
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(RECEIPT_POLL_INTERVAL.min(remaining)) => {}
                _ = self.shutdown.cancelled() => break,
            }
        }
        resolved
    }
}

/// Write the metrics registry in text exposition format, replacing `path`
/// through a temporary file so readers never see a partial write.
fn write_metrics(path: &Path) -> AppResult<()> {
    let body = Metrics::render()?;
    let tmp = path.with_extension("prom.tmp");
    std::fs::write(&tmp, body)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn summarize_position(
    key: String,
    position: Position,
    info_tokens: &InfoTokens,
    fees: &FeeSchedule,
    now: u64,
) -> PositionSummary {
    let index = info_tokens.get(&position.index_token);
    let collateral = info_tokens.get(&position.collateral_token);
    // longs close at the min price, shorts at the max
    let mark_price = index.and_then(|t| if position.is_long { t.min_price() } else { t.max_price() });
    let cumulative_funding_rate = collateral.and_then(|t| t.cumulative_funding_rate());
    let delta = mark_price.map(|price| position_delta(price, &position, None, now));

    let leverage = leverage(&LeverageInput {
        size: Some(position.size),
        collateral: Some(position.collateral),
        entry_funding_rate: Some(position.entry_funding_rate),
        cumulative_funding_rate,
        has_profit: delta.map(|d| d.has_profit).unwrap_or(false),
        delta: delta.map(|d| d.delta),
        include_delta: false,
        fees: fees.clone(),
        ..Default::default()
    });
    let liquidation_price = liquidation_price(&LiquidationInput {
        is_long: position.is_long,
        size: Some(position.size),
        collateral: Some(position.collateral),
        average_price: Some(position.average_price),
        entry_funding_rate: Some(position.entry_funding_rate),
        cumulative_funding_rate,
        fees: fees.clone(),
        ..Default::default()
    });

    PositionSummary {
        key,
        position,
        mark_price,
        leverage,
        liquidation_price,
        delta,
    }
}
