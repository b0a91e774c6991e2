//! VWAVE headless trading client - Entry Point
//!
//! `watch` runs the pollers; the other commands read or write once and exit.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use alloy::primitives::{Address, B256};
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::info;
use vwave_app::prefs::{PrefKey, Preferences};
use vwave_app::{AppConfig, Application};
use vwave_core::amount::{amount_from_decimal, bps_to_percent};
use vwave_core::chain::tx_url;
use vwave_core::constants::USD_DECIMALS;
use vwave_core::format::{format_amount, shorten_address};
use vwave_math::{delta_display, liquidation_price, LiquidationInput};
use vwave_tx::{SubmitOutcome, Submitter, TxStatus};

/// VWAVE trading client
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via VWAVE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// After sending a transaction, wait up to this many seconds for its receipt
    #[arg(long, global = true, value_name = "SECS")]
    wait: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll every data source until Ctrl-C
    Watch,
    /// Preview a swap through the vault
    QuoteSwap {
        from: String,
        to: String,
        amount: Decimal,
        /// Treat the amount as the desired output
        #[arg(long)]
        reverse: bool,
    },
    /// Liquidation price of a hypothetical position (USD values)
    Liquidation {
        #[arg(long)]
        size: Decimal,
        #[arg(long)]
        collateral: Decimal,
        #[arg(long)]
        average_price: Decimal,
        #[arg(long)]
        short: bool,
    },
    /// Open positions of the configured account
    Positions,
    /// Open orders of the configured account
    Orders,
    /// Staking and vesting summary
    Staking,
    /// Current minimum keeper execution fee
    ExecutionFee,
    /// Cancel orders by key, e.g. `Swap-3 Decrease-7`
    CancelOrders { keys: Vec<String> },
    /// Approve the order book as a router plugin so orders can be placed
    EnableOrders,
    /// Execute an account's order through the position manager
    ExecuteOrder {
        /// Order key, e.g. `Increase-4`
        key: String,
        /// Owner of the order
        #[arg(long)]
        account: Address,
        /// Receives the execution fee; defaults to the sending account
        #[arg(long)]
        fee_receiver: Option<Address>,
    },
    /// Receipt status of a transaction
    TxStatus { hash: B256 },
    /// Read or write persisted preferences
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
}

#[derive(Subcommand, Debug)]
enum PrefsAction {
    Get { key: String },
    Set { key: String, value: String },
    Remove { key: String },
}

fn usd(amount: Option<alloy::primitives::U256>) -> String {
    format!("${}", format_amount(amount, USD_DECIMALS, Some(2), true))
}

async fn report_sent(app: &Application, submitter: &Submitter, outcome: SubmitOutcome, wait: Option<u64>) {
    println!("{} {}", outcome.sent_message, outcome.tx_url);
    let Some(secs) = wait else {
        return;
    };
    let resolved = app.wait_for_pending(submitter, Duration::from_secs(secs)).await;
    for (txn, status) in resolved {
        match status {
            TxStatus::Succeeded => println!("{}", txn.message),
            TxStatus::Reverted => println!("Transaction {} reverted", txn.hash),
            TxStatus::Pending => {}
        }
    }
    if !submitter.pending_txns().is_empty() {
        println!("Still pending after {secs}s");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    vwave_telemetry::init_logging()?;

    info!("Starting VWAVE client v{}", env!("CARGO_PKG_VERSION"));

    // Config path: CLI arg > VWAVE_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("VWAVE_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = AppConfig::from_file(&config_path)?;

    match args.command {
        Command::Watch => {
            let app = Application::new(config)?;
            app.feeds().refresh_all().await;
            app.run().await?;
        }
        Command::QuoteSwap {
            from,
            to,
            amount,
            reverse,
        } => {
            let app = Application::new(config)?;
            let preview = app.quote_swap(&from, &to, amount, reverse).await?;
            println!(
                "{} {} -> {} {} (fee {}%)",
                format_amount(Some(preview.from_amount), preview.from_token.decimals, None, true),
                preview.from_token.symbol,
                format_amount(Some(preview.to_amount), preview.to_token.decimals, None, true),
                preview.to_token.symbol,
                bps_to_percent(preview.fee_basis_points),
            );
        }
        Command::Liquidation {
            size,
            collateral,
            average_price,
            short,
        } => {
            let input = LiquidationInput {
                is_long: !short,
                size: Some(amount_from_decimal(size, USD_DECIMALS)?),
                collateral: Some(amount_from_decimal(collateral, USD_DECIMALS)?),
                average_price: Some(amount_from_decimal(average_price, USD_DECIMALS)?),
                fees: config.fees.clone(),
                ..Default::default()
            };
            println!("Liquidation price: {}", usd(liquidation_price(&input)));
        }
        Command::Positions => {
            let app = Application::new(config)?;
            let positions = app.positions().await?;
            if positions.is_empty() {
                println!("No open positions");
            }
            for p in positions {
                let symbol = app
                    .chain()
                    .token(&p.position.index_token)
                    .map(|t| t.symbol.as_str())
                    .unwrap_or("?");
                let side = if p.position.is_long { "Long" } else { "Short" };
                let pnl = p
                    .delta
                    .map(|d| {
                        let (amount, percent) = delta_display(d.delta, d.delta_percentage, d.has_profit);
                        format!("{amount} ({percent})")
                    })
                    .unwrap_or_else(|| "...".to_string());
                println!(
                    "{side} {symbol} size {} collateral {} leverage {}x liq {} mark {} pnl {pnl}",
                    usd(Some(p.position.size)),
                    usd(Some(p.position.collateral)),
                    format_amount(p.leverage, 4, Some(2), true),
                    usd(p.liquidation_price),
                    usd(p.mark_price),
                );
            }
        }
        Command::Orders => {
            let app = Application::new(config)?;
            let orders = app.orders().await?;
            if orders.is_empty() {
                println!("No open orders");
            }
            for o in orders {
                let status = o.error.map(|e| e.to_string()).unwrap_or_else(|| "valid".to_string());
                println!("{} {status}", o.order.key());
            }
        }
        Command::Staking => {
            let app = Application::new(config)?;
            app.feeds().refresh_staking().await;
            let Some(data) = app.store().processed_staking() else {
                bail!("staking data incomplete, see logs for failed reads");
            };
            println!("{data:#?}");
        }
        Command::ExecutionFee => {
            let app = Application::new(config)?;
            let native_decimals = app.chain().native_token().map(|t| t.decimals).unwrap_or(18);
            match app.execution_fee().await? {
                Some(quote) => {
                    println!(
                        "{} {} ({})",
                        format_amount(Some(quote.fee), native_decimals, Some(6), false),
                        app.chain().native_symbol,
                        usd(quote.fee_usd),
                    );
                    if let Some(message) = quote.error_message() {
                        println!("{message}");
                    }
                }
                None => println!("Execution fee unavailable"),
            }
        }
        Command::CancelOrders { keys } => {
            let app = Application::new(config)?;
            let submitter = app.submitter()?;
            let outcome = app.cancel_orders(&submitter, &keys).await?;
            info!(
                account = %shorten_address(&submitter.account().to_string(), 13),
                orders = keys.len(),
                "Cancel sent"
            );
            report_sent(&app, &submitter, outcome, args.wait).await;
        }
        Command::EnableOrders => {
            let app = Application::new(config)?;
            let submitter = app.submitter()?;
            match app.enable_orders(&submitter).await? {
                Some(outcome) => report_sent(&app, &submitter, outcome, args.wait).await,
                None => println!("Orders already enabled"),
            }
        }
        Command::ExecuteOrder {
            key,
            account,
            fee_receiver,
        } => {
            let app = Application::new(config)?;
            let submitter = app.submitter()?;
            let outcome = app.execute_order(&submitter, &key, account, fee_receiver).await?;
            report_sent(&app, &submitter, outcome, args.wait).await;
        }
        Command::TxStatus { hash } => {
            let app = Application::new(config)?;
            let status = match app.tx_status(hash).await? {
                TxStatus::Pending => "pending",
                TxStatus::Succeeded => "succeeded",
                TxStatus::Reverted => "reverted",
            };
            println!("{hash} {status} {}", tx_url(app.chain().chain_id, &hash.to_string()));
        }
        Command::Prefs { action } => {
            let prefs = Preferences::load(&config.prefs_path)?;
            let chain_id = config.chain_id;
            let key_of = |name: &str| PrefKey::from_name(name).with_context(|| format!("unknown preference {name}"));
            match action {
                PrefsAction::Get { key } => {
                    let key = key_of(&key)?;
                    match prefs.get_raw(chain_id, key) {
                        Some(value) => println!("{value}"),
                        None => println!("(unset)"),
                    }
                }
                PrefsAction::Set { key, value } => {
                    prefs.set_from_str(chain_id, key_of(&key)?, &value)?;
                    prefs.save()?;
                }
                PrefsAction::Remove { key } => {
                    prefs.remove(chain_id, key_of(&key)?);
                    prefs.save()?;
                }
            }
        }
    }

    Ok(())
}
