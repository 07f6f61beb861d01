//! Run Command
//!
//! Starts the controller poll loop:
//! - Fixed-interval ticks with graceful Ctrl-C shutdown
//! - Dry-run by default; `--live` arms real order flow after a countdown
//! - State checkpoint restored at startup and written on shutdown

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::time::{interval, sleep};
use tracing::{debug, error, info, warn};

use grid_bot::binance::auth::Credentials;
use grid_bot::binance::{BinanceFuturesClient, ClientConfig};
use grid_bot::controller::Controller;
use grid_bot::signal::SignalChannel;
use grid_bot::Config;

pub fn run(config_path: String, live: bool, interval_secs: Option<u64>) -> Result<()> {
    dotenv::dotenv().ok();

    let mut config = Config::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path))?;

    if live {
        config.controller.dry_run = false;
    }
    if let Some(secs) = interval_secs {
        config.controller.poll_interval_secs = secs;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run_async(config))
}

async fn run_async(config: Config) -> Result<()> {
    let mode = if config.controller.dry_run {
        "DRY RUN"
    } else {
        "LIVE"
    };

    info!("Grid controller starting - {} mode", mode);
    info!(
        "Symbol {} | tf {} | {} levels | budget {} USD | leverage {}x",
        config.trading.symbol,
        config.trading.timeframe,
        config.trading.grid_levels,
        config.trading.budget_usd,
        config.trading.leverage
    );
    info!(
        "Max drawdown {:.0}% | cooldown {}s | poll every {}s | signal file {}",
        config.risk.max_drawdown_fraction * 100.0,
        config.risk.cooldown_secs,
        config.controller.poll_interval_secs,
        config.controller.signal_file
    );

    if !config.controller.dry_run {
        warn!("LIVE TRADING MODE - REAL MONEY AT RISK!");
        warn!("Press Ctrl+C within 10 seconds to abort...");
        for i in (1..=10).rev() {
            info!("Starting in {} seconds...", i);
            sleep(Duration::from_secs(1)).await;
        }
    }

    let credentials = Credentials::new(
        config.exchange.api_key.clone().unwrap_or_default(),
        config.exchange.api_secret.clone().unwrap_or_default(),
    );
    let client_config = ClientConfig {
        base_url: config.exchange.base_url.clone(),
        max_retries: config.exchange.max_retries,
        timeout: Duration::from_secs(config.exchange.request_timeout_secs),
        rate_limit: config.exchange.rate_limit,
        price_decimals: config.trading.price_decimals as usize,
        quantity_decimals: config.trading.quantity_decimals as usize,
    };
    let exchange = BinanceFuturesClient::with_config(credentials, client_config);

    let channel = SignalChannel::new(&config.controller.signal_file);
    let state_file = config.controller.state_file.clone();
    let mut controller = Controller::new(exchange, channel, &config).with_state_file(state_file);

    let mut ticker = interval(Duration::from_secs(config.controller.poll_interval_secs));

    info!("Entering poll loop...");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match controller.tick(Utc::now()).await {
                    Ok(phase) => debug!("Cycle complete: {:?}", phase),
                    Err(e) => error!("Trading cycle error (skipping cycle): {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received, shutting down...");
                break;
            }
        }
    }

    controller.shutdown();
    info!("Controller stopped.");
    Ok(())
}
