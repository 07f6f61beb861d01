//! Signal Command
//!
//! Publishes a trading signal into the channel by hand, exactly as the
//! external decision process would: atomic replace of the single JSON
//! slot. Useful for dry-run rehearsal and for poking the controller
//! without the producer running.

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use grid_bot::signal::{SignalChannel, TradingSignal};
use grid_bot::{Config, Direction};

pub fn run(
    config_path: String,
    pair: Option<String>,
    direction: Direction,
    timeframe: Option<String>,
) -> Result<()> {
    // The signal command works without a config file; defaults cover it.
    let config = if Path::new(&config_path).exists() {
        Config::from_file(&config_path)?
    } else {
        Config::default()
    };

    let signal = TradingSignal {
        pair: pair.unwrap_or_else(|| config.trading.symbol.clone()),
        signal: direction,
        tf: timeframe.unwrap_or_else(|| config.trading.timeframe.clone()),
        ts: Utc::now().timestamp(),
    };

    let channel = SignalChannel::new(&config.controller.signal_file);
    channel.publish(&signal)?;

    info!(
        "Published {} {} (tf {}) to {}",
        signal.pair,
        signal.signal,
        signal.tf,
        channel.path().display()
    );

    Ok(())
}
