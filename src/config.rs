//! Configuration management
//!
//! JSON config file with serde defaults for every tunable, plus
//! environment variable overrides for API credentials so secrets stay
//! out of the file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::Symbol;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub exchange: ExchangeConfig,
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// `BINANCE_API_KEY` / `BINANCE_API_SECRET` in the environment take
    /// precedence over credentials in the file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).context("Failed to read config file")?;
        let mut config: Config =
            serde_json::from_str(&contents).context("Failed to parse config JSON")?;
        config.apply_env_credentials();
        Ok(config)
    }

    pub fn apply_env_credentials(&mut self) {
        if let Ok(api_key) = std::env::var("BINANCE_API_KEY") {
            self.exchange.api_key = Some(api_key);
        }
        if let Ok(api_secret) = std::env::var("BINANCE_API_SECRET") {
            self.exchange.api_secret = Some(api_secret);
        }
    }
}

/// Exchange connectivity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_secret: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_rate_limit")]
    pub rate_limit: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_base_url() -> String {
    crate::binance::client::FUTURES_BASE_URL.to_string()
}

fn default_rate_limit() -> usize {
    10
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        ExchangeConfig {
            api_key: None,
            api_secret: None,
            base_url: default_base_url(),
            rate_limit: default_rate_limit(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

/// Grid sizing and spacing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Default pair, used when the producer publishes without one
    pub symbol: String,
    /// Candle timeframe used for the volatility estimate
    pub timeframe: String,
    pub leverage: f64,
    /// Maximum quote currency committed across the whole grid
    pub budget_usd: f64,
    pub grid_levels: usize,
    pub atr_period: usize,
    pub spacing_multiplier: f64,
    pub quantity_decimals: u32,
    pub price_decimals: u32,
}

impl Default for TradingConfig {
    fn default() -> Self {
        TradingConfig {
            symbol: "ETHUSDT".to_string(),
            timeframe: "5m".to_string(),
            leverage: 5.0,
            budget_usd: 50.0,
            grid_levels: 7,
            atr_period: 14,
            spacing_multiplier: 0.8,
            quantity_decimals: 3,
            price_decimals: 5,
        }
    }
}

impl TradingConfig {
    pub fn default_symbol(&self) -> Symbol {
        Symbol::new(&self.symbol)
    }
}

/// Loss limits and post-exit pause
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Close the position at this fraction of margin lost (0.30 = 30%)
    pub max_drawdown_fraction: f64,
    pub cooldown_secs: u64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            max_drawdown_fraction: 0.30,
            cooldown_secs: 30 * 60,
        }
    }
}

/// Poll loop behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    pub poll_interval_secs: u64,
    pub signal_file: String,
    /// Checkpoint file for controller state; survives restarts
    pub state_file: String,
    /// When true, every exchange-mutating call is logged and skipped
    pub dry_run: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        ControllerConfig {
            poll_interval_secs: 5,
            signal_file: "signal.json".to_string(),
            state_file: "controller_state.json".to_string(),
            dry_run: true,
        }
    }
}
