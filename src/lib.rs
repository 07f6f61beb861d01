//! Signal-Driven Grid Trading Controller
//!
//! A standalone execution layer decoupled from whatever logic decides
//! LONG or SHORT. An external decision process drops its latest call
//! into a single-slot signal file; this controller turns that into a
//! bounded set of resting limit orders and keeps the downside bounded:
//!
//! 1. Read the signal channel (atomic single-slot JSON record)
//! 2. On a direction change, size a grid from recent volatility (ATR)
//!    and replace any resting ladder wholesale (cancel-all first)
//! 3. While a grid is active, watch unrealized loss against margin
//!    committed and liquidate everything past the drawdown limit
//! 4. After an emergency exit, refuse new grids for a cooldown window
//!
//! ## Example (scripted exchange)
//! ```no_run
//! use grid_bot::binance::auth::Credentials;
//! use grid_bot::binance::BinanceFuturesClient;
//! use grid_bot::controller::Controller;
//! use grid_bot::signal::SignalChannel;
//! use grid_bot::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let exchange = BinanceFuturesClient::new(Credentials::from_env()?);
//!     let channel = SignalChannel::new("signal.json");
//!     let mut controller = Controller::new(exchange, channel, &config);
//!     controller.tick(chrono::Utc::now()).await?;
//!     Ok(())
//! }
//! ```

pub mod binance;
pub mod common;
pub mod config;
pub mod controller;
pub mod error;
pub mod exchange;
pub mod grid;
pub mod indicators;
pub mod risk;
pub mod signal;
pub mod types;

pub use config::Config;
pub use exchange::ExchangeApi;
pub use types::*;
