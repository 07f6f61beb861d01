//! Binance USDT-M futures API client
//!
//! REST client for the market-data and order endpoints the controller
//! consumes, with request signing, per-call timeouts, rate limiting, and
//! bounded retries for read calls.

pub mod auth;
pub mod client;
pub mod types;

pub use client::{BinanceFuturesClient, ClientConfig};
