//! HTTP client for the Binance USDT-M futures REST API
//!
//! Read calls (price, candles) and the idempotent cancel are retried
//! with exponential backoff; order placement is submitted exactly once
//! so an ambiguous transport failure can never double-place a level.
//! Every request carries the client-wide timeout, and expiry surfaces
//! as a `MarketDataError` like any other transport failure.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::auth::Credentials;
use super::types::{candle_from_kline_row, PlacedOrder, PositionRisk, TickerPrice};
use crate::common::RateLimiter;
use crate::error::{MarketDataError, OrderPlacementError};
use crate::exchange::ExchangeApi;
use crate::{Candle, PositionSnapshot, Side, Symbol};

/// Default base URL for USDT-M futures
pub const FUTURES_BASE_URL: &str = "https://fapi.binance.com";

const RECV_WINDOW_MS: u64 = 5_000;

/// Client tuning knobs
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    /// Retry attempts for read and cancel calls
    pub max_retries: u32,
    pub timeout: Duration,
    /// Requests per second
    pub rate_limit: usize,
    /// Decimal places used when formatting order prices
    pub price_decimals: usize,
    /// Decimal places used when formatting order quantities
    pub quantity_decimals: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: FUTURES_BASE_URL.to_string(),
            max_retries: 3,
            timeout: Duration::from_secs(10),
            rate_limit: 10,
            price_decimals: 5,
            quantity_decimals: 3,
        }
    }
}

#[derive(Clone)]
pub struct BinanceFuturesClient {
    http: Client,
    credentials: Credentials,
    config: ClientConfig,
    rate_limiter: RateLimiter,
}

impl BinanceFuturesClient {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_config(credentials, ClientConfig::default())
    }

    pub fn with_config(credentials: Credentials, config: ClientConfig) -> Self {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to build HTTP client");

        let rate_limiter = RateLimiter::per_second(config.rate_limit);

        BinanceFuturesClient {
            http,
            credentials,
            config,
            rate_limiter,
        }
    }

    /// Public (unsigned) endpoint URL
    fn public_url(&self, path: &str, query: &str) -> String {
        format!("{}{}?{}", self.config.base_url, path, query)
    }

    /// Signed endpoint URL: appends timestamp, recvWindow, and the HMAC
    /// signature over the full query string. Rebuilt per attempt so each
    /// retry carries a fresh timestamp.
    fn signed_url(&self, path: &str, query: &str) -> String {
        let ts = Utc::now().timestamp_millis();
        let qs = if query.is_empty() {
            format!("timestamp={}&recvWindow={}", ts, RECV_WINDOW_MS)
        } else {
            format!("{}&timestamp={}&recvWindow={}", query, ts, RECV_WINDOW_MS)
        };
        let signature = self.credentials.sign(&qs);
        format!("{}{}?{}&signature={}", self.config.base_url, path, qs, signature)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("X-MBX-APIKEY", self.credentials.api_key())
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, MarketDataError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(MarketDataError::Api {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| MarketDataError::Parse(e.to_string()))
    }

    /// Execute a request with bounded retries and exponential backoff.
    /// Only used for reads and the idempotent cancel.
    async fn request_with_retry<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &str,
        signed: bool,
    ) -> Result<T, MarketDataError> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(2u64.pow(attempt - 1));
                debug!("Retrying {} after {}s", path, delay.as_secs());
                sleep(delay).await;
            }

            self.rate_limiter.acquire().await;

            let url = if signed {
                self.signed_url(path, query)
            } else {
                self.public_url(path, query)
            };
            let mut builder = self.http.request(method.clone(), &url);
            if signed {
                builder = self.authorized(builder);
            }

            match self.send_json(builder).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(
                        "Request {} failed (attempt {}/{}): {}",
                        path,
                        attempt + 1,
                        self.config.max_retries + 1,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(MarketDataError::Parse(
            "request failed with no attempts".to_string(),
        )))
    }

    fn format_price(&self, price: f64) -> String {
        format!("{:.*}", self.config.price_decimals, price)
    }

    fn format_quantity(&self, quantity: f64) -> String {
        format!("{:.*}", self.config.quantity_decimals, quantity)
    }
}

impl ExchangeApi for BinanceFuturesClient {
    async fn ticker_price(&self, symbol: &Symbol) -> Result<f64, MarketDataError> {
        let query = format!("symbol={}", symbol);
        let ticker: TickerPrice = self
            .request_with_retry(Method::GET, "/fapi/v1/ticker/price", &query, false)
            .await?;

        ticker
            .price_f64()
            .ok_or_else(|| MarketDataError::Parse(format!("bad ticker price: {}", ticker.price)))
    }

    async fn klines(
        &self,
        symbol: &Symbol,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let query = format!("symbol={}&interval={}&limit={}", symbol, interval, limit);
        let raw: Vec<Vec<serde_json::Value>> = self
            .request_with_retry(Method::GET, "/fapi/v1/klines", &query, false)
            .await?;

        let candles: Vec<Candle> = raw
            .iter()
            .filter_map(|row| candle_from_kline_row(row))
            .collect();

        if candles.is_empty() && !raw.is_empty() {
            return Err(MarketDataError::Parse(
                "kline payload contained no parsable rows".to_string(),
            ));
        }

        Ok(candles)
    }

    async fn place_limit_order(
        &self,
        symbol: &Symbol,
        side: Side,
        price: f64,
        quantity: f64,
    ) -> Result<String, OrderPlacementError> {
        self.rate_limiter.acquire().await;

        let query = format!(
            "symbol={}&side={}&type=LIMIT&timeInForce=GTC&price={}&quantity={}",
            symbol,
            side,
            self.format_price(price),
            self.format_quantity(quantity)
        );
        let url = self.signed_url("/fapi/v1/order", &query);

        let response = self.authorized(self.http.post(&url)).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(OrderPlacementError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let placed: PlacedOrder =
            serde_json::from_str(&body).map_err(|e| OrderPlacementError::Parse(e.to_string()))?;

        Ok(placed.order_id.to_string())
    }

    async fn cancel_all_orders(&self, symbol: &Symbol) -> Result<(), MarketDataError> {
        let query = format!("symbol={}", symbol);
        let _: serde_json::Value = self
            .request_with_retry(Method::DELETE, "/fapi/v1/allOpenOrders", &query, true)
            .await?;
        Ok(())
    }

    async fn position_risk(
        &self,
        symbol: &Symbol,
    ) -> Result<Option<PositionSnapshot>, MarketDataError> {
        let query = format!("symbol={}", symbol);
        let positions: Vec<PositionRisk> = self
            .request_with_retry(Method::GET, "/fapi/v2/positionRisk", &query, true)
            .await?;

        let snapshot = positions
            .iter()
            .find(|p| p.symbol == symbol.as_str() && p.position_amt_f64() != 0.0)
            .map(|p| PositionSnapshot {
                position_amt: p.position_amt_f64(),
                margin_used: p.initial_margin(),
                unrealized_pnl: p.unrealized_profit_f64(),
            });

        Ok(snapshot)
    }

    async fn close_position_market(
        &self,
        symbol: &Symbol,
        position_amt: f64,
    ) -> Result<(), MarketDataError> {
        let side = if position_amt > 0.0 { Side::Sell } else { Side::Buy };

        self.rate_limiter.acquire().await;

        let query = format!(
            "symbol={}&side={}&type=MARKET&quantity={}&reduceOnly=true",
            symbol,
            side,
            self.format_quantity(position_amt.abs())
        );
        let url = self.signed_url("/fapi/v1/order", &query);

        let response = self.authorized(self.http.post(&url)).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MarketDataError::Api {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
