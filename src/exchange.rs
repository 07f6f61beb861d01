//! Exchange surface consumed by the controller
//!
//! Everything the controller needs from an exchange, behind one trait so
//! the decision loop, grid builder, and risk monitor can be exercised
//! against a scripted double. The only non-idempotent call is
//! `place_limit_order`; cancel and close are safe to repeat.

use crate::error::{MarketDataError, OrderPlacementError};
use crate::{Candle, PositionSnapshot, Side, Symbol};

#[allow(async_fn_in_trait)]
pub trait ExchangeApi {
    /// Last traded price for the symbol
    async fn ticker_price(&self, symbol: &Symbol) -> Result<f64, MarketDataError>;

    /// Recent OHLCV candles, oldest first
    async fn klines(
        &self,
        symbol: &Symbol,
        interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError>;

    /// Submit one resting limit order; returns the exchange order id
    async fn place_limit_order(
        &self,
        symbol: &Symbol,
        side: Side,
        price: f64,
        quantity: f64,
    ) -> Result<String, OrderPlacementError>;

    /// Cancel every open order for the symbol. Idempotent: no open
    /// orders is not an error.
    async fn cancel_all_orders(&self, symbol: &Symbol) -> Result<(), MarketDataError>;

    /// Live position for the symbol, or `None` when flat
    async fn position_risk(
        &self,
        symbol: &Symbol,
    ) -> Result<Option<PositionSnapshot>, MarketDataError>;

    /// Close the full position with a reduce-only market order.
    /// `position_amt` is the signed amount from the latest snapshot.
    async fn close_position_market(
        &self,
        symbol: &Symbol,
        position_amt: f64,
    ) -> Result<(), MarketDataError>;
}
