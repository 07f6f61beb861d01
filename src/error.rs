//! Error taxonomy for the controller
//!
//! Nothing in here is fatal to the process. Each kind maps to a distinct
//! recovery action: market data and insufficient-data failures skip the
//! current cycle, a failed level leaves a partial grid, and a failed
//! emergency close still enters cooldown. An absent or corrupt signal is
//! not an error at all; the channel yields `None`.

use thiserror::Error;

/// Failure reading price or candle data from the exchange.
///
/// Request timeouts surface through the `Http` variant (`reqwest` reports
/// them as transport errors). The controller treats any of these as
/// "skip this cycle for this symbol".
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("exchange API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse exchange payload: {0}")]
    Parse(String),
}

/// Too few candles to compute the volatility estimate
#[derive(Debug, Error)]
#[error("insufficient candle data: need {required}, got {got}")]
pub struct InsufficientDataError {
    pub required: usize,
    pub got: usize,
}

/// A single grid level failed to be placed.
///
/// Logged and skipped; the remaining levels are still submitted. A
/// partial ladder is preferable to none.
#[derive(Debug, Error)]
pub enum OrderPlacementError {
    #[error("transport failure placing order: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("order rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("unreadable order response: {0}")]
    Parse(String),
}

/// A close or cancel call failed while unwinding an emergency.
///
/// Best effort only: the emergency still completes and the cooldown is
/// entered, so a flapping exchange cannot cause a retry storm.
#[derive(Debug, Error)]
pub enum EmergencyCloseError {
    #[error("failed to close position for {symbol}: {reason}")]
    Close { symbol: String, reason: String },

    #[error("failed to cancel resting orders for {symbol}: {reason}")]
    Cancel { symbol: String, reason: String },
}

/// Anything that can abort a single controller cycle.
///
/// Caught by the poll loop, logged, and followed by the next tick.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    MarketData(#[from] MarketDataError),

    #[error(transparent)]
    InsufficientData(#[from] InsufficientDataError),
}
