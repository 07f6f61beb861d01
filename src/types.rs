//! Core data types used across the controller

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trading pair symbol (e.g., "ETHUSDT")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    pub fn new(s: impl Into<String>) -> Self {
        Symbol(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Direction of an externally produced trading signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Order side as the exchange expects it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// OHLCV candlestick data, fetched fresh each cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// One resting limit order of a grid ladder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridLevel {
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
    pub order_id: Option<String>,
    pub placed: bool,
}

/// The full set of levels resting for one symbol.
///
/// A grid is replaced wholesale (cancel-all then rebuild) on a direction
/// change; it is never mutated level by level.
#[derive(Debug, Clone)]
pub struct Grid {
    pub symbol: Symbol,
    pub direction: Direction,
    pub levels: Vec<GridLevel>,
}

impl Grid {
    /// Number of levels the exchange actually accepted
    pub fn placed_count(&self) -> usize {
        self.levels.iter().filter(|l| l.placed).count()
    }

    pub fn is_partial(&self) -> bool {
        self.placed_count() < self.levels.len()
    }
}

/// Live position figures read fresh from the exchange each cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSnapshot {
    /// Signed position amount (negative = short)
    pub position_amt: f64,
    /// Margin committed to the position
    pub margin_used: f64,
    pub unrealized_pnl: f64,
}
