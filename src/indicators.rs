//! Volatility estimation from candle data
//!
//! The grid spacing is tied to recent realized volatility through the
//! average true range: tighter grids in calm markets, wider in volatile
//! ones, which reduces the chance of an entire ladder filling instantly
//! in a volatility spike.

use itertools::Itertools;

use crate::error::InsufficientDataError;
use crate::Candle;

/// True range for each adjacent candle pair:
/// `max(high - low, |high - prev_close|, |low - prev_close|)`.
///
/// Returns one value per pair, so `candles.len() - 1` entries.
pub fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .iter()
        .tuple_windows()
        .map(|(prev, cur)| {
            let hl = cur.high - cur.low;
            let hc = (cur.high - prev.close).abs();
            let lc = (cur.low - prev.close).abs();
            hl.max(hc).max(lc)
        })
        .collect()
}

/// Average true range over the most recent `period` true-range values.
///
/// Requires at least `period + 1` candles (one extra for the previous
/// close of the oldest pair).
pub fn average_true_range(
    candles: &[Candle],
    period: usize,
) -> Result<f64, InsufficientDataError> {
    if period == 0 || candles.len() < period + 1 {
        return Err(InsufficientDataError {
            required: period + 1,
            got: candles.len(),
        });
    }

    let trs = true_ranges(candles);
    let recent = &trs[trs.len() - period..];
    Ok(recent.iter().sum::<f64>() / period as f64)
}

/// Grid spacing step as a fraction of price
pub fn spacing_step(atr: f64, current_price: f64, multiplier: f64) -> f64 {
    (atr / current_price) * multiplier
}
