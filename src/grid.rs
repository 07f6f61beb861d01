//! Grid planning and order submission
//!
//! A grid is an averaging ladder, not a breakout ladder: LONG signals
//! rest BUY orders below market, SHORT signals rest SELL orders above
//! it, so the levels average into a position against the expected
//! pullback rather than chase momentum.

use tracing::{info, warn};

use crate::error::MarketDataError;
use crate::exchange::ExchangeApi;
use crate::{Direction, Grid, GridLevel, Side, Symbol};

/// Sizing and spacing parameters for one ladder
#[derive(Debug, Clone, Copy)]
pub struct GridParams {
    /// Spacing step as a fraction of price
    pub step: f64,
    pub levels: usize,
    /// Total budget committed across the whole ladder, in quote units
    pub budget_usd: f64,
    pub leverage: f64,
    /// Quantities are rounded to this many decimal places
    pub quantity_decimals: u32,
}

/// Round to a fixed number of decimal places
fn round_dp(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Compute the ladder levels for a direction around the current price.
///
/// Level `i` (1-based) rests at `price * (1 - step*i)` below market for
/// LONG, `price * (1 + step*i)` above for SHORT. Each level gets an
/// equal share of the budget; quantity is the levered notional divided
/// by the level price, rounded to the exchange quantity precision.
pub fn plan_levels(
    direction: Direction,
    current_price: f64,
    params: &GridParams,
) -> Vec<GridLevel> {
    let notional_per_level = params.budget_usd / params.levels as f64;

    (1..=params.levels)
        .map(|i| {
            let (price, side) = match direction {
                Direction::Long => (current_price * (1.0 - params.step * i as f64), Side::Buy),
                Direction::Short => (current_price * (1.0 + params.step * i as f64), Side::Sell),
            };

            GridLevel {
                side,
                price,
                quantity: round_dp(notional_per_level * params.leverage / price, params.quantity_decimals),
                order_id: None,
                placed: false,
            }
        })
        .collect()
}

/// Cancel any resting orders for the symbol, then submit the ladder.
///
/// Cancellation always runs first and must succeed (or be attempted
/// against an empty book, which the exchange treats as a no-op) before
/// any new order goes out; this is what keeps a stale opposite-direction
/// order from surviving a direction flip. Levels are submitted
/// sequentially in ladder order. A failed level is logged and left
/// unplaced; the rest of the ladder still goes out.
pub async fn build_grid<E: ExchangeApi>(
    exchange: &E,
    symbol: &Symbol,
    direction: Direction,
    current_price: f64,
    params: &GridParams,
    dry_run: bool,
) -> Result<Grid, MarketDataError> {
    if dry_run {
        info!("[DRY] cancel all orders for {}", symbol);
    } else {
        exchange.cancel_all_orders(symbol).await?;
    }

    let mut levels = plan_levels(direction, current_price, params);

    for level in &mut levels {
        if dry_run {
            info!(
                "[DRY] {} {} @ {:.5}",
                level.side, level.quantity, level.price
            );
            level.placed = true;
            continue;
        }

        match exchange
            .place_limit_order(symbol, level.side, level.price, level.quantity)
            .await
        {
            Ok(order_id) => {
                info!(
                    "Placed {} {} {} @ {:.5} (order {})",
                    level.side, level.quantity, symbol, level.price, order_id
                );
                level.order_id = Some(order_id);
                level.placed = true;
            }
            Err(e) => {
                warn!(
                    "Failed to place {} level @ {:.5} for {}: {}",
                    level.side, level.price, symbol, e
                );
            }
        }
    }

    let grid = Grid {
        symbol: symbol.clone(),
        direction,
        levels,
    };

    info!(
        "Grid built for {} {}: {}/{} levels resting",
        symbol,
        direction,
        grid.placed_count(),
        grid.levels.len()
    );

    Ok(grid)
}
