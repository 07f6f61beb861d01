//! Position risk monitoring and emergency liquidation
//!
//! Each cycle with an active grid, the monitor reads the live position
//! and compares unrealized loss against the margin committed. Past the
//! configured fraction, the position is market-closed and all resting
//! orders cancelled, best effort. A failed close is logged, not
//! retried here: the controller's cooldown is the guard against retry
//! storms.

use tracing::{error, warn};

use crate::error::{EmergencyCloseError, MarketDataError};
use crate::exchange::ExchangeApi;
use crate::Symbol;

#[derive(Debug, Clone, Copy)]
pub struct RiskMonitor {
    /// Fraction of margin-in-use lost before the emergency fires
    pub max_drawdown_fraction: f64,
    pub dry_run: bool,
}

/// Emergency condition: margin committed and loss strictly beyond the
/// drawdown fraction. The boundary itself does not trigger.
pub fn is_emergency(margin_used: f64, unrealized_pnl: f64, max_drawdown_fraction: f64) -> bool {
    margin_used > 0.0 && unrealized_pnl < -margin_used * max_drawdown_fraction
}

impl RiskMonitor {
    pub fn new(max_drawdown_fraction: f64, dry_run: bool) -> Self {
        RiskMonitor {
            max_drawdown_fraction,
            dry_run,
        }
    }

    /// Check the live position; on emergency, unwind it.
    ///
    /// Returns `Ok(true)` when the emergency fired, whether or not the
    /// unwind calls themselves fully succeeded. Returns `Ok(false)` when
    /// there is nothing to protect or the loss is within bounds. A
    /// failure reading the position propagates as `MarketDataError`.
    pub async fn check_emergency<E: ExchangeApi>(
        &self,
        exchange: &E,
        symbol: &Symbol,
    ) -> Result<bool, MarketDataError> {
        // Dry runs never open a position, so there is nothing to protect
        // (and no credentials to read one with).
        if self.dry_run {
            return Ok(false);
        }

        let snapshot = match exchange.position_risk(symbol).await? {
            Some(s) => s,
            None => return Ok(false),
        };

        if !is_emergency(
            snapshot.margin_used,
            snapshot.unrealized_pnl,
            self.max_drawdown_fraction,
        ) {
            return Ok(false);
        }

        warn!(
            "EMERGENCY EXIT {}: pnl {:.2} beyond {:.0}% of margin {:.2}",
            symbol,
            snapshot.unrealized_pnl,
            self.max_drawdown_fraction * 100.0,
            snapshot.margin_used
        );

        if let Err(e) = exchange
            .close_position_market(symbol, snapshot.position_amt)
            .await
        {
            let err = EmergencyCloseError::Close {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            };
            error!("{}", err);
        }

        if let Err(e) = exchange.cancel_all_orders(symbol).await {
            let err = EmergencyCloseError::Cancel {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            };
            error!("{}", err);
        }

        Ok(true)
    }
}
