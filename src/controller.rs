//! Controller state machine
//!
//! One controller instance owns the cross-cycle state for one symbol at
//! a time: the active direction, whether a grid is resting, and when the
//! last emergency exit happened. Each poll tick runs the same transition
//! order: cooldown gate, signal read, rebuild on direction change,
//! risk check while a grid is active.
//!
//! State is check-pointed to a JSON file after every transition so a
//! restart mid-grid does not mistake the unchanged signal for a fresh
//! direction change and re-place the whole ladder.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::CycleError;
use crate::exchange::ExchangeApi;
use crate::grid::{build_grid, GridParams};
use crate::indicators::{average_true_range, spacing_step};
use crate::risk::RiskMonitor;
use crate::signal::{SignalChannel, TradingSignal};
use crate::{Direction, Symbol};

/// Cross-cycle controller state, check-pointed across restarts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerState {
    pub current_direction: Option<Direction>,
    pub active_symbol: Option<Symbol>,
    pub grid_active: bool,
    pub last_exit: Option<DateTime<Utc>>,
}

/// Observable phase of the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    GridActive,
    Cooldown,
}

pub struct Controller<E> {
    exchange: E,
    channel: SignalChannel,
    risk: RiskMonitor,
    trading: crate::config::TradingConfig,
    cooldown: Duration,
    dry_run: bool,
    state: ControllerState,
    state_path: Option<PathBuf>,
}

impl<E: ExchangeApi> Controller<E> {
    pub fn new(exchange: E, channel: SignalChannel, config: &Config) -> Self {
        Controller {
            exchange,
            channel,
            risk: RiskMonitor::new(
                config.risk.max_drawdown_fraction,
                config.controller.dry_run,
            ),
            trading: config.trading.clone(),
            cooldown: Duration::seconds(config.risk.cooldown_secs as i64),
            dry_run: config.controller.dry_run,
            state: ControllerState::default(),
            state_path: None,
        }
    }

    /// Enable state persistence, restoring any checkpoint left by a
    /// previous run. A missing or corrupt checkpoint just starts fresh.
    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if let Some(state) = restore_state(&path) {
            info!(
                "Restored controller state: direction={:?}, grid_active={}",
                state.current_direction, state.grid_active
            );
            self.state = state;
        }
        self.state_path = Some(path);
        self
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn phase(&self, now: DateTime<Utc>) -> Phase {
        if self.in_cooldown(now) {
            Phase::Cooldown
        } else if self.state.grid_active {
            Phase::GridActive
        } else {
            Phase::Idle
        }
    }

    fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        match self.state.last_exit {
            Some(exit) => now - exit < self.cooldown,
            None => false,
        }
    }

    /// Run one poll cycle.
    ///
    /// Any market-data or insufficient-data failure propagates to the
    /// caller, which logs it and waits for the next tick; state is only
    /// advanced after the corresponding action succeeded, so a failed
    /// rebuild is retried on the next cycle.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<Phase, CycleError> {
        if self.in_cooldown(now) {
            debug!(
                "In cooldown until {}",
                self.state
                    .last_exit
                    .map(|t| (t + self.cooldown).to_rfc3339())
                    .unwrap_or_default()
            );
            return Ok(Phase::Cooldown);
        }

        // Deduplicate by direction, not timestamp: a re-published signal
        // with the same direction is a no-op.
        if let Some(signal) = self.channel.read_latest() {
            if self.state.current_direction != Some(signal.signal) {
                self.rebuild_grid(&signal).await?;
            }
        }

        if self.state.grid_active {
            if let Some(symbol) = self.state.active_symbol.clone() {
                if self.risk.check_emergency(&self.exchange, &symbol).await? {
                    self.state.grid_active = false;
                    self.state.current_direction = None;
                    self.state.active_symbol = None;
                    self.state.last_exit = Some(now);
                    self.checkpoint();
                    info!(
                        "Cooldown engaged for {}s after emergency exit",
                        self.cooldown.num_seconds()
                    );
                    return Ok(Phase::Cooldown);
                }
            }
        }

        Ok(self.phase(now))
    }

    async fn rebuild_grid(&mut self, signal: &TradingSignal) -> Result<(), CycleError> {
        let symbol = Symbol::new(&signal.pair);
        info!(
            "New signal: {} {} (tf {})",
            symbol, signal.signal, signal.tf
        );

        let price = self.exchange.ticker_price(&symbol).await?;
        let candles = self
            .exchange
            .klines(&symbol, &self.trading.timeframe, self.trading.atr_period + 1)
            .await?;
        let atr = average_true_range(&candles, self.trading.atr_period)?;
        let step = spacing_step(atr, price, self.trading.spacing_multiplier);

        info!(
            "{} price {:.5}, ATR {:.6}, grid step {:.3}%",
            symbol,
            price,
            atr,
            step * 100.0
        );

        let params = GridParams {
            step,
            levels: self.trading.grid_levels,
            budget_usd: self.trading.budget_usd,
            leverage: self.trading.leverage,
            quantity_decimals: self.trading.quantity_decimals,
        };

        build_grid(
            &self.exchange,
            &symbol,
            signal.signal,
            price,
            &params,
            self.dry_run,
        )
        .await?;

        self.state.current_direction = Some(signal.signal);
        self.state.active_symbol = Some(symbol);
        self.state.grid_active = true;
        self.checkpoint();

        Ok(())
    }

    /// Persist the current state, best effort
    fn checkpoint(&self) {
        if let Some(path) = &self.state_path {
            if let Err(e) = save_state(path, &self.state) {
                warn!("Failed to checkpoint controller state: {}", e);
            }
        }
    }

    /// Write a final checkpoint on shutdown
    pub fn shutdown(&self) {
        self.checkpoint();
    }
}

fn restore_state(path: &Path) -> Option<ControllerState> {
    let contents = fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}

fn save_state(path: &Path, state: &ControllerState) -> std::io::Result<()> {
    let payload = serde_json::to_string_pretty(state).expect("state serializes");
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, payload)?;
    fs::rename(&tmp, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_state_checkpoint_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("controller_state.json");

        let state = ControllerState {
            current_direction: Some(Direction::Long),
            active_symbol: Some(Symbol::new("ETHUSDT")),
            grid_active: true,
            last_exit: None,
        };

        save_state(&path, &state).unwrap();
        assert_eq!(restore_state(&path), Some(state));
    }

    #[test]
    fn test_restore_missing_or_corrupt_is_none() {
        let dir = tempdir().unwrap();

        assert_eq!(restore_state(&dir.path().join("nope.json")), None);

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{not json").unwrap();
        assert_eq!(restore_state(&bad), None);
    }

    #[test]
    fn test_default_state_is_idle() {
        let state = ControllerState::default();
        assert_eq!(state.current_direction, None);
        assert!(!state.grid_active);
        assert_eq!(state.last_exit, None);
    }
}
