//! Integration tests for the grid controller
//!
//! The exchange is replaced with a scripted double that records every
//! call, so ordering properties (cancel before place, no rebuild on an
//! unchanged direction, cooldown blocking) are asserted on the actual
//! call sequence.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, TimeZone, Utc};

use grid_bot::controller::{Controller, Phase};
use grid_bot::error::{CycleError, MarketDataError, OrderPlacementError};
use grid_bot::exchange::ExchangeApi;
use grid_bot::signal::{SignalChannel, TradingSignal};
use grid_bot::{Candle, Config, Direction, PositionSnapshot, Side, Symbol};

// =============================================================================
// Test Utilities
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum Call {
    CancelAll,
    Place { side: Side, price: f64, quantity: f64 },
    ClosePosition,
}

#[derive(Default)]
struct MockState {
    calls: Vec<Call>,
    position: Option<PositionSnapshot>,
    fail_ticker: bool,
    fail_place_at: Option<usize>,
    place_attempts: usize,
}

/// Scripted exchange double recording mutating calls in order
struct MockExchange {
    price: f64,
    candles: Vec<Candle>,
    state: Mutex<MockState>,
}

impl MockExchange {
    fn new(price: f64, candles: Vec<Candle>) -> Arc<Self> {
        Arc::new(MockExchange {
            price,
            candles,
            state: Mutex::new(MockState::default()),
        })
    }

    fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    fn set_position(&self, position: Option<PositionSnapshot>) {
        self.state.lock().unwrap().position = position;
    }

    fn set_fail_ticker(&self, fail: bool) {
        self.state.lock().unwrap().fail_ticker = fail;
    }

    fn set_fail_place_at(&self, index: Option<usize>) {
        self.state.lock().unwrap().fail_place_at = index;
    }

    fn placements(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Place { .. }))
            .collect()
    }
}

/// Shared, cloneable handle to a `MockExchange`.
///
/// `ExchangeApi` cannot be implemented directly on `Arc<MockExchange>` from
/// this crate (orphan rule: `MockExchange` is covered by `Arc`), so the
/// controller is parameterised over this local newtype instead. `Deref`
/// keeps the method bodies below accessing the inner mock unchanged.
#[derive(Clone)]
struct SharedMock(Arc<MockExchange>);

impl std::ops::Deref for SharedMock {
    type Target = MockExchange;
    fn deref(&self) -> &MockExchange {
        &self.0
    }
}

impl ExchangeApi for SharedMock {
    async fn ticker_price(&self, _symbol: &Symbol) -> Result<f64, MarketDataError> {
        if self.state.lock().unwrap().fail_ticker {
            return Err(MarketDataError::Api {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(self.price)
    }

    async fn klines(
        &self,
        _symbol: &Symbol,
        _interval: &str,
        limit: usize,
    ) -> Result<Vec<Candle>, MarketDataError> {
        let candles = &self.candles;
        let start = candles.len().saturating_sub(limit);
        Ok(candles[start..].to_vec())
    }

    async fn place_limit_order(
        &self,
        _symbol: &Symbol,
        side: Side,
        price: f64,
        quantity: f64,
    ) -> Result<String, OrderPlacementError> {
        let mut state = self.state.lock().unwrap();
        let attempt = state.place_attempts;
        state.place_attempts += 1;

        if state.fail_place_at == Some(attempt) {
            return Err(OrderPlacementError::Rejected {
                status: 400,
                body: "rejected".to_string(),
            });
        }

        state.calls.push(Call::Place {
            side,
            price,
            quantity,
        });
        Ok(format!("order-{}", attempt))
    }

    async fn cancel_all_orders(&self, _symbol: &Symbol) -> Result<(), MarketDataError> {
        self.state.lock().unwrap().calls.push(Call::CancelAll);
        Ok(())
    }

    async fn position_risk(
        &self,
        _symbol: &Symbol,
    ) -> Result<Option<PositionSnapshot>, MarketDataError> {
        Ok(self.state.lock().unwrap().position)
    }

    async fn close_position_market(
        &self,
        _symbol: &Symbol,
        _position_amt: f64,
    ) -> Result<(), MarketDataError> {
        self.state.lock().unwrap().calls.push(Call::ClosePosition);
        Ok(())
    }
}

/// Flat candle series with a constant true range.
///
/// high - low = `range` while close never moves, so ATR == `range`.
fn flat_candles(count: usize, price: f64, range: f64) -> Vec<Candle> {
    (0..count)
        .map(|i| Candle {
            open_time: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(5 * i as i64),
            open: price,
            high: price + range / 2.0,
            low: price - range / 2.0,
            close: price,
            volume: 1000.0,
        })
        .collect()
}

fn test_config() -> Config {
    let mut config = Config::default();
    // Exercise real call flow, not the dry-run logging path
    config.controller.dry_run = false;
    config
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

struct Harness {
    controller: Controller<SharedMock>,
    exchange: Arc<MockExchange>,
    channel: SignalChannel,
    _dir: tempfile::TempDir,
}

/// Controller wired to a scripted exchange and a temp signal file.
/// Reference market: price 2000, ATR 20 -> step 0.008.
fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let channel = SignalChannel::new(dir.path().join("signal.json"));
    let exchange = MockExchange::new(2000.0, flat_candles(20, 2000.0, 20.0));
    let controller =
        Controller::new(SharedMock(exchange.clone()), channel.clone(), &test_config());

    Harness {
        controller,
        exchange,
        channel,
        _dir: dir,
    }
}

fn publish(channel: &SignalChannel, direction: Direction, ts: i64) {
    channel
        .publish(&TradingSignal {
            pair: "ETHUSDT".to_string(),
            signal: direction,
            tf: "5m".to_string(),
            ts,
        })
        .unwrap();
}

// =============================================================================
// Grid construction
// =============================================================================

#[tokio::test]
async fn test_first_signal_builds_grid() {
    let mut h = harness();
    publish(&h.channel, Direction::Long, 1);

    let phase = h.controller.tick(t0()).await.unwrap();

    assert_eq!(phase, Phase::GridActive);
    assert_eq!(h.controller.state().current_direction, Some(Direction::Long));
    assert_eq!(h.exchange.placements().len(), 7);
}

#[tokio::test]
async fn test_cancel_precedes_every_placement() {
    let mut h = harness();
    publish(&h.channel, Direction::Long, 1);

    h.controller.tick(t0()).await.unwrap();

    let calls = h.exchange.calls();
    assert_eq!(calls[0], Call::CancelAll);
    assert!(calls[1..]
        .iter()
        .all(|c| matches!(c, Call::Place { .. })));
}

#[tokio::test]
async fn test_long_levels_below_price_and_widening() {
    let mut h = harness();
    publish(&h.channel, Direction::Long, 1);

    h.controller.tick(t0()).await.unwrap();

    let mut last_price = 2000.0;
    for call in h.exchange.placements() {
        let Call::Place { side, price, .. } = call else {
            unreachable!()
        };
        assert_eq!(side, Side::Buy);
        assert!(price < last_price, "levels must step further below");
        last_price = price;
    }
}

#[tokio::test]
async fn test_reference_scenario_first_level() {
    // price=2000, ATR=20, mult=0.8 -> step 0.008; levels=7, budget=50,
    // leverage=5 -> level 1 at 1984.0 with qty 0.018
    let mut h = harness();
    publish(&h.channel, Direction::Long, 1);

    h.controller.tick(t0()).await.unwrap();

    let Call::Place {
        price, quantity, ..
    } = h.exchange.placements()[0]
    else {
        unreachable!()
    };
    assert!((price - 1984.0).abs() < 1e-9);
    assert!((quantity - 0.018).abs() < 1e-9);
}

#[tokio::test]
async fn test_unchanged_direction_does_not_rebuild() {
    let mut h = harness();
    publish(&h.channel, Direction::Long, 1);

    h.controller.tick(t0()).await.unwrap();
    let calls_after_first = h.exchange.calls().len();

    // Same direction re-published with a newer timestamp: still a no-op
    publish(&h.channel, Direction::Long, 2);
    let phase = h
        .controller
        .tick(t0() + Duration::seconds(5))
        .await
        .unwrap();

    assert_eq!(phase, Phase::GridActive);
    assert_eq!(h.exchange.calls().len(), calls_after_first);
}

#[tokio::test]
async fn test_direction_flip_replaces_grid_wholesale() {
    let mut h = harness();
    publish(&h.channel, Direction::Long, 1);
    h.controller.tick(t0()).await.unwrap();

    publish(&h.channel, Direction::Short, 2);
    h.controller
        .tick(t0() + Duration::seconds(5))
        .await
        .unwrap();

    let calls = h.exchange.calls();
    // Second cancel sits between the LONG ladder and the SHORT ladder
    let cancel_positions: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == Call::CancelAll)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(cancel_positions, vec![0, 8]);

    // All post-flip levels are SELLs above market
    for call in &calls[9..] {
        let Call::Place { side, price, .. } = call else {
            unreachable!()
        };
        assert_eq!(*side, Side::Sell);
        assert!(*price > 2000.0);
    }
}

#[tokio::test]
async fn test_single_level_failure_leaves_partial_grid() {
    let mut h = harness();
    h.exchange.set_fail_place_at(Some(2));
    publish(&h.channel, Direction::Long, 1);

    let phase = h.controller.tick(t0()).await.unwrap();

    // One level lost, the other six still went out
    assert_eq!(phase, Phase::GridActive);
    assert_eq!(h.exchange.placements().len(), 6);
}

// =============================================================================
// Failure semantics
// =============================================================================

#[tokio::test]
async fn test_market_data_failure_skips_cycle_then_recovers() {
    let mut h = harness();
    h.exchange.set_fail_ticker(true);
    publish(&h.channel, Direction::Long, 1);

    let err = h.controller.tick(t0()).await.unwrap_err();
    assert!(matches!(err, CycleError::MarketData(_)));
    assert_eq!(h.controller.state().current_direction, None);
    assert!(h.exchange.calls().is_empty());

    // Signal was not consumed; the next healthy cycle picks it up
    h.exchange.set_fail_ticker(false);
    let phase = h
        .controller
        .tick(t0() + Duration::seconds(5))
        .await
        .unwrap();
    assert_eq!(phase, Phase::GridActive);
    assert_eq!(h.exchange.placements().len(), 7);
}

#[tokio::test]
async fn test_insufficient_candles_skips_grid_build() {
    let dir = tempfile::tempdir().unwrap();
    let channel = SignalChannel::new(dir.path().join("signal.json"));
    // Only 10 candles against an ATR period of 14
    let exchange = MockExchange::new(2000.0, flat_candles(10, 2000.0, 20.0));
    let mut controller = Controller::new(SharedMock(exchange.clone()), channel.clone(), &test_config());

    publish(&channel, Direction::Long, 1);
    let err = controller.tick(t0()).await.unwrap_err();

    assert!(matches!(err, CycleError::InsufficientData(_)));
    assert_eq!(controller.state().current_direction, None);
    assert!(exchange.placements().is_empty());
}

// =============================================================================
// Risk monitor and cooldown
// =============================================================================

#[tokio::test]
async fn test_loss_at_boundary_does_not_trigger() {
    let mut h = harness();
    publish(&h.channel, Direction::Long, 1);
    h.controller.tick(t0()).await.unwrap();

    h.exchange.set_position(Some(PositionSnapshot {
        position_amt: 0.126,
        margin_used: 100.0,
        unrealized_pnl: -29.99,
    }));

    let phase = h
        .controller
        .tick(t0() + Duration::seconds(5))
        .await
        .unwrap();

    assert_eq!(phase, Phase::GridActive);
    assert!(!h.exchange.calls().contains(&Call::ClosePosition));
}

#[tokio::test]
async fn test_loss_beyond_boundary_triggers_emergency() {
    let mut h = harness();
    publish(&h.channel, Direction::Long, 1);
    h.controller.tick(t0()).await.unwrap();

    h.exchange.set_position(Some(PositionSnapshot {
        position_amt: 0.126,
        margin_used: 100.0,
        unrealized_pnl: -30.01,
    }));

    let phase = h
        .controller
        .tick(t0() + Duration::seconds(5))
        .await
        .unwrap();

    assert_eq!(phase, Phase::Cooldown);
    assert_eq!(h.controller.state().current_direction, None);
    assert!(!h.controller.state().grid_active);

    // Close first, then sweep the remaining resting orders
    let calls = h.exchange.calls();
    let close_idx = calls.iter().position(|c| *c == Call::ClosePosition).unwrap();
    let last_cancel = calls.iter().rposition(|c| *c == Call::CancelAll).unwrap();
    assert!(close_idx < last_cancel);
}

#[tokio::test]
async fn test_cooldown_blocks_new_grid_until_elapsed() {
    let mut h = harness();
    publish(&h.channel, Direction::Long, 1);
    h.controller.tick(t0()).await.unwrap();

    h.exchange.set_position(Some(PositionSnapshot {
        position_amt: 0.126,
        margin_used: 100.0,
        unrealized_pnl: -45.0,
    }));
    let exit_time = t0() + Duration::seconds(5);
    h.controller.tick(exit_time).await.unwrap();
    h.exchange.set_position(None);

    let calls_after_exit = h.exchange.calls().len();

    // A fresh opposite signal arrives immediately: still blocked
    publish(&h.channel, Direction::Short, 3);
    let phase = h
        .controller
        .tick(exit_time + Duration::seconds(10))
        .await
        .unwrap();
    assert_eq!(phase, Phase::Cooldown);
    assert_eq!(h.exchange.calls().len(), calls_after_exit);

    // Still blocked one second before the window closes
    let phase = h
        .controller
        .tick(exit_time + Duration::seconds(1799))
        .await
        .unwrap();
    assert_eq!(phase, Phase::Cooldown);

    // Window elapsed: the pending signal builds a new grid
    let phase = h
        .controller
        .tick(exit_time + Duration::seconds(1800))
        .await
        .unwrap();
    assert_eq!(phase, Phase::GridActive);
    assert!(h.exchange.calls().len() > calls_after_exit);
}

// =============================================================================
// State persistence across restarts
// =============================================================================

#[tokio::test]
async fn test_restart_does_not_rebuild_for_unchanged_signal() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("controller_state.json");
    let channel = SignalChannel::new(dir.path().join("signal.json"));
    publish(&channel, Direction::Long, 1);

    // First run: build the grid and checkpoint
    let exchange = MockExchange::new(2000.0, flat_candles(20, 2000.0, 20.0));
    let mut controller = Controller::new(SharedMock(exchange.clone()), channel.clone(), &test_config())
        .with_state_file(&state_path);
    controller.tick(t0()).await.unwrap();
    assert_eq!(exchange.placements().len(), 7);
    drop(controller);

    // Restart against the same unchanged signal: the restored direction
    // must suppress a duplicate cancel-and-rebuild.
    let exchange2 = MockExchange::new(2000.0, flat_candles(20, 2000.0, 20.0));
    let mut controller2 = Controller::new(SharedMock(exchange2.clone()), channel, &test_config())
        .with_state_file(&state_path);

    let phase = controller2.tick(t0() + Duration::seconds(30)).await.unwrap();

    assert_eq!(phase, Phase::GridActive);
    assert!(exchange2.calls().iter().all(|c| *c != Call::CancelAll));
    assert!(exchange2.placements().is_empty());
}

#[tokio::test]
async fn test_restart_preserves_cooldown() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("controller_state.json");
    let channel = SignalChannel::new(dir.path().join("signal.json"));
    publish(&channel, Direction::Long, 1);

    let exchange = MockExchange::new(2000.0, flat_candles(20, 2000.0, 20.0));
    let mut controller = Controller::new(SharedMock(exchange.clone()), channel.clone(), &test_config())
        .with_state_file(&state_path);
    controller.tick(t0()).await.unwrap();

    exchange.set_position(Some(PositionSnapshot {
        position_amt: 0.126,
        margin_used: 100.0,
        unrealized_pnl: -60.0,
    }));
    let exit_time = t0() + Duration::seconds(5);
    controller.tick(exit_time).await.unwrap();
    drop(controller);

    // Restarted controller is still inside the cooldown window
    let exchange2 = MockExchange::new(2000.0, flat_candles(20, 2000.0, 20.0));
    let mut controller2 = Controller::new(SharedMock(exchange2.clone()), channel, &test_config())
        .with_state_file(&state_path);

    let phase = controller2
        .tick(exit_time + Duration::seconds(60))
        .await
        .unwrap();

    assert_eq!(phase, Phase::Cooldown);
    assert!(exchange2.calls().is_empty());
}
