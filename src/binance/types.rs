//! Request and response types for the Binance futures REST API

use chrono::DateTime;
use serde::Deserialize;

use crate::Candle;

/// `GET /fapi/v1/ticker/price` response
#[derive(Debug, Clone, Deserialize)]
pub struct TickerPrice {
    pub symbol: String,
    pub price: String,
}

impl TickerPrice {
    pub fn price_f64(&self) -> Option<f64> {
        self.price.parse().ok()
    }
}

/// `POST /fapi/v1/order` response (fields we use)
#[derive(Debug, Clone, Deserialize)]
pub struct PlacedOrder {
    #[serde(rename = "orderId")]
    pub order_id: u64,
    #[serde(default)]
    pub status: Option<String>,
}

/// One entry of the `GET /fapi/v2/positionRisk` response.
///
/// Binance serializes every numeric field as a string.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionRisk {
    pub symbol: String,
    #[serde(rename = "positionAmt")]
    pub position_amt: String,
    #[serde(rename = "entryPrice")]
    pub entry_price: String,
    #[serde(rename = "unRealizedProfit")]
    pub unrealized_profit: String,
    pub leverage: String,
    #[serde(default)]
    pub notional: String,
}

impl PositionRisk {
    pub fn position_amt_f64(&self) -> f64 {
        self.position_amt.parse().unwrap_or(0.0)
    }

    pub fn unrealized_profit_f64(&self) -> f64 {
        self.unrealized_profit.parse().unwrap_or(0.0)
    }

    /// Margin committed to the position, derived from notional and
    /// leverage (the fields `positionRisk` actually reports).
    pub fn initial_margin(&self) -> f64 {
        let notional: f64 = self.notional.parse().unwrap_or(0.0);
        let leverage: f64 = self.leverage.parse().unwrap_or(1.0);
        if leverage > 0.0 {
            notional.abs() / leverage
        } else {
            0.0
        }
    }
}

/// Parse one row of the `GET /fapi/v1/klines` array-of-arrays payload:
/// `[openTime, open, high, low, close, volume, ...]` with prices as
/// strings. Malformed rows yield `None`.
pub fn candle_from_kline_row(row: &[serde_json::Value]) -> Option<Candle> {
    fn field_f64(v: &serde_json::Value) -> Option<f64> {
        v.as_str().and_then(|s| s.parse().ok()).or_else(|| v.as_f64())
    }

    let open_time = DateTime::from_timestamp_millis(row.first()?.as_i64()?)?;

    Some(Candle {
        open_time,
        open: field_f64(row.get(1)?)?,
        high: field_f64(row.get(2)?)?,
        low: field_f64(row.get(3)?)?,
        close: field_f64(row.get(4)?)?,
        volume: field_f64(row.get(5)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_kline_row_parses() {
        let row: Vec<serde_json::Value> = serde_json::from_str(
            r#"[1700000000000, "2000.1", "2010.5", "1995.0", "2005.3", "1234.5", 1700000299999]"#,
        )
        .unwrap();

        let candle = candle_from_kline_row(&row).unwrap();
        assert_relative_eq!(candle.open, 2000.1);
        assert_relative_eq!(candle.high, 2010.5);
        assert_relative_eq!(candle.low, 1995.0);
        assert_relative_eq!(candle.close, 2005.3);
        assert_relative_eq!(candle.volume, 1234.5);
    }

    #[test]
    fn test_kline_row_rejects_short_row() {
        let row: Vec<serde_json::Value> =
            serde_json::from_str(r#"[1700000000000, "2000.1"]"#).unwrap();
        assert!(candle_from_kline_row(&row).is_none());
    }

    #[test]
    fn test_position_risk_initial_margin() {
        let pos = PositionRisk {
            symbol: "ETHUSDT".to_string(),
            position_amt: "0.126".to_string(),
            entry_price: "1984.0".to_string(),
            unrealized_profit: "-31.5".to_string(),
            leverage: "5".to_string(),
            notional: "-500.0".to_string(),
        };

        assert_relative_eq!(pos.initial_margin(), 100.0);
        assert_relative_eq!(pos.unrealized_profit_f64(), -31.5);
    }

    #[test]
    fn test_ticker_price_parse() {
        let ticker: TickerPrice =
            serde_json::from_str(r#"{"symbol": "ETHUSDT", "price": "2000.00"}"#).unwrap();
        assert_eq!(ticker.price_f64(), Some(2000.0));
    }
}
