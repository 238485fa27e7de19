#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use trade_enhancer::models::{MarketSnapshot, TradeAction, TradeIntention};

pub fn as_of() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Intention for 10 shares at `price` with the given confidence.
pub fn intention(symbol: &str, action: TradeAction, price: f64, confidence: f64) -> TradeIntention {
    TradeIntention {
        symbol: symbol.to_string(),
        action,
        quantity: 10,
        price_target: price,
        stop_loss: 0.0,
        take_profit: 0.0,
        confidence,
        reasoning: String::new(),
    }
}

/// Per-symbol indicator block with a rising price path and bullish technicals.
pub fn bullish_fields(last_price: f64) -> Value {
    json!({
        "volume": 4_000_000,
        "avg_volume": 1_500_000,
        "price_history": [last_price * 0.92, last_price * 0.96, last_price],
        "volatility": 0.035,
        "avg_volatility": 0.02,
        "sentiment": "bullish",
        "rsi": 62.0,
        "macd": 0.9,
        "macd_signal": 0.4
    })
}

/// Quiet tape: average volume, flat prices, no sentiment.
pub fn quiet_fields(price: f64) -> Value {
    json!({
        "volume": 500_000,
        "avg_volume": 1_000_000,
        "price_history": [price, price],
        "volatility": 0.01,
        "avg_volatility": 0.02,
        "rsi": 50.0
    })
}

pub fn snapshot(entries: &[(&str, Value)]) -> MarketSnapshot {
    entries
        .iter()
        .fold(MarketSnapshot::new(as_of()), |m, (k, v)| m.with_entry(k, v.clone()))
}
