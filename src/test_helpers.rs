use chrono::{DateTime, Utc};
use serde_json::json;

use crate::models::{MarketSnapshot, TradeAction, TradeIntention};

/// Fixed collection time so exit strategies compare equal across runs.
pub fn snapshot_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Intention for 10 shares with the upstream stop/target left at naive 5% offsets.
pub fn make_intention(
    symbol: &str,
    action: TradeAction,
    price_target: f64,
    confidence: f64,
) -> TradeIntention {
    TradeIntention {
        symbol: symbol.to_string(),
        action,
        quantity: 10,
        price_target,
        stop_loss: price_target * (1.0 - action.sign() * 0.05),
        take_profit: price_target * (1.0 + action.sign() * 0.05),
        confidence,
        reasoning: format!("{} {} setup", action, symbol),
    }
}

pub fn empty_snapshot() -> MarketSnapshot {
    MarketSnapshot::new(snapshot_time())
}

/// Every indicator observed and bullish for `symbol`.
pub fn strong_breakout_snapshot(symbol: &str) -> MarketSnapshot {
    empty_snapshot().with_entry(
        symbol,
        json!({
            "volume": 3_000_000.0,
            "avg_volume": 1_000_000.0,
            "price_history": [100.0, 105.0, 110.0],
            "volatility": 0.04,
            "avg_volatility": 0.02,
            "sentiment": "bullish",
            "rsi": 65.0,
            "macd": 1.2,
            "macd_signal": 0.8
        }),
    )
}

/// Negative volume for `symbol`: a feed glitch the strict filter refuses.
pub fn corrupt_volume_snapshot(symbol: &str) -> MarketSnapshot {
    empty_snapshot().with_entry(symbol, json!({ "volume": -1_000.0, "avg_volume": 50_000.0 }))
}
