use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy => "BUY",
            TradeAction::Sell => "SELL",
        }
    }

    /// +1.0 for BUY, -1.0 for SELL. Multiplies a raw price offset into the
    /// favourable direction.
    pub fn sign(&self) -> f64 {
        match self {
            TradeAction::Buy => 1.0,
            TradeAction::Sell => -1.0,
        }
    }

    pub fn opposite(&self) -> TradeAction {
        match self {
            TradeAction::Buy => TradeAction::Sell,
            TradeAction::Sell => TradeAction::Buy,
        }
    }

    pub fn from_str_loose(s: &str) -> Option<TradeAction> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" | "LONG" => Some(TradeAction::Buy),
            "SELL" | "SHORT" => Some(TradeAction::Sell),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitKind {
    Stop,
    Limit,
    Market,
}

impl fmt::Display for ExitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitKind::Stop => write!(f, "stop"),
            ExitKind::Limit => write!(f, "limit"),
            ExitKind::Market => write!(f, "market"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Neutral,
    Bearish,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Bullish => write!(f, "bullish"),
            Sentiment::Neutral => write!(f, "neutral"),
            Sentiment::Bearish => write!(f, "bearish"),
        }
    }
}

impl Sentiment {
    /// Accepts the loose vocabulary upstream collectors emit.
    pub fn from_str_loose(s: &str) -> Option<Sentiment> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bullish" | "positive" | "bull" => Some(Sentiment::Bullish),
            "neutral" | "mixed" => Some(Sentiment::Neutral),
            "bearish" | "negative" | "bear" => Some(Sentiment::Bearish),
            _ => None,
        }
    }

    pub fn favours(self, action: TradeAction) -> Option<bool> {
        match (self, action) {
            (Sentiment::Neutral, _) => None,
            (Sentiment::Bullish, TradeAction::Buy) | (Sentiment::Bearish, TradeAction::Sell) => {
                Some(true)
            }
            _ => Some(false),
        }
    }
}
