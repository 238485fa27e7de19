use serde::{Deserialize, Serialize};

use crate::error::{EnhanceError, Result};
use crate::models::TradeAction;

/// A trade proposed upstream, before filtering, sizing and exit planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeIntention {
    pub symbol: String,
    pub action: TradeAction,
    pub quantity: u64,
    pub price_target: f64,
    #[serde(default)]
    pub stop_loss: f64,
    #[serde(default)]
    pub take_profit: f64,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

impl TradeIntention {
    /// Rejects inputs the pipeline must never coerce: a confidence outside
    /// [0, 1] or a price target that cannot serve as an entry price.
    pub fn validate(&self) -> Result<()> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(EnhanceError::InvalidConfidence {
                symbol: self.symbol.clone(),
                value: self.confidence,
            });
        }
        if !self.price_target.is_finite() || self.price_target <= 0.0 {
            return Err(EnhanceError::InvalidPrice {
                symbol: self.symbol.clone(),
                value: self.price_target,
            });
        }
        Ok(())
    }
}
