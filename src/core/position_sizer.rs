use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SizingConfig;
use crate::core::beta;
use crate::error::{EnhanceError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSizingResult {
    /// Fraction of equity, in [0, max_position_pct].
    pub position_percentage: f64,
    /// Whole shares. Zero means "do not execute".
    pub position_size: u64,
    pub position_value: f64,
    pub signal_strength: f64,
    pub beta_cdf_value: f64,
    pub reasoning: String,
}

/// Confidence-driven sizing through a Beta CDF.
///
/// Confidence below the floor carries no edge and sizes to zero. Above it,
/// confidence is rescaled onto [0, 1] and fed through the Beta(2,5) CDF, which
/// keeps marginal signals small and reaches the cap only at full confidence.
pub struct PositionSizer {
    cfg: SizingConfig,
}

impl Default for PositionSizer {
    fn default() -> Self {
        Self::new(&SizingConfig::default())
    }
}

impl PositionSizer {
    pub fn new(cfg: &SizingConfig) -> Self {
        Self { cfg: cfg.clone() }
    }

    pub fn max_position_pct(&self) -> f64 {
        self.cfg.max_position_pct
    }

    /// Maps confidence onto the Beta domain. Not validated here; `size`
    /// rejects confidence outside [0, 1].
    pub fn signal_strength(&self, confidence: f64) -> f64 {
        let floor = self.cfg.confidence_floor;
        if confidence < floor {
            return 0.0;
        }
        (confidence - floor) / (1.0 - floor)
    }

    pub fn beta_cdf(&self, signal_strength: f64) -> Result<f64> {
        validate_signal(signal_strength)?;
        Ok(beta::beta_cdf(signal_strength, self.cfg.beta_alpha, self.cfg.beta_beta)?)
    }

    pub fn size(
        &self,
        confidence: f64,
        equity: f64,
        entry_price: f64,
    ) -> Result<PositionSizingResult> {
        if !confidence.is_finite() || !(0.0..=1.0).contains(&confidence) {
            return Err(EnhanceError::ConfidenceOutOfRange(confidence));
        }
        if !equity.is_finite() || equity < 0.0 {
            return Err(EnhanceError::InvalidEquity(equity));
        }
        if !entry_price.is_finite() || entry_price <= 0.0 {
            return Err(EnhanceError::InvalidEntryPrice(entry_price));
        }

        let signal_strength = self.signal_strength(confidence);
        let beta_cdf_value = self.beta_cdf(signal_strength)?;

        let position_percentage = self.cfg.max_position_pct * beta_cdf_value;
        let position_value = equity * position_percentage;
        let shares = (position_value / entry_price).floor();
        if !shares.is_finite() || shares > u64::MAX as f64 {
            return Err(EnhanceError::InvalidQuantity {
                value: position_value,
                entry: entry_price,
            });
        }
        let position_size = shares as u64;

        debug!(
            confidence,
            signal_strength,
            beta_cdf_value,
            position_percentage,
            position_size,
            "Sized position"
        );

        let reasoning = [
            format!("Confidence: {:.3}", confidence),
            format!("Signal Strength: {:.4}", signal_strength),
            format!(
                "Beta CDF ({}, {}): {:.4}",
                self.cfg.beta_alpha, self.cfg.beta_beta, beta_cdf_value
            ),
            format!("Position Percentage: {:.2}%", position_percentage * 100.0),
            format!("Position Value: ${:.2}", position_value),
            format!("Entry Price: ${:.2}", entry_price),
            format!("Position Size: {} shares", position_size),
        ]
        .join("\n");

        Ok(PositionSizingResult {
            position_percentage,
            position_size,
            position_value,
            signal_strength,
            beta_cdf_value,
            reasoning,
        })
    }
}

fn validate_signal(signal_strength: f64) -> Result<()> {
    if !signal_strength.is_finite() || !(0.0..=1.0).contains(&signal_strength) {
        return Err(EnhanceError::InvalidSignalStrength(signal_strength));
    }
    Ok(())
}
