use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{EnhanceError, Result};

// Breakout filter
pub const VOLUME_SURGE_WEIGHT: f64 = 0.25;
pub const PRICE_MOMENTUM_WEIGHT: f64 = 0.25;
pub const VOLATILITY_BREAKOUT_WEIGHT: f64 = 0.20;
pub const MARKET_SENTIMENT_WEIGHT: f64 = 0.15;
pub const TECHNICAL_STRENGTH_WEIGHT: f64 = 0.15;
pub const BREAKOUT_THRESHOLD: f64 = 0.4;
pub const HIGH_CONFIDENCE_CUTOFF: f64 = 0.8;
pub const HIGH_CONFIDENCE_BONUS: f64 = 0.10;
pub const NEUTRAL_INDICATOR: f64 = 0.5;

// Position sizing
pub const CONFIDENCE_FLOOR: f64 = 0.6;
pub const MAX_POSITION_PCT: f64 = 0.10;
pub const BETA_ALPHA: f64 = 2.0;
pub const BETA_BETA: f64 = 5.0;

// Exit planning
pub const STOP_LOSS_PCT: f64 = 0.06;
pub const TAKE_PROFIT_OFFSETS: [f64; 3] = [0.10, 0.15, 0.20];
pub const BATCH_FRACTIONS: [f64; 3] = [0.50, 0.30, 0.20];
pub const FRACTION_TOLERANCE: f64 = 0.01;

const WEIGHT_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorWeights {
    pub volume_surge: f64,
    pub price_momentum: f64,
    pub volatility_breakout: f64,
    pub market_sentiment: f64,
    pub technical_strength: f64,
}

impl IndicatorWeights {
    pub fn total(&self) -> f64 {
        self.volume_surge
            + self.price_momentum
            + self.volatility_breakout
            + self.market_sentiment
            + self.technical_strength
    }
}

impl Default for IndicatorWeights {
    fn default() -> Self {
        Self {
            volume_surge: VOLUME_SURGE_WEIGHT,
            price_momentum: PRICE_MOMENTUM_WEIGHT,
            volatility_breakout: VOLATILITY_BREAKOUT_WEIGHT,
            market_sentiment: MARKET_SENTIMENT_WEIGHT,
            technical_strength: TECHNICAL_STRENGTH_WEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakoutConfig {
    pub weights: IndicatorWeights,
    pub threshold: f64,
    pub high_confidence_cutoff: f64,
    pub high_confidence_bonus: f64,
    pub neutral_default: f64,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            weights: IndicatorWeights::default(),
            threshold: BREAKOUT_THRESHOLD,
            high_confidence_cutoff: HIGH_CONFIDENCE_CUTOFF,
            high_confidence_bonus: HIGH_CONFIDENCE_BONUS,
            neutral_default: NEUTRAL_INDICATOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizingConfig {
    pub confidence_floor: f64,
    pub max_position_pct: f64,
    pub beta_alpha: f64,
    pub beta_beta: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            confidence_floor: CONFIDENCE_FLOOR,
            max_position_pct: MAX_POSITION_PCT,
            beta_alpha: BETA_ALPHA,
            beta_beta: BETA_BETA,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitConfig {
    pub stop_loss_pct: f64,
    pub take_profit_offsets: Vec<f64>,
    pub batch_fractions: Vec<f64>,
    pub fraction_tolerance: f64,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            stop_loss_pct: STOP_LOSS_PCT,
            take_profit_offsets: TAKE_PROFIT_OFFSETS.to_vec(),
            batch_fractions: BATCH_FRACTIONS.to_vec(),
            fraction_tolerance: FRACTION_TOLERANCE,
        }
    }
}

/// Every business parameter of the enhancement pipeline in one record.
/// `Default` reproduces the production constants above.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default)]
    pub breakout: BreakoutConfig,
    #[serde(default)]
    pub sizing: SizingConfig,
    #[serde(default)]
    pub exits: ExitConfig,
}

impl StrategyConfig {
    pub fn validate(&self) -> Result<()> {
        let b = &self.breakout;
        let total = b.weights.total();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return invalid(format!("indicator weights sum to {total}, expected 1.0"));
        }
        let weights = [
            b.weights.volume_surge,
            b.weights.price_momentum,
            b.weights.volatility_breakout,
            b.weights.market_sentiment,
            b.weights.technical_strength,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return invalid("indicator weights must be non-negative".to_string());
        }
        if !(0.0..=1.0).contains(&b.threshold) {
            return invalid(format!("breakout threshold {} outside [0, 1]", b.threshold));
        }
        if !(0.0..=1.0).contains(&b.neutral_default) {
            return invalid(format!(
                "neutral indicator default {} outside [0, 1]",
                b.neutral_default
            ));
        }

        let s = &self.sizing;
        if !(0.0..1.0).contains(&s.confidence_floor) {
            return invalid(format!(
                "confidence floor {} outside [0, 1)",
                s.confidence_floor
            ));
        }
        if !(s.max_position_pct > 0.0 && s.max_position_pct <= 1.0) {
            return invalid(format!(
                "max position {} outside (0, 1]",
                s.max_position_pct
            ));
        }
        if !(s.beta_alpha > 0.0 && s.beta_beta > 0.0) {
            return invalid("beta shape parameters must be positive".to_string());
        }

        let e = &self.exits;
        if !(e.stop_loss_pct > 0.0 && e.stop_loss_pct < 1.0) {
            return invalid(format!("stop loss {} outside (0, 1)", e.stop_loss_pct));
        }
        if e.take_profit_offsets.is_empty()
            || e.take_profit_offsets.len() != e.batch_fractions.len()
        {
            return invalid(format!(
                "{} take-profit offsets for {} batch fractions",
                e.take_profit_offsets.len(),
                e.batch_fractions.len()
            ));
        }
        // SELL targets sit at entry * (1 - offset), so offsets stay below 1.
        if e.take_profit_offsets.iter().any(|o| !(*o > 0.0 && *o < 1.0)) {
            return invalid("take-profit offsets must lie in (0, 1)".to_string());
        }
        if e.batch_fractions.iter().any(|f| !(*f > 0.0 && *f <= 1.0)) {
            return invalid("batch fractions must lie in (0, 1]".to_string());
        }
        let fraction_sum: f64 = e.batch_fractions.iter().sum();
        if (fraction_sum - 1.0).abs() > e.fraction_tolerance {
            return invalid(format!("batch fractions sum to {fraction_sum:.4}, expected 1.0"));
        }
        Ok(())
    }
}

fn invalid(reason: String) -> Result<()> {
    Err(EnhanceError::InvalidConfig(reason))
}

/// Runtime settings for the binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path of the request JSON (intentions, snapshot, equity).
    pub input_path: String,
    /// Used when the request does not carry an equity figure.
    pub account_equity: f64,
    /// Optional JSON file overriding `StrategyConfig`.
    pub strategy_config_path: Option<String>,
    pub strategy: StrategyConfig,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let strategy_config_path = std::env::var("STRATEGY_CONFIG")
            .ok()
            .filter(|p| !p.trim().is_empty());

        Config {
            input_path: env("ENHANCER_INPUT", "request.json"),
            account_equity: env("ACCOUNT_EQUITY", "100000")
                .parse()
                .unwrap_or(100_000.0),
            strategy_config_path,
            strategy: StrategyConfig::default(),
            log_level: env("LOG_LEVEL", "INFO"),
        }
    }

    /// Replaces `strategy` with the JSON file named by `strategy_config_path`.
    pub fn load_strategy_override(&mut self) -> anyhow::Result<()> {
        if let Some(path) = &self.strategy_config_path {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read strategy config {path}"))?;
            let strategy: StrategyConfig = serde_json::from_str(&text)
                .with_context(|| format!("Malformed strategy config {path}"))?;
            strategy.validate()?;
            self.strategy = strategy;
        }
        Ok(())
    }
}
