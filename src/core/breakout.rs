use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::BreakoutConfig;
use crate::error::IndicatorError;
use crate::models::{MarketSnapshot, Sentiment, TradeAction, TradeIntention};

/// Scale applied to a directional return before centring on 0.5; a 10% move
/// saturates the momentum score.
const MOMENTUM_SCALE: f64 = 5.0;
/// A ratio of 2x the average saturates the surge scores; 1x maps to 0.5.
const SURGE_SATURATION: f64 = 2.0;
const SENTIMENT_FAVOURABLE: f64 = 0.8;
const SENTIMENT_UNFAVOURABLE: f64 = 0.2;
const SENTIMENT_NEUTRAL: f64 = 0.5;
const MACD_FAVOURABLE: f64 = 0.7;
const MACD_UNFAVOURABLE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    VolumeSurge,
    PriceMomentum,
    VolatilityBreakout,
    MarketSentiment,
    TechnicalStrength,
}

impl Indicator {
    pub const ALL: [Indicator; 5] = [
        Indicator::VolumeSurge,
        Indicator::PriceMomentum,
        Indicator::VolatilityBreakout,
        Indicator::MarketSentiment,
        Indicator::TechnicalStrength,
    ];

    /// What an indicator reads as when its market fields are unknown.
    pub fn default_policy(self) -> IndicatorDefault {
        match self {
            Indicator::PriceMomentum | Indicator::TechnicalStrength => {
                IndicatorDefault::TradeConfidence
            }
            Indicator::VolumeSurge
            | Indicator::VolatilityBreakout
            | Indicator::MarketSentiment => IndicatorDefault::Neutral,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Indicator::VolumeSurge => "Volume Surge",
            Indicator::PriceMomentum => "Price Momentum",
            Indicator::VolatilityBreakout => "Volatility Breakout",
            Indicator::MarketSentiment => "Market Sentiment",
            Indicator::TechnicalStrength => "Technical Strength",
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorDefault {
    /// The configured neutral value (0.5).
    Neutral,
    /// The trade's own upstream confidence.
    TradeConfidence,
}

impl IndicatorDefault {
    pub fn resolve(self, neutral: f64, confidence: f64) -> f64 {
        match self {
            IndicatorDefault::Neutral => neutral,
            IndicatorDefault::TradeConfidence => confidence.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakoutIndicators {
    pub volume_surge: f64,
    pub price_momentum: f64,
    pub volatility_breakout: f64,
    pub market_sentiment: f64,
    pub technical_strength: f64,
}

impl BreakoutIndicators {
    pub fn get(&self, indicator: Indicator) -> f64 {
        match indicator {
            Indicator::VolumeSurge => self.volume_surge,
            Indicator::PriceMomentum => self.price_momentum,
            Indicator::VolatilityBreakout => self.volatility_breakout,
            Indicator::MarketSentiment => self.market_sentiment,
            Indicator::TechnicalStrength => self.technical_strength,
        }
    }

    fn set(&mut self, indicator: Indicator, value: f64) {
        let slot = match indicator {
            Indicator::VolumeSurge => &mut self.volume_surge,
            Indicator::PriceMomentum => &mut self.price_momentum,
            Indicator::VolatilityBreakout => &mut self.volatility_breakout,
            Indicator::MarketSentiment => &mut self.market_sentiment,
            Indicator::TechnicalStrength => &mut self.technical_strength,
        };
        *slot = value.clamp(0.0, 1.0);
    }

    pub fn weighted_score(&self, cfg: &BreakoutConfig) -> f64 {
        let w = &cfg.weights;
        self.volume_surge * w.volume_surge
            + self.price_momentum * w.price_momentum
            + self.volatility_breakout * w.volatility_breakout
            + self.market_sentiment * w.market_sentiment
            + self.technical_strength * w.technical_strength
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDecision {
    pub trade: TradeIntention,
    pub probability: f64,
    pub filtered: bool,
    pub indicators: BreakoutIndicators,
    /// Indicators that fell back to their default policy.
    pub defaulted: Vec<Indicator>,
    pub reasoning: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOutcome {
    pub passed: Vec<TradeIntention>,
    pub decisions: Vec<FilterDecision>,
}

impl FilterOutcome {
    pub fn rejected_count(&self) -> usize {
        self.decisions.iter().filter(|d| d.filtered).count()
    }
}

pub struct BreakoutFilter {
    cfg: BreakoutConfig,
}

impl Default for BreakoutFilter {
    fn default() -> Self {
        Self::new(&BreakoutConfig::default())
    }
}

impl BreakoutFilter {
    pub fn new(cfg: &BreakoutConfig) -> Self {
        Self { cfg: cfg.clone() }
    }

    pub fn threshold(&self) -> f64 {
        self.cfg.threshold
    }

    /// Scores every trade and drops those below the threshold. Never fails:
    /// corrupt indicator values degrade to the indicator's default.
    pub fn filter(&self, trades: &[TradeIntention], market: &MarketSnapshot) -> FilterOutcome {
        let mut outcome = FilterOutcome::default();

        for trade in trades {
            let decision = self.evaluate(trade, market);
            if !decision.filtered {
                outcome.passed.push(trade.clone());
            }
            outcome.decisions.push(decision);
        }

        info!(
            total = trades.len(),
            passed = outcome.passed.len(),
            rejected = outcome.rejected_count(),
            "Breakout filter complete"
        );
        outcome
    }

    /// Lenient evaluation of a single trade.
    pub fn evaluate(&self, trade: &TradeIntention, market: &MarketSnapshot) -> FilterDecision {
        let mut indicators = self.defaults(trade);
        let mut defaulted = Vec::new();

        for indicator in Indicator::ALL {
            match extract(indicator, trade, market) {
                Ok(Some(value)) => indicators.set(indicator, value),
                Ok(None) => defaulted.push(indicator),
                Err(e) => {
                    warn!(symbol = %trade.symbol, "{} defaulted: {}", indicator, e);
                    defaulted.push(indicator);
                }
            }
        }

        self.decide(trade, indicators, defaulted)
    }

    /// Strict evaluation: a corrupt indicator value fails the trade instead
    /// of defaulting. Missing fields still default.
    pub fn try_evaluate(
        &self,
        trade: &TradeIntention,
        market: &MarketSnapshot,
    ) -> Result<FilterDecision, IndicatorError> {
        let mut indicators = self.defaults(trade);
        let mut defaulted = Vec::new();

        for indicator in Indicator::ALL {
            match extract(indicator, trade, market)? {
                Some(value) => indicators.set(indicator, value),
                None => defaulted.push(indicator),
            }
        }

        Ok(self.decide(trade, indicators, defaulted))
    }

    /// Weighted score plus the high-confidence bonus, clamped to [0, 1].
    pub fn probability(&self, indicators: &BreakoutIndicators, confidence: f64) -> f64 {
        let mut p = indicators.weighted_score(&self.cfg);
        if confidence > self.cfg.high_confidence_cutoff {
            p += self.cfg.high_confidence_bonus;
        }
        if p.is_nan() {
            return 0.0;
        }
        p.clamp(0.0, 1.0)
    }

    fn defaults(&self, trade: &TradeIntention) -> BreakoutIndicators {
        let mut indicators = BreakoutIndicators {
            volume_surge: 0.0,
            price_momentum: 0.0,
            volatility_breakout: 0.0,
            market_sentiment: 0.0,
            technical_strength: 0.0,
        };
        for indicator in Indicator::ALL {
            let value = indicator
                .default_policy()
                .resolve(self.cfg.neutral_default, trade.confidence);
            indicators.set(indicator, value);
        }
        indicators
    }

    fn decide(
        &self,
        trade: &TradeIntention,
        indicators: BreakoutIndicators,
        defaulted: Vec<Indicator>,
    ) -> FilterDecision {
        let probability = self.probability(&indicators, trade.confidence);
        let filtered = probability < self.cfg.threshold;
        let reasoning = self.reasoning(trade, &indicators, &defaulted, probability, filtered);

        if filtered {
            info!(
                symbol = %trade.symbol,
                probability,
                threshold = self.cfg.threshold,
                "Trade filtered out: breakout probability below threshold"
            );
        } else {
            debug!(symbol = %trade.symbol, probability, "Trade passed breakout filter");
        }

        FilterDecision {
            trade: trade.clone(),
            probability,
            filtered,
            indicators,
            defaulted,
            reasoning,
        }
    }

    fn reasoning(
        &self,
        trade: &TradeIntention,
        indicators: &BreakoutIndicators,
        defaulted: &[Indicator],
        probability: f64,
        filtered: bool,
    ) -> String {
        let mut lines = vec![
            format!("Symbol: {}", trade.symbol),
            format!("Breakout Probability: {:.3}", probability),
            format!("Threshold: {:.3}", self.cfg.threshold),
            format!("Decision: {}", if filtered { "FILTERED" } else { "PASSED" }),
        ];
        for indicator in Indicator::ALL {
            let flag = if defaulted.contains(&indicator) {
                " (default)"
            } else {
                ""
            };
            lines.push(format!(
                "{}: {:.3}{}",
                indicator.label(),
                indicators.get(indicator),
                flag
            ));
        }
        let bonus = if trade.confidence > self.cfg.high_confidence_cutoff {
            self.cfg.high_confidence_bonus
        } else {
            0.0
        };
        lines.push(format!("Confidence Bonus: {:.3}", bonus));
        lines.join("\n")
    }
}

// --- Indicator extractors ---
//
// Ok(Some(v)): observed score in [0, 1]
// Ok(None):    missing or malformed, caller applies the default policy
// Err(_):      present but impossible

fn extract(
    indicator: Indicator,
    trade: &TradeIntention,
    market: &MarketSnapshot,
) -> Result<Option<f64>, IndicatorError> {
    match indicator {
        Indicator::VolumeSurge => ratio_surge(market, &trade.symbol, "volume", "avg_volume"),
        Indicator::PriceMomentum => price_momentum(market, trade),
        Indicator::VolatilityBreakout => {
            ratio_surge(market, &trade.symbol, "volatility", "avg_volatility")
        }
        Indicator::MarketSentiment => Ok(market_sentiment(market, trade)),
        Indicator::TechnicalStrength => technical_strength(market, trade),
    }
}

fn non_negative(
    market: &MarketSnapshot,
    symbol: &str,
    field: &'static str,
) -> Result<Option<f64>, IndicatorError> {
    match market.number(symbol, field) {
        Some(v) if v < 0.0 => Err(IndicatorError::ImpossibleValue {
            symbol: symbol.to_string(),
            field,
            value: v,
        }),
        other => Ok(other),
    }
}

fn ratio_surge(
    market: &MarketSnapshot,
    symbol: &str,
    current_field: &'static str,
    average_field: &'static str,
) -> Result<Option<f64>, IndicatorError> {
    let current = non_negative(market, symbol, current_field)?;
    let average = non_negative(market, symbol, average_field)?;
    match (current, average) {
        (Some(current), Some(average)) if average > 0.0 => {
            Ok(Some((current / average / SURGE_SATURATION).min(1.0)))
        }
        _ => Ok(None),
    }
}

fn price_momentum(
    market: &MarketSnapshot,
    trade: &TradeIntention,
) -> Result<Option<f64>, IndicatorError> {
    let history = match market.series(&trade.symbol, "price_history") {
        Some(h) if h.len() >= 2 => h,
        _ => return Ok(None),
    };
    if let Some((index, &price)) = history.iter().enumerate().find(|(_, p)| **p <= 0.0) {
        return Err(IndicatorError::CorruptPriceHistory {
            symbol: trade.symbol.clone(),
            index,
            price,
        });
    }
    let first = history[0];
    let last = history[history.len() - 1];
    let directional_return = (last - first) / first * trade.action.sign();
    Ok(Some(
        0.5 + (directional_return * MOMENTUM_SCALE).clamp(-0.5, 0.5),
    ))
}

fn market_sentiment(market: &MarketSnapshot, trade: &TradeIntention) -> Option<f64> {
    let raw = market
        .text(&trade.symbol, "sentiment")
        .or_else(|| market.global_text("market_sentiment"))?;
    let sentiment = Sentiment::from_str_loose(raw)?;
    Some(match sentiment.favours(trade.action) {
        Some(true) => SENTIMENT_FAVOURABLE,
        Some(false) => SENTIMENT_UNFAVOURABLE,
        None => SENTIMENT_NEUTRAL,
    })
}

fn technical_strength(
    market: &MarketSnapshot,
    trade: &TradeIntention,
) -> Result<Option<f64>, IndicatorError> {
    let mut scores = Vec::with_capacity(2);

    if let Some(rsi) = market.number(&trade.symbol, "rsi") {
        if !(0.0..=100.0).contains(&rsi) {
            return Err(IndicatorError::ImpossibleValue {
                symbol: trade.symbol.clone(),
                field: "rsi",
                value: rsi,
            });
        }
        let bullish = rsi / 100.0;
        scores.push(match trade.action {
            TradeAction::Buy => bullish,
            TradeAction::Sell => 1.0 - bullish,
        });
    }

    let macd = market.number(&trade.symbol, "macd");
    let signal = market.number(&trade.symbol, "macd_signal");
    if let (Some(macd), Some(signal)) = (macd, signal) {
        let bullish_cross = macd > signal;
        let favourable = match trade.action {
            TradeAction::Buy => bullish_cross,
            TradeAction::Sell => !bullish_cross,
        };
        scores.push(if favourable {
            MACD_FAVOURABLE
        } else {
            MACD_UNFAVOURABLE
        });
    }

    if scores.is_empty() {
        return Ok(None);
    }
    Ok(Some(scores.iter().sum::<f64>() / scores.len() as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{empty_snapshot, make_intention, strong_breakout_snapshot};
    use serde_json::json;

    #[test]
    fn default_policies() {
        assert_eq!(
            Indicator::VolumeSurge.default_policy(),
            IndicatorDefault::Neutral
        );
        assert_eq!(
            Indicator::PriceMomentum.default_policy(),
            IndicatorDefault::TradeConfidence
        );
        assert_eq!(
            Indicator::TechnicalStrength.default_policy(),
            IndicatorDefault::TradeConfidence
        );
        assert_eq!(IndicatorDefault::Neutral.resolve(0.5, 0.9), 0.5);
        assert_eq!(IndicatorDefault::TradeConfidence.resolve(0.5, 0.9), 0.9);
    }

    #[test]
    fn empty_snapshot_uses_defaults() {
        let filter = BreakoutFilter::default();
        let trade = make_intention("AAPL", TradeAction::Buy, 100.0, 0.7);
        let d = filter.evaluate(&trade, &empty_snapshot());
        assert_eq!(d.defaulted.len(), 5);
        assert_eq!(d.indicators.volume_surge, 0.5);
        assert_eq!(d.indicators.price_momentum, 0.7);
        assert_eq!(d.indicators.technical_strength, 0.7);
        // 0.25*0.5 + 0.25*0.7 + 0.20*0.5 + 0.15*0.5 + 0.15*0.7 = 0.58
        assert!((d.probability - 0.58).abs() < 1e-9);
        assert!(!d.filtered);
    }

    #[test]
    fn high_confidence_bonus_applies_above_cutoff() {
        let filter = BreakoutFilter::default();
        let market = empty_snapshot();
        let at_cutoff =
            filter.evaluate(&make_intention("A", TradeAction::Buy, 10.0, 0.8), &market);
        let above = filter.evaluate(&make_intention("A", TradeAction::Buy, 10.0, 0.81), &market);
        // 0.8: 0.40*0.8 + 0.60*0.5 = 0.62, no bonus
        assert!((at_cutoff.probability - 0.62).abs() < 1e-9);
        // 0.81: 0.40*0.81 + 0.30 + 0.10 = 0.724
        assert!((above.probability - 0.724).abs() < 1e-9);
        assert!(above.reasoning.contains("Confidence Bonus: 0.100"));
    }

    #[test]
    fn low_confidence_without_data_is_filtered() {
        let filter = BreakoutFilter::default();
        // 0.40*0.0 + 0.60*0.5 = 0.30 < 0.4
        let trade = make_intention("X", TradeAction::Buy, 10.0, 0.0);
        let d = filter.evaluate(&trade, &empty_snapshot());
        assert!(d.filtered);
        assert!(d.reasoning.contains("Decision: FILTERED"));
    }

    #[test]
    fn strong_market_data_passes() {
        let filter = BreakoutFilter::default();
        let trade = make_intention("NVDA", TradeAction::Buy, 500.0, 0.7);
        let d = filter.evaluate(&trade, &strong_breakout_snapshot("NVDA"));
        assert!(d.defaulted.is_empty(), "defaulted: {:?}", d.defaulted);
        assert_eq!(d.indicators.volume_surge, 1.0);
        assert_eq!(d.indicators.market_sentiment, SENTIMENT_FAVOURABLE);
        assert!(d.probability > 0.8);
    }

    #[test]
    fn sell_mirrors_momentum_and_sentiment() {
        let filter = BreakoutFilter::default();
        let market = strong_breakout_snapshot("NVDA");
        let buy = filter.evaluate(&make_intention("NVDA", TradeAction::Buy, 500.0, 0.7), &market);
        let sell =
            filter.evaluate(&make_intention("NVDA", TradeAction::Sell, 500.0, 0.7), &market);
        let momentum_sum = buy.indicators.price_momentum + sell.indicators.price_momentum;
        assert!((momentum_sum - 1.0).abs() < 1e-9);
        assert_eq!(sell.indicators.market_sentiment, SENTIMENT_UNFAVOURABLE);
        assert!(sell.probability < buy.probability);
    }

    #[test]
    fn global_sentiment_used_when_symbol_has_none() {
        let filter = BreakoutFilter::default();
        let market = empty_snapshot().with_entry("market_sentiment", json!("bearish"));
        let d = filter.evaluate(&make_intention("X", TradeAction::Sell, 10.0, 0.5), &market);
        assert_eq!(d.indicators.market_sentiment, SENTIMENT_FAVOURABLE);
        assert!(!d.defaulted.contains(&Indicator::MarketSentiment));
    }

    #[test]
    fn malformed_fields_degrade_without_error() {
        let filter = BreakoutFilter::default();
        let market = empty_snapshot().with_entry(
            "X",
            json!({ "volume": "lots", "avg_volume": 0, "price_history": [10.0], "rsi": null }),
        );
        let trade = make_intention("X", TradeAction::Buy, 10.0, 0.6);
        let strict = filter.try_evaluate(&trade, &market).unwrap();
        assert_eq!(strict.defaulted.len(), 5);
        assert_eq!(strict, filter.evaluate(&trade, &market));
    }

    #[test]
    fn corrupt_values_default_leniently_but_fail_strictly() {
        let filter = BreakoutFilter::default();
        let market = empty_snapshot().with_entry(
            "BAD",
            json!({ "volume": -5.0, "avg_volume": 100.0 }),
        );
        let trade = make_intention("BAD", TradeAction::Buy, 10.0, 0.7);

        let lenient = filter.evaluate(&trade, &market);
        assert!(lenient.defaulted.contains(&Indicator::VolumeSurge));
        assert_eq!(lenient.indicators.volume_surge, 0.5);

        let strict = filter.try_evaluate(&trade, &market);
        assert!(matches!(
            strict,
            Err(IndicatorError::ImpossibleValue { field: "volume", .. })
        ));
    }

    #[test]
    fn corrupt_price_history_fails_strictly() {
        let filter = BreakoutFilter::default();
        let market =
            empty_snapshot().with_entry("BAD", json!({ "price_history": [10.0, 0.0, 11.0] }));
        let trade = make_intention("BAD", TradeAction::Buy, 10.0, 0.7);
        let err = filter.try_evaluate(&trade, &market).unwrap_err();
        assert_eq!(
            err,
            IndicatorError::CorruptPriceHistory {
                symbol: "BAD".to_string(),
                index: 1,
                price: 0.0
            }
        );
    }

    #[test]
    fn rsi_out_of_range_is_corrupt() {
        let filter = BreakoutFilter::default();
        let market = empty_snapshot().with_entry("BAD", json!({ "rsi": 140 }));
        let trade = make_intention("BAD", TradeAction::Buy, 10.0, 0.7);
        assert!(filter.try_evaluate(&trade, &market).is_err());
    }

    #[test]
    fn filter_keeps_all_decisions() {
        let filter = BreakoutFilter::default();
        let trades = vec![
            make_intention("A", TradeAction::Buy, 10.0, 0.9),
            make_intention("B", TradeAction::Buy, 10.0, 0.0),
            make_intention("C", TradeAction::Sell, 10.0, 0.75),
        ];
        let outcome = filter.filter(&trades, &empty_snapshot());
        assert_eq!(outcome.decisions.len(), 3);
        assert_eq!(outcome.rejected_count(), 1);
        let passed: Vec<&str> = outcome.passed.iter().map(|t| t.symbol.as_str()).collect();
        assert_eq!(passed, vec!["A", "C"]);
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let trade = make_intention("A", TradeAction::Buy, 10.0, 0.0);
        let market = empty_snapshot();
        let score = BreakoutFilter::default().evaluate(&trade, &market).probability;

        let mut cfg = BreakoutConfig::default();
        cfg.threshold = score;
        let at = BreakoutFilter::new(&cfg).evaluate(&trade, &market);
        assert_eq!(at.probability, score);
        assert!(!at.filtered);

        cfg.threshold = score + 1e-9;
        assert!(BreakoutFilter::new(&cfg).evaluate(&trade, &market).filtered);
    }

    #[test]
    fn reasoning_has_labelled_lines() {
        let filter = BreakoutFilter::default();
        let trade = make_intention("A", TradeAction::Buy, 10.0, 0.7);
        let d = filter.evaluate(&trade, &empty_snapshot());
        let labels = [
            "Breakout Probability:",
            "Threshold:",
            "Volume Surge:",
            "Technical Strength:",
        ];
        for label in labels {
            assert!(d.reasoning.lines().any(|l| l.starts_with(label)), "{label}");
        }
    }
}
