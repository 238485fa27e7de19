use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::breakout::{BreakoutIndicators, FilterDecision};
use crate::core::exit_planner::EnhancedExitStrategy;
use crate::core::position_sizer::PositionSizingResult;
use crate::models::{TradeAction, TradeIntention};

/// A trade intention after filtering, sizing and exit planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedTradeDecision {
    pub symbol: String,
    pub action: TradeAction,
    /// The intention exactly as received.
    pub intention: TradeIntention,
    pub sizing: PositionSizingResult,
    pub breakout_probability: f64,
    pub indicators: BreakoutIndicators,
    pub exit_strategy: EnhancedExitStrategy,
    pub original_quantity: u64,
    pub enhanced_quantity: u64,
    /// Replaces the intention's pre-enhancement stop estimate.
    pub stop_loss: f64,
    /// Replaces the intention's pre-enhancement target: the first take-profit
    /// trigger price.
    pub take_profit: f64,
    pub risk_adjusted: bool,
    pub filter_passed: bool,
}

impl EnhancedTradeDecision {
    /// Zero-share decisions are kept in the plan but must not be sent.
    pub fn is_executable(&self) -> bool {
        self.enhanced_quantity > 0
    }

    pub fn notional(&self) -> f64 {
        self.enhanced_quantity as f64 * self.intention.price_target
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Filter,
    Sizing,
    ExitPlanning,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Filter => write!(f, "filter"),
            PipelineStage::Sizing => write!(f, "sizing"),
            PipelineStage::ExitPlanning => write!(f, "exit_planning"),
        }
    }
}

/// A trade excluded from the plan because one stage could not process it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeFailure {
    /// Position of the trade in the input batch.
    pub index: usize,
    pub symbol: String,
    pub stage: PipelineStage,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPerformanceMetrics {
    pub original_trade_count: usize,
    /// Trades that made it into the plan.
    pub filtered_trade_count: usize,
    pub rejected_trade_count: usize,
    pub failed_trade_count: usize,
    pub total_position_percentage: f64,
    pub avg_signal_strength: f64,
    pub avg_breakout_probability: f64,
    pub avg_indicators: BreakoutIndicators,
    /// `1 - filtered / original`; zero for an empty batch.
    pub risk_reduction_ratio: f64,
    pub avg_confidence: f64,
}

impl StrategyPerformanceMetrics {
    /// Averages run over the trades in the plan.
    pub fn from_batch(
        original_trade_count: usize,
        trades: &[EnhancedTradeDecision],
        rejected_trade_count: usize,
        failed_trade_count: usize,
    ) -> Self {
        let n = trades.len();
        let mean = |f: &dyn Fn(&EnhancedTradeDecision) -> f64| -> f64 {
            if n == 0 {
                0.0
            } else {
                trades.iter().map(f).sum::<f64>() / n as f64
            }
        };

        let risk_reduction_ratio = if original_trade_count == 0 {
            0.0
        } else {
            1.0 - n as f64 / original_trade_count as f64
        };

        Self {
            original_trade_count,
            filtered_trade_count: n,
            rejected_trade_count,
            failed_trade_count,
            total_position_percentage: trades.iter().map(|t| t.sizing.position_percentage).sum(),
            avg_signal_strength: mean(&|t| t.sizing.signal_strength),
            avg_breakout_probability: mean(&|t| t.breakout_probability),
            avg_indicators: BreakoutIndicators {
                volume_surge: mean(&|t| t.indicators.volume_surge),
                price_momentum: mean(&|t| t.indicators.price_momentum),
                volatility_breakout: mean(&|t| t.indicators.volatility_breakout),
                market_sentiment: mean(&|t| t.indicators.market_sentiment),
                technical_strength: mean(&|t| t.indicators.technical_strength),
            },
            risk_reduction_ratio,
            avg_confidence: mean(&|t| t.intention.confidence),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedTradePlan {
    pub trades: Vec<EnhancedTradeDecision>,
    /// One decision per trade that reached the filter, passed or not.
    pub filter_decisions: Vec<FilterDecision>,
    pub failures: Vec<TradeFailure>,
    pub metrics: StrategyPerformanceMetrics,
    /// `sum(enhanced_quantity * price_target) / equity`.
    pub total_risk_exposure: f64,
    pub account_equity: f64,
    pub created_at: DateTime<Utc>,
}

impl EnhancedTradePlan {
    pub fn executable(&self) -> impl Iterator<Item = &EnhancedTradeDecision> {
        self.trades.iter().filter(|t| t.is_executable())
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }
}
