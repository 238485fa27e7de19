use tracing::{debug, error, info, warn};

use crate::config::StrategyConfig;
use crate::core::breakout::{BreakoutFilter, FilterDecision};
use crate::core::exit_planner::ExitPlanner;
use crate::core::position_sizer::PositionSizer;
use crate::error::{EnhanceError, Result};
use crate::models::{MarketSnapshot, TradeIntention};
use crate::strategies::plan::{
    EnhancedTradeDecision, EnhancedTradePlan, PipelineStage, StrategyPerformanceMetrics,
    TradeFailure,
};

/// What happened to one trade that got through the pipeline without failing.
#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub filter: FilterDecision,
    /// `None` when the breakout filter rejected the trade.
    pub decision: Option<EnhancedTradeDecision>,
}

/// Runs filter, sizer and exit planner over a batch of intentions.
pub struct StrategyCoordinator {
    cfg: StrategyConfig,
    filter: BreakoutFilter,
    sizer: PositionSizer,
    planner: ExitPlanner,
}

impl StrategyCoordinator {
    pub fn new(cfg: &StrategyConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg: cfg.clone(),
            filter: BreakoutFilter::new(&cfg.breakout),
            sizer: PositionSizer::new(&cfg.sizing),
            planner: ExitPlanner::new(&cfg.exits),
        })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.cfg
    }

    /// Enhances a batch. Fails without output on a contract violation
    /// anywhere in the input; any other failure only drops the trade that
    /// caused it.
    pub fn enhance(
        &self,
        intentions: &[TradeIntention],
        market: &MarketSnapshot,
        equity: f64,
    ) -> Result<EnhancedTradePlan> {
        if let Err(e) = validate_batch(intentions, equity) {
            error!("Rejecting batch of {}: {}", intentions.len(), e);
            return Err(e);
        }

        info!(
            trades = intentions.len(),
            equity,
            as_of = %market.as_of,
            "Enhancing trade batch"
        );

        let mut trades = Vec::new();
        let mut filter_decisions = Vec::with_capacity(intentions.len());
        let mut failures = Vec::new();

        let results = intentions
            .iter()
            .enumerate()
            .map(|(index, trade)| self.process_trade(index, trade, market, equity));

        for result in results {
            match result {
                Ok(outcome) => {
                    filter_decisions.push(outcome.filter);
                    if let Some(decision) = outcome.decision {
                        trades.push(decision);
                    }
                }
                Err(failure) => {
                    warn!(
                        symbol = %failure.symbol,
                        stage = %failure.stage,
                        "Trade excluded from plan: {}",
                        failure.reason
                    );
                    failures.push(failure);
                }
            }
        }

        let rejected = filter_decisions.iter().filter(|d| d.filtered).count();
        let metrics = StrategyPerformanceMetrics::from_batch(
            intentions.len(),
            &trades,
            rejected,
            failures.len(),
        );
        let total_risk_exposure = risk_exposure(&trades, equity);

        info!(
            original = metrics.original_trade_count,
            enhanced = metrics.filtered_trade_count,
            rejected = metrics.rejected_trade_count,
            failed = metrics.failed_trade_count,
            risk_reduction = metrics.risk_reduction_ratio,
            total_risk_exposure,
            "Trade batch enhanced"
        );

        Ok(EnhancedTradePlan {
            trades,
            filter_decisions,
            failures,
            metrics,
            total_risk_exposure,
            account_equity: equity,
            created_at: market.as_of,
        })
    }

    /// Filters, sizes and plans exits for a single trade.
    pub fn process_trade(
        &self,
        index: usize,
        trade: &TradeIntention,
        market: &MarketSnapshot,
        equity: f64,
    ) -> std::result::Result<TradeOutcome, TradeFailure> {
        let fail = |stage: PipelineStage, e: EnhanceError| TradeFailure {
            index,
            symbol: trade.symbol.clone(),
            stage,
            reason: e.to_string(),
        };

        let filter = self
            .filter
            .try_evaluate(trade, market)
            .map_err(|e| fail(PipelineStage::Filter, e.into()))?;
        if filter.filtered {
            return Ok(TradeOutcome {
                filter,
                decision: None,
            });
        }

        let entry_price = trade.price_target;
        let sizing = self
            .sizer
            .size(trade.confidence, equity, entry_price)
            .map_err(|e| fail(PipelineStage::Sizing, e))?;

        let exit_strategy = self
            .planner
            .plan(trade, entry_price, sizing.position_size, market.as_of)
            .map_err(|e| fail(PipelineStage::ExitPlanning, e))?;

        let take_profit = self.planner.target_price(
            trade.action,
            entry_price,
            self.cfg.exits.take_profit_offsets.first().copied().unwrap_or_default(),
        );

        let enhanced_quantity = sizing.position_size;
        debug!(
            symbol = %trade.symbol,
            original_quantity = trade.quantity,
            enhanced_quantity,
            probability = filter.probability,
            "Trade enhanced"
        );

        let decision = EnhancedTradeDecision {
            symbol: trade.symbol.clone(),
            action: trade.action,
            intention: trade.clone(),
            breakout_probability: filter.probability,
            indicators: filter.indicators,
            stop_loss: exit_strategy.stop_loss.trigger_price,
            take_profit,
            exit_strategy,
            original_quantity: trade.quantity,
            enhanced_quantity,
            risk_adjusted: enhanced_quantity != trade.quantity,
            filter_passed: true,
            sizing,
        };

        Ok(TradeOutcome {
            filter,
            decision: Some(decision),
        })
    }
}

fn validate_batch(intentions: &[TradeIntention], equity: f64) -> Result<()> {
    if !equity.is_finite() || equity < 0.0 {
        return Err(EnhanceError::InvalidEquity(equity));
    }
    for trade in intentions {
        trade.validate()?;
    }
    Ok(())
}

fn risk_exposure(trades: &[EnhancedTradeDecision], equity: f64) -> f64 {
    if equity <= 0.0 {
        return 0.0;
    }
    trades.iter().map(|t| t.notional()).sum::<f64>() / equity
}
