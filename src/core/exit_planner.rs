use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ExitConfig;
use crate::error::{EnhanceError, Result};
use crate::models::{ExitKind, TradeAction, TradeIntention};

/// Added before flooring a share split so that e.g. 100 * 0.57 does not
/// truncate to 56 through representation error.
const SHARE_EPSILON: f64 = 1e-9;
/// Relative slack when comparing a price against a trigger, so a target
/// stored as 110.00000000000001 still fires at 110.0.
const TRIGGER_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitLevel {
    /// Fraction of the position liquidated at this level.
    pub percentage: f64,
    pub quantity: u64,
    pub trigger_price: f64,
    pub kind: ExitKind,
    pub reasoning: String,
}

impl ExitLevel {
    /// Whether `price` has reached this level for a position in `direction`.
    /// Stops trigger on adverse moves, limits on favourable ones.
    pub fn is_crossed(&self, direction: TradeAction, price: f64) -> bool {
        let slack = self.trigger_price.abs() * TRIGGER_EPSILON;
        match (self.kind, direction) {
            (ExitKind::Market, _) => true,
            (ExitKind::Stop, TradeAction::Buy) => price <= self.trigger_price + slack,
            (ExitKind::Stop, TradeAction::Sell) => price >= self.trigger_price - slack,
            (ExitKind::Limit, TradeAction::Buy) => price >= self.trigger_price - slack,
            (ExitKind::Limit, TradeAction::Sell) => price <= self.trigger_price + slack,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedExitStrategy {
    pub symbol: String,
    pub direction: TradeAction,
    pub entry_price: f64,
    pub total_quantity: u64,
    pub stop_loss: ExitLevel,
    pub take_profits: Vec<ExitLevel>,
    /// Take-profit levels the config asked for, before zero-quantity ones
    /// were omitted.
    pub planned_levels: usize,
    pub created_at: DateTime<Utc>,
}

impl EnhancedExitStrategy {
    pub fn stop_triggered(&self, price: f64) -> bool {
        self.stop_loss.is_crossed(self.direction, price)
    }

    pub fn omitted_levels(&self) -> usize {
        self.planned_levels.saturating_sub(self.take_profits.len())
    }

    pub fn take_profit_fraction(&self) -> f64 {
        self.take_profits.iter().map(|l| l.percentage).sum()
    }

    pub fn take_profit_quantity(&self) -> u64 {
        self.take_profits.iter().map(|l| l.quantity).sum()
    }

    /// Stop on the adverse side of entry, every target on the favourable side,
    /// and (when nothing was omitted) target fractions summing to 1.
    pub fn validate(&self, tolerance: f64) -> Result<()> {
        let fail = |reason: String| {
            Err(EnhanceError::ExitValidation {
                symbol: self.symbol.clone(),
                reason,
            })
        };

        let entry = self.entry_price;
        let stop = self.stop_loss.trigger_price;
        let stop_ok = match self.direction {
            TradeAction::Buy => stop < entry,
            TradeAction::Sell => stop > entry,
        };
        if !stop_ok {
            return fail(format!(
                "{} stop {:.4} on wrong side of entry {:.4}",
                self.direction, stop, entry
            ));
        }

        for (i, level) in self.take_profits.iter().enumerate() {
            let target_ok = match self.direction {
                TradeAction::Buy => level.trigger_price > entry,
                TradeAction::Sell => level.trigger_price < entry,
            };
            if !target_ok {
                return fail(format!(
                    "{} take profit {} at {:.4} on wrong side of entry {:.4}",
                    self.direction,
                    i + 1,
                    level.trigger_price,
                    entry
                ));
            }
        }

        let fraction = self.take_profit_fraction();
        if self.omitted_levels() == 0 {
            if (fraction - 1.0).abs() > tolerance {
                return fail(format!("take-profit fractions sum to {fraction:.4}"));
            }
        } else if fraction > 1.0 + tolerance {
            return fail(format!(
                "take-profit fractions sum to {fraction:.4} with {} level(s) omitted",
                self.omitted_levels()
            ));
        }

        if self.take_profit_quantity() > self.total_quantity {
            return fail(format!(
                "take-profit quantities {} exceed position {}",
                self.take_profit_quantity(),
                self.total_quantity
            ));
        }
        Ok(())
    }
}

pub struct ExitPlanner {
    cfg: ExitConfig,
}

impl Default for ExitPlanner {
    fn default() -> Self {
        Self::new(&ExitConfig::default())
    }
}

impl ExitPlanner {
    pub fn new(cfg: &ExitConfig) -> Self {
        Self { cfg: cfg.clone() }
    }

    pub fn stop_price(&self, direction: TradeAction, entry: f64) -> f64 {
        entry * (1.0 - direction.sign() * self.cfg.stop_loss_pct)
    }

    pub fn target_price(&self, direction: TradeAction, entry: f64, offset: f64) -> f64 {
        entry * (1.0 + direction.sign() * offset)
    }

    pub fn plan(
        &self,
        trade: &TradeIntention,
        entry_price: f64,
        total_quantity: u64,
        created_at: DateTime<Utc>,
    ) -> Result<EnhancedExitStrategy> {
        if !entry_price.is_finite() || entry_price <= 0.0 {
            return Err(EnhanceError::InvalidEntryPrice(entry_price));
        }
        let direction = trade.action;
        let sign = direction.sign();

        let stop_price = self.stop_price(direction, entry_price);
        let stop_loss = ExitLevel {
            percentage: 1.0,
            quantity: total_quantity,
            trigger_price: stop_price,
            kind: ExitKind::Stop,
            reasoning: level_reasoning(
                "stop loss",
                stop_price,
                -sign * self.cfg.stop_loss_pct,
                1.0,
                total_quantity,
            ),
        };

        let mut take_profits = Vec::with_capacity(self.cfg.take_profit_offsets.len());
        let mut allocated = 0u64;
        for (i, (&offset, &fraction)) in self
            .cfg
            .take_profit_offsets
            .iter()
            .zip(&self.cfg.batch_fractions)
            .enumerate()
        {
            let split = (total_quantity as f64 * fraction + SHARE_EPSILON).floor() as u64;
            // Fractions within tolerance of 1.0 may round past the position.
            let quantity = split.min(total_quantity - allocated);
            if quantity == 0 {
                debug!(
                    symbol = %trade.symbol,
                    level = i + 1,
                    total_quantity,
                    "Take-profit level omitted: zero shares"
                );
                continue;
            }
            allocated += quantity;
            let price = self.target_price(direction, entry_price, offset);
            take_profits.push(ExitLevel {
                percentage: fraction,
                quantity,
                trigger_price: price,
                kind: ExitKind::Limit,
                reasoning: level_reasoning(
                    &format!("take profit {}", i + 1),
                    price,
                    sign * offset,
                    fraction,
                    quantity,
                ),
            });
        }

        let strategy = EnhancedExitStrategy {
            symbol: trade.symbol.clone(),
            direction,
            entry_price,
            total_quantity,
            stop_loss,
            take_profits,
            planned_levels: self.cfg.take_profit_offsets.len(),
            created_at,
        };
        strategy.validate(self.cfg.fraction_tolerance)?;
        Ok(strategy)
    }
}

fn level_reasoning(label: &str, price: f64, offset: f64, fraction: f64, quantity: u64) -> String {
    [
        format!("Exit: {}", label),
        format!("Trigger Price: ${:.2}", price),
        format!("Offset: {:+.2}%", offset * 100.0),
        format!("Percentage: {:.0}%", fraction * 100.0),
        format!("Quantity: {}", quantity),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{make_intention, snapshot_time};

    fn plan(action: TradeAction, entry: f64, qty: u64) -> EnhancedExitStrategy {
        let trade = make_intention("TEST", action, entry, 0.8);
        ExitPlanner::default()
            .plan(&trade, entry, qty, snapshot_time())
            .unwrap()
    }

    #[test]
    fn buy_levels_for_200_shares() {
        let s = plan(TradeAction::Buy, 100.0, 200);
        assert!((s.stop_loss.trigger_price - 94.0).abs() < 1e-9);
        assert_eq!(s.stop_loss.percentage, 1.0);
        assert_eq!(s.stop_loss.kind, ExitKind::Stop);

        let prices: Vec<f64> = s.take_profits.iter().map(|l| l.trigger_price).collect();
        let qtys: Vec<u64> = s.take_profits.iter().map(|l| l.quantity).collect();
        assert_eq!(qtys, vec![100, 60, 40]);
        for (p, expected) in prices.iter().zip([110.0, 115.0, 120.0]) {
            assert!((p - expected).abs() < 1e-9, "{p} vs {expected}");
        }
        assert!(s.take_profits.iter().all(|l| l.kind == ExitKind::Limit));
        assert!((s.take_profit_fraction() - 1.0).abs() < 1e-9);
        assert_eq!(s.created_at, snapshot_time());
    }

    #[test]
    fn sell_levels_mirror_buy() {
        let s = plan(TradeAction::Sell, 100.0, 200);
        assert!((s.stop_loss.trigger_price - 106.0).abs() < 1e-9);
        let prices: Vec<f64> = s.take_profits.iter().map(|l| l.trigger_price).collect();
        for (p, expected) in prices.iter().zip([90.0, 85.0, 80.0]) {
            assert!((p - expected).abs() < 1e-9);
        }
        assert!(s.take_profits.iter().all(|l| l.trigger_price < s.entry_price));
    }

    #[test]
    fn small_positions_omit_zero_share_levels() {
        // 3 shares: 1.5 -> 1, 0.9 -> 0 (omitted), 0.6 -> 0 (omitted)
        let s = plan(TradeAction::Buy, 50.0, 3);
        assert_eq!(s.take_profits.len(), 1);
        assert_eq!(s.omitted_levels(), 2);
        assert_eq!(s.take_profits[0].quantity, 1);
        assert!((s.take_profits[0].percentage - 0.5).abs() < 1e-12);
    }

    #[test]
    fn zero_quantity_has_no_targets() {
        let s = plan(TradeAction::Buy, 50.0, 0);
        assert!(s.take_profits.is_empty());
        assert_eq!(s.stop_loss.quantity, 0);
        assert!(s.validate(0.01).is_ok());
    }

    #[test]
    fn share_split_survives_representation_error() {
        // 100 * 0.57 is 56.99999999999999 in binary floating point
        let cfg = ExitConfig {
            take_profit_offsets: vec![0.10, 0.20],
            batch_fractions: vec![0.57, 0.43],
            ..ExitConfig::default()
        };
        let trade = make_intention("TEST", TradeAction::Buy, 20.0, 0.8);
        let s = ExitPlanner::new(&cfg)
            .plan(&trade, 20.0, 100, snapshot_time())
            .unwrap();
        let qtys: Vec<u64> = s.take_profits.iter().map(|l| l.quantity).collect();
        assert_eq!(qtys, vec![57, 43]);
    }

    #[test]
    fn bad_fractions_fail_loudly() {
        let cfg = ExitConfig {
            batch_fractions: vec![0.5, 0.3, 0.1],
            ..ExitConfig::default()
        };
        let trade = make_intention("TEST", TradeAction::Buy, 100.0, 0.8);
        let err = ExitPlanner::new(&cfg)
            .plan(&trade, 100.0, 1000, snapshot_time())
            .unwrap_err();
        assert!(matches!(err, EnhanceError::ExitValidation { .. }));
    }

    #[test]
    fn validation_catches_wrong_side_stop() {
        let mut s = plan(TradeAction::Buy, 100.0, 200);
        s.stop_loss.trigger_price = 101.0;
        assert!(s.validate(0.01).is_err());

        let mut s = plan(TradeAction::Sell, 100.0, 200);
        s.take_profits[2].trigger_price = 100.0;
        assert!(s.validate(0.01).is_err());
    }

    #[test]
    fn rejects_bad_entry_price() {
        let trade = make_intention("TEST", TradeAction::Buy, 100.0, 0.8);
        let planner = ExitPlanner::default();
        assert!(planner.plan(&trade, 0.0, 10, snapshot_time()).is_err());
        assert!(planner.plan(&trade, f64::NAN, 10, snapshot_time()).is_err());
    }

    #[test]
    fn crossing_rules() {
        let s = plan(TradeAction::Buy, 100.0, 200);
        assert!(s.stop_triggered(s.stop_loss.trigger_price));
        assert!(s.stop_triggered(80.0));
        assert!(!s.stop_triggered(94.5));
        assert!(s.take_profits[0].is_crossed(TradeAction::Buy, 110.5));
        assert!(!s.take_profits[0].is_crossed(TradeAction::Buy, 109.0));

        let s = plan(TradeAction::Sell, 100.0, 200);
        assert!(s.stop_triggered(106.5));
        assert!(!s.stop_triggered(105.0));
        assert!(s.take_profits[0].is_crossed(TradeAction::Sell, 89.0));
    }

    #[test]
    fn exact_boundary_prices_cross() {
        let s = plan(TradeAction::Buy, 100.0, 200);
        assert!(s.stop_triggered(94.0));
        assert!(!s.stop_triggered(94.01));
        for (level, price) in s.take_profits.iter().zip([110.0, 115.0, 120.0]) {
            assert!(level.is_crossed(TradeAction::Buy, price), "BUY target {price}");
            assert!(!level.is_crossed(TradeAction::Buy, price - 0.01));
        }

        let s = plan(TradeAction::Sell, 100.0, 200);
        assert!(s.stop_triggered(106.0));
        assert!(!s.stop_triggered(105.99));
        for (level, price) in s.take_profits.iter().zip([90.0, 85.0, 80.0]) {
            assert!(level.is_crossed(TradeAction::Sell, price), "SELL target {price}");
            assert!(!level.is_crossed(TradeAction::Sell, price + 0.01));
        }
    }

    #[test]
    fn reasoning_has_labelled_lines() {
        let s = plan(TradeAction::Buy, 100.0, 200);
        assert!(s.stop_loss.reasoning.contains("Trigger Price: $94.00"));
        assert!(s.stop_loss.reasoning.contains("Offset: -6.00%"));
        assert!(s.take_profits[1].reasoning.contains("Offset: +15.00%"));
        assert!(s.take_profits[1].reasoning.contains("Quantity: 60"));
    }
}
