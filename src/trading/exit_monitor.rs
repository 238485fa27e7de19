use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::exit_planner::{EnhancedExitStrategy, ExitLevel};
use crate::models::{ExitKind, TradeAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorStatus {
    Open,
    StoppedOut,
    TargetsFilled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    /// 1-based take-profit level.
    TakeProfit(usize),
}

/// An order to close (part of) a position, emitted when a level is crossed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitOrder {
    pub symbol: String,
    pub reason: ExitReason,
    pub kind: ExitKind,
    /// Side of the closing order, opposite to the position.
    pub side: TradeAction,
    pub quantity: u64,
    pub trigger_price: f64,
    /// Stops fill at their trigger; limits at the observed price.
    pub fill_price: f64,
    pub remaining_after: u64,
}

/// Tracks one position against its exit strategy as prices arrive.
pub struct ExitMonitor {
    strategy: EnhancedExitStrategy,
    filled: Vec<bool>,
    remaining: u64,
    status: MonitorStatus,
}

impl ExitMonitor {
    pub fn new(strategy: &EnhancedExitStrategy) -> Self {
        let status = if strategy.total_quantity == 0 {
            MonitorStatus::TargetsFilled
        } else {
            MonitorStatus::Open
        };
        Self {
            filled: vec![false; strategy.take_profits.len()],
            remaining: strategy.total_quantity,
            strategy: strategy.clone(),
            status,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.strategy.symbol
    }

    pub fn remaining_quantity(&self) -> u64 {
        self.remaining
    }

    pub fn status(&self) -> MonitorStatus {
        self.status
    }

    pub fn is_closed(&self) -> bool {
        self.status != MonitorStatus::Open
    }

    /// Applies one observed price. The stop takes priority over targets
    /// crossed at the same tick.
    pub fn check(&mut self, price: f64) -> Vec<ExitOrder> {
        let mut orders = Vec::new();
        if self.is_closed() || !price.is_finite() {
            return orders;
        }

        if self.strategy.stop_triggered(price) {
            let stop = self.strategy.stop_loss.clone();
            let quantity = self.remaining;
            orders.push(self.order(ExitReason::StopLoss, &stop, quantity, stop.trigger_price));
            self.status = MonitorStatus::StoppedOut;
            info!(
                symbol = %self.strategy.symbol,
                quantity,
                price = stop.trigger_price,
                "Stop loss hit"
            );
            return orders;
        }

        let direction = self.strategy.direction;
        let last = self.strategy.take_profits.len().saturating_sub(1);
        for i in 0..self.strategy.take_profits.len() {
            if self.filled[i] || !self.strategy.take_profits[i].is_crossed(direction, price) {
                continue;
            }
            let level = self.strategy.take_profits[i].clone();
            // The last target closes whatever is left.
            let quantity = if i == last {
                self.remaining
            } else {
                level.quantity.min(self.remaining)
            };
            self.filled[i] = true;
            if quantity == 0 {
                continue;
            }
            orders.push(self.order(ExitReason::TakeProfit(i + 1), &level, quantity, price));
            debug!(
                symbol = %self.strategy.symbol,
                level = i + 1,
                quantity,
                remaining = self.remaining,
                "Take profit filled"
            );
        }

        if self.remaining == 0 || self.filled.iter().all(|f| *f) {
            self.status = MonitorStatus::TargetsFilled;
            info!(symbol = %self.strategy.symbol, "All take-profit targets filled");
        }
        orders
    }

    fn order(
        &mut self,
        reason: ExitReason,
        level: &ExitLevel,
        quantity: u64,
        fill_price: f64,
    ) -> ExitOrder {
        self.remaining -= quantity;
        ExitOrder {
            symbol: self.strategy.symbol.clone(),
            reason,
            kind: level.kind,
            side: self.strategy.direction.opposite(),
            quantity,
            trigger_price: level.trigger_price,
            fill_price,
            remaining_after: self.remaining,
        }
    }
}
