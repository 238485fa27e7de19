use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::strategies::plan::EnhancedTradePlan;

#[derive(Debug, Clone)]
pub struct PlanReport {
    pub created_at: DateTime<Utc>,
    pub account_equity: f64,

    // Batch
    pub original_trades: usize,
    pub enhanced_trades: usize,
    pub executable_trades: usize,
    pub rejected_trades: usize,
    pub failed_trades: usize,
    pub risk_reduction_pct: f64,

    // Allocation
    pub total_position_pct: f64,
    pub total_notional: f64,
    pub total_risk_exposure: f64,
    /// Loss if every executable stop fills at its trigger.
    pub worst_case_loss: f64,

    // Quality
    pub avg_confidence: f64,
    pub avg_signal_strength: f64,
    pub avg_breakout_probability: f64,

    pub lines: Vec<TradeLine>,
    pub failures: Vec<(String, String)>,
    pub by_symbol: BTreeMap<String, SymbolStats>,
}

#[derive(Debug, Clone)]
pub struct TradeLine {
    pub symbol: String,
    pub action: String,
    pub original_quantity: u64,
    pub enhanced_quantity: u64,
    pub entry: f64,
    pub stop: f64,
    pub targets: Vec<(f64, u64)>,
    pub probability: f64,
    pub position_pct: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolStats {
    pub trades: usize,
    pub shares: u64,
    pub notional: f64,
}

impl PlanReport {
    pub fn from_plan(plan: &EnhancedTradePlan) -> Self {
        let m = &plan.metrics;

        let lines: Vec<TradeLine> = plan
            .trades
            .iter()
            .map(|t| TradeLine {
                symbol: t.symbol.clone(),
                action: t.action.to_string(),
                original_quantity: t.original_quantity,
                enhanced_quantity: t.enhanced_quantity,
                entry: t.exit_strategy.entry_price,
                stop: t.stop_loss,
                targets: t
                    .exit_strategy
                    .take_profits
                    .iter()
                    .map(|l| (l.trigger_price, l.quantity))
                    .collect(),
                probability: t.breakout_probability,
                position_pct: t.sizing.position_percentage * 100.0,
            })
            .collect();

        let mut by_symbol: BTreeMap<String, SymbolStats> = BTreeMap::new();
        for t in plan.executable() {
            let entry = by_symbol.entry(t.symbol.clone()).or_default();
            entry.trades += 1;
            entry.shares += t.enhanced_quantity;
            entry.notional += t.notional();
        }

        let worst_case_loss = plan
            .executable()
            .map(|t| {
                (t.exit_strategy.entry_price - t.stop_loss).abs() * t.enhanced_quantity as f64
            })
            .sum();

        PlanReport {
            created_at: plan.created_at,
            account_equity: plan.account_equity,
            original_trades: m.original_trade_count,
            enhanced_trades: m.filtered_trade_count,
            executable_trades: plan.executable().count(),
            rejected_trades: m.rejected_trade_count,
            failed_trades: m.failed_trade_count,
            risk_reduction_pct: m.risk_reduction_ratio * 100.0,
            total_position_pct: m.total_position_percentage * 100.0,
            total_notional: plan.executable().map(|t| t.notional()).sum(),
            total_risk_exposure: plan.total_risk_exposure,
            worst_case_loss,
            avg_confidence: m.avg_confidence,
            avg_signal_strength: m.avg_signal_strength,
            avg_breakout_probability: m.avg_breakout_probability,
            lines,
            failures: plan
                .failures
                .iter()
                .map(|f| (f.symbol.clone(), f.reason.clone()))
                .collect(),
            by_symbol,
        }
    }

    pub fn render(&self) -> String {
        let rule = "─".repeat(35);
        let mut out = vec![
            "=".repeat(70),
            "  TRADE PLAN".to_string(),
            "=".repeat(70),
            format!("  As Of:       {}", self.created_at.to_rfc3339()),
            format!("  Equity:      ${:.2}", self.account_equity),
            String::new(),
            "  BATCH".to_string(),
            format!("  {}", rule),
            format!("  Original:    {}", self.original_trades),
            format!("  Enhanced:    {}", self.enhanced_trades),
            format!("  Executable:  {}", self.executable_trades),
            format!("  Rejected:    {}", self.rejected_trades),
            format!("  Failed:      {}", self.failed_trades),
            format!("  Risk Cut:    {:.1}%", self.risk_reduction_pct),
            String::new(),
            "  ALLOCATION".to_string(),
            format!("  {}", rule),
            format!("  Position:    {:.2}% of equity", self.total_position_pct),
            format!("  Notional:    ${:.2}", self.total_notional),
            format!("  Exposure:    {:.4}", self.total_risk_exposure),
            format!("  Worst Case:  ${:.2}", self.worst_case_loss),
            String::new(),
            "  QUALITY".to_string(),
            format!("  {}", rule),
            format!("  Confidence:  {:.3}", self.avg_confidence),
            format!("  Signal:      {:.3}", self.avg_signal_strength),
            format!("  Breakout:    {:.3}", self.avg_breakout_probability),
        ];

        if !self.lines.is_empty() {
            out.push(String::new());
            out.push("  TRADES".to_string());
            out.push(format!("  {}", rule));
            for l in &self.lines {
                let targets: Vec<String> = l
                    .targets
                    .iter()
                    .map(|(p, q)| format!("{}@{:.2}", q, p))
                    .collect();
                out.push(format!(
                    "  {:>6} {:<4} {:>5} -> {:<5} | entry ${:.2} | stop ${:.2} | tp [{}] \
                     | p {:.2} | {:.2}%",
                    l.symbol,
                    l.action,
                    l.original_quantity,
                    l.enhanced_quantity,
                    l.entry,
                    l.stop,
                    targets.join(", "),
                    l.probability,
                    l.position_pct
                ));
            }
        }

        if !self.by_symbol.is_empty() {
            out.push(String::new());
            out.push("  BY SYMBOL".to_string());
            out.push(format!("  {}", rule));
            for (symbol, stats) in &self.by_symbol {
                out.push(format!(
                    "  {:>6}: {} trades | {} shares | ${:.2}",
                    symbol, stats.trades, stats.shares, stats.notional
                ));
            }
        }

        if !self.failures.is_empty() {
            out.push(String::new());
            out.push("  FAILURES".to_string());
            out.push(format!("  {}", rule));
            for (symbol, reason) in &self.failures {
                out.push(format!("  {:>6}: {}", symbol, reason));
            }
        }

        out.push("=".repeat(70));
        out.join("\n")
    }
}
