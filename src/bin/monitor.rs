use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use trade_enhancer::config::Config;
use trade_enhancer::strategies::EnhancedTradePlan;
use trade_enhancer::trading::ExitMonitor;

/// Replays a price path for one symbol against the exit strategies of a
/// saved plan.
///
/// Usage: monitor <plan.json> <symbol> <price> [price ...]
#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .init();

    let args: Vec<String> = std::env::args().collect();
    let (Some(plan_path), Some(symbol)) = (args.get(1), args.get(2)) else {
        bail!("usage: monitor <plan.json> <symbol> <price> [price ...]");
    };
    let prices: Vec<f64> = args[3..]
        .iter()
        .map(|s| s.parse::<f64>().with_context(|| format!("Bad price: {s}")))
        .collect::<Result<_>>()?;

    let text = tokio::fs::read_to_string(plan_path)
        .await
        .with_context(|| format!("Failed to read plan {plan_path}"))?;
    let plan: EnhancedTradePlan = serde_json::from_str(&text).context("Malformed plan")?;

    let mut monitors: Vec<ExitMonitor> = plan
        .executable()
        .filter(|t| t.symbol == *symbol)
        .map(|t| ExitMonitor::new(&t.exit_strategy))
        .collect();
    info!(
        "Monitoring {} {} position(s) over {} price(s)",
        monitors.len(),
        symbol,
        prices.len()
    );

    for (tick, price) in prices.iter().enumerate() {
        for monitor in monitors.iter_mut().filter(|m| !m.is_closed()) {
            for order in monitor.check(*price) {
                println!(
                    "tick {:>3} | {:>6} | {:?} | {} {} @ ${:.2} | remaining {}",
                    tick,
                    order.symbol,
                    order.reason,
                    order.side,
                    order.quantity,
                    order.fill_price,
                    order.remaining_after
                );
            }
        }
    }

    for monitor in &monitors {
        info!(
            "{}: {:?}, {} share(s) open",
            monitor.symbol(),
            monitor.status(),
            monitor.remaining_quantity()
        );
    }
    Ok(())
}
