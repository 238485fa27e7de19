use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use trade_enhancer::config::Config;
use trade_enhancer::source::{self, FileSource};
use trade_enhancer::strategies::{PlanReport, StrategyCoordinator};

#[tokio::main]
async fn main() -> Result<()> {
    let mut cfg = Config::from_env();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    cfg.load_strategy_override()?;
    let input = std::env::args().nth(1).unwrap_or_else(|| cfg.input_path.clone());

    info!("Trade enhancer starting");
    info!("Request: {}", input);
    if let Some(path) = &cfg.strategy_config_path {
        info!("Strategy override: {}", path);
    }

    let coordinator = StrategyCoordinator::new(&cfg.strategy)?;
    let mut source = FileSource::new(&input, cfg.account_equity);

    let plan = source::enhance_from(&mut source, &coordinator).await?;
    if !plan.failures.is_empty() {
        warn!("{} trade(s) excluded by processing failures", plan.failures.len());
    }

    for line in PlanReport::from_plan(&plan).render().lines() {
        info!("{}", line);
    }

    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
