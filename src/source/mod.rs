pub mod file;

pub use file::{EnhanceRequest, FileSource};

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::models::{MarketSnapshot, TradeIntention};
use crate::strategies::{EnhancedTradePlan, StrategyCoordinator};

/// Where a batch comes from: the upstream model's intentions, the market
/// data collected for them and the account they are sized against.
#[async_trait]
pub trait PlanSource: Send + Sync {
    async fn fetch_intentions(&mut self) -> Result<Vec<TradeIntention>>;
    async fn fetch_market_snapshot(&mut self) -> Result<MarketSnapshot>;
    async fn account_equity(&mut self) -> Result<f64>;
}

/// Pulls one batch from `source` and enhances it.
pub async fn enhance_from(
    source: &mut dyn PlanSource,
    coordinator: &StrategyCoordinator,
) -> Result<EnhancedTradePlan> {
    let intentions = source.fetch_intentions().await?;
    let market = source.fetch_market_snapshot().await?;
    let equity = source.account_equity().await?;
    info!(
        intentions = intentions.len(),
        symbols = market.len(),
        equity,
        "Fetched batch"
    );
    Ok(coordinator.enhance(&intentions, &market, equity)?)
}
