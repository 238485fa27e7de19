use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::models::{MarketSnapshot, TradeIntention};
use crate::source::PlanSource;

/// One batch as written to disk by the upstream trade generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhanceRequest {
    pub intentions: Vec<TradeIntention>,
    pub market: MarketSnapshot,
    /// Falls back to the configured equity when absent.
    #[serde(default)]
    pub equity: Option<f64>,
}

/// Reads an `EnhanceRequest` JSON file. The file is read once, on first use.
pub struct FileSource {
    path: PathBuf,
    fallback_equity: f64,
    request: Option<EnhanceRequest>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, fallback_equity: f64) -> Self {
        Self {
            path: path.into(),
            fallback_equity,
            request: None,
        }
    }

    async fn request(&mut self) -> Result<&EnhanceRequest> {
        if self.request.is_none() {
            let text = tokio::fs::read_to_string(&self.path)
                .await
                .with_context(|| format!("Failed to read request {}", self.path.display()))?;
            let request: EnhanceRequest = serde_json::from_str(&text)
                .with_context(|| format!("Malformed request {}", self.path.display()))?;
            debug!(
                path = %self.path.display(),
                intentions = request.intentions.len(),
                "Loaded request"
            );
            self.request = Some(request);
        }
        self.request
            .as_ref()
            .context("Request not loaded")
    }
}

#[async_trait]
impl PlanSource for FileSource {
    async fn fetch_intentions(&mut self) -> Result<Vec<TradeIntention>> {
        Ok(self.request().await?.intentions.clone())
    }

    async fn fetch_market_snapshot(&mut self) -> Result<MarketSnapshot> {
        Ok(self.request().await?.market.clone())
    }

    async fn account_equity(&mut self) -> Result<f64> {
        let fallback = self.fallback_equity;
        Ok(self.request().await?.equity.unwrap_or(fallback))
    }
}
