pub mod coordinator;
pub mod plan;
pub mod report;

pub use coordinator::{StrategyCoordinator, TradeOutcome};
pub use plan::{
    EnhancedTradeDecision, EnhancedTradePlan, PipelineStage, StrategyPerformanceMetrics,
    TradeFailure,
};
pub use report::PlanReport;
