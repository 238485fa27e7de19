pub mod direction;
pub mod intention;
pub mod market;

pub use direction::*;
pub use intention::TradeIntention;
pub use market::MarketSnapshot;
