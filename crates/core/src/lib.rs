pub mod config;
pub mod config_loader;
pub mod market_prices;
pub mod opportunity;
pub mod portfolio;
pub mod position;
pub mod report;
pub mod sizing;

pub use config::{AppConfig, ExchangeSettings, TradeManagerConfig};
pub use config_loader::ConfigLoader;
pub use market_prices::MarketPrices;
pub use opportunity::{Confidence, Opportunity, OpportunityType, Strength};
pub use portfolio::{PerformanceStats, PortfolioSummary, TradeDecision, TradeManager, TradeRecord};
pub use position::{Position, PositionStatus};
pub use report::PortfolioFormatter;
pub use sizing::{PositionSizer, SizingMethod};
