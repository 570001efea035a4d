//! CLI commands for Kalshi market data and paper trading.

pub mod account;
pub mod candles;
pub mod markets;
pub mod orderbook;
pub mod paper_trade;

pub use account::{run_account, AccountArgs};
pub use candles::{run_candles, CandlesArgs};
pub use markets::{run_markets, MarketsArgs};
pub use orderbook::{run_orderbook, OrderbookArgs};
pub use paper_trade::{run_paper_trade, PaperTradeArgs};
