//! Kalshi exchange integration for kalshi-edge.
//!
//! This crate provides:
//! - An async token bucket shared by every outbound request
//! - RSA-PSS request signing
//! - A short-TTL cache for public GET responses
//! - A typed REST client with retry on transient failures
//! - Data models for markets, orderbooks, candlesticks, orders and positions
//!
//! # Example
//!
//! ```ignore
//! use kalshi_edge_exchange::{KalshiAuthConfig, KalshiClient, KalshiClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = KalshiClient::from_env(
//!         KalshiClientConfig::production(),
//!         &KalshiAuthConfig::default(),
//!     )?;
//!
//!     let markets = client.get_all_markets(Some(100), Some("open"), None).await?;
//!     for market in &markets {
//!         let book = client.get_orderbook(&market.ticker).await?;
//!         println!("{} spread={:?}", market.ticker, book.spread());
//!     }
//!
//!     if client.is_authenticated() {
//!         println!("balance: {}", client.get_balance().await?.dollars());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Authentication
//!
//! Public market data needs no credentials. Portfolio and order endpoints
//! require an API key id and an RSA private key:
//!
//! - `KALSHI_API_KEY_ID`: API key id
//! - `KALSHI_PRIV_KEY`: private key as PEM or base64-encoded PEM
//! - `KALSHI_PRIV_KEY_PATH`: path to a PEM file, used when `KALSHI_PRIV_KEY` is unset
//!
//! # API Endpoints
//!
//! - `GET /markets`, `/markets/{ticker}`, `/markets/{ticker}/orderbook`
//! - `GET /markets/trades`, `/series/{series}`, `/events/{event}`
//! - `GET /series/{series}/markets/{ticker}/candlesticks`
//! - `GET /series/{series}/events/{event}/candlesticks`
//! - `GET /exchange/status`
//! - `GET /portfolio/balance`, `/portfolio/positions`, `/portfolio/fills`, `/portfolio/orders`
//! - `POST /portfolio/orders`, `DELETE /portfolio/orders/{order_id}`

pub mod auth;
pub mod cache;
pub mod client;
pub mod error;
pub mod rate_limiter;
pub mod types;

pub use auth::{KalshiAuth, KalshiAuthConfig, SignedHeaders};
pub use cache::{CacheKey, CacheStats, ResponseCache};
pub use client::{KalshiClient, KalshiClientConfig, KALSHI_DEMO_URL, KALSHI_PROD_URL};
pub use error::{KalshiError, Result};
pub use rate_limiter::TokenBucket;
pub use types::{
    Action, Balance, CandleInterval, Candlestick, Event, EventCandlesticks, ExchangePosition,
    ExchangeStatus, Fill, Market, MarketFilter, MarketStatus, MarketsPage, Ohlc, Order, OrderRequest,
    OrderStatus, OrderType, Orderbook, Page, PortfolioSnapshot, PriceLevel, Series, Side, Trade,
    TradeFilter, TradesPage,
};
