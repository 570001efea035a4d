//! Data models for the Kalshi REST API.
//!
//! Prices are in cents (0-100). Orderbook levels are plain integers; market
//! quotes use `rust_decimal::Decimal` so they can feed portfolio math
//! directly.

use crate::error::{KalshiError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Value of a winning contract in cents.
pub const CONTRACT_PAYOUT_CENTS: u32 = 100;

// =============================================================================
// Pagination
// =============================================================================

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,

    /// Cursor for the next page, as returned by the API.
    pub cursor: Option<String>,
}

impl<T> Page<T> {
    /// Returns the cursor for the next page, or `None` at the end of data.
    ///
    /// The API signals the end with either a missing or an empty cursor.
    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        self.cursor.as_deref().filter(|c| !c.is_empty())
    }

    /// Returns true if there are no further pages.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.next_cursor().is_none()
    }
}

/// A page of markets.
pub type MarketsPage = Page<Market>;

/// A page of public trades.
pub type TradesPage = Page<Trade>;

// =============================================================================
// Market Types
// =============================================================================

/// A Kalshi market (binary event contract).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    /// Market ticker (e.g., "KXHIGHNY-25JAN15-B40").
    pub ticker: String,

    /// Event ticker this market belongs to.
    pub event_ticker: String,

    /// Series ticker, when the API includes it.
    pub series_ticker: Option<String>,

    /// Market title/question.
    pub title: String,

    /// Market subtitle (often describes the condition).
    pub subtitle: Option<String>,

    /// Lifecycle status.
    pub status: MarketStatus,

    /// Yes bid price in cents.
    pub yes_bid: Option<Decimal>,

    /// Yes ask price in cents.
    pub yes_ask: Option<Decimal>,

    /// No bid price in cents.
    pub no_bid: Option<Decimal>,

    /// No ask price in cents.
    pub no_ask: Option<Decimal>,

    /// Last trade price in cents.
    pub last_price: Option<Decimal>,

    /// Lifetime volume in contracts.
    pub volume: i64,

    /// 24h volume in contracts.
    pub volume_24h: Option<i64>,

    /// Open interest (total outstanding contracts).
    pub open_interest: Option<i64>,

    /// Market close time.
    pub close_time: Option<DateTime<Utc>>,

    /// Expiration/settlement time.
    pub expiration_time: Option<DateTime<Utc>>,

    /// Category (e.g., "Climate").
    pub category: Option<String>,

    /// Orderbook snapshot, when the caller attached one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orderbook: Option<Orderbook>,
}

impl Market {
    /// Returns the yes mid price in cents.
    #[must_use]
    pub fn yes_mid(&self) -> Option<Decimal> {
        match (self.yes_bid, self.yes_ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            (Some(bid), None) => Some(bid),
            (None, Some(ask)) => Some(ask),
            (None, None) => self.last_price,
        }
    }

    /// Returns the no mid price in cents.
    #[must_use]
    pub fn no_mid(&self) -> Option<Decimal> {
        match (self.no_bid, self.no_ask) {
            (Some(bid), Some(ask)) => Some((bid + ask) / Decimal::TWO),
            (Some(bid), None) => Some(bid),
            (None, Some(ask)) => Some(ask),
            (None, None) => self
                .last_price
                .map(|p| Decimal::from(CONTRACT_PAYOUT_CENTS) - p),
        }
    }

    /// Returns true if the market is currently tradeable.
    #[must_use]
    pub fn is_tradeable(&self) -> bool {
        self.status == MarketStatus::Open
    }

    /// Returns the yes bid-ask spread in cents.
    #[must_use]
    pub fn spread(&self) -> Option<Decimal> {
        match (self.yes_bid, self.yes_ask) {
            (Some(bid), Some(ask)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Attaches an orderbook snapshot.
    #[must_use]
    pub fn with_orderbook(mut self, orderbook: Orderbook) -> Self {
        self.orderbook = Some(orderbook);
        self
    }
}

/// Market lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketStatus {
    /// Market created but not yet open.
    Unopened,
    /// Market is open for trading.
    Open,
    /// Market is closed (no trading).
    Closed,
    /// Market has settled.
    Settled,
    /// Market is paused.
    Paused,
}

impl MarketStatus {
    /// Parses the status strings used across API versions.
    #[must_use]
    pub fn from_api_str(s: &str) -> Self {
        match s {
            "open" | "active" => Self::Open,
            "initialized" | "unopened" => Self::Unopened,
            "settled" | "determined" | "finalized" => Self::Settled,
            "paused" => Self::Paused,
            _ => Self::Closed,
        }
    }
}

/// Filter for a single market listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketFilter {
    /// Restrict to one series.
    pub series_ticker: Option<String>,

    /// Restrict to one event.
    pub event_ticker: Option<String>,

    /// Status filter ("open", "closed", "settled" or a comma-separated list).
    pub status: Option<String>,

    /// Page size.
    pub limit: u32,

    /// Pagination cursor from a previous page.
    pub cursor: Option<String>,

    /// Only markets closing after this Unix timestamp.
    pub min_close_ts: Option<i64>,

    /// Only markets closing before this Unix timestamp.
    pub max_close_ts: Option<i64>,
}

impl Default for MarketFilter {
    fn default() -> Self {
        Self {
            series_ticker: None,
            event_ticker: None,
            status: Some("open".to_string()),
            limit: MarketFilter::MAX_PAGE_SIZE,
            cursor: None,
            min_close_ts: None,
            max_close_ts: None,
        }
    }
}

impl MarketFilter {
    /// Largest page the markets endpoint is asked for.
    pub const MAX_PAGE_SIZE: u32 = 200;

    /// Sets the status filter.
    #[must_use]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Removes the status filter.
    #[must_use]
    pub fn any_status(mut self) -> Self {
        self.status = None;
        self
    }

    /// Restricts to a series.
    #[must_use]
    pub fn with_series(mut self, series_ticker: impl Into<String>) -> Self {
        self.series_ticker = Some(series_ticker.into());
        self
    }

    /// Restricts to an event.
    #[must_use]
    pub fn with_event(mut self, event_ticker: impl Into<String>) -> Self {
        self.event_ticker = Some(event_ticker.into());
        self
    }

    /// Sets the page size.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// Sets the pagination cursor.
    #[must_use]
    pub fn with_cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    /// Restricts to markets closing inside a window.
    #[must_use]
    pub fn with_close_window(mut self, min_close_ts: Option<i64>, max_close_ts: Option<i64>) -> Self {
        self.min_close_ts = min_close_ts;
        self.max_close_ts = max_close_ts;
        self
    }

    /// Renders the filter as query parameters.
    #[must_use]
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = vec![("limit".to_string(), self.limit.to_string())];
        if let Some(series) = &self.series_ticker {
            query.push(("series_ticker".to_string(), series.clone()));
        }
        if let Some(event) = &self.event_ticker {
            query.push(("event_ticker".to_string(), event.clone()));
        }
        if let Some(status) = &self.status {
            query.push(("status".to_string(), status.clone()));
        }
        if let Some(cursor) = self.cursor.as_deref().filter(|c| !c.is_empty()) {
            query.push(("cursor".to_string(), cursor.to_string()));
        }
        if let Some(ts) = self.min_close_ts {
            query.push(("min_close_ts".to_string(), ts.to_string()));
        }
        if let Some(ts) = self.max_close_ts {
            query.push(("max_close_ts".to_string(), ts.to_string()));
        }
        query
    }
}

/// A series groups recurring events (e.g. daily NYC high temperature).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    /// Series ticker.
    pub ticker: String,

    /// Human-readable title.
    #[serde(default)]
    pub title: String,

    /// Category.
    #[serde(default)]
    pub category: Option<String>,

    /// Recurrence (e.g. "daily").
    #[serde(default)]
    pub frequency: Option<String>,

    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// An event and the markets listed under it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event ticker.
    pub event_ticker: String,

    /// Parent series ticker.
    pub series_ticker: Option<String>,

    /// Event title.
    pub title: String,

    /// Event subtitle.
    pub sub_title: Option<String>,

    /// Category.
    pub category: Option<String>,

    /// Whether at most one market in the event can resolve YES.
    pub mutually_exclusive: bool,

    /// Markets belonging to the event.
    pub markets: Vec<Market>,
}

/// Exchange-wide trading status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeStatus {
    /// Exchange is up.
    pub exchange_active: bool,

    /// Trading is currently allowed.
    pub trading_active: bool,
}

// =============================================================================
// Candlesticks
// =============================================================================

/// Candlestick period. The API accepts exactly these three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CandleInterval {
    /// One minute.
    OneMinute,
    /// One hour.
    OneHour,
    /// One day.
    OneDay,
}

impl CandleInterval {
    /// Returns the period length in minutes.
    #[must_use]
    pub fn minutes(self) -> u32 {
        match self {
            Self::OneMinute => 1,
            Self::OneHour => 60,
            Self::OneDay => 1440,
        }
    }
}

impl TryFrom<u32> for CandleInterval {
    type Error = KalshiError;

    fn try_from(minutes: u32) -> Result<Self> {
        match minutes {
            1 => Ok(Self::OneMinute),
            60 => Ok(Self::OneHour),
            1440 => Ok(Self::OneDay),
            other => Err(KalshiError::InvalidRequest(format!(
                "period_interval must be 1 (1min), 60 (1hr), or 1440 (1day), got {other}"
            ))),
        }
    }
}

/// Open/high/low/close in cents. Any field may be absent when the period
/// saw no activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ohlc {
    /// Opening value.
    #[serde(default)]
    pub open: Option<i64>,
    /// Highest value.
    #[serde(default)]
    pub high: Option<i64>,
    /// Lowest value.
    #[serde(default)]
    pub low: Option<i64>,
    /// Closing value.
    #[serde(default)]
    pub close: Option<i64>,
}

/// One candlestick for a market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candlestick {
    /// Unix timestamp (seconds) at the end of the period.
    pub end_period_ts: i64,

    /// Yes bid OHLC.
    #[serde(default)]
    pub yes_bid: Ohlc,

    /// Yes ask OHLC.
    #[serde(default)]
    pub yes_ask: Ohlc,

    /// Traded price OHLC.
    #[serde(default)]
    pub price: Ohlc,

    /// Contracts traded in the period.
    #[serde(default)]
    pub volume: i64,

    /// Open interest at period end.
    #[serde(default)]
    pub open_interest: i64,
}

/// Candlesticks for every market in an event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventCandlesticks {
    /// Market tickers, index-aligned with `market_candlesticks`.
    #[serde(default)]
    pub market_tickers: Vec<String>,

    /// Candles per market.
    #[serde(default)]
    pub market_candlesticks: Vec<Vec<Candlestick>>,

    /// End timestamp after server-side adjustment.
    #[serde(default)]
    pub adjusted_end_ts: Option<i64>,
}

// =============================================================================
// Trades
// =============================================================================

/// A public trade print.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Trade identifier.
    pub trade_id: String,

    /// Market ticker.
    pub ticker: String,

    /// Contracts traded.
    pub count: i64,

    /// Yes price in cents.
    pub yes_price: i64,

    /// No price in cents.
    pub no_price: i64,

    /// Side of the aggressor.
    pub taker_side: Option<Side>,

    /// Execution time.
    pub created_time: Option<DateTime<Utc>>,
}

/// Filter for the public trades listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TradeFilter {
    /// Restrict to one market.
    pub ticker: Option<String>,

    /// Only trades after this Unix timestamp.
    pub min_ts: Option<i64>,

    /// Only trades before this Unix timestamp.
    pub max_ts: Option<i64>,

    /// Page size (API default when unset).
    pub limit: Option<u32>,

    /// Pagination cursor.
    pub cursor: Option<String>,
}

impl TradeFilter {
    /// Restricts to a market.
    #[must_use]
    pub fn for_ticker(ticker: impl Into<String>) -> Self {
        Self {
            ticker: Some(ticker.into()),
            ..Default::default()
        }
    }

    /// Renders the filter as query parameters.
    #[must_use]
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(ticker) = &self.ticker {
            query.push(("ticker".to_string(), ticker.clone()));
        }
        if let Some(ts) = self.min_ts {
            query.push(("min_ts".to_string(), ts.to_string()));
        }
        if let Some(ts) = self.max_ts {
            query.push(("max_ts".to_string(), ts.to_string()));
        }
        if let Some(cursor) = self.cursor.as_deref().filter(|c| !c.is_empty()) {
            query.push(("cursor".to_string(), cursor.to_string()));
        }
        query
    }
}

// =============================================================================
// Order Types
// =============================================================================

/// Contract side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// YES contracts.
    Yes,
    /// NO contracts.
    No,
}

impl Side {
    /// Returns the opposite side.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::Yes => Self::No,
            Self::No => Self::Yes,
        }
    }

    /// Returns the API string representation.
    #[must_use]
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::Yes => "yes",
            Self::No => "no",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_api_str())
    }
}

impl std::str::FromStr for Side {
    type Err = KalshiError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "yes" => Ok(Self::Yes),
            "no" => Ok(Self::No),
            other => Err(KalshiError::InvalidRequest(format!("unknown side: {other}"))),
        }
    }
}

/// Order action (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Buy contracts.
    Buy,
    /// Sell contracts.
    Sell,
}

impl Action {
    /// Returns the API string representation.
    #[must_use]
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Fill at best available.
    Market,
    /// Fill at the specified price or better.
    Limit,
}

/// Request to submit an order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    /// Market ticker.
    pub ticker: String,

    /// Side (yes/no).
    pub side: Side,

    /// Action (buy/sell).
    pub action: Action,

    /// Order type.
    #[serde(rename = "type")]
    pub order_type: OrderType,

    /// Number of contracts.
    pub count: u32,

    /// Yes limit price in cents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yes_price: Option<u32>,

    /// No limit price in cents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_price: Option<u32>,

    /// Client-specified order id, used by the exchange to de-duplicate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,

    /// Expiration as a Unix timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_ts: Option<i64>,
}

impl OrderRequest {
    /// Creates a limit order priced on the given side.
    pub fn limit(ticker: impl Into<String>, action: Action, side: Side, price_cents: u32, count: u32) -> Self {
        let (yes_price, no_price) = match side {
            Side::Yes => (Some(price_cents), None),
            Side::No => (None, Some(price_cents)),
        };
        Self {
            ticker: ticker.into(),
            side,
            action,
            order_type: OrderType::Limit,
            count,
            yes_price,
            no_price,
            client_order_id: None,
            expiration_ts: None,
        }
    }

    /// Creates a limit buy order for YES contracts.
    pub fn buy_yes(ticker: impl Into<String>, price_cents: u32, count: u32) -> Self {
        Self::limit(ticker, Action::Buy, Side::Yes, price_cents, count)
    }

    /// Creates a limit buy order for NO contracts.
    pub fn buy_no(ticker: impl Into<String>, price_cents: u32, count: u32) -> Self {
        Self::limit(ticker, Action::Buy, Side::No, price_cents, count)
    }

    /// Creates a market order.
    pub fn market(ticker: impl Into<String>, action: Action, side: Side, count: u32) -> Self {
        Self {
            ticker: ticker.into(),
            side,
            action,
            order_type: OrderType::Market,
            count,
            yes_price: None,
            no_price: None,
            client_order_id: None,
            expiration_ts: None,
        }
    }

    /// Sets a client order ID.
    #[must_use]
    pub fn with_client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }

    /// Sets an expiration timestamp.
    #[must_use]
    pub fn with_expiration(mut self, ts: i64) -> Self {
        self.expiration_ts = Some(ts);
        self
    }

    /// Returns the limit price on the order's own side.
    #[must_use]
    pub fn price_cents(&self) -> Option<u32> {
        match self.side {
            Side::Yes => self.yes_price,
            Side::No => self.no_price,
        }
    }

    /// Checks the request before it is sent.
    ///
    /// # Errors
    /// Returns [`KalshiError::InvalidRequest`] for a zero count, a limit
    /// order without a price on its side, or a price outside 1-99.
    pub fn validate(&self) -> Result<()> {
        if self.count == 0 {
            return Err(KalshiError::InvalidRequest(
                "order count must be positive".to_string(),
            ));
        }

        if self.order_type == OrderType::Limit {
            let price = self.price_cents().ok_or_else(|| {
                KalshiError::InvalidRequest(format!(
                    "limit order on {} side needs a {}_price",
                    self.side, self.side
                ))
            })?;
            if !(1..CONTRACT_PAYOUT_CENTS).contains(&price) {
                return Err(KalshiError::InvalidRequest(format!(
                    "limit price must be between 1 and 99 cents, got {price}"
                )));
            }
        }

        Ok(())
    }

    /// Returns the order value in cents.
    #[must_use]
    pub fn order_value_cents(&self) -> u64 {
        let price = u64::from(self.price_cents().unwrap_or(50));
        price * u64::from(self.count)
    }
}

/// Status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Order is pending (not yet on book).
    Pending,
    /// Order is resting on the book.
    Resting,
    /// Order was fully executed.
    Executed,
    /// Order was cancelled.
    Canceled,
}

impl OrderStatus {
    /// Parses the status strings used across API versions.
    #[must_use]
    pub fn from_api_str(s: &str) -> Self {
        match s {
            "resting" => Self::Resting,
            "executed" | "filled" => Self::Executed,
            "canceled" | "cancelled" => Self::Canceled,
            _ => Self::Pending,
        }
    }

    /// Returns true if the order can no longer change.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Executed | Self::Canceled)
    }
}

/// An order as reported by the exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order ID assigned by Kalshi.
    pub order_id: String,

    /// Client order ID if provided.
    pub client_order_id: Option<String>,

    /// Market ticker.
    pub ticker: String,

    /// Side (yes/no).
    pub side: Side,

    /// Action (buy/sell).
    pub action: Action,

    /// Order type.
    pub order_type: OrderType,

    /// Order status.
    pub status: OrderStatus,

    /// Yes price in cents.
    pub yes_price: Option<u32>,

    /// No price in cents.
    pub no_price: Option<u32>,

    /// Contracts filled so far.
    pub filled_count: u32,

    /// Contracts still resting.
    pub remaining_count: u32,

    /// Order creation time.
    pub created_time: Option<DateTime<Utc>>,
}

impl Order {
    /// Returns true if the order is fully filled.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.status == OrderStatus::Executed && self.remaining_count == 0
    }

    /// Returns true if some but not all contracts filled.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.filled_count > 0 && self.remaining_count > 0
    }

    /// Returns the fill rate (0.0 to 1.0).
    #[must_use]
    pub fn fill_rate(&self) -> f64 {
        let total = self.filled_count + self.remaining_count;
        if total == 0 {
            return 0.0;
        }
        f64::from(self.filled_count) / f64::from(total)
    }
}

/// One execution against one of the account's orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    /// Trade identifier.
    pub trade_id: String,

    /// Order that was filled.
    pub order_id: String,

    /// Market ticker.
    pub ticker: String,

    /// Side.
    pub side: Side,

    /// Action.
    pub action: Action,

    /// Contracts filled.
    pub count: i64,

    /// Yes price in cents.
    pub yes_price: i64,

    /// No price in cents.
    pub no_price: i64,

    /// True if the account took liquidity.
    #[serde(default)]
    pub is_taker: bool,

    /// Fill time.
    pub created_time: Option<DateTime<Utc>>,
}

// =============================================================================
// Portfolio Types
// =============================================================================

/// Account balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Available cash in cents.
    pub balance: i64,

    /// Mark value of open positions in cents, when reported.
    #[serde(default)]
    pub portfolio_value: Option<i64>,
}

impl Balance {
    /// Returns available cash in dollars.
    #[must_use]
    pub fn dollars(&self) -> Decimal {
        Decimal::new(self.balance, 2)
    }
}

/// A position held on the exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangePosition {
    /// Market ticker.
    pub ticker: String,

    /// Signed contract count: positive for YES, negative for NO.
    pub position: i64,

    /// Cost of the position in cents.
    #[serde(default)]
    pub market_exposure: i64,

    /// Realized P&L in cents.
    #[serde(default)]
    pub realized_pnl: i64,

    /// Total contracts traded in this market.
    #[serde(default)]
    pub total_traded: i64,

    /// Fees paid in cents.
    #[serde(default)]
    pub fees_paid: i64,

    /// Orders still resting in this market.
    #[serde(default)]
    pub resting_orders_count: i64,
}

impl ExchangePosition {
    /// Returns the side held, or `None` for a flat position.
    #[must_use]
    pub fn side(&self) -> Option<Side> {
        match self.position.signum() {
            1 => Some(Side::Yes),
            -1 => Some(Side::No),
            _ => None,
        }
    }

    /// Returns the absolute number of contracts held.
    #[must_use]
    pub fn contracts(&self) -> u64 {
        self.position.unsigned_abs()
    }
}

/// Balance plus open positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    /// Cash balance.
    pub balance: Balance,

    /// Positions with a non-zero contract count.
    pub positions: Vec<ExchangePosition>,
}

// =============================================================================
// Orderbook Types
// =============================================================================

/// A resting bid level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLevel {
    /// Price in cents.
    pub price: u32,

    /// Contracts resting at this price.
    pub quantity: u32,
}

impl PriceLevel {
    /// Creates a level.
    #[must_use]
    pub fn new(price: u32, quantity: u32) -> Self {
        Self { price, quantity }
    }
}

/// Orderbook of resting bids on both sides of a market.
///
/// Kalshi only publishes bids. Each side is sorted ascending by price, so
/// the best bid is the last level. The implied ask on one side is 100 minus
/// the best bid on the other.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Orderbook {
    /// Market ticker.
    pub ticker: String,

    /// YES bids, ascending by price.
    pub yes: Vec<PriceLevel>,

    /// NO bids, ascending by price.
    pub no: Vec<PriceLevel>,

    /// Time the snapshot was taken.
    pub timestamp: DateTime<Utc>,
}

impl Orderbook {
    /// Builds a book from raw levels, sorting each side ascending by price.
    #[must_use]
    pub fn new(ticker: impl Into<String>, mut yes: Vec<PriceLevel>, mut no: Vec<PriceLevel>) -> Self {
        yes.sort_by_key(|l| l.price);
        no.sort_by_key(|l| l.price);
        Self {
            ticker: ticker.into(),
            yes,
            no,
            timestamp: Utc::now(),
        }
    }

    /// Returns the levels for one side.
    #[must_use]
    pub fn side(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Yes => &self.yes,
            Side::No => &self.no,
        }
    }

    /// Returns the best (highest) bid on a side.
    #[must_use]
    pub fn best_bid(&self, side: Side) -> Option<PriceLevel> {
        self.side(side).last().copied()
    }

    /// Returns the best yes bid.
    #[must_use]
    pub fn best_yes_bid(&self) -> Option<PriceLevel> {
        self.best_bid(Side::Yes)
    }

    /// Returns the best no bid.
    #[must_use]
    pub fn best_no_bid(&self) -> Option<PriceLevel> {
        self.best_bid(Side::No)
    }

    /// Returns the implied ask on a side: 100 minus the opposite best bid.
    #[must_use]
    pub fn implied_ask(&self, side: Side) -> Option<u32> {
        self.best_bid(side.opposite())
            .map(|l| CONTRACT_PAYOUT_CENTS.saturating_sub(l.price))
    }

    /// Returns `100 - (best yes bid + best no bid)`.
    ///
    /// Negative values mean the two sides cross.
    #[must_use]
    pub fn spread(&self) -> Option<i64> {
        match (self.best_yes_bid(), self.best_no_bid()) {
            (Some(yes), Some(no)) => Some(
                i64::from(CONTRACT_PAYOUT_CENTS) - i64::from(yes.price) - i64::from(no.price),
            ),
            _ => None,
        }
    }

    /// Returns total contracts resting on a side.
    #[must_use]
    pub fn depth(&self, side: Side) -> u64 {
        self.side(side).iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Returns true if neither side has any levels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.yes.is_empty() && self.no.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn market(status: MarketStatus) -> Market {
        Market {
            ticker: "KXHIGHNY-25JAN15-B40".to_string(),
            event_ticker: "KXHIGHNY-25JAN15".to_string(),
            series_ticker: None,
            title: "NYC high above 40?".to_string(),
            subtitle: None,
            status,
            yes_bid: Some(dec!(45)),
            yes_ask: Some(dec!(47)),
            no_bid: Some(dec!(53)),
            no_ask: Some(dec!(55)),
            last_price: Some(dec!(46)),
            volume: 1200,
            volume_24h: Some(300),
            open_interest: Some(900),
            close_time: None,
            expiration_time: None,
            category: None,
            orderbook: None,
        }
    }

    // ==================== Orderbook Tests ====================

    #[test]
    fn test_best_bid_is_last_level() {
        let book = Orderbook::new(
            "T",
            vec![PriceLevel::new(40, 10), PriceLevel::new(45, 5)],
            vec![],
        );
        assert_eq!(book.best_yes_bid(), Some(PriceLevel::new(45, 5)));
        assert_eq!(book.best_no_bid(), None);
    }

    #[test]
    fn test_new_sorts_levels_ascending() {
        let book = Orderbook::new(
            "T",
            vec![PriceLevel::new(45, 5), PriceLevel::new(40, 10)],
            vec![PriceLevel::new(52, 1), PriceLevel::new(50, 3)],
        );
        assert_eq!(book.yes[0].price, 40);
        assert_eq!(book.best_no_bid().map(|l| l.price), Some(52));
    }

    #[test]
    fn test_spread_and_implied_asks() {
        let book = Orderbook::new(
            "T",
            vec![PriceLevel::new(40, 10), PriceLevel::new(45, 5)],
            vec![PriceLevel::new(50, 7), PriceLevel::new(52, 2)],
        );
        assert_eq!(book.spread(), Some(3));
        assert_eq!(book.implied_ask(Side::Yes), Some(48));
        assert_eq!(book.implied_ask(Side::No), Some(55));
    }

    #[test]
    fn test_crossed_book_has_negative_spread() {
        let book = Orderbook::new("T", vec![PriceLevel::new(55, 1)], vec![PriceLevel::new(50, 1)]);
        assert_eq!(book.spread(), Some(-5));
    }

    #[test]
    fn test_depth_sums_quantity() {
        let book = Orderbook::new(
            "T",
            vec![PriceLevel::new(40, 10), PriceLevel::new(45, 5)],
            vec![],
        );
        assert_eq!(book.depth(Side::Yes), 15);
        assert_eq!(book.depth(Side::No), 0);
        assert!(!book.is_empty());
    }

    // ==================== Market Tests ====================

    #[test]
    fn test_market_mid_prices() {
        let m = market(MarketStatus::Open);
        assert_eq!(m.yes_mid(), Some(dec!(46)));
        assert_eq!(m.no_mid(), Some(dec!(54)));
        assert_eq!(m.spread(), Some(dec!(2)));
        assert!(m.is_tradeable());
    }

    #[test]
    fn test_market_status_parsing() {
        assert_eq!(MarketStatus::from_api_str("active"), MarketStatus::Open);
        assert_eq!(MarketStatus::from_api_str("finalized"), MarketStatus::Settled);
        assert_eq!(MarketStatus::from_api_str("initialized"), MarketStatus::Unopened);
        assert!(!market(MarketStatus::Closed).is_tradeable());
    }

    #[test]
    fn test_market_filter_query() {
        let query = MarketFilter::default()
            .with_series("KXHIGHNY")
            .with_cursor("abc")
            .to_query();

        assert!(query.contains(&("limit".to_string(), "200".to_string())));
        assert!(query.contains(&("status".to_string(), "open".to_string())));
        assert!(query.contains(&("series_ticker".to_string(), "KXHIGHNY".to_string())));
        assert!(query.contains(&("cursor".to_string(), "abc".to_string())));
    }

    #[test]
    fn test_market_filter_skips_empty_cursor() {
        let query = MarketFilter::default().with_cursor("").any_status().to_query();
        assert_eq!(query, vec![("limit".to_string(), "200".to_string())]);
    }

    // ==================== Page Tests ====================

    #[test]
    fn test_empty_cursor_ends_pagination() {
        let page: Page<u8> = Page {
            items: vec![],
            cursor: Some(String::new()),
        };
        assert!(page.is_last());

        let page: Page<u8> = Page {
            items: vec![],
            cursor: Some("next".to_string()),
        };
        assert_eq!(page.next_cursor(), Some("next"));
    }

    // ==================== Candle Interval Tests ====================

    #[test]
    fn test_candle_interval_accepts_known_periods() {
        for minutes in [1, 60, 1440] {
            let interval = CandleInterval::try_from(minutes).unwrap();
            assert_eq!(interval.minutes(), minutes);
        }
    }

    #[test]
    fn test_candle_interval_rejects_others() {
        for minutes in [0, 5, 15, 30, 120] {
            let err = CandleInterval::try_from(minutes).unwrap_err();
            assert!(err.is_configuration());
        }
    }

    #[test]
    fn test_candlestick_deserializes_with_null_prices() {
        let candle: Candlestick = serde_json::from_value(serde_json::json!({
            "end_period_ts": 1736900000,
            "yes_bid": {"open": 40, "high": 45, "low": 39, "close": 44},
            "yes_ask": {"open": 42, "high": 47, "low": 41, "close": 46},
            "price": {"open": null, "high": null, "low": null, "close": null},
            "volume": 0,
            "open_interest": 120
        }))
        .unwrap();

        assert_eq!(candle.yes_bid.close, Some(44));
        assert_eq!(candle.price.close, None);
        assert_eq!(candle.open_interest, 120);
    }

    // ==================== Order Tests ====================

    #[test]
    fn test_order_request_serializes_type_field() {
        let order = OrderRequest::buy_yes("T", 45, 10).with_client_order_id("abc");
        let json = serde_json::to_value(&order).unwrap();

        assert_eq!(json["type"], "limit");
        assert_eq!(json["side"], "yes");
        assert_eq!(json["action"], "buy");
        assert_eq!(json["yes_price"], 45);
        assert!(json.get("no_price").is_none());
        assert_eq!(json["client_order_id"], "abc");
    }

    #[test]
    fn test_order_request_validation() {
        assert!(OrderRequest::buy_no("T", 30, 5).validate().is_ok());
        assert!(OrderRequest::market("T", Action::Sell, Side::Yes, 5).validate().is_ok());
        assert!(OrderRequest::buy_yes("T", 45, 0).validate().is_err());
        assert!(OrderRequest::buy_yes("T", 100, 1).validate().is_err());

        let mut mismatched = OrderRequest::buy_yes("T", 45, 1);
        mismatched.side = Side::No;
        assert!(mismatched.validate().is_err());
    }

    #[test]
    fn test_order_value_cents() {
        assert_eq!(OrderRequest::buy_no("T", 30, 5).order_value_cents(), 150);
    }

    #[test]
    fn test_side_parsing() {
        assert_eq!("YES".parse::<Side>().unwrap(), Side::Yes);
        assert_eq!("no".parse::<Side>().unwrap(), Side::No);
        assert!("maybe".parse::<Side>().is_err());
        assert_eq!(Side::Yes.opposite(), Side::No);
    }

    // ==================== Portfolio Tests ====================

    #[test]
    fn test_exchange_position_side() {
        let pos: ExchangePosition = serde_json::from_value(serde_json::json!({
            "ticker": "T",
            "position": -12,
            "market_exposure": 480
        }))
        .unwrap();

        assert_eq!(pos.side(), Some(Side::No));
        assert_eq!(pos.contracts(), 12);
    }

    #[test]
    fn test_balance_dollars() {
        let balance = Balance {
            balance: 12345,
            portfolio_value: None,
        };
        assert_eq!(balance.dollars(), dec!(123.45));
    }
}
