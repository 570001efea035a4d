//! Kalshi REST API client.
//!
//! Every request runs through the same pipeline:
//!
//! 1. public GET requests are answered from the response cache when fresh,
//! 2. the shared token bucket grants one token,
//! 3. the request is signed when the client holds credentials,
//! 4. the request is sent, and transient failures (429, 5xx gateway errors,
//!    connect and timeout errors) are retried with exponential backoff,
//! 5. successful public GET responses are stored in the cache.
//!
//! Each retry goes back through the limiter and is signed with a fresh
//! timestamp. Endpoints under `/portfolio` require credentials and fail with
//! [`KalshiError::MissingCredentials`] before any token is taken.
//!
//! # Example
//!
//! ```ignore
//! use kalshi_edge_exchange::{KalshiClient, KalshiClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = KalshiClient::new(KalshiClientConfig::production())?;
//!
//!     let markets = client.get_all_markets(Some(500), Some("open"), Some(1000)).await?;
//!     println!("Found {} liquid markets", markets.len());
//!
//!     let book = client.get_orderbook(&markets[0].ticker).await?;
//!     println!("Best yes bid: {:?}", book.best_yes_bid());
//!
//!     Ok(())
//! }
//! ```

use crate::auth::{KalshiAuth, KalshiAuthConfig};
use crate::cache::{CacheKey, CacheStats, ResponseCache, DEFAULT_CACHE_TTL};
use crate::error::{KalshiError, Result};
use crate::rate_limiter::TokenBucket;
use crate::types::{
    Action, Balance, Candlestick, CandleInterval, Event, EventCandlesticks, ExchangePosition,
    ExchangeStatus, Fill, Market, MarketFilter, MarketStatus, MarketsPage, Order, OrderRequest,
    OrderStatus, OrderType, Orderbook, Page, PortfolioSnapshot, PriceLevel, Series, Side,
    TradeFilter, TradesPage, CONTRACT_PAYOUT_CENTS,
};
use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use reqwest::{Client, Method, Url};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

// =============================================================================
// Constants
// =============================================================================

/// Kalshi production API base URL.
pub const KALSHI_PROD_URL: &str = "https://api.elections.kalshi.com/trade-api/v2";

/// Kalshi demo API base URL.
pub const KALSHI_DEMO_URL: &str = "https://demo-api.kalshi.co/trade-api/v2";

/// Default steady request rate.
pub const DEFAULT_REQUESTS_PER_SECOND: f64 = 20.0;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Kalshi client.
#[derive(Debug, Clone)]
pub struct KalshiClientConfig {
    /// Base URL for the API, including the `/trade-api/v2` prefix.
    pub base_url: String,

    /// Steady request rate in requests per second.
    pub requests_per_second: f64,

    /// Burst capacity. Defaults to one second of traffic.
    pub burst: Option<f64>,

    /// How long GET responses stay cached. Zero disables the cache.
    pub cache_ttl: Duration,

    /// Retries after the first attempt for transient failures.
    pub max_retries: u32,

    /// First backoff delay; doubled on each retry.
    pub backoff_base: Duration,

    /// Upper bound on any single backoff delay.
    pub backoff_max: Duration,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for KalshiClientConfig {
    fn default() -> Self {
        Self {
            base_url: KALSHI_PROD_URL.to_string(),
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            burst: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(30),
            timeout_secs: 10,
        }
    }
}

impl KalshiClientConfig {
    /// Creates a configuration for production.
    #[must_use]
    pub fn production() -> Self {
        Self::default()
    }

    /// Creates a configuration for the demo environment.
    #[must_use]
    pub fn demo() -> Self {
        Self {
            base_url: KALSHI_DEMO_URL.to_string(),
            ..Default::default()
        }
    }

    /// Sets the base URL.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the steady request rate.
    #[must_use]
    pub fn with_rate_limit(mut self, requests_per_second: f64) -> Self {
        self.requests_per_second = requests_per_second;
        self
    }

    /// Sets the burst capacity.
    #[must_use]
    pub fn with_burst(mut self, burst: f64) -> Self {
        self.burst = Some(burst);
        self
    }

    /// Sets the cache TTL.
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Sets the retry budget.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the backoff base and cap.
    #[must_use]
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Effective burst capacity.
    #[must_use]
    pub fn burst_capacity(&self) -> f64 {
        self.burst.unwrap_or(self.requests_per_second)
    }

    /// Checks the configuration.
    ///
    /// # Errors
    /// Returns [`KalshiError::Configuration`] for an unparseable base URL, a
    /// non-positive rate, a burst below one, a zero timeout or a backoff cap
    /// below the base.
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url).map_err(|e| {
            KalshiError::Configuration(format!("invalid base URL {}: {e}", self.base_url))
        })?;

        if !self.requests_per_second.is_finite() || self.requests_per_second <= 0.0 {
            return Err(KalshiError::Configuration(format!(
                "requests_per_second must be positive, got {}",
                self.requests_per_second
            )));
        }
        if self.burst_capacity() < 1.0 {
            return Err(KalshiError::Configuration(format!(
                "burst must be at least 1, got {}",
                self.burst_capacity()
            )));
        }
        if self.timeout_secs == 0 {
            return Err(KalshiError::Configuration(
                "timeout_secs must be positive".to_string(),
            ));
        }
        if self.backoff_max < self.backoff_base {
            return Err(KalshiError::Configuration(
                "backoff_max must not be below backoff_base".to_string(),
            ));
        }

        Ok(())
    }

    /// Delay before retry number `attempt` (zero-based).
    ///
    /// Exponential from `backoff_base`, raised to at least the server's
    /// `Retry-After` when one was given, and capped at `backoff_max`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        let exponential = self
            .backoff_base
            .saturating_mul(2u32.saturating_pow(attempt));
        let hinted = Duration::from_secs(retry_after_secs.unwrap_or(0));
        exponential.max(hinted).min(self.backoff_max)
    }
}

// =============================================================================
// API Response Types
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
struct RawMarketsResponse {
    markets: Option<Vec<RawMarket>>,
    cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawMarketResponse {
    market: Option<RawMarket>,
}

/// Raw market data from API.
#[derive(Debug, Clone, Deserialize)]
struct RawMarket {
    ticker: String,
    #[serde(default)]
    event_ticker: String,
    series_ticker: Option<String>,
    title: Option<String>,
    subtitle: Option<String>,
    status: Option<String>,
    yes_bid: Option<i64>,
    yes_ask: Option<i64>,
    no_bid: Option<i64>,
    no_ask: Option<i64>,
    last_price: Option<i64>,
    volume: Option<i64>,
    volume_24h: Option<i64>,
    open_interest: Option<i64>,
    close_time: Option<String>,
    expiration_time: Option<String>,
    category: Option<String>,
}

fn parse_time(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|d| d.with_timezone(&Utc))
    })
}

impl From<RawMarket> for Market {
    fn from(raw: RawMarket) -> Self {
        Self {
            ticker: raw.ticker,
            event_ticker: raw.event_ticker,
            series_ticker: raw.series_ticker,
            title: raw.title.unwrap_or_default(),
            subtitle: raw.subtitle,
            status: raw
                .status
                .as_deref()
                .map_or(MarketStatus::Closed, MarketStatus::from_api_str),
            yes_bid: raw.yes_bid.map(Decimal::from),
            yes_ask: raw.yes_ask.map(Decimal::from),
            no_bid: raw.no_bid.map(Decimal::from),
            no_ask: raw.no_ask.map(Decimal::from),
            last_price: raw.last_price.map(Decimal::from),
            volume: raw.volume.unwrap_or(0),
            volume_24h: raw.volume_24h,
            open_interest: raw.open_interest,
            close_time: parse_time(raw.close_time),
            expiration_time: parse_time(raw.expiration_time),
            category: raw.category,
            orderbook: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawOrderbookResponse {
    orderbook: Option<RawOrderbook>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawOrderbook {
    yes: Option<Vec<Vec<i64>>>, // [[price, quantity], ...]
    no: Option<Vec<Vec<i64>>>,
}

/// Converts `[[price, quantity], ...]` into levels, dropping malformed rows.
fn parse_levels(raw: Option<Vec<Vec<i64>>>) -> Vec<PriceLevel> {
    raw.unwrap_or_default()
        .into_iter()
        .filter_map(|row| match row.as_slice() {
            [price, quantity, ..] => {
                let price = u32::try_from(*price).ok()?;
                let quantity = u32::try_from(*quantity).ok()?;
                (price <= CONTRACT_PAYOUT_CENTS).then_some(PriceLevel::new(price, quantity))
            }
            _ => None,
        })
        .collect()
}

#[derive(Debug, Clone, Deserialize)]
struct RawOrderResponse {
    order: Option<RawOrder>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawOrdersResponse {
    orders: Option<Vec<RawOrder>>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawOrder {
    order_id: String,
    client_order_id: Option<String>,
    ticker: String,
    side: Option<String>,
    action: Option<String>,
    #[serde(rename = "type")]
    order_type: Option<String>,
    status: Option<String>,
    yes_price: Option<i64>,
    no_price: Option<i64>,
    #[serde(alias = "filled_count")]
    fill_count: Option<i64>,
    remaining_count: Option<i64>,
    created_time: Option<String>,
}

fn to_cents(value: Option<i64>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

impl From<RawOrder> for Order {
    fn from(raw: RawOrder) -> Self {
        let side = match raw.side.as_deref() {
            Some("yes") => Side::Yes,
            _ => Side::No,
        };

        let action = match raw.action.as_deref() {
            Some("sell") => Action::Sell,
            _ => Action::Buy,
        };

        let order_type = match raw.order_type.as_deref() {
            Some("market") => OrderType::Market,
            _ => OrderType::Limit,
        };

        Self {
            order_id: raw.order_id,
            client_order_id: raw.client_order_id,
            ticker: raw.ticker,
            side,
            action,
            order_type,
            status: raw
                .status
                .as_deref()
                .map_or(OrderStatus::Pending, OrderStatus::from_api_str),
            yes_price: to_cents(raw.yes_price),
            no_price: to_cents(raw.no_price),
            filled_count: to_cents(raw.fill_count).unwrap_or(0),
            remaining_count: to_cents(raw.remaining_count).unwrap_or(0),
            created_time: parse_time(raw.created_time),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawEventResponse {
    event: Option<RawEvent>,
    markets: Option<Vec<RawMarket>>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawEvent {
    event_ticker: String,
    series_ticker: Option<String>,
    title: Option<String>,
    sub_title: Option<String>,
    category: Option<String>,
    mutually_exclusive: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawSeriesResponse {
    series: Option<Series>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawCandlesticksResponse {
    #[serde(default)]
    candlesticks: Vec<Candlestick>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawTradesResponse {
    #[serde(default)]
    trades: Vec<crate::types::Trade>,
    cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawFillsResponse {
    #[serde(default)]
    fills: Vec<Fill>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawPositionsResponse {
    #[serde(default)]
    market_positions: Vec<ExchangePosition>,
}

// =============================================================================
// KalshiClient
// =============================================================================

/// Whether an endpoint needs credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Public,
    Private,
}

struct ClientInner {
    config: KalshiClientConfig,
    http: Client,
    limiter: TokenBucket,
    cache: ResponseCache,
    auth: Option<KalshiAuth>,
}

/// Kalshi REST API client.
///
/// Cheap to clone; clones share the rate limiter, cache and credentials.
#[derive(Clone)]
pub struct KalshiClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for KalshiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KalshiClient")
            .field("base_url", &self.inner.config.base_url)
            .field("requests_per_second", &self.inner.config.requests_per_second)
            .field("authenticated", &self.inner.auth.is_some())
            .finish_non_exhaustive()
    }
}

impl KalshiClient {
    /// Creates a client without credentials. Public endpoints work; portfolio
    /// endpoints return [`KalshiError::MissingCredentials`].
    ///
    /// # Errors
    /// Returns error if the configuration is invalid.
    pub fn new(config: KalshiClientConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Creates a client that signs every request.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid.
    pub fn with_auth(config: KalshiClientConfig, auth: KalshiAuth) -> Result<Self> {
        Self::build(config, Some(auth))
    }

    /// Creates a client, loading credentials from the environment when the
    /// API key variable is set.
    ///
    /// # Errors
    /// Returns error if the configuration is invalid, or if credentials are
    /// present but cannot be loaded.
    pub fn from_env(config: KalshiClientConfig, auth_config: &KalshiAuthConfig) -> Result<Self> {
        let auth = if auth_config.is_present() {
            Some(KalshiAuth::from_env(auth_config)?)
        } else {
            tracing::info!(
                env = %auth_config.api_key_env,
                "no Kalshi credentials in environment, portfolio endpoints disabled"
            );
            None
        };
        Self::build(config, auth)
    }

    fn build(config: KalshiClientConfig, auth: Option<KalshiAuth>) -> Result<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| KalshiError::Network(format!("failed to build HTTP client: {e}")))?;

        let limiter = TokenBucket::new(config.requests_per_second, config.burst_capacity())?;
        let cache = ResponseCache::new(config.cache_ttl);

        tracing::info!(
            base_url = %config.base_url,
            rate = config.requests_per_second,
            burst = config.burst_capacity(),
            cache_ttl_secs = config.cache_ttl.as_secs(),
            authenticated = auth.is_some(),
            "Kalshi client initialized"
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                http,
                limiter,
                cache,
                auth,
            }),
        })
    }

    /// Returns the base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.config.base_url
    }

    /// Returns true if the client holds credentials.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.auth.is_some()
    }

    /// Returns the shared rate limiter.
    #[must_use]
    pub fn rate_limiter(&self) -> &TokenBucket {
        &self.inner.limiter
    }

    /// Drops every cached response.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    /// Returns cache counters.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.inner.cache.stats()
    }

    /// Validates a ticker string to prevent path traversal attacks.
    ///
    /// Valid tickers contain only alphanumeric characters, hyphens, dots and
    /// underscores. Examples: "KXHIGHNY-25JAN15-B40", "INXD-25JAN15-B5887.5"
    fn validate_ticker(ticker: &str) -> Result<&str> {
        if ticker.contains("..") || ticker.contains('/') || ticker.contains('\\') {
            return Err(KalshiError::InvalidRequest(format!(
                "invalid ticker: contains forbidden characters: {ticker}"
            )));
        }

        if ticker.is_empty() {
            return Err(KalshiError::InvalidRequest(
                "ticker cannot be empty".to_string(),
            ));
        }

        if !ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        {
            return Err(KalshiError::InvalidRequest(format!(
                "invalid ticker: must contain only alphanumeric, hyphen, dot, or underscore: {ticker}"
            )));
        }

        if ticker.len() > 64 {
            return Err(KalshiError::InvalidRequest(format!(
                "invalid ticker: exceeds maximum length of 64: {}",
                ticker.len()
            )));
        }

        Ok(ticker)
    }

    /// Validates an identifier (order_id, etc.) to prevent path traversal attacks.
    fn validate_identifier(id: &str) -> Result<&str> {
        if id.is_empty() {
            return Err(KalshiError::InvalidRequest(
                "identifier cannot be empty".to_string(),
            ));
        }

        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(KalshiError::InvalidRequest(format!(
                "invalid identifier: must contain only alphanumeric, hyphen, or underscore: {id}"
            )));
        }

        if id.len() > 128 {
            return Err(KalshiError::InvalidRequest(format!(
                "invalid identifier: exceeds maximum length of 128: {}",
                id.len()
            )));
        }

        Ok(id)
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url> {
        let raw = format!("{}{endpoint}", self.inner.config.base_url.trim_end_matches('/'));
        Url::parse(&raw)
            .map_err(|e| KalshiError::Configuration(format!("invalid request URL {raw}: {e}")))
    }

    // =========================================================================
    // Request Pipeline
    // =========================================================================

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(String, String)],
        access: Access,
    ) -> Result<T> {
        let value = self.request(Method::GET, endpoint, query, None, access).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        query: &[(String, String)],
        body: Option<&Value>,
        access: Access,
    ) -> Result<Value> {
        if access == Access::Private && self.inner.auth.is_none() {
            return Err(KalshiError::missing_credentials(endpoint));
        }

        let url = self.endpoint_url(endpoint)?;

        let cacheable =
            method == Method::GET && access == Access::Public && self.inner.cache.is_enabled();
        let cache_key = cacheable.then(|| CacheKey::new(method.as_str(), url.as_str(), query));

        if let Some(key) = &cache_key {
            if let Some(cached) = self.inner.cache.get(key) {
                tracing::debug!(endpoint, "cache hit");
                return Ok(cached);
            }
        }

        let value = self.send_with_retry(&method, &url, endpoint, query, body).await?;

        if let Some(key) = cache_key {
            self.inner.cache.put(key, value.clone());
        }

        Ok(value)
    }

    async fn send_with_retry(
        &self,
        method: &Method,
        url: &Url,
        endpoint: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let max_retries = self.inner.config.max_retries;
        let mut attempt = 0u32;

        loop {
            match self.send_once(method, url, endpoint, query, body).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() => {
                    if attempt >= max_retries {
                        tracing::warn!(
                            endpoint,
                            attempts = attempt + 1,
                            error = %err,
                            "retries exhausted"
                        );
                        return Err(KalshiError::RetriesExhausted {
                            endpoint: endpoint.to_string(),
                            attempts: attempt + 1,
                            last_error: err.to_string(),
                        });
                    }

                    let delay = self
                        .inner
                        .config
                        .backoff_delay(attempt, err.retry_after_secs());
                    tracing::warn!(
                        endpoint,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn send_once(
        &self,
        method: &Method,
        url: &Url,
        endpoint: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        self.inner.limiter.acquire(1).await;

        let mut request = self
            .inner
            .http
            .request(method.clone(), url.clone())
            .header("Accept", "application/json");

        if !query.is_empty() {
            request = request.query(query);
        }

        if let Some(auth) = &self.inner.auth {
            let headers = auth.sign_request(method.as_str(), url.path())?;
            for (name, value) in headers.as_tuples() {
                request = request.header(name, value);
            }
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!(%method, endpoint, params = query.len(), "sending request");

        let response = request.send().await?;
        Self::handle_response(endpoint, response).await
    }

    /// Handles API response, converting errors appropriately.
    async fn handle_response(endpoint: &str, response: reqwest::Response) -> Result<Value> {
        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(0);
            return Err(KalshiError::rate_limit(retry_after));
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(KalshiError::api(status.as_u16(), endpoint, text));
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    // =========================================================================
    // Market Endpoints
    // =========================================================================

    /// Fetches one page of markets.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn list_markets(&self, filter: &MarketFilter) -> Result<MarketsPage> {
        let response: RawMarketsResponse = self
            .get("/markets", &filter.to_query(), Access::Public)
            .await?;

        Ok(Page {
            items: response
                .markets
                .unwrap_or_default()
                .into_iter()
                .map(Market::from)
                .collect(),
            cursor: response.cursor,
        })
    }

    /// Fetches markets across pages until the cursor runs out or `max_count`
    /// markets passing the volume filter have been collected.
    ///
    /// Pages are requested at the maximum size. `min_volume` is applied to
    /// each page before counting toward `max_count`, and the result is
    /// trimmed to exactly `max_count`.
    ///
    /// # Errors
    /// Returns error if any page fails.
    pub async fn get_all_markets(
        &self,
        max_count: Option<usize>,
        status: Option<&str>,
        min_volume: Option<i64>,
    ) -> Result<Vec<Market>> {
        let mut filter = MarketFilter::default().any_status();
        if let Some(status) = status {
            filter = filter.with_status(status);
        }

        let mut markets = Vec::new();
        if max_count == Some(0) {
            return Ok(markets);
        }

        let mut fetched = 0usize;
        let mut filtered_out = 0usize;

        loop {
            let page = self.list_markets(&filter).await?;
            fetched += page.items.len();
            let next = page.next_cursor().map(str::to_string);

            for market in page.items {
                if min_volume.is_some_and(|min| market.volume < min) {
                    filtered_out += 1;
                } else {
                    markets.push(market);
                }
            }

            tracing::debug!(
                collected = markets.len(),
                fetched,
                has_more = next.is_some(),
                "fetched markets page"
            );

            if let Some(max) = max_count {
                if markets.len() >= max {
                    markets.truncate(max);
                    break;
                }
            }

            match next {
                Some(cursor) if filter.cursor.as_deref() == Some(cursor.as_str()) => {
                    tracing::warn!(cursor = %cursor, "market cursor did not advance, stopping");
                    break;
                }
                Some(cursor) => filter.cursor = Some(cursor),
                None => break,
            }
        }

        tracing::info!(
            markets = markets.len(),
            fetched,
            filtered_out,
            "fetched markets"
        );
        Ok(markets)
    }

    /// Gets a specific market by ticker.
    ///
    /// # Errors
    /// Returns [`KalshiError::MarketNotFound`] on a 404 or empty response.
    pub async fn get_market(&self, ticker: &str) -> Result<Market> {
        let ticker = Self::validate_ticker(ticker)?;
        let endpoint = format!("/markets/{ticker}");

        let response: RawMarketResponse = match self.get(&endpoint, &[], Access::Public).await {
            Ok(response) => response,
            Err(err) if err.status_code() == Some(404) => {
                return Err(KalshiError::market_not_found(ticker))
            }
            Err(err) => return Err(err),
        };

        response
            .market
            .map(Market::from)
            .ok_or_else(|| KalshiError::market_not_found(ticker))
    }

    /// Gets the orderbook for a market. A `null` side becomes an empty side.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn get_orderbook(&self, ticker: &str) -> Result<Orderbook> {
        let ticker = Self::validate_ticker(ticker)?;
        let endpoint = format!("/markets/{ticker}/orderbook");

        let response: RawOrderbookResponse = self.get(&endpoint, &[], Access::Public).await?;
        let raw = response.orderbook.unwrap_or_default();

        Ok(Orderbook::new(
            ticker,
            parse_levels(raw.yes),
            parse_levels(raw.no),
        ))
    }

    /// Fetches orderbooks for several markets with at most `concurrency`
    /// requests in flight. Results keep the order of `tickers`.
    ///
    /// All requests share the client's limiter and cache.
    pub async fn get_orderbooks(
        &self,
        tickers: &[String],
        concurrency: usize,
    ) -> Vec<(String, Result<Orderbook>)> {
        stream::iter(tickers.iter().cloned())
            .map(|ticker| async move {
                let book = self.get_orderbook(&ticker).await;
                (ticker, book)
            })
            .buffered(concurrency.max(1))
            .collect()
            .await
    }

    /// Gets candlesticks for one market.
    ///
    /// `period_interval` is in minutes and must be 1, 60 or 1440; anything
    /// else is rejected before a request is made.
    ///
    /// # Errors
    /// Returns [`KalshiError::InvalidRequest`] for a bad interval or ticker,
    /// or an error if the API call fails.
    pub async fn get_candlesticks(
        &self,
        series_ticker: &str,
        market_ticker: &str,
        start_ts: i64,
        end_ts: i64,
        period_interval: u32,
    ) -> Result<Vec<Candlestick>> {
        let interval = CandleInterval::try_from(period_interval)?;
        let series = Self::validate_ticker(series_ticker)?;
        let market = Self::validate_ticker(market_ticker)?;
        let endpoint = format!("/series/{series}/markets/{market}/candlesticks");

        let response: RawCandlesticksResponse = self
            .get(&endpoint, &candle_query(start_ts, end_ts, interval), Access::Public)
            .await?;

        Ok(response.candlesticks)
    }

    /// Gets candlesticks for every market in an event.
    ///
    /// # Errors
    /// Returns [`KalshiError::InvalidRequest`] for a bad interval or ticker,
    /// or an error if the API call fails.
    pub async fn get_event_candlesticks(
        &self,
        series_ticker: &str,
        event_ticker: &str,
        start_ts: i64,
        end_ts: i64,
        period_interval: u32,
    ) -> Result<EventCandlesticks> {
        let interval = CandleInterval::try_from(period_interval)?;
        let series = Self::validate_ticker(series_ticker)?;
        let event = Self::validate_ticker(event_ticker)?;
        let endpoint = format!("/series/{series}/events/{event}/candlesticks");

        self.get(&endpoint, &candle_query(start_ts, end_ts, interval), Access::Public)
            .await
    }

    /// Gets a series by ticker.
    ///
    /// # Errors
    /// Returns error if the API call fails or the series is missing.
    pub async fn get_series(&self, series_ticker: &str) -> Result<Series> {
        let series = Self::validate_ticker(series_ticker)?;
        let response: RawSeriesResponse = self
            .get(&format!("/series/{series}"), &[], Access::Public)
            .await?;

        response.series.ok_or_else(|| {
            KalshiError::api(404, format!("/series/{series}"), "no series in response")
        })
    }

    /// Gets an event and its markets.
    ///
    /// # Errors
    /// Returns error if the API call fails or the event is missing.
    pub async fn get_event(&self, event_ticker: &str) -> Result<Event> {
        let ticker = Self::validate_ticker(event_ticker)?;
        let endpoint = format!("/events/{ticker}");
        let response: RawEventResponse = self.get(&endpoint, &[], Access::Public).await?;

        let raw = response
            .event
            .ok_or_else(|| KalshiError::api(404, endpoint.as_str(), "no event in response"))?;

        Ok(Event {
            event_ticker: raw.event_ticker,
            series_ticker: raw.series_ticker,
            title: raw.title.unwrap_or_default(),
            sub_title: raw.sub_title,
            category: raw.category,
            mutually_exclusive: raw.mutually_exclusive.unwrap_or(false),
            markets: response
                .markets
                .unwrap_or_default()
                .into_iter()
                .map(Market::from)
                .collect(),
        })
    }

    /// Fetches one page of public trades.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn get_trades(&self, filter: &TradeFilter) -> Result<TradesPage> {
        if let Some(ticker) = &filter.ticker {
            Self::validate_ticker(ticker)?;
        }

        let response: RawTradesResponse = self
            .get("/markets/trades", &filter.to_query(), Access::Public)
            .await?;

        Ok(Page {
            items: response.trades,
            cursor: response.cursor,
        })
    }

    /// Gets exchange-wide trading status.
    ///
    /// # Errors
    /// Returns error if the API call fails.
    pub async fn get_exchange_status(&self) -> Result<ExchangeStatus> {
        self.get("/exchange/status", &[], Access::Public).await
    }

    // =========================================================================
    // Portfolio Endpoints
    // =========================================================================

    /// Gets the account balance.
    ///
    /// # Errors
    /// Returns [`KalshiError::MissingCredentials`] without credentials, or
    /// an error if the API call fails.
    pub async fn get_balance(&self) -> Result<Balance> {
        self.get("/portfolio/balance", &[], Access::Private).await
    }

    /// Gets positions with a non-zero contract count.
    ///
    /// # Errors
    /// Returns error if credentials are missing or the API call fails.
    pub async fn get_positions(&self) -> Result<Vec<ExchangePosition>> {
        let response: RawPositionsResponse = self
            .get("/portfolio/positions", &[], Access::Private)
            .await?;

        Ok(response
            .market_positions
            .into_iter()
            .filter(|p| p.position != 0)
            .collect())
    }

    /// Gets balance and positions together.
    ///
    /// # Errors
    /// Returns error if credentials are missing or either call fails.
    pub async fn get_portfolio(&self) -> Result<PortfolioSnapshot> {
        let balance = self.get_balance().await?;
        let positions = self.get_positions().await?;
        Ok(PortfolioSnapshot { balance, positions })
    }

    /// Gets the account's fills, optionally for one market.
    ///
    /// # Errors
    /// Returns error if credentials are missing or the API call fails.
    pub async fn get_fills(&self, ticker: Option<&str>) -> Result<Vec<Fill>> {
        let query = ticker_query(ticker)?;
        let response: RawFillsResponse = self
            .get("/portfolio/fills", &query, Access::Private)
            .await?;
        Ok(response.fills)
    }

    // =========================================================================
    // Order Endpoints
    // =========================================================================

    /// Places an order.
    ///
    /// A `client_order_id` is generated when the request has none, so a
    /// retried submission is de-duplicated by the exchange.
    ///
    /// # Errors
    /// Returns [`KalshiError::InvalidRequest`] for a malformed order, or an
    /// error if the order is rejected or the API call fails.
    pub async fn place_order(&self, order: &OrderRequest) -> Result<Order> {
        Self::validate_ticker(&order.ticker)?;
        order.validate()?;

        let mut order = order.clone();
        let client_order_id = order
            .client_order_id
            .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
            .clone();
        let body = serde_json::to_value(&order)?;

        tracing::info!(
            ticker = %order.ticker,
            side = %order.side,
            action = order.action.as_api_str(),
            count = order.count,
            price = ?order.price_cents(),
            client_order_id = %client_order_id,
            "placing order"
        );

        let value = self
            .request(Method::POST, "/portfolio/orders", &[], Some(&body), Access::Private)
            .await?;
        let response: RawOrderResponse = serde_json::from_value(value)?;

        response
            .order
            .map(Order::from)
            .ok_or_else(|| KalshiError::OrderRejected("no order in response".to_string()))
    }

    /// Cancels an order.
    ///
    /// # Errors
    /// Returns error if the order cannot be cancelled.
    pub async fn cancel_order(&self, order_id: &str) -> Result<()> {
        let order_id = Self::validate_identifier(order_id)?;
        let endpoint = format!("/portfolio/orders/{order_id}");

        match self
            .request(Method::DELETE, &endpoint, &[], None, Access::Private)
            .await
        {
            Ok(_) => {
                tracing::info!(order_id, "order cancelled");
                Ok(())
            }
            Err(err) if err.status_code() == Some(404) => Err(KalshiError::order_not_found(order_id)),
            Err(err) => Err(err),
        }
    }

    /// Gets order status.
    ///
    /// # Errors
    /// Returns error if the order is not found.
    pub async fn get_order(&self, order_id: &str) -> Result<Order> {
        let order_id = Self::validate_identifier(order_id)?;
        let endpoint = format!("/portfolio/orders/{order_id}");

        let response: RawOrderResponse = self.get(&endpoint, &[], Access::Private).await?;

        response
            .order
            .map(Order::from)
            .ok_or_else(|| KalshiError::order_not_found(order_id))
    }

    /// Lists the account's orders, optionally for one market.
    ///
    /// # Errors
    /// Returns error if credentials are missing or the API call fails.
    pub async fn get_orders(&self, ticker: Option<&str>) -> Result<Vec<Order>> {
        let query = ticker_query(ticker)?;
        let response: RawOrdersResponse = self
            .get("/portfolio/orders", &query, Access::Private)
            .await?;

        Ok(response
            .orders
            .unwrap_or_default()
            .into_iter()
            .map(Order::from)
            .collect())
    }
}

fn candle_query(start_ts: i64, end_ts: i64, interval: CandleInterval) -> Vec<(String, String)> {
    vec![
        ("start_ts".to_string(), start_ts.to_string()),
        ("end_ts".to_string(), end_ts.to_string()),
        ("period_interval".to_string(), interval.minutes().to_string()),
    ]
}

fn ticker_query(ticker: Option<&str>) -> Result<Vec<(String, String)>> {
    match ticker {
        Some(t) => Ok(vec![(
            "ticker".to_string(),
            KalshiClient::validate_ticker(t)?.to_string(),
        )]),
        None => Ok(Vec::new()),
    }
}
