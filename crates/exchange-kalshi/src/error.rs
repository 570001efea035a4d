//! Error types for the Kalshi exchange client.
//!
//! Errors fall into three groups:
//! - configuration problems (bad key material, missing credentials, invalid
//!   request parameters) which are raised before any network call and are
//!   never retried,
//! - transient transport failures (429, 5xx gateway errors, connection
//!   problems) which the client retries with backoff,
//! - permanent API failures (other 4xx) which are surfaced immediately.

use thiserror::Error;

/// HTTP status codes the client treats as transient.
pub const TRANSIENT_STATUS_CODES: [u16; 5] = [429, 500, 502, 503, 504];

/// Errors that can occur when interacting with Kalshi.
#[derive(Debug, Error)]
pub enum KalshiError {
    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An authenticated endpoint was called on a client built without credentials.
    #[error("configuration error: {endpoint} requires API credentials but none were supplied")]
    MissingCredentials {
        /// Endpoint that required authentication.
        endpoint: String,
    },

    /// Private key could not be parsed.
    #[error("invalid private key: {0}")]
    InvalidKey(String),

    /// RSA signing error.
    #[error("RSA signing error: {0}")]
    Signing(String),

    /// Request parameters rejected client-side, before the network call.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// API request failed with a non-success status.
    #[error("API error on {endpoint}: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Endpoint path that failed.
        endpoint: String,
        /// Error body returned by the API.
        message: String,
    },

    /// Rate limit exceeded (HTTP 429).
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Transient failures persisted past the retry budget.
    #[error("transport failure on {endpoint} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Endpoint path that failed.
        endpoint: String,
        /// Number of attempts made.
        attempts: u32,
        /// Description of the final failure.
        last_error: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Market not found.
    #[error("market not found: {ticker}")]
    MarketNotFound {
        /// The market ticker that was not found.
        ticker: String,
    },

    /// Order not found.
    #[error("order not found: {order_id}")]
    OrderNotFound {
        /// The order ID that was not found.
        order_id: String,
    },

    /// Order rejected by exchange.
    #[error("order rejected: {0}")]
    OrderRejected(String),
}

impl KalshiError {
    /// Creates an API error from status code, endpoint and message.
    pub fn api(status_code: u16, endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates a rate limit error.
    pub fn rate_limit(retry_after_secs: u64) -> Self {
        Self::RateLimit { retry_after_secs }
    }

    /// Creates a missing credentials error.
    pub fn missing_credentials(endpoint: impl Into<String>) -> Self {
        Self::MissingCredentials {
            endpoint: endpoint.into(),
        }
    }

    /// Creates a market not found error.
    pub fn market_not_found(ticker: impl Into<String>) -> Self {
        Self::MarketNotFound {
            ticker: ticker.into(),
        }
    }

    /// Creates an order not found error.
    pub fn order_not_found(order_id: impl Into<String>) -> Self {
        Self::OrderNotFound {
            order_id: order_id.into(),
        }
    }

    /// Returns true for configuration-class errors that must never be retried.
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_)
                | Self::MissingCredentials { .. }
                | Self::InvalidKey(_)
                | Self::InvalidRequest(_)
        )
    }

    /// Returns true if the error indicates the request should be retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. } => true,
            Self::Api { status_code, .. } => TRANSIENT_STATUS_CODES.contains(status_code),
            _ => false,
        }
    }

    /// Returns the server-suggested retry delay in seconds, if any.
    #[must_use]
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Self::RateLimit { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Returns the HTTP status code, if the error came from a response.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status_code, .. } => Some(*status_code),
            Self::RateLimit { .. } => Some(429),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for KalshiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for KalshiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for Kalshi operations.
pub type Result<T> = std::result::Result<T, KalshiError>;
