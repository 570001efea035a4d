//! Trading signals handed to the portfolio engine.
//!
//! Detection lives outside this crate. Detectors produce [`Opportunity`]
//! values (directly or as JSON) and the engine decides whether and how to
//! trade them.

use chrono::{DateTime, Utc};
use kalshi_edge_exchange::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Kind of market inefficiency a detector found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityType {
    Arbitrage,
    WideSpread,
    Mispricing,
    MomentumFade,
    CorrelationBreak,
    Imbalance,
}

impl OpportunityType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arbitrage => "arbitrage",
            Self::WideSpread => "wide_spread",
            Self::Mispricing => "mispricing",
            Self::MomentumFade => "momentum_fade",
            Self::CorrelationBreak => "correlation_break",
            Self::Imbalance => "imbalance",
        }
    }
}

impl fmt::Display for OpportunityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detector confidence. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl Confidence {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How strict the detector's thresholds were. Ordered `Soft < Hard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strength {
    /// Relaxed thresholds: more signals, lower quality.
    Soft,
    /// Strict thresholds: fewer signals, higher quality.
    Hard,
}

impl Strength {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Strength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate trade produced by an external detector.
///
/// Prices in `current_prices` are keyed `"{ticker}_{side}_bid"` and given
/// in cents. `additional_data` is free-form; the engine only reads the
/// optional `suggested_side` entry (`"yes"` or `"no"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub opportunity_type: OpportunityType,
    pub confidence: Confidence,
    pub strength: Strength,
    pub timestamp: DateTime<Utc>,
    pub market_tickers: Vec<String>,
    #[serde(default)]
    pub market_titles: Vec<String>,
    #[serde(default)]
    pub market_urls: Vec<String>,
    #[serde(default)]
    pub current_prices: HashMap<String, Decimal>,
    pub estimated_edge_cents: Decimal,
    pub estimated_edge_percent: Decimal,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub additional_data: Map<String, Value>,
}

/// Builds the `current_prices` key for a ticker and side.
#[must_use]
pub fn bid_price_key(ticker: &str, side: Side) -> String {
    format!("{ticker}_{side}_bid")
}

impl Opportunity {
    /// Creates an opportunity on a single market with zero edge and no prices.
    #[must_use]
    pub fn new(
        opportunity_type: OpportunityType,
        confidence: Confidence,
        strength: Strength,
        ticker: impl Into<String>,
    ) -> Self {
        Self {
            opportunity_type,
            confidence,
            strength,
            timestamp: Utc::now(),
            market_tickers: vec![ticker.into()],
            market_titles: Vec::new(),
            market_urls: Vec::new(),
            current_prices: HashMap::new(),
            estimated_edge_cents: Decimal::ZERO,
            estimated_edge_percent: Decimal::ZERO,
            reasoning: String::new(),
            additional_data: Map::new(),
        }
    }

    #[must_use]
    pub fn with_edge(mut self, cents: Decimal, percent: Decimal) -> Self {
        self.estimated_edge_cents = cents;
        self.estimated_edge_percent = percent;
        self
    }

    /// Records the bid for `side` on the primary market.
    #[must_use]
    pub fn with_bid(mut self, side: Side, price: Decimal) -> Self {
        if let Some(ticker) = self.market_tickers.first() {
            let key = bid_price_key(ticker, side);
            self.current_prices.insert(key, price);
        }
        self
    }

    #[must_use]
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    #[must_use]
    pub fn with_suggested_side(mut self, side: Side) -> Self {
        self.additional_data
            .insert("suggested_side".to_string(), Value::String(side.to_string()));
        self
    }

    /// Returns the first market ticker, the one the engine trades.
    #[must_use]
    pub fn primary_ticker(&self) -> Option<&str> {
        self.market_tickers.first().map(String::as_str)
    }

    /// Looks up the quoted bid for a ticker and side.
    #[must_use]
    pub fn bid_price(&self, ticker: &str, side: Side) -> Option<Decimal> {
        self.current_prices.get(&bid_price_key(ticker, side)).copied()
    }

    /// Returns the side hinted by the detector, if any.
    ///
    /// Any value other than `"yes"` counts as a NO hint.
    #[must_use]
    pub fn suggested_side(&self) -> Option<Side> {
        self.additional_data.get("suggested_side").map(|value| {
            if value.as_str() == Some("yes") {
                Side::Yes
            } else {
                Side::No
            }
        })
    }
}
