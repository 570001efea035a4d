//! Ticker to side to price map used for marking positions.

use kalshi_edge_exchange::{Market, Orderbook, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Latest price per market and side, in cents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketPrices(HashMap<String, HashMap<Side, Decimal>>);

impl MarketPrices {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one price.
    pub fn insert(&mut self, ticker: impl Into<String>, side: Side, price: Decimal) {
        self.0.entry(ticker.into()).or_default().insert(side, price);
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with_price(mut self, ticker: impl Into<String>, side: Side, price: Decimal) -> Self {
        self.insert(ticker, side, price);
        self
    }

    /// Records the best bid of each non-empty side of a book.
    pub fn insert_orderbook(&mut self, book: &Orderbook) {
        for side in [Side::Yes, Side::No] {
            if let Some(level) = book.best_bid(side) {
                self.insert(book.ticker.clone(), side, Decimal::from(level.price));
            }
        }
    }

    #[must_use]
    pub fn from_orderbooks<'a>(books: impl IntoIterator<Item = &'a Orderbook>) -> Self {
        let mut prices = Self::new();
        for book in books {
            prices.insert_orderbook(book);
        }
        prices
    }

    /// Uses the quoted yes/no bids from market listings.
    #[must_use]
    pub fn from_markets<'a>(markets: impl IntoIterator<Item = &'a Market>) -> Self {
        let mut prices = Self::new();
        for market in markets {
            if let Some(bid) = market.yes_bid {
                prices.insert(market.ticker.clone(), Side::Yes, bid);
            }
            if let Some(bid) = market.no_bid {
                prices.insert(market.ticker.clone(), Side::No, bid);
            }
        }
        prices
    }

    #[must_use]
    pub fn get(&self, ticker: &str, side: Side) -> Option<Decimal> {
        self.0.get(ticker).and_then(|sides| sides.get(&side)).copied()
    }

    #[must_use]
    pub fn contains_ticker(&self, ticker: &str) -> bool {
        self.0.contains_key(ticker)
    }

    pub fn tickers(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
