//! Paper positions and their P&L.
//!
//! Only the trade manager opens, marks and closes positions; callers read
//! them through the accessors below.

use crate::opportunity::{Confidence, Opportunity, OpportunityType, Strength};
use chrono::{DateTime, Utc};
use kalshi_edge_exchange::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Position lifecycle. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Closed,
}

/// A paper position in one market. All prices and P&L are in cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub(crate) position_id: String,
    pub(crate) market_ticker: String,
    pub(crate) side: Side,
    pub(crate) entry_price: Decimal,
    pub(crate) quantity: u32,
    pub(crate) entry_time: DateTime<Utc>,
    pub(crate) entry_reasoning: String,
    pub(crate) status: PositionStatus,
    /// Latest mark. Starts at the entry price.
    pub(crate) current_price: Option<Decimal>,
    pub(crate) exit_price: Option<Decimal>,
    pub(crate) exit_time: Option<DateTime<Utc>>,
    pub(crate) exit_reasoning: Option<String>,
    /// Set when the position closes; zero while open.
    pub(crate) realized_pnl: Decimal,
    pub(crate) opportunity_type: Option<OpportunityType>,
    pub(crate) confidence: Option<Confidence>,
    pub(crate) strength: Option<Strength>,
}

impl Position {
    /// Opens a position marked at its entry price.
    #[must_use]
    pub(crate) fn open(
        position_id: String,
        market_ticker: String,
        side: Side,
        entry_price: Decimal,
        quantity: u32,
        entry_reasoning: String,
    ) -> Self {
        Self {
            position_id,
            market_ticker,
            side,
            entry_price,
            quantity,
            entry_time: Utc::now(),
            entry_reasoning,
            status: PositionStatus::Open,
            current_price: Some(entry_price),
            exit_price: None,
            exit_time: None,
            exit_reasoning: None,
            realized_pnl: Decimal::ZERO,
            opportunity_type: None,
            confidence: None,
            strength: None,
        }
    }

    /// Copies type, confidence and strength from the originating signal.
    #[must_use]
    pub(crate) fn with_origin(mut self, opportunity: &Opportunity) -> Self {
        self.opportunity_type = Some(opportunity.opportunity_type);
        self.confidence = Some(opportunity.confidence);
        self.strength = Some(opportunity.strength);
        self
    }

    #[must_use]
    pub fn position_id(&self) -> &str {
        &self.position_id
    }

    #[must_use]
    pub fn market_ticker(&self) -> &str {
        &self.market_ticker
    }

    #[must_use]
    pub fn side(&self) -> Side {
        self.side
    }

    #[must_use]
    pub fn entry_price(&self) -> Decimal {
        self.entry_price
    }

    #[must_use]
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    #[must_use]
    pub fn entry_time(&self) -> DateTime<Utc> {
        self.entry_time
    }

    #[must_use]
    pub fn entry_reasoning(&self) -> &str {
        &self.entry_reasoning
    }

    #[must_use]
    pub fn status(&self) -> PositionStatus {
        self.status
    }

    /// Latest mark. Starts at the entry price.
    #[must_use]
    pub fn current_price(&self) -> Option<Decimal> {
        self.current_price
    }

    #[must_use]
    pub fn exit_price(&self) -> Option<Decimal> {
        self.exit_price
    }

    #[must_use]
    pub fn exit_time(&self) -> Option<DateTime<Utc>> {
        self.exit_time
    }

    #[must_use]
    pub fn exit_reasoning(&self) -> Option<&str> {
        self.exit_reasoning.as_deref()
    }

    /// Zero while open.
    #[must_use]
    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    #[must_use]
    pub fn opportunity_type(&self) -> Option<OpportunityType> {
        self.opportunity_type
    }

    #[must_use]
    pub fn confidence(&self) -> Option<Confidence> {
        self.confidence
    }

    #[must_use]
    pub fn strength(&self) -> Option<Strength> {
        self.strength
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Entry price times quantity.
    #[must_use]
    pub fn cost_basis(&self) -> Decimal {
        self.entry_price * Decimal::from(self.quantity)
    }

    /// Marked value while open, exit value once closed.
    ///
    /// An open position without a mark is valued at cost.
    #[must_use]
    pub fn current_value(&self) -> Decimal {
        let quantity = Decimal::from(self.quantity);
        match self.status {
            PositionStatus::Closed => self
                .exit_price
                .map_or(Decimal::ZERO, |price| price * quantity),
            PositionStatus::Open => self
                .current_price
                .map_or_else(|| self.cost_basis(), |price| price * quantity),
        }
    }

    #[must_use]
    pub fn unrealized_pnl(&self) -> Decimal {
        match self.status {
            PositionStatus::Open => self.current_value() - self.cost_basis(),
            PositionStatus::Closed => Decimal::ZERO,
        }
    }

    #[must_use]
    pub fn total_pnl(&self) -> Decimal {
        match self.status {
            PositionStatus::Open => self.unrealized_pnl(),
            PositionStatus::Closed => self.realized_pnl,
        }
    }

    /// Total P&L as a percentage of cost basis.
    #[must_use]
    pub fn pnl_percent(&self) -> Decimal {
        let cost = self.cost_basis();
        if cost.is_zero() {
            return Decimal::ZERO;
        }
        self.total_pnl() / cost * Decimal::ONE_HUNDRED
    }

    /// Percentage move of `price` relative to the entry price.
    #[must_use]
    pub fn price_change_percent(&self, price: Decimal) -> Decimal {
        if self.entry_price.is_zero() {
            return Decimal::ZERO;
        }
        (price - self.entry_price) / self.entry_price * Decimal::ONE_HUNDRED
    }

    pub(crate) fn mark(&mut self, price: Decimal) {
        self.current_price = Some(price);
    }

    /// Closes the position and returns the sale proceeds.
    pub(crate) fn close(&mut self, exit_price: Decimal, reason: &str) -> Decimal {
        let proceeds = exit_price * Decimal::from(self.quantity);
        self.realized_pnl = proceeds - self.cost_basis();
        self.status = PositionStatus::Closed;
        self.exit_price = Some(exit_price);
        self.exit_time = Some(Utc::now());
        self.exit_reasoning = Some(reason.to_string());
        proceeds
    }
}
