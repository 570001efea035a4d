//! Paper portfolio engine.
//!
//! [`TradeManager`] owns the cash balance and every position. It gates
//! incoming [`Opportunity`] signals through the configured risk checks,
//! opens positions sized by the configured [`PositionSizer`], marks them to
//! market and closes them on stop loss, take profit or request.
//!
//! Rejections are routine and never errors: `should_trade` returns a
//! [`TradeDecision`], `execute_trade` returns `None` and `close_position`
//! returns `false`.

use crate::config::TradeManagerConfig;
use crate::market_prices::MarketPrices;
use crate::opportunity::{Opportunity, OpportunityType};
use crate::position::Position;
use crate::sizing::PositionSizer;
use anyhow::Result;
use chrono::{DateTime, Utc};
use kalshi_edge_exchange::Side;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Entry price used when a signal carries no bid for the chosen side.
pub const DEFAULT_ENTRY_PRICE_CENTS: i64 = 50;

/// Contracts settle at 0 or 100 cents; no valid price lies outside that.
pub const MAX_PRICE_CENTS: i64 = 100;

fn in_price_range(price: Decimal) -> bool {
    price >= Decimal::ZERO && price <= Decimal::from(MAX_PRICE_CENTS)
}

/// Outcome of [`TradeManager::should_trade`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeDecision {
    pub allow: bool,
    pub reason: String,
}

impl TradeDecision {
    #[must_use]
    pub fn approve() -> Self {
        Self {
            allow: true,
            reason: "All checks passed".to_string(),
        }
    }

    #[must_use]
    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            allow: false,
            reason: reason.into(),
        }
    }
}

/// Append-only trade log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "UPPERCASE")]
pub enum TradeRecord {
    Open {
        timestamp: DateTime<Utc>,
        position_id: String,
        ticker: String,
        side: Side,
        price: Decimal,
        quantity: u32,
        cost: Decimal,
        cash_after: Decimal,
    },
    Close {
        timestamp: DateTime<Utc>,
        position_id: String,
        ticker: String,
        side: Side,
        exit_price: Decimal,
        quantity: u32,
        proceeds: Decimal,
        pnl: Decimal,
        reason: String,
        cash_after: Decimal,
    },
}

impl TradeRecord {
    #[must_use]
    pub fn position_id(&self) -> &str {
        match self {
            Self::Open { position_id, .. } | Self::Close { position_id, .. } => position_id,
        }
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Open { timestamp, .. } | Self::Close { timestamp, .. } => *timestamp,
        }
    }

    #[must_use]
    pub fn cash_after(&self) -> Decimal {
        match self {
            Self::Open { cash_after, .. } | Self::Close { cash_after, .. } => *cash_after,
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open { .. })
    }
}

/// Point-in-time portfolio totals. Money in cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub timestamp: DateTime<Utc>,
    pub cash: Decimal,
    pub position_value: Decimal,
    pub portfolio_value: Decimal,
    pub initial_capital: Decimal,
    pub total_pnl: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub return_percent: Decimal,
    pub capital_at_risk: Decimal,
    pub num_open_positions: usize,
    pub num_closed_positions: usize,
    pub num_trades: usize,
}

/// Statistics over closed positions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub closed_trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// Fraction of closed trades with positive P&L (0.0-1.0).
    pub win_rate: Decimal,
    pub average_win: Decimal,
    pub average_loss: Decimal,
    pub largest_win: Decimal,
    pub largest_loss: Decimal,
    /// Gross profit over gross loss. `None` when there are no losses.
    pub profit_factor: Option<Decimal>,
}

/// In-memory portfolio: cash, open positions, closed log and trade log.
#[derive(Debug)]
pub struct TradeManager {
    config: TradeManagerConfig,
    sizer: PositionSizer,
    cash: Decimal,
    positions: BTreeMap<String, Position>,
    closed_positions: Vec<Position>,
    trade_log: Vec<TradeRecord>,
    position_counter: u64,
}

impl TradeManager {
    /// Creates a manager holding `initial_capital` in cash.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration fails validation.
    pub fn new(config: TradeManagerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: TradeManagerConfig) -> Self {
        info!(
            capital = %format_dollars(config.initial_capital),
            sizing = ?config.sizing_method,
            "TradeManager initialized"
        );

        Self {
            sizer: config.sizer(),
            cash: config.initial_capital,
            config,
            positions: BTreeMap::new(),
            closed_positions: Vec::new(),
            trade_log: Vec::new(),
            position_counter: 0,
        }
    }

    // ==================== Accessors ====================

    #[must_use]
    pub fn config(&self) -> &TradeManagerConfig {
        &self.config
    }

    #[must_use]
    pub fn cash(&self) -> Decimal {
        self.cash
    }

    /// Open positions ordered by id.
    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    #[must_use]
    pub fn open_position_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn position(&self, position_id: &str) -> Option<&Position> {
        self.positions.get(position_id)
    }

    /// Open position on a market, if any.
    #[must_use]
    pub fn position_for_ticker(&self, ticker: &str) -> Option<&Position> {
        self.positions.values().find(|p| p.market_ticker == ticker)
    }

    #[must_use]
    pub fn closed_positions(&self) -> &[Position] {
        &self.closed_positions
    }

    #[must_use]
    pub fn trade_log(&self) -> &[TradeRecord] {
        &self.trade_log
    }

    // ==================== Portfolio Totals ====================

    #[must_use]
    pub fn total_position_value(&self) -> Decimal {
        self.positions.values().map(Position::current_value).sum()
    }

    #[must_use]
    pub fn total_unrealized_pnl(&self) -> Decimal {
        self.positions.values().map(Position::unrealized_pnl).sum()
    }

    #[must_use]
    pub fn total_realized_pnl(&self) -> Decimal {
        self.closed_positions.iter().map(|p| p.realized_pnl).sum()
    }

    #[must_use]
    pub fn total_pnl(&self) -> Decimal {
        self.total_realized_pnl() + self.total_unrealized_pnl()
    }

    /// Cash plus marked value of open positions.
    #[must_use]
    pub fn portfolio_value(&self) -> Decimal {
        self.cash + self.total_position_value()
    }

    /// Return on initial capital in percent. Zero when capital is zero.
    #[must_use]
    pub fn return_percent(&self) -> Decimal {
        let initial = self.config.initial_capital;
        if initial.is_zero() {
            return Decimal::ZERO;
        }
        (self.portfolio_value() - initial) / initial * Decimal::ONE_HUNDRED
    }

    /// Cost basis of all open positions.
    #[must_use]
    pub fn capital_at_risk(&self) -> Decimal {
        self.positions.values().map(Position::cost_basis).sum()
    }

    /// Position value, in cents, the sizing policy assigns to a signal.
    #[must_use]
    pub fn position_size(&self, opportunity: &Opportunity) -> Decimal {
        self.sizer.size(opportunity, self.portfolio_value())
    }

    // ==================== Evaluation ====================

    /// Runs the pre-trade checks in order and reports the first failure.
    #[must_use]
    pub fn should_trade(&self, opportunity: &Opportunity) -> TradeDecision {
        let decision = self.evaluate(opportunity);
        if !decision.allow {
            debug!(
                ticker = opportunity.primary_ticker().unwrap_or_default(),
                reason = %decision.reason,
                "Opportunity rejected"
            );
        }
        decision
    }

    fn evaluate(&self, opportunity: &Opportunity) -> TradeDecision {
        let config = &self.config;

        if self.positions.len() >= config.max_positions {
            return TradeDecision::reject(format!("At max positions ({})", config.max_positions));
        }

        if let Some(min) = config.min_confidence {
            if opportunity.confidence < min {
                return TradeDecision::reject(format!(
                    "Confidence too low ({})",
                    opportunity.confidence
                ));
            }
        }

        if let Some(min) = config.min_strength {
            if opportunity.strength < min {
                return TradeDecision::reject(format!(
                    "Strength too low ({})",
                    opportunity.strength
                ));
            }
        }

        if opportunity.estimated_edge_cents < config.min_edge_cents {
            return TradeDecision::reject(format!(
                "Edge too small ({:.1}¢ < {}¢)",
                opportunity.estimated_edge_cents, config.min_edge_cents
            ));
        }

        if opportunity.estimated_edge_percent < config.min_edge_percent {
            return TradeDecision::reject(format!(
                "Edge % too small ({:.1}% < {}%)",
                opportunity.estimated_edge_percent, config.min_edge_percent
            ));
        }

        let size = self.position_size(opportunity);
        if size > self.cash {
            return TradeDecision::reject(format!(
                "Insufficient cash (need {}, have {})",
                format_dollars(size),
                format_dollars(self.cash)
            ));
        }

        let Some(ticker) = opportunity.primary_ticker() else {
            return TradeDecision::reject("No market ticker in opportunity");
        };
        if self.position_for_ticker(ticker).is_some() {
            return TradeDecision::reject(format!("Already have position in {ticker}"));
        }

        TradeDecision::approve()
    }

    /// Picks a side from the opportunity type.
    ///
    /// Wide spreads take the cheaper bid (ties go to NO), mispricings follow
    /// the detector's `suggested_side` or default to YES, momentum fades and
    /// imbalances fade the move with NO, everything else buys YES.
    #[must_use]
    pub fn determine_side(&self, opportunity: &Opportunity) -> Side {
        match opportunity.opportunity_type {
            OpportunityType::WideSpread => {
                let default = Decimal::from(DEFAULT_ENTRY_PRICE_CENTS);
                let ticker = opportunity.primary_ticker().unwrap_or_default();
                let yes = opportunity.bid_price(ticker, Side::Yes).unwrap_or(default);
                let no = opportunity.bid_price(ticker, Side::No).unwrap_or(default);
                if yes < no {
                    Side::Yes
                } else {
                    Side::No
                }
            }
            OpportunityType::Mispricing => opportunity.suggested_side().unwrap_or(Side::Yes),
            OpportunityType::MomentumFade | OpportunityType::Imbalance => Side::No,
            OpportunityType::Arbitrage | OpportunityType::CorrelationBreak => Side::Yes,
        }
    }

    // ==================== Execution ====================

    /// Opens a position on the opportunity's first market.
    ///
    /// Omitted arguments are resolved from the signal: the side from
    /// [`determine_side`](Self::determine_side), the price from the quoted
    /// bid for that side (50¢ if absent) and the quantity from the sizing
    /// policy, floored to whole contracts. Returns `None` when there is no
    /// ticker, the price lies outside 1..=100 cents, the quantity comes out
    /// as zero or the cost exceeds cash.
    pub fn execute_trade(
        &mut self,
        opportunity: &Opportunity,
        side: Option<Side>,
        price: Option<Decimal>,
        quantity: Option<u32>,
    ) -> Option<Position> {
        let side = side.unwrap_or_else(|| self.determine_side(opportunity));

        let Some(ticker) = opportunity.primary_ticker() else {
            warn!("No market ticker in opportunity");
            return None;
        };
        let ticker = ticker.to_string();

        let price = match price {
            Some(price) => price,
            None => opportunity.bid_price(&ticker, side).unwrap_or_else(|| {
                warn!(ticker = %ticker, %side, "No bid in opportunity, using default mid-price");
                Decimal::from(DEFAULT_ENTRY_PRICE_CENTS)
            }),
        };
        if price <= Decimal::ZERO || !in_price_range(price) {
            warn!(ticker = %ticker, %price, "Entry price must be between 1 and 100 cents");
            return None;
        }

        let quantity = match quantity {
            Some(quantity) => quantity,
            None => {
                let size = self.position_size(opportunity);
                (size / price).floor().to_u32().unwrap_or(0)
            }
        };
        if quantity == 0 {
            warn!(ticker = %ticker, %price, "Calculated quantity is 0");
            return None;
        }

        let cost = price * Decimal::from(quantity);
        if cost > self.cash {
            warn!(
                ticker = %ticker,
                need = %format_dollars(cost),
                have = %format_dollars(self.cash),
                "Insufficient cash"
            );
            return None;
        }

        self.position_counter += 1;
        let position_id = format!("POS_{:04}", self.position_counter);
        let position = Position::open(
            position_id.clone(),
            ticker.clone(),
            side,
            price,
            quantity,
            opportunity.reasoning.clone(),
        )
        .with_origin(opportunity);

        self.cash -= cost;
        self.positions.insert(position_id.clone(), position.clone());
        self.trade_log.push(TradeRecord::Open {
            timestamp: Utc::now(),
            position_id: position_id.clone(),
            ticker: ticker.clone(),
            side,
            price,
            quantity,
            cost,
            cash_after: self.cash,
        });

        info!(
            position_id = %position_id,
            ticker = %ticker,
            side = %side.as_api_str().to_uppercase(),
            quantity,
            price = %price,
            cost = %format_dollars(cost),
            cash = %format_dollars(self.cash),
            "TRADE EXECUTED"
        );

        Some(position)
    }

    /// Closes an open position at `exit_price` and credits the proceeds.
    ///
    /// Returns `false` for an unknown or already closed id, or an exit price
    /// outside 0..=100 cents. A rejected close leaves cash untouched.
    pub fn close_position(&mut self, position_id: &str, exit_price: Decimal, reason: &str) -> bool {
        if !in_price_range(exit_price) {
            warn!(position_id, %exit_price, "Exit price must be between 0 and 100 cents");
            return false;
        }

        let Some(mut position) = self.positions.remove(position_id) else {
            if self.closed_positions.iter().any(|p| p.position_id == position_id) {
                warn!(position_id, "Position is not open");
            } else {
                warn!(position_id, "Position not found");
            }
            return false;
        };

        let proceeds = position.close(exit_price, reason);
        let pnl = position.realized_pnl;
        self.cash += proceeds;

        self.trade_log.push(TradeRecord::Close {
            timestamp: Utc::now(),
            position_id: position_id.to_string(),
            ticker: position.market_ticker.clone(),
            side: position.side,
            exit_price,
            quantity: position.quantity,
            proceeds,
            pnl,
            reason: reason.to_string(),
            cash_after: self.cash,
        });

        info!(
            position_id,
            ticker = %position.market_ticker,
            side = %position.side.as_api_str().to_uppercase(),
            exit_price = %exit_price,
            pnl = %format_dollars(pnl),
            cash = %format_dollars(self.cash),
            reason,
            "POSITION CLOSED"
        );

        self.closed_positions.push(position);
        true
    }

    // ==================== Mark to Market ====================

    /// Sets the current price of every open position quoted in `prices`.
    pub fn update_position_prices(&mut self, prices: &MarketPrices) {
        for position in self.positions.values_mut() {
            match prices.get(&position.market_ticker, position.side) {
                Some(price) if in_price_range(price) => position.mark(price),
                Some(price) => warn!(
                    position_id = %position.position_id,
                    %price,
                    "Ignoring out-of-range mark"
                ),
                None => {}
            }
        }
    }

    /// Marks positions and closes any that hit the stop loss or take profit.
    ///
    /// The stop is checked before the target. Returns the ids closed, in id
    /// order.
    pub fn check_stops_and_targets(&mut self, prices: &MarketPrices) -> Vec<String> {
        let stop = -self.config.stop_loss_percent;
        let target = self.config.take_profit_percent;

        let mut exits = Vec::new();
        for position in self.positions.values_mut() {
            let Some(price) = prices.get(&position.market_ticker, position.side) else {
                continue;
            };
            if !in_price_range(price) {
                warn!(position_id = %position.position_id, %price, "Ignoring out-of-range mark");
                continue;
            }
            position.mark(price);

            let change = position.price_change_percent(price);
            if change <= stop {
                exits.push((
                    position.position_id.clone(),
                    price,
                    format!("Stop loss triggered ({change:.1}%)"),
                ));
            } else if change >= target {
                exits.push((
                    position.position_id.clone(),
                    price,
                    format!("Take profit triggered ({change:.1}%)"),
                ));
            }
        }

        exits
            .into_iter()
            .filter_map(|(id, price, reason)| self.close_position(&id, price, &reason).then_some(id))
            .collect()
    }

    // ==================== Reporting ====================

    #[must_use]
    pub fn summary(&self) -> PortfolioSummary {
        PortfolioSummary {
            timestamp: Utc::now(),
            cash: self.cash,
            position_value: self.total_position_value(),
            portfolio_value: self.portfolio_value(),
            initial_capital: self.config.initial_capital,
            total_pnl: self.total_pnl(),
            realized_pnl: self.total_realized_pnl(),
            unrealized_pnl: self.total_unrealized_pnl(),
            return_percent: self.return_percent(),
            capital_at_risk: self.capital_at_risk(),
            num_open_positions: self.positions.len(),
            num_closed_positions: self.closed_positions.len(),
            num_trades: self.trade_log.len(),
        }
    }

    #[must_use]
    pub fn performance(&self) -> PerformanceStats {
        let closed = self.closed_positions.len();
        if closed == 0 {
            return PerformanceStats::default();
        }

        let wins: Vec<Decimal> = self
            .closed_positions
            .iter()
            .map(|p| p.realized_pnl)
            .filter(|pnl| *pnl > Decimal::ZERO)
            .collect();
        let losses: Vec<Decimal> = self
            .closed_positions
            .iter()
            .map(|p| p.realized_pnl)
            .filter(|pnl| *pnl < Decimal::ZERO)
            .collect();

        let gross_profit: Decimal = wins.iter().sum();
        let gross_loss: Decimal = losses.iter().map(|l| l.abs()).sum();

        PerformanceStats {
            closed_trades: closed,
            wins: wins.len(),
            losses: losses.len(),
            win_rate: Decimal::from(wins.len()) / Decimal::from(closed),
            average_win: average(&wins),
            average_loss: average(&losses),
            largest_win: wins.iter().copied().max().unwrap_or_default(),
            largest_loss: losses.iter().copied().min().unwrap_or_default(),
            profit_factor: (!gross_loss.is_zero()).then(|| gross_profit / gross_loss),
        }
    }
}

impl Default for TradeManager {
    fn default() -> Self {
        Self::from_config(TradeManagerConfig::default())
    }
}

fn average(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().sum::<Decimal>() / Decimal::from(values.len())
}

/// Formats cents as dollars, e.g. `$95.00`.
#[must_use]
pub fn format_dollars(cents: Decimal) -> String {
    let dollars = cents / Decimal::ONE_HUNDRED;
    if dollars < Decimal::ZERO {
        format!("-${:.2}", dollars.abs())
    } else {
        format!("${dollars:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opportunity::{Confidence, Strength};
    use crate::sizing::SizingMethod;
    use rust_decimal_macros::dec;

    fn opportunity(ticker: &str) -> Opportunity {
        Opportunity::new(OpportunityType::WideSpread, Confidence::High, Strength::Hard, ticker)
            .with_edge(dec!(10), dec!(15))
            .with_bid(Side::Yes, dec!(30))
            .with_bid(Side::No, dec!(60))
            .with_reasoning("wide spread")
    }

    #[test]
    fn test_default_matches_new_with_default_config() {
        let default = TradeManager::default();
        let built = TradeManager::new(TradeManagerConfig::default()).unwrap();

        assert_eq!(default.cash(), built.cash());
        assert_eq!(default.config().max_positions, built.config().max_positions);
        assert_eq!(default.open_position_count(), 0);
        assert!(default.trade_log().is_empty());
    }

    // ==================== should_trade ====================

    #[test]
    fn test_should_trade_passes_all_checks() {
        let manager = TradeManager::default();
        let decision = manager.should_trade(&opportunity("A"));
        assert!(decision.allow);
        assert_eq!(decision.reason, "All checks passed");
    }

    #[test]
    fn test_should_trade_max_positions() {
        let config = TradeManagerConfig::default().with_max_positions(1);
        let mut manager = TradeManager::new(config).unwrap();
        manager.execute_trade(&opportunity("A"), None, None, None).unwrap();

        let decision = manager.should_trade(&opportunity("B"));
        assert!(!decision.allow);
        assert_eq!(decision.reason, "At max positions (1)");
    }

    #[test]
    fn test_should_trade_confidence_and_strength() {
        let config = TradeManagerConfig::default()
            .with_min_confidence(Confidence::Medium)
            .with_min_strength(Strength::Hard);
        let manager = TradeManager::new(config).unwrap();

        let mut low = opportunity("A");
        low.confidence = Confidence::Low;
        assert_eq!(manager.should_trade(&low).reason, "Confidence too low (low)");

        let mut soft = opportunity("A");
        soft.strength = Strength::Soft;
        assert_eq!(manager.should_trade(&soft).reason, "Strength too low (soft)");

        let mut medium = opportunity("A");
        medium.confidence = Confidence::Medium;
        assert!(manager.should_trade(&medium).allow);
    }

    #[test]
    fn test_should_trade_edge_thresholds() {
        let manager = TradeManager::default();

        let thin = opportunity("A").with_edge(dec!(3), dec!(15));
        let decision = manager.should_trade(&thin);
        assert!(!decision.allow);
        assert!(decision.reason.starts_with("Edge too small"));

        let low_pct = opportunity("A").with_edge(dec!(10), dec!(1));
        let decision = manager.should_trade(&low_pct);
        assert!(!decision.allow);
        assert!(decision.reason.starts_with("Edge % too small"));
    }

    #[test]
    fn test_should_trade_checks_run_in_order() {
        let config = TradeManagerConfig::default().with_min_confidence(Confidence::High);
        let manager = TradeManager::new(config).unwrap();

        let mut opp = opportunity("A").with_edge(dec!(1), dec!(1));
        opp.confidence = Confidence::Low;
        assert!(manager.should_trade(&opp).reason.starts_with("Confidence"));
    }

    // ==================== execute_trade ====================

    #[test]
    fn test_execute_trade_resolves_side_price_quantity() {
        let mut manager = TradeManager::default();
        let position = manager.execute_trade(&opportunity("A"), None, None, None).unwrap();

        // yes bid 30 < no bid 60
        assert_eq!(position.side, Side::Yes);
        assert_eq!(position.entry_price, dec!(30));
        // 500 / 30 floored
        assert_eq!(position.quantity, 16);
        assert_eq!(position.position_id, "POS_0001");
        assert_eq!(position.entry_reasoning, "wide spread");
        assert_eq!(position.opportunity_type, Some(OpportunityType::WideSpread));
        assert_eq!(manager.cash(), dec!(10000) - dec!(480));
    }

    #[test]
    fn test_execute_trade_default_price_when_missing() {
        let mut manager = TradeManager::default();
        let opp = Opportunity::new(OpportunityType::Arbitrage, Confidence::High, Strength::Hard, "A")
            .with_edge(dec!(10), dec!(10));

        let position = manager.execute_trade(&opp, None, None, None).unwrap();
        assert_eq!(position.side, Side::Yes);
        assert_eq!(position.entry_price, dec!(50));
        assert_eq!(position.quantity, 10);
    }

    #[test]
    fn test_execute_trade_zero_quantity_rejected() {
        let config = TradeManagerConfig::default().with_sizing(SizingMethod::Fixed, dec!(20), dec!(1000));
        let mut manager = TradeManager::new(config).unwrap();

        assert!(manager
            .execute_trade(&opportunity("A"), Some(Side::No), None, None)
            .is_none());
        assert!(manager.trade_log().is_empty());
        assert_eq!(manager.cash(), dec!(10000));
    }

    #[test]
    fn test_execute_trade_ids_increase() {
        let mut manager = TradeManager::default();
        let a = manager.execute_trade(&opportunity("A"), None, None, None).unwrap();
        let b = manager.execute_trade(&opportunity("B"), None, None, None).unwrap();
        assert_eq!(a.position_id, "POS_0001");
        assert_eq!(b.position_id, "POS_0002");
    }

    #[test]
    fn test_determine_side_heuristics() {
        let manager = TradeManager::default();

        let mut opp = opportunity("A");
        opp.opportunity_type = OpportunityType::MomentumFade;
        assert_eq!(manager.determine_side(&opp), Side::No);

        opp.opportunity_type = OpportunityType::Imbalance;
        assert_eq!(manager.determine_side(&opp), Side::No);

        opp.opportunity_type = OpportunityType::CorrelationBreak;
        assert_eq!(manager.determine_side(&opp), Side::Yes);

        opp.opportunity_type = OpportunityType::Mispricing;
        assert_eq!(manager.determine_side(&opp), Side::Yes);
        let hinted = opp.with_suggested_side(Side::No);
        assert_eq!(manager.determine_side(&hinted), Side::No);

        let equal = opportunity("A")
            .with_bid(Side::Yes, dec!(45))
            .with_bid(Side::No, dec!(45));
        assert_eq!(manager.determine_side(&equal), Side::No);
    }

    // ==================== close_position ====================

    #[test]
    fn test_close_unknown_position() {
        let mut manager = TradeManager::default();
        assert!(!manager.close_position("POS_9999", dec!(50), "Manual close"));
    }

    #[test]
    fn test_close_twice_fails() {
        let mut manager = TradeManager::default();
        let pos = manager.execute_trade(&opportunity("A"), None, None, None).unwrap();

        assert!(manager.close_position(&pos.position_id, dec!(35), "Manual close"));
        let cash = manager.cash();
        assert!(!manager.close_position(&pos.position_id, dec!(35), "Manual close"));
        assert_eq!(manager.cash(), cash);
        assert_eq!(manager.trade_log().len(), 2);
    }

    // ==================== Marking ====================

    #[test]
    fn test_update_position_prices_is_pure_mark() {
        let mut manager = TradeManager::default();
        let pos = manager
            .execute_trade(&opportunity("A"), Some(Side::Yes), Some(dec!(30)), Some(10))
            .unwrap();
        let cash = manager.cash();

        let prices = MarketPrices::new()
            .with_price("A", Side::Yes, dec!(35))
            .with_price("A", Side::No, dec!(62));
        manager.update_position_prices(&prices);

        let marked = manager.position(&pos.position_id).unwrap();
        assert_eq!(marked.current_price, Some(dec!(35)));
        assert_eq!(manager.total_unrealized_pnl(), dec!(50));
        assert_eq!(manager.cash(), cash);
        assert_eq!(manager.trade_log().len(), 1);
    }

    #[test]
    fn test_take_profit_triggers() {
        let mut manager = TradeManager::default();
        let pos = manager
            .execute_trade(&opportunity("A"), Some(Side::No), Some(dec!(40)), Some(10))
            .unwrap();

        let prices = MarketPrices::new().with_price("A", Side::No, dec!(60));
        let closed = manager.check_stops_and_targets(&prices);

        assert_eq!(closed, vec![pos.position_id.clone()]);
        let record = &manager.closed_positions()[0];
        assert_eq!(record.exit_reasoning.as_deref(), Some("Take profit triggered (50.0%)"));
        assert_eq!(record.realized_pnl, dec!(200));
    }

    #[test]
    fn test_stops_ignore_unquoted_positions() {
        let mut manager = TradeManager::default();
        manager
            .execute_trade(&opportunity("A"), Some(Side::Yes), Some(dec!(50)), Some(10))
            .unwrap();

        let other_side = MarketPrices::new().with_price("A", Side::No, dec!(1));
        assert!(manager.check_stops_and_targets(&other_side).is_empty());
        assert_eq!(manager.open_position_count(), 1);
    }

    // ==================== Reporting ====================

    #[test]
    fn test_performance_stats() {
        let mut manager = TradeManager::default();
        let a = manager
            .execute_trade(&opportunity("A"), Some(Side::Yes), Some(dec!(50)), Some(10))
            .unwrap();
        let b = manager
            .execute_trade(&opportunity("B"), Some(Side::Yes), Some(dec!(50)), Some(10))
            .unwrap();
        let c = manager
            .execute_trade(&opportunity("C"), Some(Side::Yes), Some(dec!(50)), Some(10))
            .unwrap();

        manager.close_position(&a.position_id, dec!(60), "win");
        manager.close_position(&b.position_id, dec!(70), "win");
        manager.close_position(&c.position_id, dec!(40), "loss");

        let stats = manager.performance();
        assert_eq!(stats.closed_trades, 3);
        assert_eq!(stats.wins, 2);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.average_win, dec!(150));
        assert_eq!(stats.average_loss, dec!(-100));
        assert_eq!(stats.largest_win, dec!(200));
        assert_eq!(stats.largest_loss, dec!(-100));
        assert_eq!(stats.profit_factor, Some(dec!(3)));
    }

    #[test]
    fn test_performance_empty() {
        let stats = TradeManager::default().performance();
        assert_eq!(stats.closed_trades, 0);
        assert!(stats.profit_factor.is_none());
    }

    #[test]
    fn test_trade_record_serializes_with_action_tag() {
        let mut manager = TradeManager::default();
        let pos = manager
            .execute_trade(&opportunity("A"), Some(Side::Yes), Some(dec!(50)), Some(10))
            .unwrap();
        manager.close_position(&pos.position_id, dec!(60), "Manual close");

        let open = serde_json::to_value(&manager.trade_log()[0]).unwrap();
        let close = serde_json::to_value(&manager.trade_log()[1]).unwrap();
        assert_eq!(open["action"], "OPEN");
        assert_eq!(open["side"], "yes");
        assert_eq!(close["action"], "CLOSE");
        assert_eq!(close["reason"], "Manual close");
    }

    #[test]
    fn test_format_dollars() {
        assert_eq!(format_dollars(dec!(9500)), "$95.00");
        assert_eq!(format_dollars(dec!(-150)), "-$1.50");
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = TradeManagerConfig::default().with_max_positions(0);
        assert!(TradeManager::new(config).is_err());
    }
}
