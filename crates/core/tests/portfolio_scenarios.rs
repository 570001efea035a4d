//! End-to-end portfolio scenarios.
//!
//! These tests drive the trade manager the way the paper-trading loop does:
//! - Round-trip trades and cash accounting
//! - Stop loss and take profit exits from live prices
//! - One position per market
//! - Cash and sizing limits
//! - Marking from exchange orderbooks

use kalshi_edge_core::{
    Confidence, MarketPrices, Opportunity, OpportunityType, PositionStatus, SizingMethod,
    Strength, TradeManager, TradeManagerConfig, TradeRecord,
};
use kalshi_edge_exchange::{Orderbook, PriceLevel, Side};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// =============================================================================
// Helper Functions
// =============================================================================

fn signal(ticker: &str) -> Opportunity {
    Opportunity::new(
        OpportunityType::WideSpread,
        Confidence::High,
        Strength::Hard,
        ticker,
    )
    .with_edge(dec!(10), dec!(15))
    .with_bid(Side::Yes, dec!(50))
    .with_bid(Side::No, dec!(55))
    .with_reasoning("spread wider than 10 cents")
}

fn manager_with(config: TradeManagerConfig) -> TradeManager {
    TradeManager::new(config).expect("valid config")
}

// =============================================================================
// Round Trip
// =============================================================================

#[test]
fn test_round_trip_trade_accounting() {
    let mut manager = TradeManager::default();
    assert_eq!(manager.cash(), dec!(10000));

    let position = manager
        .execute_trade(&signal("KXTEST-1"), Some(Side::Yes), Some(dec!(50)), Some(10))
        .expect("trade executes");

    assert_eq!(manager.cash(), dec!(9500));
    assert_eq!(manager.open_position_count(), 1);
    assert_eq!(position.cost_basis(), dec!(500));
    assert_eq!(position.status(), PositionStatus::Open);

    assert!(manager.close_position(position.position_id(), dec!(60), "Manual close"));

    assert_eq!(manager.cash(), dec!(10100));
    assert_eq!(manager.open_position_count(), 0);
    assert_eq!(manager.closed_positions().len(), 1);
    assert_eq!(manager.closed_positions()[0].realized_pnl(), dec!(100));
    assert_eq!(manager.total_realized_pnl(), dec!(100));
    assert_eq!(manager.portfolio_value(), dec!(10100));
    assert_eq!(manager.return_percent(), dec!(1));

    let log = manager.trade_log();
    assert_eq!(log.len(), 2);
    assert!(matches!(log[0], TradeRecord::Open { cost, .. } if cost == dec!(500)));
    match &log[1] {
        TradeRecord::Close {
            proceeds,
            pnl,
            cash_after,
            ..
        } => {
            assert_eq!(*proceeds, dec!(600));
            assert_eq!(*pnl, dec!(100));
            assert_eq!(*cash_after, dec!(10100));
        }
        TradeRecord::Open { .. } => panic!("expected close record"),
    }
}

#[test]
fn test_cash_plus_cost_basis_is_conserved() {
    let mut manager = TradeManager::default();
    for (i, ticker) in ["A", "B", "C"].iter().enumerate() {
        let price = Decimal::from(30 + 10 * i as i64);
        manager
            .execute_trade(&signal(ticker), Some(Side::Yes), Some(price), Some(5))
            .expect("trade executes");
    }

    assert_eq!(manager.cash() + manager.capital_at_risk(), dec!(10000));
    assert_eq!(manager.portfolio_value(), dec!(10000));
}

// =============================================================================
// Stops and Targets
// =============================================================================

#[test]
fn test_stop_loss_closes_position() {
    let mut manager = manager_with(TradeManagerConfig::default().with_stops(dec!(20), dec!(50)));
    let position = manager
        .execute_trade(&signal("KXTEST-1"), Some(Side::Yes), Some(dec!(50)), Some(10))
        .expect("trade executes");

    let prices = MarketPrices::new().with_price("KXTEST-1", Side::Yes, dec!(39));
    let closed = manager.check_stops_and_targets(&prices);

    assert_eq!(closed, vec![position.position_id().to_string()]);
    assert_eq!(manager.open_position_count(), 0);

    let exited = &manager.closed_positions()[0];
    assert_eq!(exited.exit_price(), Some(dec!(39)));
    assert!(exited
        .exit_reasoning()
        .unwrap_or_default()
        .starts_with("Stop loss triggered"));
    assert_eq!(exited.realized_pnl(), dec!(-110));
    assert_eq!(manager.cash(), dec!(9890));
}

#[test]
fn test_price_inside_band_keeps_position_open() {
    let mut manager = TradeManager::default();
    manager
        .execute_trade(&signal("KXTEST-1"), Some(Side::Yes), Some(dec!(50)), Some(10))
        .expect("trade executes");

    let prices = MarketPrices::new().with_price("KXTEST-1", Side::Yes, dec!(45));
    assert!(manager.check_stops_and_targets(&prices).is_empty());

    let open: Vec<_> = manager.open_positions().collect();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].current_price(), Some(dec!(45)));
    assert_eq!(manager.total_unrealized_pnl(), dec!(-50));
}

#[test]
fn test_stop_at_exact_threshold_triggers() {
    let mut manager = TradeManager::default();
    manager
        .execute_trade(&signal("KXTEST-1"), Some(Side::No), Some(dec!(50)), Some(2))
        .expect("trade executes");

    // exactly -20%
    let prices = MarketPrices::new().with_price("KXTEST-1", Side::No, dec!(40));
    assert_eq!(manager.check_stops_and_targets(&prices).len(), 1);
}

#[test]
fn test_out_of_range_exit_price_leaves_position_open() {
    let mut manager = manager_with(TradeManagerConfig::default().with_initial_capital(dec!(1000)));
    let position = manager
        .execute_trade(&signal("KXTEST-1"), Some(Side::Yes), Some(dec!(50)), Some(10))
        .expect("trade executes");
    assert_eq!(manager.cash(), dec!(500));

    assert!(!manager.close_position(position.position_id(), dec!(-200), "Manual close"));
    assert!(!manager.close_position(position.position_id(), dec!(101), "Manual close"));

    assert_eq!(manager.cash(), dec!(500));
    assert_eq!(manager.open_position_count(), 1);
    assert!(manager.closed_positions().is_empty());
    assert_eq!(manager.trade_log().len(), 1);

    // settlement bounds are valid exits
    assert!(manager.close_position(position.position_id(), Decimal::ZERO, "Settled NO"));
    assert_eq!(manager.cash(), dec!(500));
    assert!(manager.cash() >= Decimal::ZERO);
}

#[test]
fn test_negative_mark_never_drives_cash_negative() {
    let mut manager = manager_with(TradeManagerConfig::default().with_initial_capital(dec!(1000)));
    manager
        .execute_trade(&signal("KXTEST-1"), Some(Side::Yes), Some(dec!(50)), Some(10))
        .expect("trade executes");

    let prices = MarketPrices::new().with_price("KXTEST-1", Side::Yes, dec!(-200));
    assert!(manager.check_stops_and_targets(&prices).is_empty());
    assert_eq!(manager.open_position_count(), 1);
    assert_eq!(manager.cash(), dec!(500));

    let open: Vec<_> = manager.open_positions().collect();
    assert_eq!(open[0].current_price(), Some(dec!(50)));
}

#[test]
fn test_entry_price_above_one_dollar_rejected() {
    let mut manager = TradeManager::default();

    assert!(manager
        .execute_trade(&signal("KXTEST-1"), Some(Side::Yes), Some(dec!(101)), Some(1))
        .is_none());
    assert!(manager
        .execute_trade(&signal("KXTEST-1"), Some(Side::Yes), Some(Decimal::ZERO), Some(1))
        .is_none());
    assert_eq!(manager.cash(), dec!(10000));
    assert!(manager.trade_log().is_empty());

    assert!(manager
        .execute_trade(&signal("KXTEST-1"), Some(Side::Yes), Some(dec!(100)), Some(1))
        .is_some());
}

// =============================================================================
// Gates
// =============================================================================

#[test]
fn test_one_position_per_market() {
    let mut manager = TradeManager::default();
    manager
        .execute_trade(&signal("KXTEST-1"), None, None, None)
        .expect("trade executes");

    let decision = manager.should_trade(&signal("KXTEST-1"));
    assert!(!decision.allow);
    assert_eq!(decision.reason, "Already have position in KXTEST-1");

    assert!(manager.should_trade(&signal("KXTEST-2")).allow);
}

#[test]
fn test_insufficient_cash_rejected() {
    let config = TradeManagerConfig::default()
        .with_initial_capital(dec!(400))
        .with_sizing(SizingMethod::Fixed, dec!(500), dec!(1000));
    let mut manager = manager_with(config);

    let decision = manager.should_trade(&signal("KXTEST-1"));
    assert!(!decision.allow);
    assert!(decision.reason.starts_with("Insufficient cash"));

    assert!(manager
        .execute_trade(&signal("KXTEST-1"), Some(Side::Yes), Some(dec!(50)), Some(10))
        .is_none());
    assert_eq!(manager.cash(), dec!(400));
    assert!(manager.trade_log().is_empty());
}

#[test]
fn test_confidence_scaled_sizing_drives_quantity() {
    let config = TradeManagerConfig::default().with_sizing(
        SizingMethod::ConfidenceScaled,
        dec!(500),
        dec!(1000),
    );
    let mut manager = manager_with(config);

    let mut opp = signal("KXTEST-1");
    opp.confidence = Confidence::Medium;

    // 500 * 0.75 = 375 at 50 cents
    let position = manager
        .execute_trade(&opp, Some(Side::Yes), None, None)
        .expect("trade executes");
    assert_eq!(position.quantity(), 7);
    assert_eq!(manager.cash(), dec!(9650));
}

// =============================================================================
// Exchange Data
// =============================================================================

#[test]
fn test_mark_from_orderbook_best_bid() {
    let mut manager = TradeManager::default();
    manager
        .execute_trade(&signal("KXTEST-1"), Some(Side::No), Some(dec!(40)), Some(10))
        .expect("trade executes");

    let book = Orderbook::new(
        "KXTEST-1",
        vec![PriceLevel::new(30, 100), PriceLevel::new(35, 20)],
        vec![PriceLevel::new(38, 50), PriceLevel::new(44, 10)],
    );
    manager.update_position_prices(&MarketPrices::from_orderbooks([&book]));

    assert_eq!(manager.total_position_value(), dec!(440));
    assert_eq!(manager.total_unrealized_pnl(), dec!(40));
}

#[test]
fn test_summary_reflects_state() {
    let mut manager = TradeManager::default();
    let a = manager
        .execute_trade(&signal("A"), Some(Side::Yes), Some(dec!(50)), Some(10))
        .expect("trade executes");
    manager
        .execute_trade(&signal("B"), Some(Side::Yes), Some(dec!(20)), Some(10))
        .expect("trade executes");
    manager.close_position(a.position_id(), dec!(45), "Manual close");

    let summary = manager.summary();
    assert_eq!(summary.cash, dec!(10000) - dec!(500) - dec!(200) + dec!(450));
    assert_eq!(summary.realized_pnl, dec!(-50));
    assert_eq!(summary.num_open_positions, 1);
    assert_eq!(summary.num_closed_positions, 1);
    assert_eq!(summary.num_trades, 3);
    assert_eq!(summary.portfolio_value, dec!(9950));
}
