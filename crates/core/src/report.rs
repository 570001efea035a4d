#![allow(clippy::format_push_string)]
#![allow(clippy::uninlined_format_args)]

use crate::portfolio::{format_dollars, TradeManager};
use rust_decimal::Decimal;

pub struct PortfolioFormatter;

impl PortfolioFormatter {
    #[must_use]
    pub fn format(manager: &TradeManager) -> String {
        let summary = manager.summary();
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                    PORTFOLIO SUMMARY                          \n");
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        // Balances
        output.push_str("Balances\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!(
            "Portfolio Value:       {:>12}\n",
            format_dollars(summary.portfolio_value)
        ));
        output.push_str(&format!(
            "Cash:                  {:>12}\n",
            format_dollars(summary.cash)
        ));
        output.push_str(&format!(
            "Position Value:        {:>12}\n",
            format_dollars(summary.position_value)
        ));
        output.push_str(&format!(
            "Capital At Risk:       {:>12}\n",
            format_dollars(summary.capital_at_risk)
        ));
        output.push('\n');

        // Profit and loss
        output.push_str("Profit & Loss\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!(
            "Total P&L:             {:>12}  ({:.2}%)\n",
            format_dollars(summary.total_pnl),
            summary.return_percent
        ));
        output.push_str(&format!(
            "  Realized:            {:>12}\n",
            format_dollars(summary.realized_pnl)
        ));
        output.push_str(&format!(
            "  Unrealized:          {:>12}\n",
            format_dollars(summary.unrealized_pnl)
        ));
        output.push('\n');

        // Activity
        output.push_str("Activity\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!(
            "Open Positions:        {}\n",
            summary.num_open_positions
        ));
        output.push_str(&format!(
            "Closed Positions:      {}\n",
            summary.num_closed_positions
        ));
        output.push_str(&format!("Total Trades:          {}\n", summary.num_trades));

        let stats = manager.performance();
        if stats.closed_trades > 0 {
            output.push_str(&format!(
                "Win Rate:              {:.2}%\n",
                stats.win_rate * Decimal::ONE_HUNDRED
            ));
            match stats.profit_factor {
                Some(pf) => output.push_str(&format!("Profit Factor:         {:.2}\n", pf)),
                None => output.push_str("Profit Factor:         N/A (no losses)\n"),
            }
        } else {
            output.push_str("Win Rate:              N/A (no closed trades)\n");
        }
        output.push('\n');

        if summary.num_open_positions > 0 {
            output.push_str("Open Positions\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for pos in manager.open_positions() {
                output.push_str(&format!(
                    "{} | {:<30} | {:<3} {:>4}x @ {:>3}¢ | P&L: {:>9} ({:.2}%)\n",
                    pos.position_id,
                    pos.market_ticker,
                    pos.side.as_api_str().to_uppercase(),
                    pos.quantity,
                    pos.entry_price,
                    format_dollars(pos.unrealized_pnl()),
                    pos.pnl_percent()
                ));
            }
            output.push('\n');
        }

        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output
    }
}
