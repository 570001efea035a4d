//! account CLI command: balance, positions and resting orders.

use anyhow::{Context, Result};
use clap::Args;
use kalshi_edge_exchange::{KalshiClient, OrderStatus};

/// Arguments for the account command.
#[derive(Args, Debug)]
pub struct AccountArgs {
    /// Also list resting orders
    #[arg(long)]
    pub orders: bool,

    /// Print raw JSON instead of a summary
    #[arg(long)]
    pub json: bool,
}

/// Runs the account command.
pub async fn run_account(args: AccountArgs, client: &KalshiClient) -> Result<()> {
    if !client.is_authenticated() {
        anyhow::bail!(
            "account commands need KALSHI_API_KEY_ID and KALSHI_PRIV_KEY (or KALSHI_PRIV_KEY_PATH)"
        );
    }

    let portfolio = client
        .get_portfolio()
        .await
        .context("failed to fetch portfolio")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&portfolio)?);
        return Ok(());
    }

    println!("\n=== Account ===\n");
    println!("Balance:          ${:.2}", portfolio.balance.dollars());
    if let Some(value) = portfolio.balance.portfolio_value {
        println!("Portfolio Value:  ${:.2}", rust_decimal::Decimal::new(value, 2));
    }

    println!("\nPositions ({})", portfolio.positions.len());
    for position in &portfolio.positions {
        let side = position
            .side()
            .map_or("-", |s| s.as_api_str())
            .to_uppercase();
        println!(
            "  {:<40} {:<3} {:>6}  exposure {:>8}¢  realized {:>8}¢",
            position.ticker,
            side,
            position.contracts(),
            position.market_exposure,
            position.realized_pnl
        );
    }

    if args.orders {
        let orders = client.get_orders(None).await.context("failed to fetch orders")?;
        let resting: Vec<_> = orders
            .iter()
            .filter(|o| o.status == OrderStatus::Resting)
            .collect();

        println!("\nResting Orders ({})", resting.len());
        for order in resting {
            println!(
                "  {} {:<40} {} {} remaining {}",
                order.order_id,
                order.ticker,
                order.action.as_api_str(),
                order.side,
                order.remaining_count
            );
        }
    }

    println!();
    Ok(())
}
