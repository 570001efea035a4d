//! markets CLI command: paginated market listing.

use anyhow::Result;
use clap::Args;
use kalshi_edge_exchange::{KalshiClient, Market};

/// Arguments for the markets command.
#[derive(Args, Debug)]
pub struct MarketsArgs {
    /// Maximum number of markets to return
    #[arg(long, default_value = "50")]
    pub limit: usize,

    /// Market status filter (open, closed, settled, unopened)
    #[arg(long, default_value = "open")]
    pub status: String,

    /// Drop markets with lower total volume
    #[arg(long)]
    pub min_volume: Option<i64>,

    /// Print raw JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Runs the markets command.
pub async fn run_markets(args: MarketsArgs, client: &KalshiClient) -> Result<()> {
    let markets = client
        .get_all_markets(Some(args.limit), Some(&args.status), args.min_volume)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&markets)?);
        return Ok(());
    }

    println!(
        "\n{:<40} {:>7} {:>7} {:>7} {:>10}  TITLE",
        "TICKER", "YES BID", "YES ASK", "SPREAD", "VOLUME"
    );
    for market in &markets {
        println!("{}", format_row(market));
    }
    println!("\n{} markets", markets.len());

    Ok(())
}

fn format_row(market: &Market) -> String {
    let cents = |v: Option<rust_decimal::Decimal>| v.map_or_else(|| "-".to_string(), |d| d.to_string());
    let title: String = market.title.chars().take(60).collect();
    format!(
        "{:<40} {:>7} {:>7} {:>7} {:>10}  {}",
        market.ticker,
        cents(market.yes_bid),
        cents(market.yes_ask),
        cents(market.spread()),
        market.volume,
        title
    )
}
