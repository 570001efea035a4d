//! orderbook CLI command: best bids, implied asks and depth per market.

use anyhow::Result;
use clap::Args;
use kalshi_edge_exchange::{KalshiClient, Orderbook, Side};

/// Arguments for the orderbook command.
#[derive(Args, Debug)]
pub struct OrderbookArgs {
    /// Market tickers (comma-separated)
    #[arg(long, value_delimiter = ',', required = true)]
    pub tickers: Vec<String>,

    /// Maximum concurrent requests
    #[arg(long, default_value = "4")]
    pub concurrency: usize,

    /// Levels to print per side
    #[arg(long, default_value = "5")]
    pub levels: usize,
}

/// Runs the orderbook command.
pub async fn run_orderbook(args: OrderbookArgs, client: &KalshiClient) -> Result<()> {
    let tickers: Vec<String> = args
        .tickers
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    if tickers.is_empty() {
        anyhow::bail!("No tickers specified");
    }

    println!("\n=== Orderbooks ===\n");

    for (ticker, result) in client.get_orderbooks(&tickers, args.concurrency).await {
        match result {
            Ok(book) => print_book(&book, args.levels),
            Err(e) => println!("{ticker}: failed to fetch orderbook: {e}\n"),
        }
    }

    Ok(())
}

fn print_book(book: &Orderbook, levels: usize) {
    println!("{}", book.ticker);

    if book.is_empty() {
        println!("  (empty book)\n");
        return;
    }

    for side in [Side::Yes, Side::No] {
        let best = book
            .best_bid(side)
            .map_or_else(|| "-".to_string(), |l| format!("{}¢ x {}", l.price, l.quantity));
        let ask = book
            .implied_ask(side)
            .map_or_else(|| "-".to_string(), |p| format!("{p}¢"));
        println!(
            "  {:<3} best bid {:<14} implied ask {:<5} depth {}",
            side.as_api_str().to_uppercase(),
            best,
            ask,
            book.depth(side)
        );

        // best levels first
        for level in book.side(side).iter().rev().take(levels) {
            println!("        {:>3}¢  {:>8}", level.price, level.quantity);
        }
    }

    match book.spread() {
        Some(spread) => println!("  spread {spread}¢\n"),
        None => println!("  spread -\n"),
    }
}
