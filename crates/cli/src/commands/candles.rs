//! candles CLI command: candlesticks for one market.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use kalshi_edge_exchange::{Candlestick, KalshiClient, Ohlc};

/// Arguments for the candles command.
#[derive(Args, Debug)]
pub struct CandlesArgs {
    /// Market ticker
    #[arg(long)]
    pub ticker: String,

    /// Series ticker (defaults to the ticker prefix before the first '-')
    #[arg(long)]
    pub series: Option<String>,

    /// Period in minutes: 1, 60 or 1440
    #[arg(long, default_value = "60")]
    pub interval: u32,

    /// Hours of history to fetch
    #[arg(long, default_value = "24")]
    pub hours: i64,

    /// Print raw JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// Runs the candles command.
pub async fn run_candles(args: CandlesArgs, client: &KalshiClient) -> Result<()> {
    let series = args
        .series
        .clone()
        .unwrap_or_else(|| series_from_ticker(&args.ticker).to_string());

    let end_ts = Utc::now().timestamp();
    let start_ts = end_ts - args.hours * 3600;

    let mut candles = client
        .get_candlesticks(&series, &args.ticker, start_ts, end_ts, args.interval)
        .await
        .with_context(|| format!("failed to fetch candlesticks for {}", args.ticker))?;
    candles.sort_by_key(|c| c.end_period_ts);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&candles)?);
        return Ok(());
    }

    println!(
        "\n{:<17} {:>16} {:>16} {:>8} {:>8}",
        "PERIOD END (UTC)", "YES BID O/C", "PRICE O/C", "VOLUME", "OI"
    );
    for candle in &candles {
        println!("{}", format_row(candle));
    }
    println!("\n{} candles for {}", candles.len(), args.ticker);

    Ok(())
}

/// Series ticker is the part of a market ticker before the first '-'.
fn series_from_ticker(ticker: &str) -> &str {
    ticker.split('-').next().unwrap_or(ticker)
}

fn format_row(candle: &Candlestick) -> String {
    let time = DateTime::<Utc>::from_timestamp(candle.end_period_ts, 0)
        .map_or_else(|| candle.end_period_ts.to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string());
    format!(
        "{:<17} {:>16} {:>16} {:>8} {:>8}",
        time,
        open_close(&candle.yes_bid),
        open_close(&candle.price),
        candle.volume,
        candle.open_interest
    )
}

fn open_close(ohlc: &Ohlc) -> String {
    let fmt = |v: Option<i64>| v.map_or_else(|| "-".to_string(), |c| c.to_string());
    format!("{}/{}", fmt(ohlc.open), fmt(ohlc.close))
}
