//! paper-trade CLI command.
//!
//! Reads opportunity signals from a JSON file written by an external
//! detector, runs them through the trade manager and marks open positions
//! against live Kalshi orderbooks until the duration elapses or Ctrl+C.

use anyhow::{anyhow, Context, Result};
use clap::{Args, ValueEnum};
use kalshi_edge_core::{
    AppConfig, MarketPrices, Opportunity, PortfolioFormatter, TradeManager, TradeManagerConfig,
};
use kalshi_edge_exchange::KalshiClient;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Risk preset overriding the `[trading]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Preset {
    Conservative,
    Aggressive,
}

/// Arguments for the paper-trade command.
#[derive(Args, Debug, Clone)]
pub struct PaperTradeArgs {
    /// JSON file holding an array of opportunities, re-read every poll
    #[arg(long)]
    pub signals: PathBuf,

    /// Duration to run (e.g., "30m", "1h", "7d")
    #[arg(long, default_value = "1h")]
    pub duration: String,

    /// Poll interval in seconds
    #[arg(long, default_value = "30")]
    pub poll_interval_secs: u64,

    /// Use a built-in risk preset instead of the configured trading section
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,

    /// Maximum concurrent orderbook requests
    #[arg(long, default_value = "4")]
    pub concurrency: usize,
}

/// Runs the paper trading loop.
pub async fn run_paper_trade(
    args: PaperTradeArgs,
    config: &AppConfig,
    client: KalshiClient,
) -> Result<()> {
    let duration = parse_duration(&args.duration)?;
    let trading = match args.preset {
        Some(Preset::Conservative) => TradeManagerConfig::conservative(),
        Some(Preset::Aggressive) => TradeManagerConfig::aggressive(),
        None => config.trading.clone(),
    };
    let mut manager = TradeManager::new(trading)?;
    let mut seen = HashSet::new();

    tracing::info!(
        signals = %args.signals.display(),
        ?duration,
        poll_interval_secs = args.poll_interval_secs,
        "Paper trading running. Will stop when the duration elapses or on Ctrl+C"
    );

    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);
    let mut interval = tokio::time::interval(Duration::from_secs(args.poll_interval_secs.max(1)));

    loop {
        tokio::select! {
            _ = &mut deadline => {
                tracing::info!("Duration elapsed, stopping");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, stopping");
                break;
            }
            _ = interval.tick() => {
                if let Err(e) = run_cycle(&args, &client, &mut manager, &mut seen).await {
                    tracing::warn!(error = %e, "Paper trading cycle failed");
                }
            }
        }
    }

    println!("{}", PortfolioFormatter::format(&manager));
    Ok(())
}

async fn run_cycle(
    args: &PaperTradeArgs,
    client: &KalshiClient,
    manager: &mut TradeManager,
    seen: &mut HashSet<String>,
) -> Result<()> {
    for opportunity in load_signals(&args.signals)? {
        if !seen.insert(signal_key(&opportunity)) {
            continue;
        }

        let decision = manager.should_trade(&opportunity);
        if decision.allow {
            manager.execute_trade(&opportunity, None, None, None);
        } else {
            tracing::info!(
                ticker = opportunity.primary_ticker().unwrap_or_default(),
                reason = %decision.reason,
                "Skipping opportunity"
            );
        }
    }

    let tickers: Vec<String> = manager
        .open_positions()
        .map(|p| p.market_ticker().to_string())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    if tickers.is_empty() {
        return Ok(());
    }

    let mut prices = MarketPrices::new();
    for (ticker, result) in client.get_orderbooks(&tickers, args.concurrency).await {
        match result {
            Ok(book) => prices.insert_orderbook(&book),
            Err(e) => tracing::warn!(ticker = %ticker, error = %e, "Orderbook fetch failed"),
        }
    }

    let closed = manager.check_stops_and_targets(&prices);
    let summary = manager.summary();
    tracing::info!(
        open = summary.num_open_positions,
        closed = closed.len(),
        cash = %summary.cash,
        total_pnl = %summary.total_pnl,
        "Cycle complete"
    );

    Ok(())
}

/// Reads the signal file. A missing file means no signals yet.
fn load_signals(path: &Path) -> Result<Vec<Opportunity>> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Signal file not found");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
    };
    parse_signals(&contents)
}

fn parse_signals(contents: &str) -> Result<Vec<Opportunity>> {
    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(contents).context("signal file is not a JSON array of opportunities")
}

/// Identity of a signal across re-reads of the file.
fn signal_key(opportunity: &Opportunity) -> String {
    format!(
        "{}:{}:{}",
        opportunity.market_tickers.join(","),
        opportunity.opportunity_type,
        opportunity.timestamp.timestamp_millis()
    )
}

/// Parses a duration string like "30s", "15m", "1h", "7d" or "2w".
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();

    if s.is_empty() {
        return Err(anyhow!("Duration string cannot be empty"));
    }

    let split_idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| anyhow!("Duration must have a unit (s, m, h, d, w)"))?;
    let (num_str, unit) = s.split_at(split_idx);

    if num_str.is_empty() {
        return Err(anyhow!("Duration must start with a number"));
    }

    let value: u64 = num_str
        .parse()
        .map_err(|_| anyhow!("Invalid number in duration: {}", num_str))?;

    if value == 0 {
        return Err(anyhow!("Duration must be positive"));
    }

    let unit_secs: u64 = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        "w" => 604_800,
        _ => return Err(anyhow!("Unknown duration unit: {}", unit)),
    };

    let secs = value
        .checked_mul(unit_secs)
        .ok_or_else(|| anyhow!("Duration too large: {}", s))?;

    Ok(Duration::from_secs(secs))
}
