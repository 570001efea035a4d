use anyhow::Context;
use clap::{Parser, Subcommand};
use kalshi_edge_core::{AppConfig, ConfigLoader};
use kalshi_edge_exchange::KalshiClient;

mod commands;

use commands::{AccountArgs, CandlesArgs, MarketsArgs, OrderbookArgs, PaperTradeArgs};

#[derive(Parser)]
#[command(name = "kalshi-edge")]
#[command(about = "Kalshi market data and paper trading", long_about = None)]
struct Cli {
    /// Config file path (defaults to config/Config.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Use the Kalshi demo environment
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List markets, following pagination
    Markets(MarketsArgs),
    /// Show orderbooks for one or more tickers
    Orderbook(OrderbookArgs),
    /// Fetch candlesticks for a market
    Candles(CandlesArgs),
    /// Show balance and positions (requires credentials)
    Account(AccountArgs),
    /// Paper trade signals from a JSON file against live prices
    PaperTrade(PaperTradeArgs),
    /// Print the merged configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = match &cli.config {
        Some(path) => ConfigLoader::load_from(path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => ConfigLoader::load().context("failed to load config")?,
    };
    if cli.demo {
        config.exchange.demo = true;
    }

    match cli.command {
        Commands::Markets(args) => commands::run_markets(args, &client(&config)?).await,
        Commands::Orderbook(args) => commands::run_orderbook(args, &client(&config)?).await,
        Commands::Candles(args) => commands::run_candles(args, &client(&config)?).await,
        Commands::Account(args) => commands::run_account(args, &client(&config)?).await,
        Commands::PaperTrade(args) => {
            let client = client(&config)?;
            commands::run_paper_trade(args, &config, client).await
        }
        Commands::ShowConfig => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn client(config: &AppConfig) -> anyhow::Result<KalshiClient> {
    KalshiClient::from_env(
        config.exchange.client_config(),
        &config.exchange.auth_config(),
    )
    .context("failed to create Kalshi client")
}
