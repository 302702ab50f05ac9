use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tokio::sync::mpsc;
use wenmoon::api::BinanceClient;
use wenmoon::execution::{Bot, KlineStream};
use wenmoon::settings::Settings;
use wenmoon::strategy;

const DEFAULT_LOG_FILTER: &str = "wenmoon=info";
const FEED_QUEUE_SIZE: usize = 256;

#[derive(Parser, Debug)]
#[command(name = "wenmoon")]
#[command(about = "Single-pair paper trading bot driven by Binance klines", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./wenmoon.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Strategy name (overrides config file)
    #[arg(short, long)]
    strategy: Option<String>,

    /// Tracing filter, RUST_LOG takes precedence
    #[arg(long, default_value = DEFAULT_LOG_FILTER)]
    log_filter: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_filter);

    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(name) = cli.strategy {
        settings.trading.strategy = name;
    }

    let strategy = strategy::from_name(&settings.trading.strategy)?;
    tracing::info!(
        "🚀 wenmoon starting: {} {} with {} (test mode)",
        settings.exchange.symbol_pair,
        settings.exchange.interval,
        strategy.name()
    );

    let client = BinanceClient::new(&settings.exchange).context("Failed to build REST client")?;
    let mut bot = Bot::new(&settings, strategy)?;

    let (tx, rx) = mpsc::channel(FEED_QUEUE_SIZE);
    let feed_task = tokio::spawn(KlineStream::new(&settings.exchange, tx).run());

    tracing::info!("Press Ctrl+C to stop...");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        result = bot.run(rx, &client) => {
            if let Err(e) = result {
                tracing::error!("Bot loop exited: {}", e);
            }
        }
    }

    feed_task.abort();

    let account = bot.trader().account();
    tracing::info!(
        coin_balance = account.coin_balance,
        fiat_balance = account.fiat_balance,
        buys = account.buy_count,
        sells = account.sell_count,
        "Final balances"
    );

    Ok(())
}

fn setup_logging(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
