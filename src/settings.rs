//! Configuration management
//!
//! Settings come from an optional file (any format the `config` crate reads,
//! `wenmoon.toml` by default) overlaid with `WENMOON__SECTION__KEY`
//! environment variables. Everything is validated once at startup and then
//! passed around immutably.

use ::config::{Config, Environment, File};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::Position;

pub const DEFAULT_CONFIG_FILE: &str = "wenmoon.toml";
const ENV_PREFIX: &str = "WENMOON";

const VALID_INTERVALS: [&str; 10] = [
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "12h",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub exchange: ExchangeConfig,
    pub trading: TradingConfig,
    pub risk: RiskConfig,
    pub display: DisplayConfig,
    pub report: ReportConfig,
}

/// Market data source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub symbol_pair: String,
    pub interval: String,
    pub rest_url: String,
    pub ws_url: String,
    pub request_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            symbol_pair: "BTCUSDT".to_string(),
            interval: "1h".to_string(),
            rest_url: "https://api.binance.com".to_string(),
            ws_url: "wss://stream.binance.com:9443/ws".to_string(),
            request_timeout_secs: 30,
            api_key: None,
            secret_key: None,
        }
    }
}

impl ExchangeConfig {
    /// Candle length for the configured interval
    pub fn interval_duration(&self) -> Result<Duration> {
        parse_interval(&self.interval).ok_or_else(|| {
            Error::Config(format!(
                "interval '{}' is invalid, required one of {:?}",
                self.interval, VALID_INTERVALS
            ))
        })
    }
}

/// Position sizing and strategy selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub max_candles: usize,
    pub start_position: Position,
    pub start_balance: f64,
    /// Simulated fills only; real order placement is not supported
    pub test_mode: bool,
    pub strategy: String,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            max_candles: 50,
            start_position: Position::Short,
            start_balance: 1000.0,
            test_mode: true,
            strategy: "macd_rsi".to_string(),
        }
    }
}

/// Fee and exit thresholds, all in percent
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub test_fee: f64,
    pub profit_target: Option<f64>,
    pub stop_loss: Option<f64>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            test_fee: 0.1,
            profit_target: None,
            stop_loss: None,
        }
    }
}

impl RiskConfig {
    pub fn fee_fraction(&self) -> f64 {
        self.test_fee / 100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub coin_symbol: String,
    pub fiat_symbol: String,
    /// Log every admitted candle
    pub output_candles: bool,
    /// Log every websocket update, including open candles
    pub output_websocket: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            coin_symbol: "BTC".to_string(),
            fiat_symbol: "USDT".to_string(),
            output_candles: false,
            output_websocket: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub status_file: PathBuf,
    pub trades_file: PathBuf,
    /// Print the balance block after every closed candle
    pub console: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            status_file: PathBuf::from("wenmoon_status.csv"),
            trades_file: PathBuf::from("wenmoon_trades.csv"),
            console: true,
        }
    }
}

impl Settings {
    /// Load settings from `path` (optional file) and the environment
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings: Settings = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;

        tracing::debug!("Loaded settings: {:?}", settings);

        Ok(settings)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        self.exchange.interval_duration()?;

        if self.exchange.symbol_pair.trim().is_empty() {
            return Err(Error::Config("symbol_pair must not be empty".into()));
        }
        if self.trading.max_candles == 0 {
            return Err(Error::Config("max_candles must be greater than 0".into()));
        }
        if !(self.trading.start_balance >= 0.0) {
            return Err(Error::Config(format!(
                "start_balance must be >= 0, got {}",
                self.trading.start_balance
            )));
        }
        if !self.trading.test_mode {
            return Err(Error::Config(
                "test_mode must be enabled, live order execution is not supported".into(),
            ));
        }
        if !(self.risk.test_fee >= 0.0 && self.risk.test_fee < 100.0) {
            return Err(Error::Config(format!(
                "test_fee must be in [0, 100), got {}",
                self.risk.test_fee
            )));
        }
        if let Some(target) = self.risk.profit_target {
            if !(target > 0.0) {
                return Err(Error::Config(format!(
                    "profit_target must be > 0, got {}",
                    target
                )));
            }
        }
        if let Some(stop) = self.risk.stop_loss {
            if !(stop < 0.0) {
                return Err(Error::Config(format!(
                    "stop_loss must be < 0, got {}",
                    stop
                )));
            }
        }

        Ok(())
    }

    /// Make sure the window can hold the strategy's longest lookback
    pub fn validate_lookback(&self, min_candles: usize) -> Result<()> {
        if self.trading.max_candles < min_candles {
            return Err(Error::Config(format!(
                "max_candles is {} but strategy '{}' needs at least {}",
                self.trading.max_candles, self.trading.strategy, min_candles
            )));
        }
        Ok(())
    }

    /// How far back the historical fetch must reach to fill the window
    pub fn history_span(&self) -> Result<Duration> {
        let interval = self.exchange.interval_duration()?;
        let candles = i32::try_from(self.trading.max_candles).map_err(|_| {
            Error::Config(format!(
                "max_candles {} is too large",
                self.trading.max_candles
            ))
        })?;
        interval.checked_mul(candles).ok_or_else(|| {
            Error::Config(format!(
                "history span of {} x {} overflows",
                candles, self.exchange.interval
            ))
        })
    }
}

fn parse_interval(interval: &str) -> Option<Duration> {
    if !VALID_INTERVALS.contains(&interval) {
        return None;
    }

    let (number, unit) = interval.split_at(interval.len() - 1);
    let number: i64 = number.parse().ok()?;

    match unit {
        "m" => Some(Duration::minutes(number)),
        "h" => Some(Duration::hours(number)),
        _ => None,
    }
}
