use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::TradeSide;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Stale candle: close time {candle_close} is not after last admitted close {last_close}")]
    StaleCandle {
        candle_close: DateTime<Utc>,
        last_close: DateTime<Utc>,
    },

    #[error("Candle closing at {0} is still in progress")]
    CandleNotClosed(DateTime<Utc>),

    #[error("Insufficient history: {have} candles, need {need}")]
    InsufficientHistory { have: usize, need: usize },

    #[error("Cannot {side} with a zero {asset} balance")]
    ZeroBalanceTrade { side: TradeSide, asset: &'static str },

    #[error("Market feed disconnected: {0}")]
    FeedDisconnected(String),

    #[error("Malformed kline: {0}")]
    MalformedKline(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Exchange API error: {0}")]
    Exchange(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<::config::ConfigError> for Error {
    fn from(err: ::config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
