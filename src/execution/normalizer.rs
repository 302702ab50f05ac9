//! Converts raw Binance kline payloads into [`Candle`]s
//!
//! Two shapes arrive from the exchange: REST `/api/v3/klines` rows (JSON arrays)
//! and websocket `<pair>@kline_<interval>` events. Both end up as the same
//! immutable candle record.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::Candle;

/// Live kline update from the websocket
#[derive(Debug, Clone, PartialEq)]
pub struct KlineEvent {
    pub symbol: String,
    pub event_time: DateTime<Utc>,
    pub candle: Candle,
}

#[derive(Deserialize)]
struct KlineMessage {
    #[serde(rename = "E")]
    event_time_ms: i64,
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "k")]
    kline: KlineData,
}

#[derive(Deserialize)]
struct KlineData {
    #[serde(rename = "t")]
    open_time_ms: i64,
    #[serde(rename = "T")]
    close_time_ms: i64,
    #[serde(rename = "o")]
    open: String,
    #[serde(rename = "h")]
    high: String,
    #[serde(rename = "l")]
    low: String,
    #[serde(rename = "c")]
    close: String,
    #[serde(rename = "v")]
    volume: String,
    #[serde(rename = "x")]
    is_closed: bool,
}

/// Parse a websocket text frame
///
/// Returns `Ok(None)` for frames that are not kline events (subscription
/// acks, other stream types).
pub fn parse_kline_message(text: &str) -> Result<Option<KlineEvent>> {
    let value: Value = serde_json::from_str(text)?;
    if value.get("e").and_then(|v| v.as_str()) != Some("kline") {
        return Ok(None);
    }

    let msg: KlineMessage = serde_json::from_value(value)?;
    let k = msg.kline;

    let candle = build_candle(
        millis_to_utc(k.open_time_ms)?,
        millis_to_utc(k.close_time_ms)?,
        parse_price(&k.open, "open")?,
        parse_price(&k.high, "high")?,
        parse_price(&k.low, "low")?,
        parse_price(&k.close, "close")?,
        parse_price(&k.volume, "volume")?,
        k.is_closed,
    )?;

    Ok(Some(KlineEvent {
        symbol: msg.symbol,
        event_time: millis_to_utc(msg.event_time_ms)?,
        candle,
    }))
}

/// Parse one REST kline row
///
/// Layout: `[open_time, open, high, low, close, volume, close_time, ...]`
/// with prices as strings. The row counts as closed when its close time is
/// strictly before `now`.
pub fn candle_from_rest_row(row: &[Value], now: DateTime<Utc>) -> Result<Candle> {
    if row.len() < 7 {
        return Err(Error::MalformedKline(format!(
            "expected at least 7 fields, got {}",
            row.len()
        )));
    }

    let open_time = millis_to_utc(field_i64(&row[0], "open_time")?)?;
    let close_time = millis_to_utc(field_i64(&row[6], "close_time")?)?;

    build_candle(
        open_time,
        close_time,
        field_f64(&row[1], "open")?,
        field_f64(&row[2], "high")?,
        field_f64(&row[3], "low")?,
        field_f64(&row[4], "close")?,
        field_f64(&row[5], "volume")?,
        close_time < now,
    )
}

/// Normalize a historical batch, keeping only candles closed before `now`
///
/// Malformed rows are logged and skipped rather than failing the batch.
pub fn normalize_historical(rows: &[Vec<Value>], now: DateTime<Utc>) -> Vec<Candle> {
    rows.iter()
        .filter_map(|row| match candle_from_rest_row(row, now) {
            Ok(candle) => Some(candle),
            Err(e) => {
                tracing::warn!("Skipping historical kline: {}", e);
                None
            }
        })
        .filter(|c| c.is_closed)
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn build_candle(
    open_time: DateTime<Utc>,
    close_time: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    is_closed: bool,
) -> Result<Candle> {
    if [open, high, low, close, volume]
        .iter()
        .any(|v| !v.is_finite() || *v < 0.0)
    {
        return Err(Error::MalformedKline(format!(
            "negative or non-finite value in OHLCV ({}, {}, {}, {}, {})",
            open, high, low, close, volume
        )));
    }

    if high < open.max(close) || low > open.min(close) {
        return Err(Error::MalformedKline(format!(
            "inconsistent range: open {} high {} low {} close {}",
            open, high, low, close
        )));
    }

    if close_time <= open_time {
        return Err(Error::MalformedKline(format!(
            "close time {} is not after open time {}",
            close_time, open_time
        )));
    }

    Ok(Candle {
        open_time,
        close_time,
        open,
        high,
        low,
        close,
        volume,
        is_closed,
    })
}

fn millis_to_utc(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| Error::MalformedKline(format!("invalid timestamp {}", ms)))
}

fn parse_price(raw: &str, name: &str) -> Result<f64> {
    raw.parse::<f64>()
        .map_err(|_| Error::MalformedKline(format!("{} is not a number: '{}'", name, raw)))
}

fn field_i64(value: &Value, name: &str) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| Error::MalformedKline(format!("{} is not an integer: {}", name, value)))
}

fn field_f64(value: &Value, name: &str) -> Result<f64> {
    match value {
        Value::String(s) => parse_price(s, name),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::MalformedKline(format!("{} out of range: {}", name, n))),
        other => Err(Error::MalformedKline(format!(
            "{} has unexpected type: {}",
            name, other
        ))),
    }
}
