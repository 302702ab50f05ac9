use crate::error::{Error, Result};
use crate::execution::normalizer::normalize_historical;
use crate::models::Candle;
use crate::settings::ExchangeConfig;
use chrono::{DateTime, Utc};
use governor::{Quota, RateLimiter};
use reqwest::Client;
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

const KLINES_PATH: &str = "/api/v3/klines";
const KLINES_PAGE_LIMIT: usize = 1000;
const API_KEY_HEADER: &str = "X-MBX-APIKEY";

// Binance allows 6000 request weight per minute, klines cost 2
const REQUESTS_PER_SECOND: NonZeroU32 = match NonZeroU32::new(10) {
    Some(n) => n,
    None => unreachable!(),
};

type BinanceRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Binance spot REST client for historical klines
///
/// Cloneable; all clones share the same rate limiter.
#[derive(Clone)]
pub struct BinanceClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    page_limit: usize,
    rate_limiter: Arc<BinanceRateLimiter>,
}

impl BinanceClient {
    pub fn new(config: &ExchangeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(REQUESTS_PER_SECOND)));

        Ok(Self {
            client,
            base_url: config.rest_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            page_limit: KLINES_PAGE_LIMIT,
            rate_limiter,
        })
    }

    /// Override the number of rows requested per page
    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit.clamp(1, KLINES_PAGE_LIMIT);
        self
    }

    /// Fetch one page of raw kline rows starting at `start_ms`
    pub async fn fetch_klines_page(
        &self,
        symbol: &str,
        interval: &str,
        start_ms: i64,
    ) -> Result<Vec<Vec<Value>>> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, KLINES_PATH);
        let mut request = self.client.get(&url).query(&[
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
            ("startTime", start_ms.to_string()),
            ("limit", self.page_limit.to_string()),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::Exchange(format!(
                "klines request failed ({}): {}",
                status, body
            )));
        }

        Ok(response.json().await?)
    }

    /// Fetch every closed candle from `start` up to `now`, following pages
    /// until the exchange runs out of rows.
    pub async fn historical_candles(
        &self,
        symbol: &str,
        interval: &str,
        start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Candle>> {
        let now_ms = now.timestamp_millis();
        let mut start_ms = start.timestamp_millis();
        let mut rows: Vec<Vec<Value>> = Vec::new();

        while start_ms < now_ms {
            let page = self.fetch_klines_page(symbol, interval, start_ms).await?;
            let page_len = page.len();

            let last_open = page
                .last()
                .and_then(|row| row.first())
                .and_then(Value::as_i64);
            rows.extend(page);

            let next_start = match last_open {
                Some(open_ms) if open_ms >= start_ms => open_ms + 1,
                _ => break,
            };
            if page_len < self.page_limit {
                break;
            }
            start_ms = next_start;
        }

        let candles = normalize_historical(&rows, now);
        tracing::info!(
            "Fetched {} historical candles for {} {} ({} rows)",
            candles.len(),
            symbol,
            interval,
            rows.len()
        );

        Ok(candles)
    }
}
