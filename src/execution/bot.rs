use crate::api::BinanceClient;
use crate::error::{Error, Result};
use crate::execution::normalizer::KlineEvent;
use crate::execution::price_feed::FeedEvent;
use crate::execution::trader::{CycleOutcome, Trader};
use crate::execution::CandleBuffer;
use crate::models::Candle;
use crate::report::StatusReporter;
use crate::settings::{DisplayConfig, Settings};
use crate::strategy::Strategy;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::mpsc;

/// Single-pair trading loop
///
/// Owns the window, the trader, the strategy and the reporter. Feed events
/// are handled one at a time, each closed candle runs to completion (window,
/// strategy, trade, report) before the next event is read.
pub struct Bot {
    buffer: CandleBuffer,
    trader: Trader,
    strategy: Box<dyn Strategy>,
    reporter: StatusReporter,
    display: DisplayConfig,
    symbol: String,
    interval: String,
    history_span: Duration,
    last_processed_close: Option<DateTime<Utc>>,
}

impl Bot {
    pub fn new(settings: &Settings, strategy: Box<dyn Strategy>) -> Result<Self> {
        settings.validate_lookback(strategy.min_candles_required())?;

        let trading = &settings.trading;
        Ok(Self {
            buffer: CandleBuffer::new(trading.max_candles),
            trader: Trader::new(trading.start_position, trading.start_balance, &settings.risk),
            strategy,
            reporter: StatusReporter::new(&settings.report, &settings.display),
            display: settings.display.clone(),
            symbol: settings.exchange.symbol_pair.clone(),
            interval: settings.exchange.interval.clone(),
            history_span: settings.history_span()?,
            last_processed_close: None,
        })
    }

    pub fn buffer(&self) -> &CandleBuffer {
        &self.buffer
    }

    pub fn trader(&self) -> &Trader {
        &self.trader
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Close time of the newest candle a decision cycle ran on
    pub fn last_processed_close(&self) -> Option<DateTime<Utc>> {
        self.last_processed_close
    }

    /// Admit a closed live candle and run a decision cycle on it
    ///
    /// Stale or still-open candles are logged and skipped with `Ok(None)`.
    pub fn handle_candle(&mut self, candle: Candle) -> Result<Option<CycleOutcome>> {
        match self.buffer.push_closed_candle(candle) {
            Ok(()) => {}
            Err(e @ (Error::StaleCandle { .. } | Error::CandleNotClosed(_))) => {
                tracing::warn!("Skipping candle: {}", e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        }

        if self.display.output_candles {
            if let Some(latest) = self.buffer.latest() {
                tracing::info!(
                    close_time = %latest.close_time,
                    open = latest.open,
                    high = latest.high,
                    low = latest.low,
                    close = latest.close,
                    volume = latest.volume,
                    "Closed candle"
                );
            }
        }

        Ok(self.run_cycle())
    }

    /// Replace the window with a fresh historical batch
    ///
    /// Runs a decision cycle only if the batch ends on a candle newer than
    /// the last one processed, so a reconnect catches up on a missed close
    /// without trading twice on the same candle.
    pub fn resync(&mut self, candles: Vec<Candle>, now: DateTime<Utc>) -> Option<CycleOutcome> {
        let loaded = self.buffer.load_historical(candles, now);
        tracing::info!(
            "Window refreshed with {} historical candles for {} {}",
            loaded,
            self.symbol,
            self.interval
        );

        let latest = self.buffer.latest()?.close_time;
        match self.last_processed_close {
            Some(processed) if latest <= processed => None,
            _ => self.run_cycle(),
        }
    }

    /// Fetch history from the exchange and resync the window
    pub async fn refresh(&mut self, client: &BinanceClient) -> Result<Option<CycleOutcome>> {
        let now = Utc::now();
        let candles = client
            .historical_candles(&self.symbol, &self.interval, now - self.history_span, now)
            .await?;

        Ok(self.resync(candles, now))
    }

    /// Handle one live kline update
    pub fn on_kline(&mut self, event: KlineEvent) -> Result<Option<CycleOutcome>> {
        if !event.symbol.eq_ignore_ascii_case(&self.symbol) {
            tracing::debug!("Ignoring kline for {}", event.symbol);
            return Ok(None);
        }

        if self.display.output_websocket {
            tracing::info!(
                event_time = %event.event_time,
                close = event.candle.close,
                closed = event.candle.is_closed,
                "Kline update"
            );
        }

        if !event.candle.is_closed {
            return Ok(None);
        }

        self.handle_candle(event.candle)
    }

    /// Consume feed events until the channel closes
    pub async fn run(
        &mut self,
        mut rx: mpsc::Receiver<FeedEvent>,
        client: &BinanceClient,
    ) -> Result<()> {
        tracing::info!(
            strategy = self.strategy.name(),
            position = %self.trader.position(),
            "Bot started for {} {}",
            self.symbol,
            self.interval
        );

        while let Some(event) = rx.recv().await {
            match event {
                FeedEvent::Connected => {
                    if let Err(e) = self.refresh(client).await {
                        tracing::error!("Failed to refresh historical candles: {}", e);
                    }
                }
                FeedEvent::Kline(kline) => {
                    self.on_kline(kline)?;
                }
                FeedEvent::Disconnected(reason) => {
                    tracing::warn!("Market feed disconnected: {}", reason);
                }
            }
        }

        tracing::info!("Feed closed, bot stopping");
        Ok(())
    }

    fn run_cycle(&mut self) -> Option<CycleOutcome> {
        let window = self.buffer.snapshot();
        let latest = window.last()?.clone();

        let outcome = self.trader.on_closed_candle(self.strategy.as_mut(), &window);
        self.last_processed_close = Some(latest.close_time);

        if let Some(trade) = &outcome.trade {
            if let Err(e) = self.reporter.record_trade(trade) {
                tracing::error!("Failed to write trade log: {}", e);
            }
        }

        if let Err(e) = self
            .reporter
            .report(self.trader.account(), self.trader.position(), &latest)
        {
            tracing::error!("Failed to write status log: {}", e);
        }

        Some(outcome)
    }
}
