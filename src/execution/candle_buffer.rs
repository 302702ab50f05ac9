use crate::error::{Error, Result};
use crate::models::Candle;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Rolling window of closed candles for the traded pair
///
/// Candles are kept oldest first. Each admitted candle must close strictly
/// after the previous one, and the window never grows past `max_candles`.
/// Single-writer: the bot loop owns the buffer, no locking.
#[derive(Debug, Clone)]
pub struct CandleBuffer {
    candles: VecDeque<Candle>,
    max_candles: usize,
}

impl CandleBuffer {
    /// Create an empty buffer
    ///
    /// # Arguments
    /// * `max_candles` - Maximum number of candles to keep
    pub fn new(max_candles: usize) -> Self {
        Self {
            candles: VecDeque::with_capacity(max_candles + 1),
            max_candles,
        }
    }

    /// Append a newly closed candle
    ///
    /// If the buffer is full, removes the oldest candle. Open candles and
    /// candles that do not close after the current newest one are rejected
    /// and leave the buffer untouched.
    pub fn push_closed_candle(&mut self, candle: Candle) -> Result<()> {
        if !candle.is_closed {
            return Err(Error::CandleNotClosed(candle.close_time));
        }

        if let Some(last) = self.candles.back() {
            if candle.close_time <= last.close_time {
                return Err(Error::StaleCandle {
                    candle_close: candle.close_time,
                    last_close: last.close_time,
                });
            }
        }

        self.candles.push_back(candle);

        while self.candles.len() > self.max_candles {
            self.candles.pop_front();
        }

        Ok(())
    }

    /// Replace the whole window with historical candles
    ///
    /// Drops anything whose close time is not strictly before `now` (the
    /// exchange returns the in-progress candle too), orders by close time,
    /// collapses duplicate close times and keeps the newest `max_candles`.
    ///
    /// Returns the number of candles loaded.
    pub fn load_historical(&mut self, candles: Vec<Candle>, now: DateTime<Utc>) -> usize {
        let received = candles.len();

        let mut closed: Vec<Candle> = candles
            .into_iter()
            .filter(|c| c.close_time < now)
            .map(|mut c| {
                c.is_closed = true;
                c
            })
            .collect();

        // Stable sort keeps exchange order for equal close times, so the
        // later duplicate wins below
        closed.sort_by_key(|c| c.close_time);

        let mut deduped: Vec<Candle> = Vec::with_capacity(closed.len());
        for candle in closed {
            match deduped.last_mut() {
                Some(last) if last.close_time == candle.close_time => *last = candle,
                _ => deduped.push(candle),
            }
        }

        let skip = deduped.len().saturating_sub(self.max_candles);
        self.candles = deduped.into_iter().skip(skip).collect();

        if received != self.candles.len() {
            tracing::debug!(
                "Loaded {} of {} historical candles (capacity {})",
                self.candles.len(),
                received,
                self.max_candles
            );
        }

        self.candles.len()
    }

    /// Copy of the window, oldest to newest
    pub fn snapshot(&self) -> Vec<Candle> {
        self.candles.iter().cloned().collect()
    }

    /// The N most recent candles, oldest first
    pub fn recent(&self, n: usize) -> Vec<Candle> {
        let skip = self.candles.len().saturating_sub(n);
        self.candles.iter().skip(skip).cloned().collect()
    }

    /// Newest admitted candle
    pub fn latest(&self) -> Option<&Candle> {
        self.candles.back()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_candles
    }
}
