use super::{closes, ensure_history, PositionStrategy};
use crate::error::{Error, Result};
use crate::indicators::{calculate_macd, macd_min_prices, scaled_atr_series};
use crate::models::{Candle, PositionSignal};

#[derive(Debug, Clone)]
pub struct ChandelierConfig {
    pub atr_period: usize,
    pub atr_multiplier: f64,
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
}

impl Default for ChandelierConfig {
    fn default() -> Self {
        Self {
            atr_period: 20,
            atr_multiplier: 2.0,
            fast_period: 12,
            slow_period: 27,
            signal_period: 7,
        }
    }
}

/// Direction implied by price crossing a chandelier stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

/// Chandelier exit confirmed by the MACD histogram
///
/// Long stop hangs a scaled ATR below the highest OHLC4 of the ATR window,
/// short stop sits the same distance above the lowest. Each stop ratchets
/// against the previous one while price stays on its side. A close above the
/// previous short stop turns direction up, a close below the previous long
/// stop turns it down. Direction only becomes a position when the histogram
/// agrees.
#[derive(Debug, Clone, Default)]
pub struct ChandelierStrategy {
    config: ChandelierConfig,
    long_stop_prev: Option<f64>,
    short_stop_prev: Option<f64>,
    direction: Option<Direction>,
}

impl ChandelierStrategy {
    pub fn new(config: ChandelierConfig) -> Self {
        Self {
            config,
            long_stop_prev: None,
            short_stop_prev: None,
            direction: None,
        }
    }

    /// Stops retained from the previous call as (long, short)
    pub fn previous_stops(&self) -> (Option<f64>, Option<f64>) {
        (self.long_stop_prev, self.short_stop_prev)
    }
}

impl PositionStrategy for ChandelierStrategy {
    fn scout(&mut self, candles: &[Candle]) -> Result<PositionSignal> {
        let need = self.min_candles_required();
        ensure_history(candles, need)?;
        let insufficient = || Error::InsufficientHistory {
            have: candles.len(),
            need,
        };

        let atr = scaled_atr_series(candles, self.config.atr_period, self.config.atr_multiplier)
            .last()
            .copied()
            .ok_or_else(insufficient)?;
        let hist = calculate_macd(
            &closes(candles),
            self.config.fast_period,
            self.config.slow_period,
            self.config.signal_period,
        )
        .and_then(|macd| macd.last_histogram())
        .ok_or_else(insufficient)?;

        let window = &candles[candles.len() - self.config.atr_period..];
        let highest = window.iter().map(Candle::ohlc4).fold(f64::MIN, f64::max);
        let lowest = window.iter().map(Candle::ohlc4).fold(f64::MAX, f64::min);

        let previous = &candles[candles.len() - 2];
        let close = candles[candles.len() - 1].close;

        let mut long_stop = highest - atr;
        if let Some(prev) = self.long_stop_prev {
            if previous.close > prev {
                long_stop = long_stop.max(prev);
            }
        }

        let mut short_stop = lowest + atr;
        if let Some(prev) = self.short_stop_prev {
            if previous.ohlc4() < prev {
                short_stop = short_stop.min(prev);
            }
        }

        match (self.short_stop_prev, self.long_stop_prev) {
            (Some(short_prev), _) if close > short_prev => self.direction = Some(Direction::Up),
            (_, Some(long_prev)) if close < long_prev => self.direction = Some(Direction::Down),
            _ => {}
        }

        self.long_stop_prev = Some(long_stop);
        self.short_stop_prev = Some(short_stop);

        tracing::debug!(
            long_stop,
            short_stop,
            atr,
            hist,
            direction = ?self.direction,
            "chandelier indicators"
        );

        Ok(match self.direction {
            Some(Direction::Up) if hist > 0.0 => PositionSignal::Long,
            Some(Direction::Down) if hist < 0.0 => PositionSignal::Short,
            _ => PositionSignal::Neutral,
        })
    }

    fn name(&self) -> &str {
        "chandelier"
    }

    fn min_candles_required(&self) -> usize {
        let macd_need =
            macd_min_prices(self.config.slow_period, self.config.signal_period, 1);
        macd_need.max(self.config.atr_period + 1)
    }
}
