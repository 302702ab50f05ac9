use super::{closes, ensure_history, PositionStrategy};
use crate::error::{Error, Result};
use crate::indicators::{calculate_macd, heikin_ashi, macd_min_prices};
use crate::models::{Candle, PositionSignal};

#[derive(Debug, Clone)]
pub struct MacdHeikinAshiConfig {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
}

impl Default for MacdHeikinAshiConfig {
    fn default() -> Self {
        Self {
            fast_period: 17,
            slow_period: 37,
            signal_period: 9,
        }
    }
}

/// MACD histogram sign on Heikin-Ashi closes
///
/// Long above zero, Short below zero, Neutral on exactly zero.
#[derive(Debug, Clone, Default)]
pub struct MacdHeikinAshiStrategy {
    config: MacdHeikinAshiConfig,
}

impl MacdHeikinAshiStrategy {
    pub fn new(config: MacdHeikinAshiConfig) -> Self {
        Self { config }
    }
}

impl PositionStrategy for MacdHeikinAshiStrategy {
    fn scout(&mut self, candles: &[Candle]) -> Result<PositionSignal> {
        let need = self.min_candles_required();
        ensure_history(candles, need)?;

        let smoothed = closes(&heikin_ashi(candles));
        let hist = calculate_macd(
            &smoothed,
            self.config.fast_period,
            self.config.slow_period,
            self.config.signal_period,
        )
        .and_then(|macd| macd.last_histogram())
        .ok_or(Error::InsufficientHistory {
            have: candles.len(),
            need,
        })?;

        tracing::debug!(hist, "macd_ha histogram");

        Ok(if hist > 0.0 {
            PositionSignal::Long
        } else if hist < 0.0 {
            PositionSignal::Short
        } else {
            PositionSignal::Neutral
        })
    }

    fn name(&self) -> &str {
        "macd_ha"
    }

    fn min_candles_required(&self) -> usize {
        macd_min_prices(self.config.slow_period, self.config.signal_period, 1)
    }
}
