use super::{closes, ensure_history, Strategy};
use crate::error::{Error, Result};
use crate::indicators::{calculate_macd, calculate_rsi, macd_min_prices};
use crate::models::{Candle, Signal};

#[derive(Debug, Clone)]
pub struct MacdRsiConfig {
    pub rsi_period: usize,
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
    /// Buys are only taken while RSI is at or below this level
    pub rsi_cutoff: f64,
}

impl Default for MacdRsiConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            fast_period: 17,
            slow_period: 37,
            signal_period: 9,
            rsi_cutoff: 35.0,
        }
    }
}

/// MACD crossover filtered by RSI
///
/// - Buy: histogram crosses from negative to positive while the MACD line is
///   still below zero and RSI is oversold
/// - Sell: histogram crosses from positive to negative while the MACD line is
///   above zero
#[derive(Debug, Clone, Default)]
pub struct MacdRsiStrategy {
    config: MacdRsiConfig,
}

impl MacdRsiStrategy {
    pub fn new(config: MacdRsiConfig) -> Self {
        Self { config }
    }
}

impl Strategy for MacdRsiStrategy {
    fn scout(&mut self, candles: &[Candle]) -> Result<Signal> {
        let need = self.min_candles_required();
        ensure_history(candles, need)?;
        let insufficient = || Error::InsufficientHistory {
            have: candles.len(),
            need,
        };

        let prices = closes(candles);
        let rsi = calculate_rsi(&prices, self.config.rsi_period).ok_or_else(insufficient)?;
        let macd = calculate_macd(
            &prices,
            self.config.fast_period,
            self.config.slow_period,
            self.config.signal_period,
        )
        .ok_or_else(insufficient)?;

        let (line, hist, prev_hist) = match (
            macd.last_line(),
            macd.last_histogram(),
            macd.previous_histogram(),
        ) {
            (Some(line), Some(hist), Some(prev)) => (line, hist, prev),
            _ => return Err(insufficient()),
        };

        let crossed_up = prev_hist < 0.0 && hist > 0.0;
        let crossed_down = prev_hist > 0.0 && hist < 0.0;

        tracing::debug!(rsi, macd_line = line, hist, prev_hist, "macd_rsi indicators");

        if crossed_down && line > 0.0 {
            return Ok(Signal::Sell);
        }
        if crossed_up && rsi <= self.config.rsi_cutoff && line < 0.0 {
            return Ok(Signal::Buy);
        }
        Ok(Signal::Hold)
    }

    fn name(&self) -> &str {
        "macd_rsi"
    }

    fn min_candles_required(&self) -> usize {
        // Two histogram values to detect a crossover
        let macd_need = macd_min_prices(self.config.slow_period, self.config.signal_period, 2);
        macd_need.max(self.config.rsi_period + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn create_test_candles(prices: &[f64]) -> Vec<Candle> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &price)| Candle {
                open_time: base + Duration::hours(i as i64),
                close_time: base + Duration::hours(i as i64 + 1) - Duration::milliseconds(1),
                open: price,
                high: price,
                low: price,
                close: price,
                volume: 1000.0,
                is_closed: true,
            })
            .collect()
    }

    /// Accelerating sell-off that slows down into a floor
    fn decelerating_decline() -> Vec<f64> {
        let mut prices: Vec<f64> = (0..40).map(|i| 200.0 - 0.05 * (i * i) as f64).collect();
        let last = prices[39];
        for j in 1..40 {
            prices.push(last - 30.0 * (1.0 - 0.9f64.powi(j)));
        }
        prices
    }

    #[test]
    fn test_strategy_requires_sufficient_data() {
        let mut strategy = MacdRsiStrategy::default();
        assert_eq!(strategy.min_candles_required(), 46);

        let candles = create_test_candles(&[100.0; 45]);
        assert!(matches!(
            strategy.scout(&candles),
            Err(Error::InsufficientHistory { have: 45, need: 46 })
        ));
    }

    #[test]
    fn test_buy_on_oversold_crossover() {
        let mut strategy = MacdRsiStrategy::default();
        let prices = decelerating_decline();

        // Histogram is still negative one candle earlier
        let before = create_test_candles(&prices[..51]);
        assert_eq!(strategy.scout(&before).unwrap(), Signal::Hold);

        let candles = create_test_candles(&prices[..52]);
        assert_eq!(strategy.scout(&candles).unwrap(), Signal::Buy);
    }

    #[test]
    fn test_rsi_filter_blocks_buy() {
        let mut strategy = MacdRsiStrategy::new(MacdRsiConfig {
            rsi_cutoff: -1.0,
            ..MacdRsiConfig::default()
        });
        let candles = create_test_candles(&decelerating_decline()[..52]);
        assert_eq!(strategy.scout(&candles).unwrap(), Signal::Hold);
    }

    #[test]
    fn test_sell_on_overbought_crossover() {
        let mut strategy = MacdRsiStrategy::default();
        let prices: Vec<f64> = decelerating_decline().iter().map(|p| 400.0 - p).collect();

        let candles = create_test_candles(&prices[..52]);
        assert_eq!(strategy.scout(&candles).unwrap(), Signal::Sell);
    }

    #[test]
    fn test_flat_market_holds() {
        let mut strategy = MacdRsiStrategy::default();
        let candles = create_test_candles(&[100.0; 60]);
        assert_eq!(strategy.scout(&candles).unwrap(), Signal::Hold);
    }
}
