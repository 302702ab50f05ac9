use super::{closes, ensure_history, Strategy};
use crate::error::{Error, Result};
use crate::indicators::rsi_series;
use crate::models::{Candle, Signal};

#[derive(Debug, Clone)]
pub struct TripleRsiConfig {
    pub fast_period: usize,
    pub mid_period: usize,
    pub slow_period: usize,
}

impl Default for TripleRsiConfig {
    fn default() -> Self {
        Self {
            fast_period: 6,
            mid_period: 12,
            slow_period: 24,
        }
    }
}

/// Three RSI speeds read together
///
/// Buys while the slow RSI is rising. Sells once the slow RSI stops rising
/// and the fast > mid > slow stack has broken down; otherwise holds.
#[derive(Debug, Clone, Default)]
pub struct TripleRsiStrategy {
    config: TripleRsiConfig,
}

impl TripleRsiStrategy {
    pub fn new(config: TripleRsiConfig) -> Self {
        Self { config }
    }
}

impl Strategy for TripleRsiStrategy {
    fn scout(&mut self, candles: &[Candle]) -> Result<Signal> {
        let need = self.min_candles_required();
        ensure_history(candles, need)?;

        let prices = closes(candles);
        let fast = rsi_series(&prices, self.config.fast_period);
        let mid = rsi_series(&prices, self.config.mid_period);
        let slow = rsi_series(&prices, self.config.slow_period);

        let (fast, mid, slow_prev, slow) = match (
            fast.last(),
            mid.last(),
            slow.iter().rev().nth(1),
            slow.last(),
        ) {
            (Some(&f), Some(&m), Some(&sp), Some(&s)) => (f, m, sp, s),
            _ => {
                return Err(Error::InsufficientHistory {
                    have: candles.len(),
                    need,
                })
            }
        };

        let slow_rising = slow > slow_prev;
        let stacked = fast > mid && mid > slow;

        tracing::debug!(fast, mid, slow, slow_rising, stacked, "triple_rsi indicators");

        if slow_rising {
            Ok(Signal::Buy)
        } else if !stacked {
            Ok(Signal::Sell)
        } else {
            Ok(Signal::Hold)
        }
    }

    fn name(&self) -> &str {
        "triple_rsi"
    }

    fn min_candles_required(&self) -> usize {
        let longest = self
            .config
            .fast_period
            .max(self.config.mid_period)
            .max(self.config.slow_period);
        // Two slow RSI values to tell whether it is rising
        longest + 2
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

    /// Prices bouncing between 100 and 101
    fn zigzag() -> Vec<f64> {
        (0..30).map(|i| if i % 2 == 1 { 101.0 } else { 100.0 }).collect()
    }

    #[test]
    fn test_strategy_requires_sufficient_data() {
        let mut strategy = TripleRsiStrategy::default();
        assert_eq!(strategy.min_candles_required(), 26);

        let candles = create_test_candles(&[100.0; 25]);
        assert!(matches!(
            strategy.scout(&candles),
            Err(Error::InsufficientHistory { have: 25, need: 26 })
        ));
    }

    #[test]
    fn test_buy_when_slow_rsi_rises() {
        let mut strategy = TripleRsiStrategy::default();
        let mut prices = zigzag();
        prices.push(103.0);

        assert_eq!(strategy.scout(&create_test_candles(&prices)).unwrap(), Signal::Buy);
    }

    #[test]
    fn test_sell_when_slow_rsi_falls_and_stack_breaks() {
        let mut strategy = TripleRsiStrategy::default();
        let mut prices = zigzag();
        prices.push(99.0);

        assert_eq!(strategy.scout(&create_test_candles(&prices)).unwrap(), Signal::Sell);
    }

    #[test]
    fn test_hold_while_stack_intact() {
        let mut strategy = TripleRsiStrategy::default();

        // Slow drift down, sharp rally, then a small pullback
        let mut prices: Vec<f64> = (0..20).map(|i| 100.0 - i as f64 * 0.5).collect();
        let bottom = prices[19];
        prices.extend((1..9).map(|i| bottom + 2.0 * i as f64));
        let top = prices[prices.len() - 1];
        prices.push(top - 0.5);

        assert_eq!(strategy.scout(&create_test_candles(&prices)).unwrap(), Signal::Hold);
    }
}
