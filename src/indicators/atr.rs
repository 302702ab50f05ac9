/// True range and scaled Average True Range
///
/// True Range is the greatest of:
/// - Current High - Current Low
/// - Abs(Current High - Previous Close)
/// - Abs(Current Low - Previous Close)
use super::moving_average::ema_series;
use crate::models::Candle;

/// True range for each candle after the first
pub fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .windows(2)
        .map(|pair| {
            let high = pair[1].high;
            let low = pair[1].low;
            let prev_close = pair[0].close;

            (high - low)
                .max((high - prev_close).abs())
                .max((low - prev_close).abs())
        })
        .collect()
}

/// EMA of `multiplier * true range` over `period`.
///
/// Returns an empty vector if there are fewer than `period + 1` candles.
pub fn scaled_atr_series(candles: &[Candle], period: usize, multiplier: f64) -> Vec<f64> {
    let scaled: Vec<f64> = true_ranges(candles)
        .into_iter()
        .map(|tr| tr * multiplier)
        .collect();

    ema_series(&scaled, period)
}
