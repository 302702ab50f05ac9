/// Calculate the Relative Strength Index series using Wilder's smoothing.
///
/// The first average gain/loss is the simple mean of the first `period`
/// price changes; later values are smoothed as
/// `avg = (avg * (period - 1) + change) / period`.
///
/// One value is produced per price from index `period` onward, so the output
/// holds `prices.len() - period` values. A window with no losses reads 100,
/// a completely flat window reads 50.
pub fn rsi_series(prices: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || prices.len() < period + 1 {
        return Vec::new();
    }

    let changes: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();

    let mut avg_gain = changes[..period].iter().map(|c| c.max(0.0)).sum::<f64>() / period as f64;
    let mut avg_loss = changes[..period].iter().map(|c| (-c).max(0.0)).sum::<f64>() / period as f64;

    let mut series = Vec::with_capacity(changes.len() - period + 1);
    series.push(rsi_from_averages(avg_gain, avg_loss));

    let smoothing = period as f64;
    for change in &changes[period..] {
        avg_gain = (avg_gain * (smoothing - 1.0) + change.max(0.0)) / smoothing;
        avg_loss = (avg_loss * (smoothing - 1.0) + (-change).max(0.0)) / smoothing;
        series.push(rsi_from_averages(avg_gain, avg_loss));
    }

    series
}

/// Calculate the latest Relative Strength Index (RSI)
///
/// Values:
/// - RSI > 70: Overbought
/// - RSI < 30: Oversold
pub fn calculate_rsi(prices: &[f64], period: usize) -> Option<f64> {
    rsi_series(prices, period).last().copied()
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        if avg_gain == 0.0 {
            return 50.0;
        }
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}
