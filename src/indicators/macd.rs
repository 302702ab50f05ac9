/// Moving Average Convergence Divergence
///
/// `line` is EMA(fast) - EMA(slow), `signal` is the EMA of the line and
/// `histogram` is line - signal. All three are aligned to the most recent
/// price: the last element of each belongs to the last input value.
use super::moving_average::ema_series;

#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

impl Macd {
    pub fn last_line(&self) -> Option<f64> {
        self.line.last().copied()
    }

    /// Latest histogram value
    pub fn last_histogram(&self) -> Option<f64> {
        self.histogram.last().copied()
    }

    /// Histogram value before the latest one
    pub fn previous_histogram(&self) -> Option<f64> {
        self.histogram.iter().rev().nth(1).copied()
    }
}

/// Number of prices needed for `histogram_values` histogram entries
pub fn macd_min_prices(slow: usize, signal: usize, histogram_values: usize) -> usize {
    (slow + signal + histogram_values).saturating_sub(2)
}

/// Calculate MACD with the given fast/slow/signal periods.
///
/// Returns None when the prices can't produce at least one histogram value
/// or when `fast >= slow`.
pub fn calculate_macd(prices: &[f64], fast: usize, slow: usize, signal: usize) -> Option<Macd> {
    if fast == 0 || signal == 0 || fast >= slow || prices.len() < macd_min_prices(slow, signal, 1) {
        return None;
    }

    let fast_ema = ema_series(prices, fast);
    let slow_ema = ema_series(prices, slow);

    // fast_ema starts `slow - fast` prices earlier than slow_ema
    let offset = fast_ema.len() - slow_ema.len();
    let line: Vec<f64> = fast_ema[offset..]
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();

    let signal_line = ema_series(&line, signal);
    if signal_line.is_empty() {
        return None;
    }

    let histogram = line[line.len() - signal_line.len()..]
        .iter()
        .zip(&signal_line)
        .map(|(l, s)| l - s)
        .collect();

    Some(Macd {
        line,
        signal: signal_line,
        histogram,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macd_insufficient_data() {
        let prices: Vec<f64> = (0..10).map(|i| i as f64).collect();
        assert!(calculate_macd(&prices, 3, 6, 5).is_none());
        assert!(calculate_macd(&prices, 6, 3, 2).is_none());
    }

    #[test]
    fn test_macd_lengths_align_to_tail() {
        let prices: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let macd = calculate_macd(&prices, 3, 6, 4).unwrap();

        assert_eq!(macd.line.len(), 30 - 6 + 1);
        assert_eq!(macd.signal.len(), macd.line.len() - 4 + 1);
        assert_eq!(macd.histogram.len(), macd.signal.len());
        assert_eq!(macd_min_prices(6, 4, 1), 9);
        assert!(calculate_macd(&prices[..9], 3, 6, 4).is_some());
        assert!(calculate_macd(&prices[..8], 3, 6, 4).is_none());
    }

    #[test]
    fn test_macd_flat_prices_are_zero() {
        let prices = vec![50.0; 40];
        let macd = calculate_macd(&prices, 12, 26, 9).unwrap();
        assert!(macd.line.iter().all(|v| v.abs() < 1e-12));
        assert!(macd.histogram.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_macd_uptrend_positive_line() {
        // Accelerating uptrend keeps the histogram above zero
        let prices: Vec<f64> = (0..60).map(|i| 100.0 * 1.02f64.powi(i)).collect();
        let macd = calculate_macd(&prices, 12, 26, 9).unwrap();

        assert!(macd.last_line().unwrap() > 0.0);
        assert!(macd.last_histogram().unwrap() > 0.0);
        assert!(macd.previous_histogram().unwrap() > 0.0);
    }

    #[test]
    fn test_macd_downtrend_negative_line() {
        let prices: Vec<f64> = (0..60).map(|i| 100.0 * 0.98f64.powi(i)).collect();
        let macd = calculate_macd(&prices, 12, 26, 9).unwrap();
        assert!(macd.last_line().unwrap() < 0.0);
    }
}
