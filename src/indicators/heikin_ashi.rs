use crate::models::Candle;

/// Convert regular candles into Heikin-Ashi candles.
///
/// - close = (open + high + low + close) / 4
/// - open = midpoint of the previous Heikin-Ashi open and close, seeded with
///   the midpoint of the first candle's open and close
/// - high/low extend the raw range to cover the Heikin-Ashi open and close
///
/// Times, volume and the closed flag are carried over unchanged.
pub fn heikin_ashi(candles: &[Candle]) -> Vec<Candle> {
    let mut out: Vec<Candle> = Vec::with_capacity(candles.len());

    for candle in candles {
        let close = candle.ohlc4();
        let open = match out.last() {
            Some(prev) => (prev.open + prev.close) / 2.0,
            None => (candle.open + candle.close) / 2.0,
        };

        out.push(Candle {
            open,
            high: candle.high.max(open).max(close),
            low: candle.low.min(open).min(close),
            close,
            ..candle.clone()
        });
    }

    out
}
