use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::VecDeque;
use wenmoon::execution::{CandleBuffer, Trader};
use wenmoon::settings::RiskConfig;
use wenmoon::{Candle, Position, Result, Signal, Strategy};

struct ScriptedStrategy {
    signals: VecDeque<Signal>,
}

impl Strategy for ScriptedStrategy {
    fn scout(&mut self, _candles: &[Candle]) -> Result<Signal> {
        Ok(self.signals.pop_front().unwrap_or(Signal::Hold))
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn min_candles_required(&self) -> usize {
        1
    }
}

fn candle_at(hour: i64, close: f64) -> Candle {
    let open_time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(hour);
    Candle {
        open_time,
        close_time: open_time + Duration::hours(1) - Duration::milliseconds(1),
        open: close,
        high: close,
        low: close,
        close,
        volume: 1.0,
        is_closed: true,
    }
}

fn signal_strategy() -> impl proptest::strategy::Strategy<Value = Signal> {
    prop_oneof![Just(Signal::Buy), Just(Signal::Sell), Just(Signal::Hold)]
}

proptest! {
    /// The window never exceeds capacity and stays strictly ordered by close time.
    #[test]
    fn window_is_bounded_and_ordered(
        max_candles in 1usize..20,
        hours in proptest::collection::vec(0i64..200, 0..80),
    ) {
        let mut buffer = CandleBuffer::new(max_candles);

        for hour in hours {
            let before = buffer.snapshot();
            let admitted = buffer.push_closed_candle(candle_at(hour, 100.0)).is_ok();
            if !admitted {
                prop_assert_eq!(buffer.snapshot(), before);
            }

            prop_assert!(buffer.len() <= max_candles);
            let window = buffer.snapshot();
            prop_assert!(window.windows(2).all(|w| w[0].close_time < w[1].close_time));
        }
    }

    /// A historical load keeps exactly the newest closed candles, up to capacity.
    #[test]
    fn load_historical_keeps_newest(
        max_candles in 1usize..30,
        count in 0i64..60,
        now_hour in 0i64..80,
    ) {
        let mut buffer = CandleBuffer::new(max_candles);
        let candles: Vec<Candle> = (0..count).rev().map(|h| candle_at(h, 1.0 + h as f64)).collect();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(now_hour);

        let loaded = buffer.load_historical(candles, now);

        let closed = (0..count).filter(|h| candle_at(*h, 1.0).close_time < now).count();
        prop_assert_eq!(loaded, closed.min(max_candles));
        prop_assert!(buffer.snapshot().iter().all(|c| c.close_time < now && c.is_closed));
        if let Some(latest) = buffer.latest() {
            let newest_closed = (0..count)
                .filter(|h| candle_at(*h, 1.0).close_time < now)
                .max()
                .unwrap();
            prop_assert_eq!(latest.close_time, candle_at(newest_closed, 1.0).close_time);
        }
    }

    /// Funds sit in exactly one asset and each cycle trades at most once.
    #[test]
    fn trader_keeps_balances_exclusive(
        start_long in any::<bool>(),
        start_balance in 1.0f64..100_000.0,
        test_fee in 0.0f64..5.0,
        profit_target in proptest::option::of(0.1f64..50.0),
        stop_loss in proptest::option::of(-50.0f64..-0.1),
        steps in proptest::collection::vec((signal_strategy(), 0.01f64..100_000.0), 1..60),
    ) {
        let start_position = if start_long { Position::Long } else { Position::Short };
        let risk = RiskConfig { test_fee, profit_target, stop_loss };
        let mut trader = Trader::new(start_position, start_balance, &risk);
        let mut strategy = ScriptedStrategy {
            signals: steps.iter().map(|(signal, _)| *signal).collect(),
        };

        let mut window = Vec::new();
        for (hour, (_, price)) in steps.iter().enumerate() {
            window.push(candle_at(hour as i64, *price));
            let trades_before = trader.account().buy_count + trader.account().sell_count;
            let position_before = trader.position();

            let outcome = trader.on_closed_candle(&mut strategy, &window);

            let account = trader.account();
            let trades_after = account.buy_count + account.sell_count;
            prop_assert!(trades_after - trades_before <= 1);
            prop_assert_eq!(outcome.trade.is_some(), trades_after != trades_before);
            prop_assert_eq!(outcome.trade.is_some(), trader.position() != position_before);

            match trader.position() {
                Position::Long => {
                    prop_assert_eq!(account.fiat_balance, 0.0);
                    prop_assert!(account.coin_balance > 0.0);
                }
                Position::Short => {
                    prop_assert_eq!(account.coin_balance, 0.0);
                    prop_assert!(account.fiat_balance > 0.0);
                    prop_assert_eq!(account.current_trade_profit, 0.0);
                }
            }

            if let Some(trade) = &outcome.trade {
                prop_assert_eq!(trade.timestamp, window[hour].close_time);
                prop_assert!(trade.fee_applied >= 0.0);
            }
        }
    }
}
