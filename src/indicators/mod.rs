// Technical indicators used by the strategies

pub mod atr;
pub mod heikin_ashi;
pub mod macd;
pub mod moving_average;
pub mod rsi;

pub use atr::{scaled_atr_series, true_ranges};
pub use heikin_ashi::heikin_ashi;
pub use macd::{calculate_macd, macd_min_prices, Macd};
pub use moving_average::{calculate_ema, calculate_sma, ema_series};
pub use rsi::{calculate_rsi, rsi_series};
