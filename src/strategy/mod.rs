// Trading strategy module
pub mod chandelier;
pub mod macd_heikin_ashi;
pub mod macd_rsi;
pub mod triple_rsi;

use crate::error::{Error, Result};
use crate::models::{Candle, PositionSignal, Signal};

pub use chandelier::{ChandelierConfig, ChandelierStrategy};
pub use macd_heikin_ashi::{MacdHeikinAshiConfig, MacdHeikinAshiStrategy};
pub use macd_rsi::{MacdRsiConfig, MacdRsiStrategy};
pub use triple_rsi::{TripleRsiConfig, TripleRsiStrategy};

/// Base trait for all trading strategies
///
/// Strategies see the full rolling window, oldest candle first, and may keep
/// state between calls.
pub trait Strategy: Send {
    /// Recommend an action for the newest candle in the window
    fn scout(&mut self, candles: &[Candle]) -> Result<Signal>;

    /// Get strategy name
    fn name(&self) -> &str;

    /// Minimum candles required for this strategy
    fn min_candles_required(&self) -> usize;
}

/// Strategies that report a desired position instead of an action
pub trait PositionStrategy: Send {
    fn scout(&mut self, candles: &[Candle]) -> Result<PositionSignal>;

    fn name(&self) -> &str;

    fn min_candles_required(&self) -> usize;
}

/// Exposes a [`PositionStrategy`] through the action vocabulary.
///
/// Long maps to Buy, Short to Sell and Neutral to Hold. The adapter keeps no
/// state of its own.
#[derive(Debug, Clone)]
pub struct PositionAdapter<S> {
    inner: S,
}

impl<S: PositionStrategy> PositionAdapter<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: PositionStrategy> Strategy for PositionAdapter<S> {
    fn scout(&mut self, candles: &[Candle]) -> Result<Signal> {
        self.inner.scout(candles).map(Signal::from)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn min_candles_required(&self) -> usize {
        self.inner.min_candles_required()
    }
}

/// Names accepted by [`from_name`]; `rsi_simple` is also taken as `triple_rsi`
pub const STRATEGY_NAMES: [&str; 4] = ["macd_rsi", "triple_rsi", "macd_ha", "chandelier"];

/// Build a strategy with its default parameters by name
pub fn from_name(name: &str) -> Result<Box<dyn Strategy>> {
    let strategy: Box<dyn Strategy> = match name {
        "macd_rsi" => Box::new(MacdRsiStrategy::default()),
        "triple_rsi" | "rsi_simple" => Box::new(TripleRsiStrategy::default()),
        "macd_ha" => Box::new(PositionAdapter::new(MacdHeikinAshiStrategy::default())),
        "chandelier" => Box::new(PositionAdapter::new(ChandelierStrategy::default())),
        other => {
            return Err(Error::Config(format!(
                "unknown strategy '{}', expected one of {}",
                other,
                STRATEGY_NAMES.join(", ")
            )))
        }
    };

    Ok(strategy)
}

pub(crate) fn ensure_history(candles: &[Candle], need: usize) -> Result<()> {
    if candles.len() < need {
        return Err(Error::InsufficientHistory {
            have: candles.len(),
            need,
        });
    }
    Ok(())
}

pub(crate) fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}
