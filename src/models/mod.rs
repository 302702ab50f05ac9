use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Fixed-interval OHLCV price summary
///
/// Built by the normalizer from exchange data and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub is_closed: bool,
}

impl Candle {
    /// Average of open, high, low and close
    pub fn ohlc4(&self) -> f64 {
        (self.open + self.high + self.low + self.close) / 4.0
    }
}

/// Canonical strategy recommendation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

/// Desired position reported by position-style strategies
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PositionSignal {
    Long,
    Short,
    Neutral,
}

impl From<PositionSignal> for Signal {
    fn from(signal: PositionSignal) -> Self {
        match signal {
            PositionSignal::Long => Signal::Buy,
            PositionSignal::Short => Signal::Sell,
            PositionSignal::Neutral => Signal::Hold,
        }
    }
}

/// Which asset the account currently sits in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// Fully in coin
    #[serde(alias = "coin")]
    Long,
    /// Fully in fiat
    #[serde(alias = "fiat")]
    Short,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Long => write!(f, "long"),
            Position::Short => write!(f, "short"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

/// Why a trade fired
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TradeReason {
    Strategy,
    ProfitTarget,
    StopLoss,
}

impl fmt::Display for TradeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeReason::Strategy => write!(f, "strategy"),
            TradeReason::ProfitTarget => write!(f, "profit target"),
            TradeReason::StopLoss => write!(f, "stop loss"),
        }
    }
}

/// Executed trade, appended to the trade log
///
/// `quantity_before` is the spent balance (fiat for a buy, coin for a sell),
/// `quantity_after` the received balance net of fee, and `fee_applied` the fee
/// in units of the received asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub side: TradeSide,
    pub price: f64,
    pub quantity_before: f64,
    pub quantity_after: f64,
    pub fee_applied: f64,
    pub reason: TradeReason,
}

/// Balances and counters for the single traded pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountState {
    pub coin_balance: f64,
    pub fiat_balance: f64,
    pub newest_buy_price: f64,
    /// Unrealised profit of the open trade in percent, 0 when not long
    pub current_trade_profit: f64,
    pub buy_count: u64,
    pub sell_count: u64,
}

impl AccountState {
    /// Starting account: the whole balance sits in the asset of `position`
    pub fn new(position: Position, start_balance: f64) -> Self {
        let (coin_balance, fiat_balance) = match position {
            Position::Long => (start_balance, 0.0),
            Position::Short => (0.0, start_balance),
        };

        Self {
            coin_balance,
            fiat_balance,
            newest_buy_price: 0.0,
            current_trade_profit: 0.0,
            buy_count: 0,
            sell_count: 0,
        }
    }

    /// Fiat value of the coin balance at `price`
    pub fn fiat_value(&self, price: f64) -> f64 {
        self.coin_balance * price
    }

    /// Coin value of the fiat balance at `price`
    pub fn coin_value(&self, price: f64) -> f64 {
        if price > 0.0 {
            self.fiat_balance / price
        } else {
            0.0
        }
    }
}
