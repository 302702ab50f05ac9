use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{
    AccountState, Candle, Position, Signal, TradeEvent, TradeReason, TradeSide,
};
use crate::settings::RiskConfig;
use crate::strategy::Strategy;

/// Result of one closed-candle decision cycle
#[derive(Debug)]
pub struct CycleOutcome {
    /// What the strategy recommended (Hold when it could not decide)
    pub signal: Signal,
    /// Unrealised profit in percent computed at the start of the cycle
    pub current_trade_profit: f64,
    /// Trade executed this cycle, at most one
    pub trade: Option<TradeEvent>,
    /// Trade that was due but skipped
    pub skipped: Option<Error>,
}

/// Position/trade state machine for a single pair
///
/// The account is always fully in one asset: `Long` holds coin, `Short` holds
/// fiat. Each closed candle runs one cycle: refresh profit, ask the strategy,
/// check exits while long, check entries while short.
pub struct Trader {
    position: Position,
    account: AccountState,
    fee_fraction: f64,
    profit_target: Option<f64>,
    stop_loss: Option<f64>,
}

impl Trader {
    pub fn new(start_position: Position, start_balance: f64, risk: &RiskConfig) -> Self {
        Self {
            position: start_position,
            account: AccountState::new(start_position, start_balance),
            fee_fraction: risk.fee_fraction(),
            profit_target: risk.profit_target,
            stop_loss: risk.stop_loss,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn account(&self) -> &AccountState {
        &self.account
    }

    pub fn fee_fraction(&self) -> f64 {
        self.fee_fraction
    }

    /// Run one decision cycle against the current window
    ///
    /// The newest candle in `window` is the one that just closed; its close
    /// price is the execution price for any trade.
    pub fn on_closed_candle(
        &mut self,
        strategy: &mut dyn Strategy,
        window: &[Candle],
    ) -> CycleOutcome {
        let Some(latest) = window.last() else {
            return CycleOutcome {
                signal: Signal::Hold,
                current_trade_profit: self.account.current_trade_profit,
                trade: None,
                skipped: None,
            };
        };

        let price = latest.close;
        let profit = self.trade_profit(price);
        self.account.current_trade_profit = profit;

        let signal = match strategy.scout(window) {
            Ok(signal) => signal,
            Err(Error::InsufficientHistory { have, need }) => {
                tracing::debug!(
                    strategy = strategy.name(),
                    "Not enough candles to decide ({} of {}), holding",
                    have,
                    need
                );
                Signal::Hold
            }
            Err(e) => {
                tracing::warn!(strategy = strategy.name(), "Strategy failed, holding: {}", e);
                Signal::Hold
            }
        };

        tracing::debug!(
            position = %self.position,
            ?signal,
            profit,
            "Checked strategy"
        );

        let mut outcome = CycleOutcome {
            signal,
            current_trade_profit: profit,
            trade: None,
            skipped: None,
        };

        let Some((side, reason)) = self.decide(signal, profit) else {
            return outcome;
        };

        let result = match side {
            TradeSide::Buy => self.buy(price, latest.close_time, reason),
            TradeSide::Sell => self.sell(price, latest.close_time, reason),
        };

        match result {
            Ok(event) => outcome.trade = Some(event),
            Err(e) => {
                tracing::warn!("Trade skipped: {}", e);
                outcome.skipped = Some(e);
            }
        }

        outcome
    }

    /// Unrealised profit of the open trade in percent, net of one fee
    ///
    /// Zero when short, and when long without a recorded buy (started long).
    pub fn trade_profit(&self, price: f64) -> f64 {
        match self.position {
            Position::Long if self.account.newest_buy_price > 0.0 => {
                let buy_price = self.account.newest_buy_price;
                100.0 * (1.0 - self.fee_fraction) * (price - buy_price) / buy_price
            }
            _ => 0.0,
        }
    }

    /// Pick the trade for this cycle
    ///
    /// While long: strategy sell, then profit target, then stop loss; the first
    /// that holds is the reason. While short: strategy buy only.
    fn decide(&self, signal: Signal, profit: f64) -> Option<(TradeSide, TradeReason)> {
        match self.position {
            Position::Long => {
                if signal == Signal::Sell {
                    Some((TradeSide::Sell, TradeReason::Strategy))
                } else if self.profit_target.is_some_and(|target| profit >= target) {
                    Some((TradeSide::Sell, TradeReason::ProfitTarget))
                } else if self.stop_loss.is_some_and(|stop| profit <= stop) {
                    Some((TradeSide::Sell, TradeReason::StopLoss))
                } else {
                    None
                }
            }
            Position::Short => {
                (signal == Signal::Buy).then_some((TradeSide::Buy, TradeReason::Strategy))
            }
        }
    }

    /// Convert the whole fiat balance into coin
    fn buy(&mut self, price: f64, at: DateTime<Utc>, reason: TradeReason) -> Result<TradeEvent> {
        if self.account.fiat_balance == 0.0 {
            return Err(Error::ZeroBalanceTrade {
                side: TradeSide::Buy,
                asset: "fiat",
            });
        }
        ensure_positive_price(price)?;

        let spent = self.account.fiat_balance;
        let gross = spent / price;
        let quantity = gross * (1.0 - self.fee_fraction);
        ensure_positive_fill(quantity, self.fee_fraction)?;

        self.account.fiat_balance = 0.0;
        self.account.coin_balance = quantity;
        self.account.newest_buy_price = price;
        self.account.buy_count += 1;
        self.position = Position::Long;
        self.account.current_trade_profit = self.trade_profit(price);

        tracing::info!(
            price,
            quantity,
            %reason,
            "Going long: bought {:.8} at {}",
            quantity,
            price
        );

        Ok(TradeEvent {
            id: Uuid::new_v4(),
            timestamp: at,
            side: TradeSide::Buy,
            price,
            quantity_before: spent,
            quantity_after: quantity,
            fee_applied: gross - quantity,
            reason,
        })
    }

    /// Convert the whole coin balance into fiat
    fn sell(&mut self, price: f64, at: DateTime<Utc>, reason: TradeReason) -> Result<TradeEvent> {
        if self.account.coin_balance == 0.0 {
            return Err(Error::ZeroBalanceTrade {
                side: TradeSide::Sell,
                asset: "coin",
            });
        }
        ensure_positive_price(price)?;

        let spent = self.account.coin_balance;
        let gross = spent * price;
        let quantity = gross * (1.0 - self.fee_fraction);
        ensure_positive_fill(quantity, self.fee_fraction)?;

        self.account.coin_balance = 0.0;
        self.account.fiat_balance = quantity;
        self.account.sell_count += 1;
        self.position = Position::Short;
        self.account.current_trade_profit = 0.0;

        tracing::info!(
            price,
            quantity,
            %reason,
            "Going short: sold at {} for {:.8}",
            price,
            quantity
        );

        Ok(TradeEvent {
            id: Uuid::new_v4(),
            timestamp: at,
            side: TradeSide::Sell,
            price,
            quantity_before: spent,
            quantity_after: quantity,
            fee_applied: gross - quantity,
            reason,
        })
    }
}

/// A fill that leaves nothing would strand the account in neither asset
fn ensure_positive_fill(quantity: f64, fee_fraction: f64) -> Result<()> {
    if quantity > 0.0 && quantity.is_finite() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "fee of {}% leaves nothing to receive",
            fee_fraction * 100.0
        )))
    }
}

fn ensure_positive_price(price: f64) -> Result<()> {
    if price > 0.0 && price.is_finite() {
        Ok(())
    } else {
        Err(Error::MalformedKline(format!(
            "cannot trade at close price {}",
            price
        )))
    }
}
