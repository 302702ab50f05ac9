use crate::models::{AccountState, Candle, Position, TradeEvent};
use crate::persistence::CsvLog;
use crate::settings::{DisplayConfig, ReportConfig};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const STATUS_HEADER: &[&str] = &["time", "fiat_balance", "coin_balance", "fiat_value", "coin_value"];

pub const TRADE_HEADER: &[&str] = &[
    "id",
    "timestamp",
    "side",
    "price",
    "quantity_before",
    "quantity_after",
    "fee_applied",
    "reason",
];

/// One status log row, valued at the candle close
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusRow {
    pub time: DateTime<Utc>,
    pub fiat_balance: f64,
    pub coin_balance: f64,
    pub fiat_value: f64,
    pub coin_value: f64,
}

impl StatusRow {
    pub fn new(account: &AccountState, candle: &Candle) -> Self {
        Self {
            time: candle.close_time,
            fiat_balance: account.fiat_balance,
            coin_balance: account.coin_balance,
            fiat_value: account.fiat_value(candle.close),
            coin_value: account.coin_value(candle.close),
        }
    }
}

#[derive(Debug, Serialize)]
struct TradeRow {
    id: Uuid,
    timestamp: DateTime<Utc>,
    side: String,
    price: f64,
    quantity_before: f64,
    quantity_after: f64,
    fee_applied: f64,
    reason: String,
}

impl From<&TradeEvent> for TradeRow {
    fn from(event: &TradeEvent) -> Self {
        Self {
            id: event.id,
            timestamp: event.timestamp,
            side: event.side.to_string(),
            price: event.price,
            quantity_before: event.quantity_before,
            quantity_after: event.quantity_after,
            fee_applied: event.fee_applied,
            reason: event.reason.to_string(),
        }
    }
}

/// Formats account snapshots for the console and the CSV logs
///
/// This is the only component that writes durable state.
#[derive(Debug, Clone)]
pub struct StatusReporter {
    status_log: CsvLog,
    trades_log: CsvLog,
    console: bool,
    display: DisplayConfig,
}

impl StatusReporter {
    pub fn new(report: &ReportConfig, display: &DisplayConfig) -> Self {
        Self {
            status_log: CsvLog::new(&report.status_file, STATUS_HEADER),
            trades_log: CsvLog::new(&report.trades_file, TRADE_HEADER),
            console: report.console,
            display: display.clone(),
        }
    }

    /// Print the balance block (if enabled) and append a status row
    pub fn report(
        &self,
        account: &AccountState,
        position: Position,
        candle: &Candle,
    ) -> Result<StatusRow> {
        if self.console {
            println!("{}", self.render(account, position, candle));
        }

        let row = StatusRow::new(account, candle);
        self.status_log.append(&row)?;
        Ok(row)
    }

    /// Append an executed trade to the trade log
    pub fn record_trade(&self, event: &TradeEvent) -> Result<()> {
        self.trades_log.append(&TradeRow::from(event))
    }

    /// Human readable status block
    pub fn render(&self, account: &AccountState, position: Position, candle: &Candle) -> String {
        let coin = &self.display.coin_symbol;
        let fiat = &self.display.fiat_symbol;
        let rule = "$".repeat(48);

        let mut lines = Vec::with_capacity(9);
        lines.push(rule.clone());
        lines.push(format!(
            "Candle {}  O {:.8}  H {:.8}  L {:.8}  C {:.8}  V {:.4}",
            candle.close_time.format("%Y-%m-%d %H:%M:%S"),
            candle.open,
            candle.high,
            candle.low,
            candle.close,
            candle.volume
        ));
        lines.push(format!(
            "Coin balance: {:.8} {} ({:.2} {})",
            account.coin_balance,
            coin,
            account.fiat_value(candle.close),
            fiat
        ));
        lines.push(format!(
            "Fiat balance: {:.2} {} ({:.8} {})",
            account.fiat_balance,
            fiat,
            account.coin_value(candle.close),
            coin
        ));
        lines.push(format!("Position: {}", position));
        if position == Position::Long {
            lines.push(format!("Current trade profit: {:.2}%", account.current_trade_profit));
        }
        lines.push(format!(
            "Buys: {}  Sells: {}",
            account.buy_count, account.sell_count
        ));
        lines.push(rule);

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TradeReason, TradeSide};
    use chrono::{Duration, TimeZone};
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("wenmoon_{}_{}.csv", name, Uuid::new_v4()))
    }

    fn create_test_candle(close: f64) -> Candle {
        let open_time = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Candle {
            open_time,
            close_time: open_time + Duration::hours(1) - Duration::milliseconds(1),
            open: close,
            high: close,
            low: close,
            close,
            volume: 12.5,
            is_closed: true,
        }
    }

    fn create_reporter() -> (StatusReporter, PathBuf, PathBuf) {
        let status_file = temp_path("status");
        let trades_file = temp_path("trades");
        let report = ReportConfig {
            status_file: status_file.clone(),
            trades_file: trades_file.clone(),
            console: false,
        };
        let reporter = StatusReporter::new(&report, &DisplayConfig::default());
        (reporter, status_file, trades_file)
    }

    #[test]
    fn test_status_row_cross_values() {
        let mut account = AccountState::new(Position::Short, 1000.0);
        account.coin_balance = 0.5;

        let row = StatusRow::new(&account, &create_test_candle(200.0));
        assert_eq!(row.fiat_value, 100.0);
        assert_eq!(row.coin_value, 5.0);
    }

    #[test]
    fn test_report_appends_rows_with_single_header() {
        let (reporter, status_file, trades_file) = create_reporter();
        let account = AccountState::new(Position::Short, 1000.0);

        reporter.report(&account, Position::Short, &create_test_candle(100.0)).unwrap();
        reporter.report(&account, Position::Short, &create_test_candle(125.0)).unwrap();

        let mut reader = csv::Reader::from_path(&status_file).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, STATUS_HEADER);

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][1], "1000.0");
        assert_eq!(&rows[1][4], "8.0");

        std::fs::remove_file(&status_file).unwrap();
        assert!(!trades_file.exists());
    }

    #[test]
    fn test_record_trade() {
        let (reporter, status_file, trades_file) = create_reporter();
        let event = TradeEvent {
            id: Uuid::new_v4(),
            timestamp: create_test_candle(100.0).close_time,
            side: TradeSide::Sell,
            price: 100.0,
            quantity_before: 10.0,
            quantity_after: 999.0,
            fee_applied: 1.0,
            reason: TradeReason::StopLoss,
        };

        reporter.record_trade(&event).unwrap();

        let mut reader = csv::Reader::from_path(&trades_file).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, TRADE_HEADER);

        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[0], event.id.to_string());
        assert_eq!(&row[2], "sell");
        assert_eq!(&row[7], "stop loss");

        std::fs::remove_file(&trades_file).unwrap();
        assert!(!status_file.exists());
    }

    #[test]
    fn test_render_block() {
        let (reporter, _, _) = create_reporter();
        let mut account = AccountState::new(Position::Long, 2.0);
        account.current_trade_profit = 4.5;
        account.buy_count = 1;

        let block = reporter.render(&account, Position::Long, &create_test_candle(50.0));
        assert!(block.contains("Coin balance: 2.00000000 BTC (100.00 USDT)"));
        assert!(block.contains("Fiat balance: 0.00 USDT (0.00000000 BTC)"));
        assert!(block.contains("Position: long"));
        assert!(block.contains("Current trade profit: 4.50%"));
        assert!(block.contains("Buys: 1  Sells: 0"));
    }
}
