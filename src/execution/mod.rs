// Candle ingestion, trade state machine and the bot loop
pub mod bot;
pub mod candle_buffer;
pub mod normalizer;
pub mod price_feed;
pub mod trader;

pub use bot::Bot;
pub use candle_buffer::CandleBuffer;
pub use normalizer::{normalize_historical, parse_kline_message, KlineEvent};
pub use price_feed::{FeedEvent, KlineStream};
pub use trader::{CycleOutcome, Trader};
