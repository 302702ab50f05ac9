//! Live Binance kline feed
//!
//! Runs in its own task and hands every parsed update to the bot through a
//! bounded mpsc channel. The bot is the only reader.

use crate::error::{Error, Result};
use crate::execution::normalizer::{parse_kline_message, KlineEvent};
use crate::settings::ExchangeConfig;
use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};
use url::Url;

const RECONNECT_DELAY: Duration = Duration::from_secs(10);

/// What the feed reports to the bot
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// A (re)connection succeeded; the bot should resync its window
    Connected,
    /// Kline update, open or closed
    Kline(KlineEvent),
    /// Connection dropped, a reconnect follows after the delay
    Disconnected(String),
}

/// Websocket subscription to `<pair>@kline_<interval>`
pub struct KlineStream {
    ws_url: String,
    symbol: String,
    interval: String,
    reconnect_delay: Duration,
    tx: mpsc::Sender<FeedEvent>,
}

impl KlineStream {
    pub fn new(config: &ExchangeConfig, tx: mpsc::Sender<FeedEvent>) -> Self {
        Self {
            ws_url: config.ws_url.trim_end_matches('/').to_string(),
            symbol: config.symbol_pair.clone(),
            interval: config.interval.clone(),
            reconnect_delay: RECONNECT_DELAY,
            tx,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn stream_url(&self) -> Result<Url> {
        let raw = format!(
            "{}/{}@kline_{}",
            self.ws_url,
            self.symbol.to_lowercase(),
            self.interval
        );
        Url::parse(&raw).map_err(|e| Error::Config(format!("invalid websocket url {}: {}", raw, e)))
    }

    /// Run the stream loop, reconnecting after a fixed delay.
    ///
    /// Returns once the receiving side of the channel is gone. Call this
    /// inside a `tokio::spawn`.
    pub async fn run(self) {
        loop {
            info!(pair = %self.symbol, interval = %self.interval, "Connecting to kline stream");

            let reason = match self.connect_once().await {
                Ok(()) => "stream closed".to_string(),
                Err(e) => e.to_string(),
            };

            if self.tx.is_closed() {
                info!("Feed receiver dropped, stopping kline stream");
                return;
            }

            warn!(pair = %self.symbol, reason = %reason, delay = ?self.reconnect_delay, "Kline stream disconnected, reconnecting");
            if self.tx.send(FeedEvent::Disconnected(reason)).await.is_err() {
                return;
            }

            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn connect_once(&self) -> Result<()> {
        let url = self.stream_url()?;

        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| Error::FeedDisconnected(e.to_string()))?;

        info!(pair = %self.symbol, "Kline stream connected");
        self.forward(FeedEvent::Connected).await?;

        let (_, mut read) = ws_stream.split();

        while let Some(msg) = read.next().await {
            let msg = msg.map_err(|e| Error::FeedDisconnected(e.to_string()))?;

            match msg {
                Message::Text(text) => match parse_kline_message(&text) {
                    Ok(Some(event)) => self.forward(FeedEvent::Kline(event)).await?,
                    Ok(None) => {}
                    Err(e) => warn!(error = %e, "Failed to parse kline event"),
                },
                Message::Close(frame) => {
                    info!(?frame, "Kline stream close frame received");
                    break;
                }
                // tungstenite answers pings on its own
                _ => {}
            }
        }

        Ok(())
    }

    async fn forward(&self, event: FeedEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| Error::FeedDisconnected("feed receiver dropped".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::SinkExt;
    use serde_json::json;
    use tokio::net::TcpListener;

    fn kline_frame(is_closed: bool) -> String {
        json!({
            "e": "kline",
            "E": 1_700_000_060_000i64,
            "s": "BTCUSDT",
            "k": {
                "t": 1_700_000_000_000i64,
                "T": 1_700_000_059_999i64,
                "s": "BTCUSDT",
                "i": "1m",
                "o": "100.0",
                "c": "101.0",
                "h": "102.0",
                "l": "99.0",
                "v": "3.5",
                "x": is_closed
            }
        })
        .to_string()
    }

    #[test]
    fn test_stream_url() {
        let (tx, _rx) = mpsc::channel(1);
        let config = ExchangeConfig {
            symbol_pair: "ETHUSDT".to_string(),
            interval: "5m".to_string(),
            ws_url: "wss://stream.binance.com:9443/ws/".to_string(),
            ..ExchangeConfig::default()
        };

        let stream = KlineStream::new(&config, tx);
        assert_eq!(
            stream.stream_url().unwrap().as_str(),
            "wss://stream.binance.com:9443/ws/ethusdt@kline_5m"
        );
    }

    #[tokio::test]
    async fn test_forwards_klines_then_reports_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
            ws.send(Message::Text(r#"{"result":null,"id":1}"#.to_string()))
                .await
                .unwrap();
            ws.send(Message::Text(kline_frame(false))).await.unwrap();
            ws.send(Message::Text(kline_frame(true))).await.unwrap();
            ws.close(None).await.unwrap();
        });

        let (tx, mut rx) = mpsc::channel(8);
        let config = ExchangeConfig {
            ws_url: format!("ws://{}/ws", addr),
            ..ExchangeConfig::default()
        };
        let feed = tokio::spawn(
            KlineStream::new(&config, tx)
                .with_reconnect_delay(Duration::from_secs(60))
                .run(),
        );

        assert_eq!(rx.recv().await, Some(FeedEvent::Connected));

        match rx.recv().await {
            Some(FeedEvent::Kline(event)) => assert!(!event.candle.is_closed),
            other => panic!("expected open kline, got {other:?}"),
        }
        match rx.recv().await {
            Some(FeedEvent::Kline(event)) => {
                assert!(event.candle.is_closed);
                assert_eq!(event.symbol, "BTCUSDT");
                assert_eq!(event.candle.close, 101.0);
            }
            other => panic!("expected closed kline, got {other:?}"),
        }
        assert!(matches!(rx.recv().await, Some(FeedEvent::Disconnected(_))));

        server.await.unwrap();
        feed.abort();
    }
}
