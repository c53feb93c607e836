//! Websocket feed providers
//!
//! One task per stream. Each text frame is parsed to JSON and forwarded to
//! the pump as a [`FeedMessage`]; the engine decides relevance. A dropped
//! connection is retried after a fixed delay.

use anyhow::{Context, Result};
use async_trait::async_trait;
use common::{Channel, Instrument, Symbol, Venue};
use config::FeedsConfig;
use futures_util::{SinkExt, StreamExt};
use market_data::wire::hyperliquid_subscription;
use market_data::FeedMessage;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::shutdown::run_until_shutdown;

const WS_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Both venues push at least every 100ms while the market is open
const WS_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// What providers send to the pump
#[derive(Debug)]
pub enum FeedEvent {
    Connected(Venue),
    Disconnected(Venue),
    Message(FeedMessage),
    /// Frame that was not valid JSON
    Undecodable(Venue),
}

#[async_trait]
pub trait FeedProvider: Send + Sync + 'static {
    /// Name for logging, e.g. "binance_futures@aggTrade"
    fn name(&self) -> &str;

    fn venue(&self) -> Venue;

    fn endpoint(&self) -> &str;

    /// Frames to send right after connecting
    fn subscriptions(&self) -> Vec<serde_json::Value> {
        Vec::new()
    }

    /// Wrap a decoded frame
    fn message(&self, payload: serde_json::Value) -> FeedMessage;

    /// One connection, returns when the socket closes
    async fn stream(&self, tx: &mpsc::Sender<FeedEvent>) -> Result<()> {
        let (mut ws, _) = timeout(WS_CONNECT_TIMEOUT, connect_async(self.endpoint()))
            .await
            .with_context(|| format!("connect {} timeout", self.name()))?
            .with_context(|| format!("connect {}", self.name()))?;
        info!(feed = self.name(), endpoint = self.endpoint(), "Feed connected");

        for sub in self.subscriptions() {
            ws.send(Message::Text(sub.to_string().into()))
                .await
                .with_context(|| format!("subscribe {}", self.name()))?;
        }

        tx.send(FeedEvent::Connected(self.venue()))
            .await
            .context("pump stopped")?;

        loop {
            let frame = match timeout(WS_READ_TIMEOUT, ws.next()).await {
                Ok(Some(frame)) => frame.with_context(|| format!("read {}", self.name()))?,
                Ok(None) => return Ok(()),
                Err(_) => anyhow::bail!("{} read timeout", self.name()),
            };

            let text = match frame {
                Message::Text(t) => t.to_string(),
                Message::Binary(b) => String::from_utf8_lossy(&b).to_string(),
                Message::Ping(v) => {
                    ws.send(Message::Pong(v)).await.context("send pong")?;
                    continue;
                }
                Message::Pong(_) | Message::Frame(_) => continue,
                Message::Close(_) => return Ok(()),
            };

            let event = match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(payload) => FeedEvent::Message(self.message(payload)),
                Err(e) => {
                    debug!(feed = self.name(), error = %e, "Undecodable frame");
                    FeedEvent::Undecodable(self.venue())
                }
            };
            tx.send(event).await.context("pump stopped")?;
        }
    }
}

/// Single Binance raw stream (`<base>/<symbol>@<stream>`)
pub struct BinanceStream {
    name: String,
    venue: Venue,
    channel: Channel,
    symbol: Symbol,
    endpoint: String,
}

impl BinanceStream {
    pub fn new(venue: Venue, channel: Channel, base: &str, instrument: &Instrument, stream: &str) -> Self {
        let symbol = instrument.exchange_symbol();
        Self {
            name: format!("{}@{}", venue, stream),
            venue,
            channel,
            endpoint: format!(
                "{}/{}@{}",
                base.trim_end_matches('/'),
                symbol.to_lowercase(),
                stream
            ),
            symbol: Symbol::new(symbol),
        }
    }
}

#[async_trait]
impl FeedProvider for BinanceStream {
    fn name(&self) -> &str {
        &self.name
    }

    fn venue(&self) -> Venue {
        self.venue
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn message(&self, payload: serde_json::Value) -> FeedMessage {
        FeedMessage::new(self.venue, self.channel, self.symbol.clone(), payload)
    }
}

/// Hyperliquid socket carrying both the l2Book and trades subscriptions
pub struct HyperliquidFeed {
    coin: Symbol,
    endpoint: String,
}

impl HyperliquidFeed {
    pub fn new(endpoint: &str, instrument: &Instrument) -> Self {
        Self {
            coin: Symbol::new(instrument.perp_symbol()),
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl FeedProvider for HyperliquidFeed {
    fn name(&self) -> &str {
        "hyperliquid"
    }

    fn venue(&self) -> Venue {
        Venue::Hyperliquid
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn subscriptions(&self) -> Vec<serde_json::Value> {
        vec![
            hyperliquid_subscription("l2Book", self.coin.as_str()),
            hyperliquid_subscription("trades", self.coin.as_str()),
        ]
    }

    fn message(&self, payload: serde_json::Value) -> FeedMessage {
        FeedMessage::hyperliquid(self.coin.clone(), payload)
    }
}

/// Every stream the engine consumes
pub fn all_providers(feeds: &FeedsConfig, instrument: &Instrument) -> Vec<Box<dyn FeedProvider>> {
    vec![
        Box::new(BinanceStream::new(
            Venue::BinanceFutures,
            Channel::Book,
            &feeds.binance_futures_ws,
            instrument,
            &feeds.depth_stream,
        )),
        Box::new(BinanceStream::new(
            Venue::BinanceFutures,
            Channel::Trades,
            &feeds.binance_futures_ws,
            instrument,
            "aggTrade",
        )),
        Box::new(BinanceStream::new(
            Venue::BinanceSpot,
            Channel::Book,
            &feeds.binance_spot_ws,
            instrument,
            &feeds.depth_stream,
        )),
        Box::new(BinanceStream::new(
            Venue::BinanceSpot,
            Channel::Trades,
            &feeds.binance_spot_ws,
            instrument,
            "aggTrade",
        )),
        Box::new(HyperliquidFeed::new(&feeds.hyperliquid_ws, instrument)),
    ]
}

/// Keep a provider connected until shutdown
pub async fn run_provider(
    provider: Box<dyn FeedProvider>,
    tx: mpsc::Sender<FeedEvent>,
    token: CancellationToken,
    reconnect_delay: Duration,
) {
    let venue = provider.venue();

    while !token.is_cancelled() {
        match run_until_shutdown(&token, provider.stream(&tx)).await {
            None => break,
            Some(Ok(())) => info!(feed = provider.name(), "Feed closed"),
            Some(Err(e)) => warn!(feed = provider.name(), error = %e, "Feed failed"),
        }

        if tx.send(FeedEvent::Disconnected(venue)).await.is_err() {
            break;
        }
        debug!(feed = provider.name(), delay = ?reconnect_delay, "Reconnecting");
        if run_until_shutdown(&token, tokio::time::sleep(reconnect_delay)).await.is_none() {
            break;
        }
    }

    debug!(feed = provider.name(), "Feed task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binance_endpoint() {
        let instrument = Instrument::new("btc", "usdt");
        let feed = BinanceStream::new(
            Venue::BinanceFutures,
            Channel::Book,
            "wss://fstream.binance.com/ws/",
            &instrument,
            "depth20@100ms",
        );

        assert_eq!(feed.endpoint(), "wss://fstream.binance.com/ws/btcusdt@depth20@100ms");
        assert_eq!(feed.name(), "binance_futures@depth20@100ms");

        let msg = feed.message(serde_json::json!({}));
        assert_eq!(msg.symbol.as_str(), "BTCUSDT");
        assert_eq!(msg.channel, Channel::Book);
    }

    #[test]
    fn test_hyperliquid_subscriptions() {
        let feed = HyperliquidFeed::new("wss://api.hyperliquid.xyz/ws", &Instrument::new("eth", "usdt"));
        let subs = feed.subscriptions();

        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0]["subscription"]["type"], "l2Book");
        assert_eq!(subs[1]["subscription"]["coin"], "ETH");

        let msg = feed.message(serde_json::json!({"channel": "trades", "data": []}));
        assert_eq!(msg.channel, Channel::Trades);
    }

    #[test]
    fn test_all_providers() {
        let providers = all_providers(&FeedsConfig::default(), &Instrument::new("BTC", "USDT"));
        assert_eq!(providers.len(), 5);
        assert_eq!(
            providers.iter().filter(|p| p.venue() == Venue::BinanceSpot).count(),
            2
        );
    }
}
