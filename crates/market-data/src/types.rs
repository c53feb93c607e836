//! Shared types for Market Data

use common::{Channel, SeriesKey, Symbol, Venue};
use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch
pub type TimestampMs = i64;

/// One timestamped value of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub timestamp: TimestampMs,
    pub price: f64,
}

impl DataPoint {
    pub fn new(timestamp: TimestampMs, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// Price level in an order book ladder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub size: f64,
}

impl PriceLevel {
    pub fn new(price: f64, size: f64) -> Self {
        Self { price, size }
    }

    /// Notional value of the level in quote currency
    pub fn notional(&self) -> f64 {
        self.price * self.size
    }
}

/// Raw message handed over by a feed provider
#[derive(Debug, Clone)]
pub struct FeedMessage {
    pub venue: Venue,
    pub channel: Channel,
    /// Symbol the stream was subscribed for
    pub symbol: Symbol,
    pub payload: serde_json::Value,
}

impl FeedMessage {
    pub fn new(venue: Venue, channel: Channel, symbol: impl Into<Symbol>, payload: serde_json::Value) -> Self {
        Self {
            venue,
            channel,
            symbol: symbol.into(),
            payload,
        }
    }

    /// Build a message from a Hyperliquid frame.
    ///
    /// One socket carries every subscription, so the channel is read from
    /// the frame itself.
    pub fn hyperliquid(symbol: impl Into<Symbol>, payload: serde_json::Value) -> Self {
        let channel = match payload.get("channel").and_then(|c| c.as_str()) {
            Some("l2Book") => Channel::Book,
            Some("trades") => Channel::Trades,
            _ => Channel::Other,
        };
        Self::new(Venue::Hyperliquid, channel, symbol, payload)
    }
}

/// Uniform event produced by the feed normalizer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedEvent {
    pub key: SeriesKey,
    pub timestamp: TimestampMs,
    pub price: f64,
}

impl NormalizedEvent {
    pub fn new(key: SeriesKey, timestamp: TimestampMs, price: f64) -> Self {
        Self { key, timestamp, price }
    }
}

/// Appended point as seen by presentation subscribers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesUpdate {
    pub key: SeriesKey,
    pub point: DataPoint,
}
