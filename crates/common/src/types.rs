//! Common types used across Stalegun
//!
//! This module provides the fundamental domain types used throughout
//! the engine: where a price came from, what kind of price it is, and
//! which side of the book it belongs to.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// Price source identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Venue {
    /// Centralized exchange, USDT-margined futures market
    BinanceFutures,
    /// Centralized exchange, spot market
    BinanceSpot,
    /// Decentralized perpetuals exchange
    Hyperliquid,
    /// Series derived by the fair-value generator
    Synthetic,
}

impl Venue {
    pub const ALL: [Venue; 4] = [
        Venue::BinanceFutures,
        Venue::BinanceSpot,
        Venue::Hyperliquid,
        Venue::Synthetic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Venue::BinanceFutures => "binance_futures",
            Venue::BinanceSpot => "binance_spot",
            Venue::Hyperliquid => "hyperliquid",
            Venue::Synthetic => "synthetic",
        }
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Venue {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Venue::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::unknown(format!("venue '{}'", s)))
    }
}

/// Kind of price carried by a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Executed trade prices
    Trade,
    /// Best bid / best ask
    TopOfBook,
    /// Price reachable for the configured notional size
    DepthWeighted,
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricKind::Trade => write!(f, "trade"),
            MetricKind::TopOfBook => write!(f, "top_of_book"),
            MetricKind::DepthWeighted => write!(f, "depth_weighted"),
        }
    }
}

/// Side of the book (bid / ask) or aggressor side of a trade (buy / sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Bid side, or a trade initiated by a buyer
    Buy,
    /// Ask side, or a trade initiated by a seller
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Composite identifier of a time series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    pub venue: Venue,
    pub kind: MetricKind,
    pub side: Side,
}

impl SeriesKey {
    pub const fn new(venue: Venue, kind: MetricKind, side: Side) -> Self {
        Self { venue, kind, side }
    }

    pub const fn top_of_book(venue: Venue, side: Side) -> Self {
        Self::new(venue, MetricKind::TopOfBook, side)
    }

    pub const fn depth_weighted(venue: Venue, side: Side) -> Self {
        Self::new(venue, MetricKind::DepthWeighted, side)
    }

    pub const fn trade(venue: Venue, side: Side) -> Self {
        Self::new(venue, MetricKind::Trade, side)
    }
}

impl std::fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.venue, self.kind, self.side)
    }
}

/// Quoting mode set by the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Quote the price we are willing to buy at
    #[default]
    Buying,
    /// Quote the price we are willing to sell at
    Selling,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Buying => "buying",
            Mode::Selling => "selling",
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Mode::Buying => Mode::Selling,
            Mode::Selling => Mode::Buying,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buying" | "buy" | "b" => Ok(Mode::Buying),
            "selling" | "sell" | "s" => Ok(Mode::Selling),
            other => Err(Error::unknown(format!("mode '{}'", other))),
        }
    }
}

/// Stream kind a feed message arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Order book snapshots / depth updates
    Book,
    /// Public trades
    Trades,
    /// Anything else the venue sends (acks, pings, errors)
    Other,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Channel::Book => write!(f, "book"),
            Channel::Trades => write!(f, "trades"),
            Channel::Other => write!(f, "other"),
        }
    }
}

/// Asset symbol (e.g., "BTC", "ETH")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    /// Create a new Symbol
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_uppercase())
    }

    /// Get the symbol as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// The single instrument being tracked (e.g., BTC quoted in USDT)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    /// Base asset, as named by the perp venue (e.g., BTC)
    pub coin: Symbol,
    /// Quote asset on the centralized venue (e.g., USDT)
    pub quote: Symbol,
}

impl Instrument {
    pub fn new(coin: impl Into<Symbol>, quote: impl Into<Symbol>) -> Self {
        Self {
            coin: coin.into(),
            quote: quote.into(),
        }
    }

    /// Symbol as the centralized venue names it (e.g., "BTCUSDT")
    pub fn exchange_symbol(&self) -> String {
        format!("{}{}", self.coin, self.quote)
    }

    /// Symbol as the perp venue names it (e.g., "BTC")
    pub fn perp_symbol(&self) -> &str {
        self.coin.as_str()
    }

    /// Symbol expected on messages from the given venue
    pub fn symbol_for(&self, venue: Venue) -> String {
        match venue {
            Venue::Hyperliquid => self.perp_symbol().to_string(),
            _ => self.exchange_symbol(),
        }
    }
}

impl std::fmt::Display for Instrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.coin, self.quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol() {
        let sym = Symbol::new("btc");
        assert_eq!(sym.as_str(), "BTC");
    }

    #[test]
    fn test_instrument_symbols() {
        let instrument = Instrument::new("eth", "usdt");
        assert_eq!(instrument.exchange_symbol(), "ETHUSDT");
        assert_eq!(instrument.perp_symbol(), "ETH");
        assert_eq!(instrument.symbol_for(Venue::Hyperliquid), "ETH");
        assert_eq!(instrument.symbol_for(Venue::BinanceSpot), "ETHUSDT");
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("buy".parse::<Mode>().unwrap(), Mode::Buying);
        assert_eq!("SELLING".parse::<Mode>().unwrap(), Mode::Selling);
        assert!("hold".parse::<Mode>().is_err());
        assert_eq!(Mode::Buying.toggled(), Mode::Selling);
    }

    #[test]
    fn test_venue_parse_roundtrip() {
        for venue in Venue::ALL {
            assert_eq!(venue.as_str().parse::<Venue>().unwrap(), venue);
        }
    }

    #[test]
    fn test_series_key_display() {
        let key = SeriesKey::top_of_book(Venue::Hyperliquid, Side::Sell);
        assert_eq!(key.to_string(), "hyperliquid/top_of_book/sell");
    }
}
