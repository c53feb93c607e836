//! Venue payload shapes
//!
//! Only the fields the normalizer reads are declared; serde ignores the
//! rest. Prices and sizes arrive as decimal strings on both venues.

use crate::types::PriceLevel;
use serde::{Deserialize, Deserializer};

pub const BINANCE_DEPTH_UPDATE: &str = "depthUpdate";
pub const BINANCE_AGG_TRADE: &str = "aggTrade";

#[derive(Deserialize)]
#[serde(untagged)]
enum StrOrNum {
    Str(String),
    Num(f64),
}

fn de_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match StrOrNum::deserialize(deserializer)? {
        StrOrNum::Str(s) => s.trim().parse::<f64>().map_err(serde::de::Error::custom),
        StrOrNum::Num(n) => Ok(n),
    }
}

/// `["price", "qty"]` pair used by both Binance book streams
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct BinanceLevel(#[serde(deserialize_with = "de_f64")] pub f64, #[serde(deserialize_with = "de_f64")] pub f64);

impl From<BinanceLevel> for PriceLevel {
    fn from(level: BinanceLevel) -> Self {
        PriceLevel::new(level.0, level.1)
    }
}

/// Futures partial book depth event (`<symbol>@depth20@100ms`)
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceDepthUpdate {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "E")]
    pub event_time: i64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "b")]
    pub bids: Vec<BinanceLevel>,
    #[serde(rename = "a")]
    pub asks: Vec<BinanceLevel>,
}

/// Spot partial book depth snapshot. Carries no symbol and no timestamp.
#[derive(Debug, Clone, Deserialize)]
pub struct BinanceSpotDepth {
    #[serde(rename = "lastUpdateId", default)]
    pub last_update_id: u64,
    pub bids: Vec<BinanceLevel>,
    pub asks: Vec<BinanceLevel>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceAggTrade {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "p", deserialize_with = "de_f64")]
    pub price: f64,
    #[serde(rename = "T")]
    pub trade_time: i64,
    /// Buyer is the maker, so the aggressor sold
    #[serde(rename = "m")]
    pub buyer_is_maker: bool,
}

/// Hyperliquid push frame `{ "channel": ..., "data": ... }`
#[derive(Debug, Clone, Deserialize)]
pub struct HyperliquidFrame<T> {
    pub channel: String,
    pub data: T,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HyperliquidLevel {
    #[serde(deserialize_with = "de_f64")]
    pub px: f64,
    #[serde(deserialize_with = "de_f64")]
    pub sz: f64,
    #[serde(default)]
    pub n: u32,
}

impl From<HyperliquidLevel> for PriceLevel {
    fn from(level: HyperliquidLevel) -> Self {
        PriceLevel::new(level.px, level.sz)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HyperliquidBook {
    pub coin: String,
    pub time: i64,
    /// `[bids, asks]`
    pub levels: Vec<Vec<HyperliquidLevel>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HyperliquidTrade {
    pub coin: String,
    /// "B" aggressor bought, "A" aggressor sold
    pub side: String,
    #[serde(deserialize_with = "de_f64")]
    pub px: f64,
    pub time: i64,
}

impl HyperliquidTrade {
    pub fn is_aggressor_buy(&self) -> bool {
        self.side == "B"
    }
}

/// Subscription request sent after connecting
pub fn hyperliquid_subscription(kind: &str, coin: &str) -> serde_json::Value {
    serde_json::json!({
        "method": "subscribe",
        "subscription": { "type": kind, "coin": coin }
    })
}

pub fn levels<L: Into<PriceLevel> + Copy>(raw: &[L]) -> Vec<PriceLevel> {
    raw.iter().copied().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_depth_update_decodes_string_levels() {
        let payload = json!({
            "e": "depthUpdate", "E": 1700000000123_i64, "T": 1700000000120_i64, "s": "BTCUSDT",
            "U": 1, "u": 2, "pu": 0,
            "b": [["100.5", "2.0"], ["100.4", "1"]],
            "a": [["100.6", "3.5"]]
        });

        let update = BinanceDepthUpdate::deserialize(&payload).unwrap();
        assert_eq!(update.event_type, BINANCE_DEPTH_UPDATE);
        assert_eq!(update.event_time, 1700000000123);
        assert_eq!(update.bids.len(), 2);
        assert_eq!(PriceLevel::from(update.asks[0]), PriceLevel::new(100.6, 3.5));
    }

    #[test]
    fn test_agg_trade() {
        let payload = json!({
            "e": "aggTrade", "E": 1, "s": "ETHUSDT", "a": 5, "p": "2000.10", "q": "0.5",
            "f": 1, "l": 2, "T": 1700000000000_i64, "m": true
        });

        let trade = BinanceAggTrade::deserialize(&payload).unwrap();
        assert_eq!(trade.price, 2000.10);
        assert!(trade.buyer_is_maker);
    }

    #[test]
    fn test_hyperliquid_book() {
        let payload = json!({
            "channel": "l2Book",
            "data": {
                "coin": "BTC", "time": 1700000000000_i64,
                "levels": [[{"px": "99.9", "sz": "10", "n": 2}], [{"px": "100.2", "sz": "4", "n": 1}]]
            }
        });

        let frame = HyperliquidFrame::<HyperliquidBook>::deserialize(&payload).unwrap();
        assert_eq!(frame.data.levels[1][0].px, 100.2);
    }

    #[test]
    fn test_malformed_price_is_an_error() {
        let payload = json!({"e": "aggTrade", "s": "BTCUSDT", "p": "abc", "T": 1, "m": false});
        assert!(BinanceAggTrade::deserialize(&payload).is_err());
    }
}
