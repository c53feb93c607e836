//! Feed normalizer
//!
//! Turns venue-specific payloads into [`NormalizedEvent`]s. Messages for
//! other symbols or channels produce no events; malformed payloads are
//! errors.
//!
//! Timestamp policy:
//! - futures and perp books use the venue event time
//! - spot books carry none and are stamped `now - latency`
//! - trades use the venue trade time
//!
//! Futures book updates and spot trades feed the latency estimate.

use crate::context::QuoteContext;
use crate::depth::{depth_weighted_price, DEFAULT_FALLBACK_DIVISOR, DEFAULT_TARGET_NOTIONAL};
use crate::error::MarketDataError;
use crate::types::{FeedMessage, NormalizedEvent, PriceLevel, TimestampMs};
use crate::wire::{
    self, BinanceAggTrade, BinanceDepthUpdate, BinanceSpotDepth, HyperliquidBook, HyperliquidFrame,
    HyperliquidTrade,
};
use crate::Result;
use common::{Channel, Instrument, SeriesKey, Side, Venue};
use config::QuotingConfig;
use serde::Deserialize;
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub struct FeedNormalizer {
    instrument: Instrument,
    target_notional: f64,
    fallback_divisor: f64,
    /// The first non-empty Hyperliquid trades batch is a backlog
    perp_backlog_pending: bool,
}

impl FeedNormalizer {
    pub fn new(instrument: Instrument) -> Self {
        Self {
            instrument,
            target_notional: DEFAULT_TARGET_NOTIONAL,
            fallback_divisor: DEFAULT_FALLBACK_DIVISOR,
            perp_backlog_pending: true,
        }
    }

    pub fn from_config(instrument: Instrument, config: &QuotingConfig) -> Self {
        Self {
            target_notional: config.target_notional,
            fallback_divisor: config.depth_fallback_divisor,
            ..Self::new(instrument)
        }
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    /// Call after a perp venue reconnect so the replayed backlog is skipped
    pub fn reset_perp_backlog(&mut self) {
        self.perp_backlog_pending = true;
    }

    pub fn normalize(
        &mut self,
        msg: &FeedMessage,
        ctx: &mut QuoteContext,
        now: TimestampMs,
    ) -> Result<Vec<NormalizedEvent>> {
        let expected = self.instrument.symbol_for(msg.venue);
        if msg.symbol.as_str() != expected {
            trace!(venue = %msg.venue, symbol = %msg.symbol, "Ignoring message for other symbol");
            return Ok(Vec::new());
        }

        match (msg.venue, msg.channel) {
            (Venue::BinanceFutures, Channel::Book) => self.futures_book(msg, ctx, now),
            (Venue::BinanceSpot, Channel::Book) => self.spot_book(msg, ctx, now),
            (Venue::BinanceFutures | Venue::BinanceSpot, Channel::Trades) => {
                self.binance_trade(msg, ctx, now)
            }
            (Venue::Hyperliquid, Channel::Book) => self.perp_book(msg),
            (Venue::Hyperliquid, Channel::Trades) => self.perp_trades(msg),
            (venue, channel) => {
                trace!(%venue, %channel, "Ignoring message");
                Ok(Vec::new())
            }
        }
    }

    fn futures_book(
        &self,
        msg: &FeedMessage,
        ctx: &mut QuoteContext,
        now: TimestampMs,
    ) -> Result<Vec<NormalizedEvent>> {
        if event_type(msg) != Some(wire::BINANCE_DEPTH_UPDATE) {
            return Ok(Vec::new());
        }
        let update = BinanceDepthUpdate::deserialize(&msg.payload)?;
        if update.symbol != self.instrument.exchange_symbol() {
            return Ok(Vec::new());
        }

        let events = self.book_events(
            Venue::BinanceFutures,
            update.event_time,
            &wire::levels(&update.bids),
            &wire::levels(&update.asks),
        )?;

        let latency = ctx.record_venue_timestamp(now, update.event_time);
        trace!(latency_ms = latency, "Latency estimate updated from futures book");
        Ok(events)
    }

    fn spot_book(
        &self,
        msg: &FeedMessage,
        ctx: &QuoteContext,
        now: TimestampMs,
    ) -> Result<Vec<NormalizedEvent>> {
        let depth = BinanceSpotDepth::deserialize(&msg.payload)?;
        self.book_events(
            Venue::BinanceSpot,
            ctx.venue_time(now),
            &wire::levels(&depth.bids),
            &wire::levels(&depth.asks),
        )
    }

    fn binance_trade(
        &self,
        msg: &FeedMessage,
        ctx: &mut QuoteContext,
        now: TimestampMs,
    ) -> Result<Vec<NormalizedEvent>> {
        if event_type(msg) != Some(wire::BINANCE_AGG_TRADE) {
            return Ok(Vec::new());
        }
        let trade = BinanceAggTrade::deserialize(&msg.payload)?;
        if trade.symbol != self.instrument.exchange_symbol() {
            return Ok(Vec::new());
        }

        let price = positive_price(trade.price)?;
        let side = if trade.buyer_is_maker { Side::Sell } else { Side::Buy };

        if msg.venue == Venue::BinanceSpot {
            ctx.record_venue_timestamp(now, trade.trade_time);
        }

        Ok(vec![NormalizedEvent::new(
            SeriesKey::trade(msg.venue, side),
            trade.trade_time,
            price,
        )])
    }

    fn perp_book(&self, msg: &FeedMessage) -> Result<Vec<NormalizedEvent>> {
        let frame = HyperliquidFrame::<HyperliquidBook>::deserialize(&msg.payload)?;
        let book = frame.data;
        if book.coin != self.instrument.perp_symbol() {
            return Ok(Vec::new());
        }

        match book.levels.as_slice() {
            [bids, asks, ..] => self.book_events(
                Venue::Hyperliquid,
                book.time,
                &wire::levels(bids),
                &wire::levels(asks),
            ),
            _ => {
                debug!(levels = book.levels.len(), "Perp book without both sides");
                Ok(Vec::new())
            }
        }
    }

    fn perp_trades(&mut self, msg: &FeedMessage) -> Result<Vec<NormalizedEvent>> {
        let frame = HyperliquidFrame::<Vec<HyperliquidTrade>>::deserialize(&msg.payload)?;
        if frame.data.is_empty() {
            return Ok(Vec::new());
        }

        if self.perp_backlog_pending {
            self.perp_backlog_pending = false;
            debug!(trades = frame.data.len(), "Discarding perp trade backlog");
            return Ok(Vec::new());
        }

        frame
            .data
            .iter()
            .filter(|t| t.coin == self.instrument.perp_symbol())
            .map(|t| {
                let side = if t.is_aggressor_buy() { Side::Buy } else { Side::Sell };
                Ok(NormalizedEvent::new(
                    SeriesKey::trade(Venue::Hyperliquid, side),
                    t.time,
                    positive_price(t.px)?,
                ))
            })
            .collect()
    }

    /// Top of book and depth-weighted price for both sides
    fn book_events(
        &self,
        venue: Venue,
        timestamp: TimestampMs,
        bids: &[PriceLevel],
        asks: &[PriceLevel],
    ) -> Result<Vec<NormalizedEvent>> {
        let best_bid = positive_price(first_price(bids, "bid")?)?;
        let best_ask = positive_price(first_price(asks, "ask")?)?;
        let deep_bid = depth_weighted_price(bids, self.target_notional, self.fallback_divisor)?;
        let deep_ask = depth_weighted_price(asks, self.target_notional, self.fallback_divisor)?;

        Ok(vec![
            NormalizedEvent::new(SeriesKey::top_of_book(venue, Side::Buy), timestamp, best_bid),
            NormalizedEvent::new(SeriesKey::top_of_book(venue, Side::Sell), timestamp, best_ask),
            NormalizedEvent::new(SeriesKey::depth_weighted(venue, Side::Buy), timestamp, deep_bid),
            NormalizedEvent::new(SeriesKey::depth_weighted(venue, Side::Sell), timestamp, deep_ask),
        ])
    }
}

fn event_type(msg: &FeedMessage) -> Option<&str> {
    msg.payload.get("e").and_then(|e| e.as_str())
}

fn first_price(levels: &[PriceLevel], side: &str) -> Result<f64> {
    levels
        .first()
        .map(|l| l.price)
        .ok_or_else(|| MarketDataError::invalid_input(format!("empty {} ladder", side)))
}

fn positive_price(price: f64) -> Result<f64> {
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(MarketDataError::invalid_input(format!("price must be positive, got {}", price)))
    }
}
