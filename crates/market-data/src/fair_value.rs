//! Fair-value / quote generator
//!
//! On every cycle the perp/futures ratios are pushed into the divergence
//! tracker and the futures top of book is scaled by a low (bid) and high
//! (ask) percentile of those ratios to get theoretical prices. The quote
//! then leans one tick inside the perp book, capped by the theoretical
//! price, and a synthetic trade marker is emitted whenever the perp book
//! crosses it.
//!
//! A cycle needs the futures and perp top of book. If either is missing the
//! cycle is skipped without touching any state.

use crate::context::QuoteContext;
use crate::divergence::DivergenceTracker;
use crate::error::MarketDataError;
use crate::store::TimeSeriesStore;
use crate::types::{NormalizedEvent, TimestampMs};
use crate::Result;
use chrono::{DateTime, Timelike, Utc};
use common::{Mode, SeriesKey, Side, Venue};
use config::{HourGuardConfig, QuotingConfig};
use tracing::{info, trace};

pub const FUTURES_BID: SeriesKey = SeriesKey::top_of_book(Venue::BinanceFutures, Side::Buy);
pub const FUTURES_ASK: SeriesKey = SeriesKey::top_of_book(Venue::BinanceFutures, Side::Sell);
pub const PERP_BID: SeriesKey = SeriesKey::top_of_book(Venue::Hyperliquid, Side::Buy);
pub const PERP_ASK: SeriesKey = SeriesKey::top_of_book(Venue::Hyperliquid, Side::Sell);

/// Keys whose writes trigger a cycle
pub const TRIGGER_KEYS: [SeriesKey; 4] = [FUTURES_BID, FUTURES_ASK, PERP_BID, PERP_ASK];

/// Widening around the top of every hour.
///
/// Reads UTC wall time, not the host's local time zone. Perp funding
/// settles on UTC hours, and the two only differ in zones with a
/// non-whole-hour offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourGuard {
    pub enabled: bool,
    pub window_seconds: u32,
    pub widen_fraction: f64,
}

impl HourGuard {
    /// True from HH:59:(60-w) through HH:00:w inclusive
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        let into_hour = now.minute() * 60 + now.second();
        into_hour >= 3600 - self.window_seconds.min(3600) || into_hour <= self.window_seconds
    }
}

impl Default for HourGuard {
    fn default() -> Self {
        Self::from(&HourGuardConfig::default())
    }
}

impl From<&HourGuardConfig> for HourGuard {
    fn from(config: &HourGuardConfig) -> Self {
        Self {
            enabled: config.enabled,
            window_seconds: config.window_seconds,
            widen_fraction: config.widen_fraction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FairValueParams {
    pub bid_percentile: f64,
    pub ask_percentile: f64,
    pub tick_exponent_offset: i32,
    pub divergence_capacity: usize,
    pub hour_guard: HourGuard,
}

impl FairValueParams {
    pub fn from_config(quoting: &QuotingConfig, hour_guard: &HourGuardConfig) -> Self {
        Self {
            bid_percentile: quoting.bid_percentile,
            ask_percentile: quoting.ask_percentile,
            tick_exponent_offset: quoting.tick_exponent_offset,
            divergence_capacity: quoting.divergence_capacity,
            hour_guard: hour_guard.into(),
        }
    }

    /// Price increment derived from the magnitude of `price`.
    /// NaN for non-positive prices.
    pub fn tick(&self, price: f64) -> f64 {
        let magnitude = price.log10().floor();
        if !magnitude.is_finite() {
            return f64::NAN;
        }
        10f64.powi(magnitude as i32 - self.tick_exponent_offset)
    }
}

impl Default for FairValueParams {
    fn default() -> Self {
        Self::from_config(&QuotingConfig::default(), &HourGuardConfig::default())
    }
}

/// Synthetic trade emitted when the perp book crosses the theoretical price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeMarker {
    pub side: Side,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub mode: Mode,
    pub timestamp: TimestampMs,
    /// Emitted as both the synthetic bid and ask
    pub price: f64,
    pub bid_theo: f64,
    pub ask_theo: f64,
    pub tick: f64,
    pub hour_guard_active: bool,
    pub marker: Option<TradeMarker>,
}

impl Quote {
    pub fn events(&self) -> Vec<NormalizedEvent> {
        let mut events = vec![
            NormalizedEvent::new(SeriesKey::top_of_book(Venue::Synthetic, Side::Buy), self.timestamp, self.price),
            NormalizedEvent::new(SeriesKey::top_of_book(Venue::Synthetic, Side::Sell), self.timestamp, self.price),
        ];
        if let Some(marker) = self.marker {
            events.push(NormalizedEvent::new(
                SeriesKey::trade(Venue::Synthetic, marker.side),
                self.timestamp,
                marker.price,
            ));
        }
        events
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// An input series had no value yet
    Skipped { missing: SeriesKey },
    Quoted(Quote),
}

impl CycleOutcome {
    pub fn quote(&self) -> Option<&Quote> {
        match self {
            CycleOutcome::Quoted(quote) => Some(quote),
            CycleOutcome::Skipped { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FairValueGenerator {
    divergence: DivergenceTracker,
    params: FairValueParams,
}

struct TopOfBook {
    bid: f64,
    ask: f64,
}

fn top_of_book(store: &TimeSeriesStore, bid: SeriesKey, ask: SeriesKey) -> std::result::Result<TopOfBook, SeriesKey> {
    let bid = store.try_latest(bid).ok_or(bid)?.price;
    let ask = store.try_latest(ask).ok_or(ask)?.price;
    Ok(TopOfBook { bid, ask })
}

fn finite(name: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(MarketDataError::unexpected(format!("{} is not finite: {}", name, value)))
    }
}

impl FairValueGenerator {
    pub fn new(params: FairValueParams) -> Self {
        Self {
            divergence: DivergenceTracker::new(params.divergence_capacity),
            params,
        }
    }

    pub fn params(&self) -> &FairValueParams {
        &self.params
    }

    pub fn divergence(&self) -> &DivergenceTracker {
        &self.divergence
    }

    pub fn divergence_mut(&mut self) -> &mut DivergenceTracker {
        &mut self.divergence
    }

    /// Compute the quote for the current store contents.
    ///
    /// Pushes one ratio per side unless the cycle is skipped or fails.
    pub fn evaluate(
        &mut self,
        store: &TimeSeriesStore,
        ctx: &QuoteContext,
        now: DateTime<Utc>,
    ) -> Result<CycleOutcome> {
        let futures = match top_of_book(store, FUTURES_BID, FUTURES_ASK) {
            Ok(book) => book,
            Err(missing) => return Ok(CycleOutcome::Skipped { missing }),
        };
        let tick = finite("tick", self.params.tick(futures.bid))?;

        let perp = match top_of_book(store, PERP_BID, PERP_ASK) {
            Ok(book) => book,
            Err(missing) => return Ok(CycleOutcome::Skipped { missing }),
        };

        let bid_ratio = finite("bid ratio", perp.bid / futures.bid)?;
        let ask_ratio = finite("ask ratio", perp.ask / futures.ask)?;
        self.divergence.push_bid(bid_ratio);
        self.divergence.push_ask(ask_ratio);

        let bid_pct = self
            .divergence
            .percentile(Side::Buy, self.params.bid_percentile)
            .ok_or_else(|| MarketDataError::unexpected("bid ratio buffer empty after push"))?;
        let ask_pct = self
            .divergence
            .percentile(Side::Sell, self.params.ask_percentile)
            .ok_or_else(|| MarketDataError::unexpected("ask ratio buffer empty after push"))?;

        let mut bid_theo = finite("bid theo", bid_pct * futures.bid)?;
        let mut ask_theo = finite("ask theo", ask_pct * futures.ask)?;

        let guard = self.params.hour_guard;
        let hour_guard_active = guard.is_active(now);
        if hour_guard_active {
            bid_theo *= 1.0 - guard.widen_fraction;
            ask_theo *= 1.0 + guard.widen_fraction;
        }

        let (price, marker) = match ctx.mode() {
            Mode::Buying => {
                let buy_price = (perp.bid + tick).min(bid_theo);
                let marker = (perp.ask < bid_theo).then_some(TradeMarker {
                    side: Side::Buy,
                    price: perp.ask,
                });
                (buy_price, marker)
            }
            Mode::Selling => {
                let sell_price = (perp.ask - tick).max(ask_theo);
                let marker = (perp.bid > ask_theo).then_some(TradeMarker {
                    side: Side::Sell,
                    price: perp.bid,
                });
                (sell_price, marker)
            }
        };

        Ok(CycleOutcome::Quoted(Quote {
            mode: ctx.mode(),
            timestamp: ctx.venue_time(now.timestamp_millis()),
            price: finite("quote", price)?,
            bid_theo,
            ask_theo,
            tick,
            hour_guard_active,
            marker,
        }))
    }

    /// Evaluate and write the synthetic series back into the store
    pub fn run_cycle(
        &mut self,
        store: &mut TimeSeriesStore,
        ctx: &QuoteContext,
        now: DateTime<Utc>,
    ) -> Result<CycleOutcome> {
        let outcome = self.evaluate(store, ctx, now)?;

        match &outcome {
            CycleOutcome::Skipped { missing } => {
                trace!(%missing, "Fair-value cycle skipped");
            }
            CycleOutcome::Quoted(quote) => {
                for event in quote.events() {
                    store.append_event(&event);
                }
                trace!(
                    mode = %quote.mode,
                    price = quote.price,
                    bid_theo = quote.bid_theo,
                    ask_theo = quote.ask_theo,
                    "Synthetic quote"
                );
                if let Some(marker) = quote.marker {
                    info!(side = %marker.side, price = marker.price, mode = %quote.mode, "Synthetic trade marker");
                }
            }
        }

        Ok(outcome)
    }
}

impl Default for FairValueGenerator {
    fn default() -> Self {
        Self::new(FairValueParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{OrderingPolicy, Retention};
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, s).unwrap()
    }

    fn store_at(now: DateTime<Utc>) -> TimeSeriesStore {
        let clock = Arc::new(ManualClock::at(now));
        TimeSeriesStore::new(clock, Retention::default(), OrderingPolicy::Reorder)
    }

    fn seeded_generator() -> FairValueGenerator {
        let mut generator = FairValueGenerator::default();
        for _ in 0..200 {
            generator.divergence_mut().push_bid(1.005);
            generator.divergence_mut().push_ask(1.005);
        }
        generator
    }

    fn books(store: &mut TimeSeriesStore, ts: TimestampMs) {
        store.append(FUTURES_BID, ts, 100.0);
        store.append(FUTURES_ASK, ts, 100.1);
        store.append(PERP_BID, ts, 99.9);
        store.append(PERP_ASK, ts, 100.2);
    }

    #[test]
    fn test_tick_from_price_magnitude() {
        let params = FairValueParams::default();
        assert!((params.tick(100.0) - 0.01).abs() < 1e-12);
        assert!((params.tick(65_000.0) - 1.0).abs() < 1e-12);
        assert!((params.tick(0.5) - 0.00001).abs() < 1e-12);
        assert!(params.tick(0.0).is_nan());
    }

    #[test]
    fn test_hour_guard_window() {
        let guard = HourGuard::default();
        assert!(guard.is_active(at(12, 59, 50)));
        assert!(guard.is_active(at(13, 0, 0)));
        assert!(guard.is_active(at(13, 0, 10)));
        assert!(!guard.is_active(at(12, 59, 49)));
        assert!(!guard.is_active(at(13, 0, 11)));
        assert!(!guard.is_active(at(12, 30, 0)));

        let disabled = HourGuard { enabled: false, ..guard };
        assert!(!disabled.is_active(at(13, 0, 0)));
    }

    #[test]
    fn test_buying_quote_and_marker() {
        let now = at(12, 30, 0);
        let mut store = store_at(now);
        books(&mut store, now.timestamp_millis());
        let mut generator = seeded_generator();
        let ctx = QuoteContext::default();

        let outcome = generator.run_cycle(&mut store, &ctx, now).unwrap();
        let quote = outcome.quote().unwrap();

        assert!((quote.bid_theo - 100.5).abs() < 1e-9);
        assert!((quote.price - 99.91).abs() < 1e-9);
        assert!(!quote.hour_guard_active);
        assert_eq!(quote.marker, Some(TradeMarker { side: Side::Buy, price: 100.2 }));

        let synthetic_bid = store.latest(SeriesKey::top_of_book(Venue::Synthetic, Side::Buy)).unwrap();
        let synthetic_ask = store.latest(SeriesKey::top_of_book(Venue::Synthetic, Side::Sell)).unwrap();
        assert!((synthetic_bid.price - 99.91).abs() < 1e-9);
        assert_eq!(synthetic_bid, synthetic_ask);
        assert_eq!(synthetic_bid.timestamp, now.timestamp_millis());

        let marker = store.latest(SeriesKey::trade(Venue::Synthetic, Side::Buy)).unwrap();
        assert_eq!(marker.price, 100.2);
    }

    #[test]
    fn test_hour_guard_widens_theoretical_prices() {
        let now = at(12, 59, 55);
        let mut store = store_at(now);
        books(&mut store, now.timestamp_millis());
        let mut generator = seeded_generator();

        let outcome = generator.run_cycle(&mut store, &QuoteContext::default(), now).unwrap();
        let quote = outcome.quote().unwrap();

        assert!(quote.hour_guard_active);
        assert!((quote.bid_theo - 100.5 * 0.99).abs() < 1e-9);
        assert!((quote.ask_theo - 100.1 * 1.005 * 1.01).abs() < 1e-9);
        // the widened bid theo now caps the quote and the perp ask no longer crosses it
        assert!((quote.price - 100.5 * 0.99).abs() < 1e-9);
        assert_eq!(quote.marker, None);
    }

    #[test]
    fn test_selling_quote_and_marker() {
        let now = at(12, 30, 0);
        let mut store = store_at(now);
        let ts = now.timestamp_millis();
        store.append(FUTURES_BID, ts, 100.0);
        store.append(FUTURES_ASK, ts, 100.1);
        store.append(PERP_BID, ts, 101.0);
        store.append(PERP_ASK, ts, 101.2);
        let mut generator = seeded_generator();
        let mut ctx = QuoteContext::default();
        ctx.set_mode(Mode::Selling);

        let outcome = generator.run_cycle(&mut store, &ctx, now).unwrap();
        let quote = outcome.quote().unwrap();

        let ask_theo = 100.1 * 1.005;
        assert!((quote.ask_theo - ask_theo).abs() < 1e-9);
        // max(101.2 - 0.01, 100.6005)
        assert!((quote.price - 101.19).abs() < 1e-9);
        assert_eq!(quote.marker, Some(TradeMarker { side: Side::Sell, price: 101.0 }));
        assert_eq!(store.len(SeriesKey::trade(Venue::Synthetic, Side::Sell)), 1);
    }

    #[test]
    fn test_missing_data_emits_nothing() {
        let now = at(12, 30, 0);
        let mut store = store_at(now);
        let ts = now.timestamp_millis();
        store.append(FUTURES_BID, ts, 100.0);
        store.append(FUTURES_ASK, ts, 100.1);
        let mut generator = FairValueGenerator::default();

        let outcome = generator.run_cycle(&mut store, &QuoteContext::default(), now).unwrap();

        assert_matches!(outcome, CycleOutcome::Skipped { missing } if missing == PERP_BID);
        assert!(generator.divergence().buffer(Side::Buy).is_empty());
        assert_eq!(store.len(SeriesKey::top_of_book(Venue::Synthetic, Side::Buy)), 0);
        assert_eq!(store.series_count(), 2);
    }

    #[test]
    fn test_missing_futures_skips_first() {
        let now = at(12, 30, 0);
        let store = store_at(now);
        let outcome = FairValueGenerator::default()
            .evaluate(&store, &QuoteContext::default(), now)
            .unwrap();
        assert_eq!(outcome, CycleOutcome::Skipped { missing: FUTURES_BID });
    }

    #[test]
    fn test_non_finite_ratio_is_unexpected() {
        let now = at(12, 30, 0);
        let mut store = store_at(now);
        let ts = now.timestamp_millis();
        store.append(FUTURES_BID, ts, 0.0);
        store.append(FUTURES_ASK, ts, 100.1);
        store.append(PERP_BID, ts, 99.9);
        store.append(PERP_ASK, ts, 100.2);
        let mut generator = FairValueGenerator::default();

        assert_matches!(
            generator.run_cycle(&mut store, &QuoteContext::default(), now),
            Err(MarketDataError::Unexpected(_))
        );
        assert!(generator.divergence().buffer(Side::Sell).is_empty());
    }
}
