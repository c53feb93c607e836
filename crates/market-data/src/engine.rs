use crate::clock::SharedClock;
use crate::context::QuoteContext;
use crate::fair_value::{CycleOutcome, FairValueGenerator, FairValueParams, TRIGGER_KEYS};
use crate::normalizer::FeedNormalizer;
use crate::store::{InsertOutcome, TimeSeriesStore};
use crate::types::{DataPoint, FeedMessage, SeriesUpdate, TimestampMs};
use crate::Result;
use common::{Instrument, Mode, SeriesKey};
use config::StalegunConfig;
use tokio::sync::broadcast;
use tracing::{debug, instrument};

/// Result of handling one feed message
#[derive(Debug, Clone, PartialEq)]
pub struct HandleReport {
    /// Normalized events produced by the message
    pub events: usize,
    /// Events the store kept under its ordering policy
    pub stored: usize,
    /// Set when the message touched a trigger key
    pub cycle: Option<CycleOutcome>,
}

/// Single-writer processing step: normalize, store, then at most one
/// fair-value cycle per message
#[derive(Debug)]
pub struct QuoteEngine {
    store: TimeSeriesStore,
    normalizer: FeedNormalizer,
    generator: FairValueGenerator,
    context: QuoteContext,
    clock: SharedClock,
}

impl QuoteEngine {
    pub fn new(
        mut store: TimeSeriesStore,
        normalizer: FeedNormalizer,
        generator: FairValueGenerator,
        context: QuoteContext,
        clock: SharedClock,
    ) -> Self {
        for key in TRIGGER_KEYS {
            store.watch(key);
        }
        Self {
            store,
            normalizer,
            generator,
            context,
            clock,
        }
    }

    pub fn from_config(config: &StalegunConfig, clock: SharedClock) -> Self {
        let instrument = config.instrument.to_instrument();
        Self::new(
            TimeSeriesStore::from_config(&config.quoting, clock.clone()),
            FeedNormalizer::from_config(instrument, &config.quoting),
            FairValueGenerator::new(FairValueParams::from_config(&config.quoting, &config.hour_guard)),
            QuoteContext::from_config(&config.quoting),
            clock,
        )
    }

    #[instrument(skip_all, fields(venue = %msg.venue, channel = %msg.channel))]
    pub fn handle(&mut self, msg: &FeedMessage) -> Result<HandleReport> {
        let now = self.clock.now_ms();
        let events = self.normalizer.normalize(msg, &mut self.context, now)?;

        let stored = events
            .iter()
            .map(|event| self.store.append_event(event))
            .filter(InsertOutcome::is_stored)
            .count();

        Ok(HandleReport {
            events: events.len(),
            stored,
            cycle: self.run_pending_cycle()?,
        })
    }

    /// One cycle if any trigger key was written since the last drain.
    ///
    /// Writes to several trigger keys still run a single cycle.
    fn run_pending_cycle(&mut self) -> Result<Option<CycleOutcome>> {
        let touched = self.store.drain_notifications();
        if touched.is_empty() {
            return Ok(None);
        }
        debug!(touched = touched.len(), "Trigger keys updated");
        self.generator
            .run_cycle(&mut self.store, &self.context, self.clock.utc_now())
            .map(Some)
    }

    pub fn set_mode(&mut self, mode: Mode) -> Mode {
        let mode = self.context.set_mode(mode);
        debug!(%mode, "Quoting mode changed");
        mode
    }

    pub fn mode(&self) -> Mode {
        self.context.mode()
    }

    pub fn latency_ms(&self) -> f64 {
        self.context.latency().read()
    }

    pub fn instrument(&self) -> &Instrument {
        self.normalizer.instrument()
    }

    /// Skip the next perp trade batch, used after a reconnect
    pub fn reset_perp_backlog(&mut self) {
        self.normalizer.reset_perp_backlog();
    }

    /// Presentation sink. A write to a trigger key runs its cycle here.
    pub fn append(&mut self, key: SeriesKey, timestamp: TimestampMs, price: f64) -> Result<HandleReport> {
        let outcome = self.store.append(key, timestamp, price);
        Ok(HandleReport {
            events: 1,
            stored: usize::from(outcome.is_stored()),
            cycle: self.run_pending_cycle()?,
        })
    }

    pub fn latest(&self, key: SeriesKey) -> Result<DataPoint> {
        self.store.latest(key)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SeriesUpdate> {
        self.store.subscribe()
    }

    pub fn store(&self) -> &TimeSeriesStore {
        &self.store
    }

    pub fn generator(&self) -> &FairValueGenerator {
        &self.generator
    }

    pub fn generator_mut(&mut self) -> &mut FairValueGenerator {
        &mut self.generator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::error::MarketDataError;
    use crate::fair_value::{FUTURES_BID, PERP_BID, TradeMarker};
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};
    use common::{Channel, Side, Venue};
    use config::generate_default_config;
    use serde_json::json;
    use std::sync::Arc;

    fn engine() -> (QuoteEngine, Arc<ManualClock>) {
        let noon = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let clock = Arc::new(ManualClock::at(noon));
        let engine = QuoteEngine::from_config(&generate_default_config(), clock.clone());
        (engine, clock)
    }

    fn futures_book(ts: i64) -> FeedMessage {
        FeedMessage::new(
            Venue::BinanceFutures,
            Channel::Book,
            "BTCUSDT",
            json!({"e": "depthUpdate", "E": ts, "s": "BTCUSDT",
                "b": [["100.0", "100"]], "a": [["100.1", "100"]]}),
        )
    }

    fn perp_book(ts: i64) -> FeedMessage {
        FeedMessage::hyperliquid(
            "BTC",
            json!({"channel": "l2Book", "data": {"coin": "BTC", "time": ts,
                "levels": [[{"px": "99.9", "sz": "100", "n": 1}], [{"px": "100.2", "sz": "100", "n": 1}]]}}),
        )
    }

    #[test]
    fn test_missing_perp_skips_cycle() {
        let (mut engine, clock) = engine();

        let report = engine.handle(&futures_book(clock.now_ms())).unwrap();

        assert_eq!(report.events, 4);
        assert_eq!(report.stored, 4);
        assert_matches!(report.cycle, Some(CycleOutcome::Skipped { missing }) if missing == PERP_BID);
        assert!(engine.latest(SeriesKey::top_of_book(Venue::Synthetic, Side::Buy)).is_err());
    }

    #[test]
    fn test_both_venues_produce_quote() {
        let (mut engine, clock) = engine();
        for _ in 0..200 {
            engine.generator_mut().divergence_mut().push_bid(1.005);
            engine.generator_mut().divergence_mut().push_ask(1.005);
        }

        engine.handle(&futures_book(clock.now_ms())).unwrap();
        let report = engine.handle(&perp_book(clock.now_ms())).unwrap();

        let quote = report.cycle.as_ref().and_then(CycleOutcome::quote).unwrap();
        assert!((quote.price - 99.91).abs() < 1e-9);
        assert_eq!(quote.marker, Some(TradeMarker { side: Side::Buy, price: 100.2 }));

        // the futures message skipped, so only the perp message pushed a ratio
        let bids = engine.generator().divergence().buffer(Side::Buy);
        assert_eq!(bids.iter().filter(|r| **r != 1.005).count(), 1);
        assert_eq!(bids.iter().last(), Some(&(99.9 / 100.0)));
        let synthetic = engine.latest(SeriesKey::top_of_book(Venue::Synthetic, Side::Sell)).unwrap();
        assert!((synthetic.price - 99.91).abs() < 1e-9);
    }

    #[test]
    fn test_non_trigger_message_runs_no_cycle() {
        let (mut engine, clock) = engine();
        let spot = FeedMessage::new(
            Venue::BinanceSpot,
            Channel::Book,
            "BTCUSDT",
            json!({"bids": [["99.5", "100"]], "asks": [["99.6", "100"]]}),
        );

        let report = engine.handle(&spot).unwrap();
        assert_eq!(report.events, 4);
        assert!(report.cycle.is_none());

        let other_coin = FeedMessage::new(
            Venue::BinanceFutures,
            Channel::Book,
            "ETHUSDT",
            futures_book(clock.now_ms()).payload,
        );
        let ignored = engine.handle(&other_coin).unwrap();
        assert_eq!(ignored, HandleReport { events: 0, stored: 0, cycle: None });
    }

    #[test]
    fn test_sink_write_to_trigger_key_runs_cycle() {
        let (mut engine, clock) = engine();

        let report = engine.append(FUTURES_BID, clock.now_ms(), 100.0).unwrap();
        assert_eq!(report.stored, 1);
        assert_matches!(report.cycle, Some(CycleOutcome::Skipped { .. }));

        // nothing left pending for the next feed message
        let spot = FeedMessage::new(
            Venue::BinanceSpot,
            Channel::Book,
            "BTCUSDT",
            json!({"bids": [["99.5", "100"]], "asks": [["99.6", "100"]]}),
        );
        assert!(engine.handle(&spot).unwrap().cycle.is_none());
    }

    #[test]
    fn test_sink_write_to_other_key_runs_no_cycle() {
        let (mut engine, clock) = engine();
        let key = SeriesKey::trade(Venue::BinanceSpot, Side::Buy);

        let report = engine.append(key, clock.now_ms(), 101.5).unwrap();

        assert_eq!(report, HandleReport { events: 1, stored: 1, cycle: None });
        assert!(engine.generator().divergence().buffer(Side::Buy).is_empty());
    }

    #[test]
    fn test_invalid_message_propagates() {
        let (mut engine, _) = engine();
        let bad = FeedMessage::hyperliquid("BTC", json!({"channel": "l2Book", "data": {"coin": "BTC"}}));
        assert_matches!(engine.handle(&bad), Err(MarketDataError::Decode(_)));
    }

    #[test]
    fn test_mode_switch_changes_quote() {
        let (mut engine, clock) = engine();
        assert_eq!(engine.set_mode(Mode::Selling), Mode::Selling);

        engine.handle(&futures_book(clock.now_ms())).unwrap();
        let report = engine.handle(&perp_book(clock.now_ms())).unwrap();

        let quote = report.cycle.as_ref().and_then(CycleOutcome::quote).unwrap();
        assert_eq!(quote.mode, Mode::Selling);
    }
}
