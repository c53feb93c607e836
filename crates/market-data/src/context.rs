use crate::latency::LatencyEstimator;
use crate::types::TimestampMs;
use common::Mode;
use config::QuotingConfig;

/// Operator mode and clock-skew estimate shared by the normalizer and the
/// fair-value generator
#[derive(Debug, Clone, Copy, Default)]
pub struct QuoteContext {
    mode: Mode,
    latency: LatencyEstimator,
}

impl QuoteContext {
    pub fn new(mode: Mode, latency: LatencyEstimator) -> Self {
        Self { mode, latency }
    }

    pub fn from_config(config: &QuotingConfig) -> Self {
        Self::new(config.initial_mode, LatencyEstimator::with_alpha(config.latency_alpha))
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: Mode) -> Mode {
        self.mode = mode;
        self.mode
    }

    pub fn toggle_mode(&mut self) -> Mode {
        self.set_mode(self.mode.toggled())
    }

    pub fn latency(&self) -> &LatencyEstimator {
        &self.latency
    }

    /// Record a trusted venue timestamp, returns the new estimate
    pub fn record_venue_timestamp(&mut self, now: TimestampMs, venue_ts: TimestampMs) -> f64 {
        self.latency.update(now, venue_ts)
    }

    /// Timestamp for locally derived or untimestamped events
    pub fn venue_time(&self, now: TimestampMs) -> TimestampMs {
        self.latency.adjust(now)
    }
}
