use crate::types::TimestampMs;

pub const DEFAULT_ALPHA: f64 = 0.1;

/// Exponentially weighted estimate of `local clock - venue timestamp`.
///
/// The centralized venue's spot book stream carries no timestamp, so its
/// points are stamped `now - estimate` instead.
#[derive(Debug, Clone, Copy)]
pub struct LatencyEstimator {
    estimate_ms: f64,
    alpha: f64,
}

impl LatencyEstimator {
    pub fn new() -> Self {
        Self::with_alpha(DEFAULT_ALPHA)
    }

    pub fn with_alpha(alpha: f64) -> Self {
        Self {
            estimate_ms: 0.0,
            alpha: alpha.clamp(f64::MIN_POSITIVE, 1.0),
        }
    }

    /// Fold in one sample taken from a trusted venue timestamp
    pub fn update(&mut self, now: TimestampMs, venue_ts: TimestampMs) -> f64 {
        let sample = (now - venue_ts) as f64;
        self.estimate_ms = self.estimate_ms * (1.0 - self.alpha) + sample * self.alpha;
        self.estimate_ms
    }

    pub fn read(&self) -> f64 {
        self.estimate_ms
    }

    /// Venue-clock timestamp for a locally observed event
    pub fn adjust(&self, now: TimestampMs) -> TimestampMs {
        now - self.estimate_ms.round() as i64
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Default for LatencyEstimator {
    fn default() -> Self {
        Self::new()
    }
}
