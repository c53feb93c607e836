//! Time-series store
//!
//! One ordered sequence of `(timestamp, price)` points per [`SeriesKey`].
//! Series are created on first write and trimmed from the front by a
//! wall-clock retention window. Writes to watched keys queue a notification
//! that the engine drains after each feed message, and every stored point is
//! broadcast to presentation subscribers.

use crate::clock::SharedClock;
use crate::error::MarketDataError;
use crate::types::{DataPoint, NormalizedEvent, SeriesUpdate, TimestampMs};
use crate::Result;
use common::SeriesKey;
use config::{OrderingPolicyConfig, QuotingConfig};
use std::collections::{BTreeMap, HashSet, VecDeque};
use tokio::sync::broadcast;
use tracing::{debug, trace};

pub const DEFAULT_RETENTION_WINDOW_MS: u64 = 30_000;
pub const DEFAULT_RETENTION_MULTIPLIER: f64 = 1.5;
const BROADCAST_CAPACITY: usize = 4096;

/// How a point older than the newest point of its series is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderingPolicy {
    /// Keep arrival order
    Append,
    /// Insert at timestamp position; a late point identical to a stored one
    /// is dropped
    #[default]
    Reorder,
    /// Drop late points
    Reject,
}

impl From<OrderingPolicyConfig> for OrderingPolicy {
    fn from(config: OrderingPolicyConfig) -> Self {
        match config {
            OrderingPolicyConfig::Append => OrderingPolicy::Append,
            OrderingPolicyConfig::Reorder => OrderingPolicy::Reorder,
            OrderingPolicyConfig::Reject => OrderingPolicy::Reject,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Appended,
    /// Late point stored at its timestamp position
    Reordered,
    Duplicate,
    Rejected,
}

impl InsertOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, InsertOutcome::Appended | InsertOutcome::Reordered)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Retention {
    pub window_ms: u64,
    pub multiplier: f64,
}

impl Retention {
    /// Oldest timestamp kept at `now`
    pub fn cutoff(&self, now: TimestampMs) -> TimestampMs {
        now - (self.window_ms as f64 * self.multiplier).round() as i64
    }
}

impl Default for Retention {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_RETENTION_WINDOW_MS,
            multiplier: DEFAULT_RETENTION_MULTIPLIER,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Series {
    points: VecDeque<DataPoint>,
    last: Option<DataPoint>,
}

impl Series {
    fn insert(&mut self, point: DataPoint, policy: OrderingPolicy) -> InsertOutcome {
        let newest = self.points.back().map(|p| p.timestamp);
        let late = newest.is_some_and(|ts| point.timestamp < ts);

        let outcome = match (late, policy) {
            (false, _) | (true, OrderingPolicy::Append) => {
                self.points.push_back(point);
                InsertOutcome::Appended
            }
            (true, OrderingPolicy::Reject) => return InsertOutcome::Rejected,
            (true, OrderingPolicy::Reorder) => {
                let pos = self.points.partition_point(|p| p.timestamp <= point.timestamp);
                let duplicate = self
                    .points
                    .range(..pos)
                    .rev()
                    .take_while(|p| p.timestamp == point.timestamp)
                    .any(|p| p.price == point.price);
                if duplicate {
                    return InsertOutcome::Duplicate;
                }
                self.points.insert(pos, point);
                InsertOutcome::Reordered
            }
        };

        self.last = Some(point);
        outcome
    }

    fn trim(&mut self, cutoff: TimestampMs) -> usize {
        let mut removed = 0;
        let mut dropped_last = false;
        while let Some(point) = self.points.front().copied() {
            if point.timestamp >= cutoff {
                break;
            }
            self.points.pop_front();
            dropped_last |= self.last == Some(point);
            removed += 1;
        }
        // a late arrival can expire before newer points do
        if dropped_last || self.points.is_empty() {
            self.last = self.points.back().copied();
        }
        removed
    }

    /// Most recently arrived point
    pub fn latest(&self) -> Option<DataPoint> {
        self.last
    }

    pub fn points(&self) -> impl Iterator<Item = &DataPoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

pub struct TimeSeriesStore {
    series: BTreeMap<SeriesKey, Series>,
    watched: HashSet<SeriesKey>,
    pending: Vec<SeriesKey>,
    policy: OrderingPolicy,
    retention: Retention,
    clock: SharedClock,
    updates: broadcast::Sender<SeriesUpdate>,
}

impl std::fmt::Debug for TimeSeriesStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeSeriesStore")
            .field("series", &self.series.len())
            .field("watched", &self.watched)
            .field("policy", &self.policy)
            .field("retention", &self.retention)
            .finish()
    }
}

impl TimeSeriesStore {
    pub fn new(clock: SharedClock, retention: Retention, policy: OrderingPolicy) -> Self {
        let (updates, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            series: BTreeMap::new(),
            watched: HashSet::new(),
            pending: Vec::new(),
            policy,
            retention,
            clock,
            updates,
        }
    }

    pub fn from_config(config: &QuotingConfig, clock: SharedClock) -> Self {
        let retention = Retention {
            window_ms: config.retention_window_ms,
            multiplier: config.retention_multiplier,
        };
        Self::new(clock, retention, config.ordering_policy.into())
    }

    /// Series for `key`, created empty if absent
    pub fn series_entry(&mut self, key: SeriesKey) -> &mut Series {
        self.series.entry(key).or_default()
    }

    pub fn append(&mut self, key: SeriesKey, timestamp: TimestampMs, price: f64) -> InsertOutcome {
        let point = DataPoint::new(timestamp, price);
        let policy = self.policy;
        let outcome = self.series_entry(key).insert(point, policy);

        if outcome.is_stored() {
            if self.watched.contains(&key) && !self.pending.contains(&key) {
                self.pending.push(key);
            }
            // no receivers is fine
            let _ = self.updates.send(SeriesUpdate { key, point });
        } else {
            debug!(%key, timestamp, price, ?outcome, "Point not stored");
        }

        let now = self.clock.now_ms();
        self.trim(now, self.retention.window_ms);
        outcome
    }

    pub fn append_event(&mut self, event: &NormalizedEvent) -> InsertOutcome {
        self.append(event.key, event.timestamp, event.price)
    }

    pub fn latest(&self, key: SeriesKey) -> Result<DataPoint> {
        self.try_latest(key).ok_or(MarketDataError::NotAvailable(key))
    }

    pub fn latest_price(&self, key: SeriesKey) -> Result<f64> {
        self.latest(key).map(|p| p.price)
    }

    pub fn try_latest(&self, key: SeriesKey) -> Option<DataPoint> {
        self.series.get(&key).and_then(Series::latest)
    }

    /// Drop points older than `now - window_ms * multiplier` from every series
    pub fn trim(&mut self, now: TimestampMs, window_ms: u64) -> usize {
        let cutoff = Retention {
            window_ms,
            multiplier: self.retention.multiplier,
        }
        .cutoff(now);

        let removed: usize = self.series.values_mut().map(|s| s.trim(cutoff)).sum();
        if removed > 0 {
            trace!(removed, cutoff, "Trimmed expired points");
        }
        removed
    }

    /// Queue a notification whenever `key` is written
    pub fn watch(&mut self, key: SeriesKey) {
        self.watched.insert(key);
    }

    /// Watched keys written since the last drain, in first-write order
    pub fn drain_notifications(&mut self) -> Vec<SeriesKey> {
        std::mem::take(&mut self.pending)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SeriesUpdate> {
        self.updates.subscribe()
    }

    pub fn points(&self, key: SeriesKey) -> Vec<DataPoint> {
        self.series
            .get(&key)
            .map(|s| s.points().copied().collect())
            .unwrap_or_default()
    }

    pub fn len(&self, key: SeriesKey) -> usize {
        self.series.get(&key).map_or(0, Series::len)
    }

    pub fn series_count(&self) -> usize {
        self.series.len()
    }
}
