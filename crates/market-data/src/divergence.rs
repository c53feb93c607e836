//! Rolling distributions of perp / futures price ratios

use common::Side;
use ordered_float::OrderedFloat;
use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 200;

/// Fixed-capacity FIFO of ratios with a percentile query
#[derive(Debug, Clone)]
pub struct RatioBuffer {
    values: VecDeque<f64>,
    capacity: usize,
}

impl RatioBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        while self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    /// Value at index `floor(len * pct)` of the ascending sorted copy
    pub fn percentile(&self, pct: f64) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }

        let mut sorted: Vec<OrderedFloat<f64>> = self.values.iter().copied().map(OrderedFloat).collect();
        sorted.sort_unstable();

        let rank = (sorted.len() as f64 * pct.clamp(0.0, 1.0)).floor() as usize;
        let index = rank.min(sorted.len() - 1);
        Some(sorted[index].into_inner())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first
    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.values.iter()
    }
}

/// Bid and ask ratio buffers
#[derive(Debug, Clone)]
pub struct DivergenceTracker {
    bid: RatioBuffer,
    ask: RatioBuffer,
}

impl DivergenceTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            bid: RatioBuffer::new(capacity),
            ask: RatioBuffer::new(capacity),
        }
    }

    pub fn push_bid(&mut self, ratio: f64) {
        self.bid.push(ratio);
    }

    pub fn push_ask(&mut self, ratio: f64) {
        self.ask.push(ratio);
    }

    pub fn percentile(&self, side: Side, pct: f64) -> Option<f64> {
        self.buffer(side).percentile(pct)
    }

    pub fn buffer(&self, side: Side) -> &RatioBuffer {
        match side {
            Side::Buy => &self.bid,
            Side::Sell => &self.ask,
        }
    }
}

impl Default for DivergenceTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_indices() {
        let mut buffer = RatioBuffer::new(DEFAULT_CAPACITY);
        for v in [4.0, 1.0, 6.0, 3.0, 5.0, 2.0] {
            buffer.push(v);
        }

        // floor(6/3) = 2, floor(6*2/3) = 4
        assert_eq!(buffer.percentile(1.0 / 3.0), Some(3.0));
        assert_eq!(buffer.percentile(2.0 / 3.0), Some(5.0));
        assert_eq!(buffer.percentile(0.0), Some(1.0));
        assert_eq!(buffer.percentile(1.0), Some(6.0));
    }

    #[test]
    fn test_empty_percentile() {
        assert_eq!(RatioBuffer::new(10).percentile(0.5), None);
    }

    #[test]
    fn test_fifo_eviction() {
        let mut buffer = RatioBuffer::new(DEFAULT_CAPACITY);
        for i in 0..201 {
            buffer.push(i as f64);
        }

        assert_eq!(buffer.len(), 200);
        assert_eq!(buffer.iter().next(), Some(&1.0));
        assert_eq!(buffer.percentile(0.0), Some(1.0));
    }

    #[test]
    fn test_tracker_sides_are_independent() {
        let mut tracker = DivergenceTracker::default();
        tracker.push_bid(0.99);
        tracker.push_ask(1.01);

        assert_eq!(tracker.percentile(Side::Buy, 0.5), Some(0.99));
        assert_eq!(tracker.percentile(Side::Sell, 0.5), Some(1.01));
        assert_eq!(tracker.buffer(Side::Buy).len(), 1);
    }
}
