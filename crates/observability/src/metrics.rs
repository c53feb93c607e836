//! Prometheus metrics infrastructure
//!
//! This module provides utilities for initializing Prometheus metrics
//! and the metric set recorded by the quote engine.

use common::{Channel, Venue};
use metrics::{counter, gauge, histogram, Counter, Gauge, Histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;

/// Initialize the Prometheus metrics exporter
///
/// This starts an HTTP server on the specified port that exposes metrics
/// at the `/metrics` endpoint.
///
/// # Example
///
/// ```ignore
/// observability::metrics::init_metrics(9090)?;
/// // Metrics available at http://localhost:9090/metrics
/// ```
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// Quote engine metrics
///
/// Recording is a no-op until a recorder is installed, so an instance can
/// always be created, including in tests.
///
/// # Metrics
///
/// * `stalegun_feed_messages_total` - Feed messages by venue and channel
/// * `stalegun_feed_errors_total` - Messages that failed to decode
/// * `stalegun_cycles_total` - Fair-value cycles by outcome
/// * `stalegun_markers_total` - Synthetic trade markers emitted
/// * `stalegun_cycle_duration_seconds` - Time spent handling one message
/// * `stalegun_latency_ms` - Current clock-skew estimate
/// * `stalegun_feed_connected` - 1 while a venue connection is open
#[derive(Clone)]
pub struct EngineMetrics {
    feed_messages: fn(Venue, Channel) -> Counter,
    feed_errors: fn(Venue) -> Counter,
    feed_connected: fn(Venue) -> Gauge,
    cycles_quoted: Counter,
    cycles_skipped: Counter,
    markers: Counter,
    cycle_duration: Histogram,
    latency: Gauge,
    coin: String,
}

impl EngineMetrics {
    /// Create metrics for a specific instrument
    pub fn new(coin: &str) -> Self {
        let coin = coin.to_string();

        Self {
            feed_messages: |venue, channel| {
                counter!(
                    "stalegun_feed_messages_total",
                    "venue" => venue.as_str(),
                    "channel" => channel.to_string()
                )
            },
            feed_errors: |venue| counter!("stalegun_feed_errors_total", "venue" => venue.as_str()),
            feed_connected: |venue| gauge!("stalegun_feed_connected", "venue" => venue.as_str()),
            cycles_quoted: counter!("stalegun_cycles_total", "coin" => coin.clone(), "outcome" => "quoted"),
            cycles_skipped: counter!("stalegun_cycles_total", "coin" => coin.clone(), "outcome" => "skipped"),
            markers: counter!("stalegun_markers_total", "coin" => coin.clone()),
            cycle_duration: histogram!("stalegun_cycle_duration_seconds", "coin" => coin.clone()),
            latency: gauge!("stalegun_latency_ms", "coin" => coin.clone()),
            coin,
        }
    }

    pub fn record_message(&self, venue: Venue, channel: Channel) {
        (self.feed_messages)(venue, channel).increment(1);
    }

    pub fn record_decode_error(&self, venue: Venue) {
        (self.feed_errors)(venue).increment(1);
    }

    pub fn set_connected(&self, venue: Venue, connected: bool) {
        (self.feed_connected)(venue).set(if connected { 1.0 } else { 0.0 });
    }

    /// Record the outcome of one fair-value cycle
    pub fn record_cycle(&self, quoted: bool, markers: usize) {
        if quoted {
            self.cycles_quoted.increment(1);
        } else {
            self.cycles_skipped.increment(1);
        }
        self.markers.increment(markers as u64);
    }

    pub fn record_handling_time(&self, duration: Duration) {
        self.cycle_duration.record(duration.as_secs_f64());
    }

    pub fn set_latency(&self, latency_ms: f64) {
        self.latency.set(latency_ms);
    }

    pub fn coin(&self) -> &str {
        &self.coin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_metrics_creation() {
        // Without an installed recorder every call is a no-op
        let metrics = EngineMetrics::new("BTC");
        metrics.record_message(Venue::Hyperliquid, Channel::Book);
        metrics.record_cycle(true, 1);
        metrics.set_latency(12.5);
        assert_eq!(metrics.coin(), "BTC");
    }
}
