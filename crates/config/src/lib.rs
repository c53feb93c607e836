use common::{Instrument, Mode};
use serde::{Deserialize, Serialize};

pub mod defaults;
pub mod parser;
pub mod substitution;
pub mod validator;

pub use defaults::*;
pub use parser::*;
pub use substitution::*;
pub use validator::*;

/// Top-level configuration document
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StalegunConfig {
    pub instrument: InstrumentConfig,
    #[serde(default)]
    pub quoting: QuotingConfig,
    #[serde(rename = "hour_guard")]
    #[serde(default)]
    pub hour_guard: HourGuardConfig,
    #[serde(default)]
    pub feeds: FeedsConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstrumentConfig {
    /// Base asset, e.g. BTC
    pub coin: String,
    /// Quote asset on the centralized venue
    #[serde(default = "default_quote_asset")]
    pub quote: String,
}

impl InstrumentConfig {
    pub fn to_instrument(&self) -> Instrument {
        Instrument::new(self.coin.as_str(), self.quote.as_str())
    }
}

/// How the store treats a point older than the newest point of its series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicyConfig {
    /// Keep arrival order
    Append,
    /// Insert at timestamp position, drop exact duplicates
    #[default]
    Reorder,
    /// Drop the point
    Reject,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuotingConfig {
    /// Notional (quote currency) the depth-weighted price must cover
    #[serde(rename = "target_notional")]
    #[serde(default = "default_target_notional")]
    pub target_notional: f64,
    #[serde(rename = "retention_window_ms")]
    #[serde(default = "default_retention_window_ms")]
    pub retention_window_ms: u64,
    #[serde(rename = "retention_multiplier")]
    #[serde(default = "default_retention_multiplier")]
    pub retention_multiplier: f64,
    /// Smoothing factor of the clock-skew estimate
    #[serde(rename = "latency_alpha")]
    #[serde(default = "default_latency_alpha")]
    pub latency_alpha: f64,
    #[serde(rename = "divergence_capacity")]
    #[serde(default = "default_divergence_capacity")]
    pub divergence_capacity: usize,
    #[serde(rename = "bid_percentile")]
    #[serde(default = "default_bid_percentile")]
    pub bid_percentile: f64,
    #[serde(rename = "ask_percentile")]
    #[serde(default = "default_ask_percentile")]
    pub ask_percentile: f64,
    /// Divisor applied to the worst level when the book is exhausted
    #[serde(rename = "depth_fallback_divisor")]
    #[serde(default = "default_depth_fallback_divisor")]
    pub depth_fallback_divisor: f64,
    /// tick = 10^(floor(log10(price)) - offset)
    #[serde(rename = "tick_exponent_offset")]
    #[serde(default = "default_tick_exponent_offset")]
    pub tick_exponent_offset: i32,
    #[serde(rename = "ordering_policy")]
    #[serde(default)]
    pub ordering_policy: OrderingPolicyConfig,
    #[serde(rename = "initial_mode")]
    #[serde(default)]
    pub initial_mode: Mode,
}

impl Default for QuotingConfig {
    fn default() -> Self {
        Self {
            target_notional: default_target_notional(),
            retention_window_ms: default_retention_window_ms(),
            retention_multiplier: default_retention_multiplier(),
            latency_alpha: default_latency_alpha(),
            divergence_capacity: default_divergence_capacity(),
            bid_percentile: default_bid_percentile(),
            ask_percentile: default_ask_percentile(),
            depth_fallback_divisor: default_depth_fallback_divisor(),
            tick_exponent_offset: default_tick_exponent_offset(),
            ordering_policy: OrderingPolicyConfig::default(),
            initial_mode: Mode::default(),
        }
    }
}

/// Widening applied around the top of every hour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HourGuardConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Seconds on each side of HH:00:00
    #[serde(rename = "window_seconds")]
    #[serde(default = "default_hour_guard_window_seconds")]
    pub window_seconds: u32,
    #[serde(rename = "widen_fraction")]
    #[serde(default = "default_hour_guard_widen_fraction")]
    pub widen_fraction: f64,
}

impl Default for HourGuardConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            window_seconds: default_hour_guard_window_seconds(),
            widen_fraction: default_hour_guard_widen_fraction(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedsConfig {
    #[serde(rename = "binance_futures_ws")]
    #[serde(default = "default_binance_futures_ws")]
    pub binance_futures_ws: String,
    #[serde(rename = "binance_spot_ws")]
    #[serde(default = "default_binance_spot_ws")]
    pub binance_spot_ws: String,
    #[serde(rename = "hyperliquid_ws")]
    #[serde(default = "default_hyperliquid_ws")]
    pub hyperliquid_ws: String,
    /// Partial book stream suffix, e.g. depth20@100ms
    #[serde(rename = "depth_stream")]
    #[serde(default = "default_depth_stream")]
    pub depth_stream: String,
    #[serde(rename = "reconnect_delay_seconds")]
    #[serde(default = "default_reconnect_delay_seconds")]
    pub reconnect_delay_seconds: u64,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            binance_futures_ws: default_binance_futures_ws(),
            binance_spot_ws: default_binance_spot_ws(),
            hyperliquid_ws: default_hyperliquid_ws(),
            depth_stream: default_depth_stream(),
            reconnect_delay_seconds: default_reconnect_delay_seconds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitoringConfig {
    #[serde(rename = "log_format")]
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Prometheus exporter port, disabled when absent
    #[serde(rename = "metrics_port")]
    #[serde(default)]
    pub metrics_port: Option<u16>,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_format: default_log_format(),
            metrics_port: None,
        }
    }
}
