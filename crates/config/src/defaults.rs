pub fn default_enabled() -> bool {
    true
}

pub fn default_quote_asset() -> String {
    "USDT".to_string()
}

pub fn default_target_notional() -> f64 {
    5000.0
}

pub fn default_retention_window_ms() -> u64 {
    30_000
}

pub fn default_retention_multiplier() -> f64 {
    1.5
}

pub fn default_latency_alpha() -> f64 {
    0.1
}

pub fn default_divergence_capacity() -> usize {
    200
}

pub fn default_bid_percentile() -> f64 {
    1.0 / 3.0
}

pub fn default_ask_percentile() -> f64 {
    2.0 / 3.0
}

pub fn default_depth_fallback_divisor() -> f64 {
    1.01
}

pub fn default_tick_exponent_offset() -> i32 {
    4
}

pub fn default_hour_guard_window_seconds() -> u32 {
    10
}

pub fn default_hour_guard_widen_fraction() -> f64 {
    0.01
}

pub fn default_binance_futures_ws() -> String {
    "wss://fstream.binance.com/ws".to_string()
}

pub fn default_binance_spot_ws() -> String {
    "wss://stream.binance.com:443/ws".to_string()
}

pub fn default_hyperliquid_ws() -> String {
    "wss://api.hyperliquid.xyz/ws".to_string()
}

pub fn default_depth_stream() -> String {
    "depth20@100ms".to_string()
}

pub fn default_reconnect_delay_seconds() -> u64 {
    5
}

pub fn default_log_format() -> String {
    "pretty".to_string()
}
