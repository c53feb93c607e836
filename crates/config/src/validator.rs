use crate::*;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Instrument coin is required")]
    MissingCoin,

    #[error("Instrument quote asset is required")]
    MissingQuote,

    #[error("{field} must be a positive float, got: {value}")]
    InvalidPositiveFloat { field: String, value: f64 },

    #[error("{field} must be a positive integer")]
    InvalidPositiveInteger { field: String },

    #[error("{field} must be within [{min}, {max}], got: {value}")]
    OutOfRange {
        field: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Bid percentile ({bid}) must not exceed ask percentile ({ask})")]
    PercentilesInverted { bid: f64, ask: f64 },

    #[error("Feed endpoint '{field}' is not a websocket URL: {value}")]
    InvalidEndpoint { field: String, value: String },

    #[error("Unknown log format: {0}. Must be one of: pretty, json, compact")]
    InvalidLogFormat(String),

    #[error("Environment variable placeholder left unresolved in '{field}'")]
    UnresolvedEnvVar { field: String },
}

#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.push(ValidationWarning {
            field: field.to_string(),
            message: message.to_string(),
        });
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate_config(config: &StalegunConfig) -> ValidationReport {
    let mut report = ValidationReport::new();

    validate_instrument(&config.instrument, &mut report);
    validate_quoting(&config.quoting, &mut report);
    validate_hour_guard(&config.hour_guard, &mut report);
    validate_feeds(&config.feeds, &mut report);
    validate_monitoring(&config.monitoring, &mut report);

    report
}

fn validate_instrument(instrument: &InstrumentConfig, report: &mut ValidationReport) {
    if instrument.coin.trim().is_empty() {
        report.add_error(ValidationError::MissingCoin);
    } else if has_unresolved_env_vars(&instrument.coin) {
        report.add_error(ValidationError::UnresolvedEnvVar {
            field: "instrument.coin".to_string(),
        });
    }

    if instrument.quote.trim().is_empty() {
        report.add_error(ValidationError::MissingQuote);
    }
}

fn require_positive(field: &str, value: f64, report: &mut ValidationReport) {
    if !(value.is_finite() && value > 0.0) {
        report.add_error(ValidationError::InvalidPositiveFloat {
            field: field.to_string(),
            value,
        });
    }
}

fn require_range(field: &str, value: f64, min: f64, max: f64, report: &mut ValidationReport) {
    if !(min..=max).contains(&value) {
        report.add_error(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min,
            max,
        });
    }
}

fn validate_quoting(quoting: &QuotingConfig, report: &mut ValidationReport) {
    require_positive("quoting.target_notional", quoting.target_notional, report);
    require_positive("quoting.retention_multiplier", quoting.retention_multiplier, report);
    require_positive("quoting.depth_fallback_divisor", quoting.depth_fallback_divisor, report);

    if quoting.retention_window_ms == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "quoting.retention_window_ms".to_string(),
        });
    }

    if quoting.divergence_capacity == 0 {
        report.add_error(ValidationError::InvalidPositiveInteger {
            field: "quoting.divergence_capacity".to_string(),
        });
    }

    if !(quoting.latency_alpha > 0.0 && quoting.latency_alpha <= 1.0) {
        report.add_error(ValidationError::OutOfRange {
            field: "quoting.latency_alpha".to_string(),
            value: quoting.latency_alpha,
            min: f64::MIN_POSITIVE,
            max: 1.0,
        });
    }

    require_range("quoting.bid_percentile", quoting.bid_percentile, 0.0, 1.0, report);
    require_range("quoting.ask_percentile", quoting.ask_percentile, 0.0, 1.0, report);

    if quoting.bid_percentile > quoting.ask_percentile {
        report.add_error(ValidationError::PercentilesInverted {
            bid: quoting.bid_percentile,
            ask: quoting.ask_percentile,
        });
    }

    if quoting.depth_fallback_divisor < 1.0 {
        report.add_warning(
            "quoting.depth_fallback_divisor",
            "A divisor below 1 makes the exhausted-book fallback optimistic",
        );
    }

    if quoting.ordering_policy == OrderingPolicyConfig::Append {
        report.add_warning(
            "quoting.ordering_policy",
            "append keeps late points out of timestamp order; retention trimming may keep stale points",
        );
    }
}

fn validate_hour_guard(guard: &HourGuardConfig, report: &mut ValidationReport) {
    if !guard.enabled {
        return;
    }

    require_range("hour_guard.widen_fraction", guard.widen_fraction, 0.0, 0.5, report);

    if guard.window_seconds >= 1800 {
        report.add_error(ValidationError::OutOfRange {
            field: "hour_guard.window_seconds".to_string(),
            value: guard.window_seconds as f64,
            min: 0.0,
            max: 1799.0,
        });
    }
}

fn validate_endpoint(field: &str, value: &str, report: &mut ValidationReport) {
    let valid = Url::parse(value)
        .map(|url| matches!(url.scheme(), "ws" | "wss"))
        .unwrap_or(false);

    if !valid {
        report.add_error(ValidationError::InvalidEndpoint {
            field: field.to_string(),
            value: value.to_string(),
        });
    }
}

fn validate_feeds(feeds: &FeedsConfig, report: &mut ValidationReport) {
    validate_endpoint("feeds.binance_futures_ws", &feeds.binance_futures_ws, report);
    validate_endpoint("feeds.binance_spot_ws", &feeds.binance_spot_ws, report);
    validate_endpoint("feeds.hyperliquid_ws", &feeds.hyperliquid_ws, report);

    if !feeds.depth_stream.starts_with("depth") {
        report.add_warning(
            "feeds.depth_stream",
            "Expected a partial book depth stream such as depth20@100ms",
        );
    }

    if feeds.reconnect_delay_seconds == 0 {
        report.add_warning(
            "feeds.reconnect_delay_seconds",
            "Reconnecting without delay may hammer the venue",
        );
    }
}

fn validate_monitoring(monitoring: &MonitoringConfig, report: &mut ValidationReport) {
    let valid_formats = ["pretty", "json", "compact"];
    if !valid_formats.contains(&monitoring.log_format.to_lowercase().as_str()) {
        report.add_error(ValidationError::InvalidLogFormat(monitoring.log_format.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_default_config_is_valid() {
        let report = validate_config(&generate_default_config());
        assert!(report.is_valid(), "{:?}", report.errors);
    }

    #[test]
    fn test_empty_coin() {
        let mut config = generate_default_config();
        config.instrument.coin = " ".to_string();

        let report = validate_config(&config);
        assert!(report.errors.contains(&ValidationError::MissingCoin));
    }

    #[test]
    fn test_percentile_bounds() {
        let mut config = generate_default_config();
        config.quoting.bid_percentile = 0.9;
        config.quoting.ask_percentile = 1.5;

        let report = validate_config(&config);
        assert!(!report.is_valid());
        assert!(report
            .errors
            .iter()
            .any(|e| matches!(e, ValidationError::OutOfRange { field, .. } if field == "quoting.ask_percentile")));
    }

    #[test]
    fn test_inverted_percentiles() {
        let mut config = generate_default_config();
        config.quoting.bid_percentile = 0.8;
        config.quoting.ask_percentile = 0.2;

        let report = validate_config(&config);
        assert_matches!(
            report.errors.as_slice(),
            [ValidationError::PercentilesInverted { .. }]
        );
    }

    #[test]
    fn test_non_positive_notional() {
        let mut config = generate_default_config();
        config.quoting.target_notional = 0.0;

        let report = validate_config(&config);
        assert_matches!(
            report.errors.first(),
            Some(ValidationError::InvalidPositiveFloat { .. })
        );
    }

    #[test]
    fn test_http_endpoint_rejected() {
        let mut config = generate_default_config();
        config.feeds.hyperliquid_ws = "https://api.hyperliquid.xyz/ws".to_string();

        let report = validate_config(&config);
        assert_matches!(
            report.errors.as_slice(),
            [ValidationError::InvalidEndpoint { field, .. }] if field == "feeds.hyperliquid_ws"
        );
    }

    #[test]
    fn test_append_policy_warns() {
        let mut config = generate_default_config();
        config.quoting.ordering_policy = OrderingPolicyConfig::Append;

        let report = validate_config(&config);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn test_disabled_hour_guard_skips_checks() {
        let mut config = generate_default_config();
        config.hour_guard.enabled = false;
        config.hour_guard.widen_fraction = 3.0;

        assert!(validate_config(&config).is_valid());
    }
}
