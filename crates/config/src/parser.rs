use crate::*;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

#[instrument(skip(path))]
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<StalegunConfig> {
    let path = path.as_ref();
    info!("Loading configuration from: {:?}", path);

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    debug!("Config file content length: {} bytes", content.len());

    parse_config(&content)
}

/// Parse a YAML document after environment variable substitution
pub fn parse_config(content: &str) -> Result<StalegunConfig> {
    let substituted = substitution::substitute_env_vars(content)?;
    debug!("Environment variable substitution completed");

    let config: StalegunConfig = serde_yaml::from_str(&substituted)
        .with_context(|| "Failed to parse YAML configuration")?;

    info!(coin = %config.instrument.coin, "Configuration loaded successfully");
    Ok(config)
}

#[instrument]
pub fn generate_default_config() -> StalegunConfig {
    StalegunConfig {
        instrument: InstrumentConfig {
            coin: "BTC".to_string(),
            quote: default_quote_asset(),
        },
        quoting: QuotingConfig::default(),
        hour_guard: HourGuardConfig::default(),
        feeds: FeedsConfig::default(),
        monitoring: MonitoringConfig::default(),
    }
}

#[instrument]
pub fn save_config<P: AsRef<Path> + std::fmt::Debug>(config: &StalegunConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Saving configuration to: {:?}", path);

    let yaml = serde_yaml::to_string(config)
        .with_context(|| "Failed to serialize configuration to YAML")?;

    fs::write(path, yaml)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    info!("Configuration saved successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Mode;

    #[test]
    fn test_minimal_document_gets_defaults() {
        let config = parse_config("instrument:\n  coin: ETH\n").unwrap();

        assert_eq!(config.instrument.coin, "ETH");
        assert_eq!(config.instrument.quote, "USDT");
        assert_eq!(config.quoting.target_notional, 5000.0);
        assert_eq!(config.quoting.divergence_capacity, 200);
        assert_eq!(config.quoting.ordering_policy, OrderingPolicyConfig::Reorder);
        assert_eq!(config.quoting.initial_mode, Mode::Buying);
        assert!(config.hour_guard.enabled);
        assert_eq!(config.hour_guard.window_seconds, 10);
        assert!(config.monitoring.metrics_port.is_none());
    }

    #[test]
    fn test_overrides_are_read() {
        let yaml = r#"
instrument:
  coin: sol
quoting:
  target_notional: 20000
  ordering_policy: reject
  initial_mode: selling
hour_guard:
  enabled: false
monitoring:
  log_format: json
  metrics_port: 9100
"#;
        let config = parse_config(yaml).unwrap();

        assert_eq!(config.quoting.target_notional, 20000.0);
        assert_eq!(config.quoting.ordering_policy, OrderingPolicyConfig::Reject);
        assert_eq!(config.quoting.initial_mode, Mode::Selling);
        assert!(!config.hour_guard.enabled);
        assert_eq!(config.monitoring.metrics_port, Some(9100));
        assert_eq!(config.instrument.to_instrument().exchange_symbol(), "SOLUSDT");
    }

    #[test]
    fn test_missing_instrument_is_an_error() {
        assert!(parse_config("quoting:\n  target_notional: 1\n").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("stalegun-config-{}.yaml", std::process::id()));
        let config = generate_default_config();

        save_config(&config, &path).unwrap();
        let loaded = load_config(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded.instrument.coin, "BTC");
        assert_eq!(loaded.feeds.depth_stream, "depth20@100ms");
    }
}
