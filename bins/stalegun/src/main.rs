//! Stalegun CLI and quote engine binary
//!
//! Connects to the Binance futures and spot feeds and the Hyperliquid perp
//! feed, and publishes a synthetic fair-value quote for one instrument.

mod control;
mod providers;
mod shutdown;

use anyhow::{Context, Result};
use cli::{Cli, Commands, LogFormatArg, ModeArg};
use common::Venue;
use config::{generate_default_config, load_config, save_config, validate_config, StalegunConfig};
use market_data::clock::system_clock;
use market_data::{MarketDataError, StalegunCoordinator};
use observability::{init_logging, init_metrics, EngineMetrics, LogFormat};
use providers::{all_providers, run_provider, FeedEvent};
use shutdown::ShutdownController;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const FEED_CHANNEL_CAPACITY: usize = 4096;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    match cli.command {
        Commands::Run {
            config,
            coin,
            mode,
            log_format,
        } => run_command(config, coin, mode, log_format).await,
        Commands::Validate { config } => {
            init_logging("stalegun", LogFormat::Pretty)?;
            validate_command(config).await
        }
        Commands::Init { output } => {
            init_logging("stalegun", LogFormat::Pretty)?;
            init_command(output).await
        }
    }
}

fn apply_overrides(
    config: &mut StalegunConfig,
    coin: Option<String>,
    mode: Option<ModeArg>,
    log_format: Option<LogFormatArg>,
) {
    if let Some(coin) = coin {
        config.instrument.coin = coin.to_uppercase();
    }
    if let Some(mode) = mode {
        config.quoting.initial_mode = mode.into();
    }
    if let Some(format) = log_format {
        config.monitoring.log_format = format.as_str().to_string();
    }
}

async fn run_command<P: AsRef<Path>>(
    config_path: P,
    coin: Option<String>,
    mode: Option<ModeArg>,
    log_format: Option<LogFormatArg>,
) -> Result<()> {
    let mut config = load_config(config_path.as_ref())?;
    apply_overrides(&mut config, coin, mode, log_format);

    let format = LogFormat::parse(&config.monitoring.log_format).unwrap_or_default();
    init_logging("stalegun", format)?;
    info!("Stalegun starting...");

    let report = validate_config(&config);
    for warning in &report.warnings {
        warn!(field = %warning.field, message = %warning.message, "Configuration warning");
    }
    if !report.is_valid() {
        error!(error_count = report.errors.len(), "Configuration validation failed");
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!("Cannot start due to configuration errors");
    }

    if let Some(port) = config.monitoring.metrics_port {
        init_metrics(port)?;
    }

    let instrument = config.instrument.to_instrument();
    let metrics = EngineMetrics::new(instrument.coin.as_str());
    let coordinator = StalegunCoordinator::from_config(&config, system_clock());
    let shutdown = ShutdownController::with_ctrl_c();

    info!(
        coin = %instrument.coin,
        quote = %instrument.quote,
        mode = %config.quoting.initial_mode,
        target_notional = config.quoting.target_notional,
        "Starting quote engine"
    );

    let (tx, rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
    let reconnect_delay = Duration::from_secs(config.feeds.reconnect_delay_seconds);
    let mut tasks = Vec::new();

    for provider in all_providers(&config.feeds, &instrument) {
        tasks.push(tokio::spawn(run_provider(
            provider,
            tx.clone(),
            shutdown.child_token(),
            reconnect_delay,
        )));
    }
    drop(tx);

    tasks.push(tokio::spawn(control::run_mode_control(
        control::spawn_stdin_lines(),
        coordinator.clone(),
        shutdown.child_token(),
    )));
    tasks.push(tokio::spawn(control::run_presentation_log(
        coordinator.clone(),
        shutdown.child_token(),
    )));

    pump(rx, &coordinator, &metrics, shutdown.child_token()).await;

    shutdown.shutdown();
    for task in tasks {
        if let Err(e) = task.await {
            warn!(error = %e, "Task did not stop cleanly");
        }
    }

    info!("Stalegun stopped");
    Ok(())
}

/// Hand every feed message to the engine, one at a time
async fn pump(
    mut rx: mpsc::Receiver<FeedEvent>,
    coordinator: &StalegunCoordinator,
    metrics: &EngineMetrics,
    token: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = token.cancelled() => break,
            event = rx.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        match event {
            FeedEvent::Connected(venue) => {
                metrics.set_connected(venue, true);
                if venue == Venue::Hyperliquid {
                    coordinator.reset_perp_backlog().await;
                }
            }
            FeedEvent::Disconnected(venue) => metrics.set_connected(venue, false),
            FeedEvent::Undecodable(venue) => metrics.record_decode_error(venue),
            FeedEvent::Message(msg) => {
                metrics.record_message(msg.venue, msg.channel);
                let started = Instant::now();

                match coordinator.on_feed_message(&msg).await {
                    Ok(report) => {
                        if let Some(cycle) = &report.cycle {
                            let markers = cycle
                                .quote()
                                .map_or(0, |quote| usize::from(quote.marker.is_some()));
                            metrics.record_cycle(cycle.quote().is_some(), markers);
                        }
                        metrics.record_handling_time(started.elapsed());
                        metrics.set_latency(coordinator.latency_ms().await);
                    }
                    Err(e @ (MarketDataError::Decode(_) | MarketDataError::InvalidInput(_))) => {
                        metrics.record_decode_error(msg.venue);
                        warn!(venue = %msg.venue, channel = %msg.channel, error = %e, "Dropped feed message");
                    }
                    Err(e) => {
                        error!(venue = %msg.venue, channel = %msg.channel, error = %e, "Failed to handle feed message");
                    }
                }
            }
        }
    }

    debug!("Feed pump stopped");
}

async fn validate_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    info!(path = ?config_path.as_ref(), "Validating configuration");

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    let instrument = config.instrument.to_instrument();
    println!("[ok] Configuration is valid!");
    println!();
    println!("Futures/spot symbol: {}", instrument.exchange_symbol());
    println!("Perp coin: {}", instrument.perp_symbol());
    println!("Target notional: {}", config.quoting.target_notional);
    println!(
        "Percentiles: bid {} / ask {}",
        config.quoting.bid_percentile, config.quoting.ask_percentile
    );
    println!("Initial mode: {}", config.quoting.initial_mode);

    Ok(())
}

async fn init_command<P: AsRef<Path>>(output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    save_config(&config, output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("Next steps:");
    println!("  1. Edit the instrument and quoting sections");
    println!(
        "  2. Run 'stalegun validate --config {:?}' to check configuration",
        output_path
    );
    println!(
        "  3. Run 'stalegun run --config {:?}' and type buy, sell or toggle to switch mode",
        output_path
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Mode;

    #[test]
    fn test_apply_overrides() {
        let mut config = generate_default_config();
        apply_overrides(
            &mut config,
            Some("eth".to_string()),
            Some(ModeArg::Selling),
            Some(LogFormatArg::Json),
        );

        assert_eq!(config.instrument.coin, "ETH");
        assert_eq!(config.quoting.initial_mode, Mode::Selling);
        assert_eq!(config.monitoring.log_format, "json");
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let mut config = generate_default_config();
        let coin = config.instrument.coin.clone();
        apply_overrides(&mut config, None, None, None);

        assert_eq!(config.instrument.coin, coin);
        assert_eq!(config.quoting.initial_mode, Mode::Buying);
    }
}
