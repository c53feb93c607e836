//! Operator mode control and the presentation log

use common::{Mode, Venue};
use market_data::StalegunCoordinator;
use std::io::BufRead;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeCommand {
    Set(Mode),
    Toggle,
}

impl ModeCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "" => None,
            "t" | "toggle" => Some(ModeCommand::Toggle),
            other => other.parse::<Mode>().ok().map(ModeCommand::Set),
        }
    }
}

/// Forward stdin lines from a detached thread.
///
/// Tokio's stdin holds the runtime open on shutdown while a read is
/// pending, so the blocking reader lives outside it.
pub fn spawn_stdin_lines() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read mode control input");
                    break;
                }
            }
        }
    });
    rx
}

/// Apply `buy` / `sell` / `toggle` lines until the input closes or shutdown
pub async fn run_mode_control(
    mut lines: mpsc::Receiver<String>,
    coordinator: StalegunCoordinator,
    token: CancellationToken,
) {
    loop {
        let line = tokio::select! {
            _ = token.cancelled() => break,
            line = lines.recv() => match line {
                Some(line) => line,
                None => {
                    debug!("Mode control input closed");
                    break;
                }
            },
        };

        let mode = match ModeCommand::parse(&line) {
            Some(ModeCommand::Set(mode)) => coordinator.set_mode(mode).await,
            Some(ModeCommand::Toggle) => coordinator.toggle_mode().await,
            None => {
                if !line.trim().is_empty() {
                    warn!(input = %line.trim(), "Unknown mode command, expected buy, sell or toggle");
                }
                continue;
            }
        };
        info!(%mode, "Quoting mode set");
    }
}

/// Log every synthetic point as it is appended
pub async fn run_presentation_log(coordinator: StalegunCoordinator, token: CancellationToken) {
    let mut updates = coordinator.subscribe().await;

    loop {
        let update = tokio::select! {
            _ = token.cancelled() => break,
            update = updates.recv() => update,
        };

        match update {
            Ok(update) if update.key.venue == Venue::Synthetic => {
                info!(
                    series = %update.key,
                    timestamp = update.point.timestamp,
                    price = update.point.price,
                    "Synthetic point"
                );
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Presentation log lagging"),
            Err(RecvError::Closed) => break,
        }
    }
}
