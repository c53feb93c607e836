use crate::clock::SharedClock;
use crate::engine::{HandleReport, QuoteEngine};
use crate::types::{DataPoint, FeedMessage, SeriesUpdate, TimestampMs};
use crate::Result;
use common::{Mode, SeriesKey};
use config::StalegunConfig;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Async handle shared by the feed pump, the mode control and presentation.
///
/// All writes go through one lock, so each message is processed to
/// completion before the next.
#[derive(Debug, Clone)]
pub struct StalegunCoordinator {
    engine: Arc<RwLock<QuoteEngine>>,
}

impl StalegunCoordinator {
    pub fn new(engine: QuoteEngine) -> Self {
        Self {
            engine: Arc::new(RwLock::new(engine)),
        }
    }

    pub fn from_config(config: &StalegunConfig, clock: SharedClock) -> Self {
        Self::new(QuoteEngine::from_config(config, clock))
    }

    pub async fn on_feed_message(&self, msg: &FeedMessage) -> Result<HandleReport> {
        let mut engine = self.engine.write().await;
        engine.handle(msg)
    }

    pub async fn set_mode(&self, mode: Mode) -> Mode {
        let mut engine = self.engine.write().await;
        engine.set_mode(mode)
    }

    pub async fn toggle_mode(&self) -> Mode {
        let mut engine = self.engine.write().await;
        let next = engine.mode().toggled();
        engine.set_mode(next)
    }

    pub async fn mode(&self) -> Mode {
        self.engine.read().await.mode()
    }

    pub async fn latency_ms(&self) -> f64 {
        self.engine.read().await.latency_ms()
    }

    pub async fn reset_perp_backlog(&self) {
        self.engine.write().await.reset_perp_backlog();
    }

    pub async fn append(&self, key: SeriesKey, timestamp: TimestampMs, price: f64) -> Result<HandleReport> {
        let mut engine = self.engine.write().await;
        engine.append(key, timestamp, price)
    }

    pub async fn latest(&self, key: SeriesKey) -> Result<DataPoint> {
        self.engine.read().await.latest(key)
    }

    pub async fn subscribe(&self) -> broadcast::Receiver<SeriesUpdate> {
        self.engine.read().await.subscribe()
    }
}
