//! Cross-venue fair-value engine for Stalegun
//!
//! This crate turns Binance and Hyperliquid market data into a synthetic
//! reference quote for one instrument.
//!
//! # Core Components
//!
//! - [`normalizer`] / [`wire`] - Venue payloads to uniform events
//! - [`latency`] - Clock-skew estimate for the untimestamped spot book
//! - [`store`] - Per-series ordered points with retention and notifications
//! - [`depth`] - Executable price for a target notional
//! - [`divergence`] - Rolling perp/futures ratio distributions
//! - [`fair_value`] - Theoretical prices, quote and trade markers
//! - [`engine`] - Single-writer processing step
//! - [`coordinator`] - Async handle around the engine
//!
//! # Key Invariants
//!
//! - A message is processed to completion before the next one
//! - At most one fair-value cycle runs per message
//! - A cycle with missing input data emits nothing and changes no state
//! - Synthetic points are stamped in the futures venue's clock

pub mod clock;
pub mod context;
pub mod coordinator;
pub mod depth;
pub mod divergence;
pub mod engine;
pub mod error;
pub mod fair_value;
pub mod latency;
pub mod normalizer;
pub mod store;
pub mod types;
pub mod wire;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use context::QuoteContext;
pub use coordinator::StalegunCoordinator;
pub use engine::{HandleReport, QuoteEngine};
pub use error::MarketDataError;
pub use fair_value::{CycleOutcome, FairValueGenerator, Quote, TradeMarker};
pub use store::{OrderingPolicy, TimeSeriesStore};
pub use types::{DataPoint, FeedMessage, NormalizedEvent, PriceLevel, SeriesUpdate, TimestampMs};

pub type Result<T> = std::result::Result<T, MarketDataError>;
