//! Market data error types

use common::SeriesKey;
use thiserror::Error;

/// Errors that can occur while normalizing feeds or deriving quotes
#[derive(Error, Debug)]
pub enum MarketDataError {
    /// Series has no value yet. Transient, the fair-value cycle skips.
    #[error("Data not available: {0}")]
    NotAvailable(SeriesKey),

    /// Malformed ladder, bad price or otherwise unusable payload
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Payload does not match the venue wire shape
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// Any other computation failure
    #[error("Unexpected: {0}")]
    Unexpected(String),
}

impl MarketDataError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }
}
