//! Common error types for Stalegun

use thiserror::Error;

/// Common error type used across Stalegun crates
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A name could not be mapped to a known identifier
    #[error("Unknown identifier: {0}")]
    Unknown(String),
}

/// Result type alias using the common Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an unknown identifier error
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }
}
