//! Common types and utilities for Stalegun
//!
//! This crate provides the shared vocabulary used across all Stalegun
//! crates: venue identifiers, series keys, sides and the quoting mode.
//!
//! # Modules
//!
//! - [`error`] - Common error types
//! - [`types`] - Shared domain types (Venue, SeriesKey, Side, Mode, etc.)

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
