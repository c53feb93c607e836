//! Depth-weighted price
//!
//! Converts a ladder into the price at which a given notional could be
//! executed against it.

use crate::error::MarketDataError;
use crate::types::PriceLevel;
use crate::Result;

pub const DEFAULT_TARGET_NOTIONAL: f64 = 5000.0;
pub const DEFAULT_FALLBACK_DIVISOR: f64 = 1.01;

/// Walk `levels` best to worst until the cumulative notional strictly
/// exceeds `target_notional` and return that level's price.
///
/// An exhausted ladder returns the worst price divided by
/// `fallback_divisor`.
pub fn depth_weighted_price(
    levels: &[PriceLevel],
    target_notional: f64,
    fallback_divisor: f64,
) -> Result<f64> {
    let worst = levels
        .last()
        .ok_or_else(|| MarketDataError::invalid_input("empty depth ladder"))?;

    let mut cumulative = 0.0;
    for level in levels {
        validate_level(level)?;
        cumulative += level.notional();
        if cumulative > target_notional {
            return Ok(level.price);
        }
    }

    let fallback = worst.price / fallback_divisor;
    if !fallback.is_finite() {
        return Err(MarketDataError::unexpected(format!(
            "depth fallback is not finite: {} / {}",
            worst.price, fallback_divisor
        )));
    }
    Ok(fallback)
}

fn validate_level(level: &PriceLevel) -> Result<()> {
    if !(level.price.is_finite() && level.price > 0.0) {
        return Err(MarketDataError::invalid_input(format!(
            "level price must be positive, got {}",
            level.price
        )));
    }
    if !(level.size.is_finite() && level.size >= 0.0) {
        return Err(MarketDataError::invalid_input(format!(
            "level size must be non-negative, got {}",
            level.size
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn ladder(levels: &[(f64, f64)]) -> Vec<PriceLevel> {
        levels.iter().map(|&(p, s)| PriceLevel::new(p, s)).collect()
    }

    #[test]
    fn test_threshold_crossed_on_second_level() {
        let levels = ladder(&[(100.0, 10.0), (99.0, 50.0)]);
        let price = depth_weighted_price(&levels, DEFAULT_TARGET_NOTIONAL, DEFAULT_FALLBACK_DIVISOR).unwrap();
        assert_eq!(price, 99.0);
    }

    #[test]
    fn test_equal_notional_does_not_cross() {
        // exactly 5000 on the first level, crossing needs the second
        let levels = ladder(&[(100.0, 50.0), (99.0, 1.0)]);
        let price = depth_weighted_price(&levels, 5000.0, DEFAULT_FALLBACK_DIVISOR).unwrap();
        assert_eq!(price, 99.0);
    }

    #[test]
    fn test_exhausted_ladder_falls_back() {
        let levels = ladder(&[(100.0, 1.0), (99.0, 1.0)]);
        let price = depth_weighted_price(&levels, DEFAULT_TARGET_NOTIONAL, DEFAULT_FALLBACK_DIVISOR).unwrap();
        assert!((price - 99.0 / 1.01).abs() < 1e-9);
    }

    #[test]
    fn test_empty_ladder_is_invalid() {
        assert_matches!(
            depth_weighted_price(&[], DEFAULT_TARGET_NOTIONAL, DEFAULT_FALLBACK_DIVISOR),
            Err(MarketDataError::InvalidInput(_))
        );
    }

    #[test]
    fn test_bad_level_is_invalid() {
        let levels = ladder(&[(f64::NAN, 1.0)]);
        assert_matches!(
            depth_weighted_price(&levels, DEFAULT_TARGET_NOTIONAL, DEFAULT_FALLBACK_DIVISOR),
            Err(MarketDataError::InvalidInput(_))
        );

        let levels = ladder(&[(100.0, -1.0)]);
        assert_matches!(
            depth_weighted_price(&levels, DEFAULT_TARGET_NOTIONAL, DEFAULT_FALLBACK_DIVISOR),
            Err(MarketDataError::InvalidInput(_))
        );
    }
}
