//! Fiat → unit conversion.
//!
//! ```text
//! amount_token = floor(amount_fiat × 1_000_000 / rate)
//! fee          = floor(amount_fiat × fee_rate_percent / 100)
//! ```
//!
//! The fee is taken from the *fiat* amount and later added straight onto
//! `amount_token`. The two only share a dimension at a 1:1 peg
//! (`rate == 1_000_000`); callers move the sum regardless.

use remitflow_types::constants::UNIT_SCALE;
use remitflow_types::{RemitError, Result};
use serde::{Deserialize, Serialize};

/// Output of a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversion {
    pub amount_token: u64,
    pub fee: u64,
}

impl Conversion {
    /// Units moved into custody: `amount_token + fee`.
    pub fn total_units(&self) -> Result<u64> {
        self.amount_token
            .checked_add(self.fee)
            .ok_or(RemitError::ArithmeticOverflow)
    }
}

/// Pure, stateless converter.
pub struct ConversionEngine;

impl ConversionEngine {
    /// Convert `amount_fiat` at `rate` (units per fiat, scaled by 1e6).
    ///
    /// # Errors
    /// - `InvalidRate` if `rate == 0`
    /// - `ArithmeticOverflow` if a result does not fit in `u64`
    pub fn convert(amount_fiat: u64, rate: u64, fee_rate_percent: u64) -> Result<Conversion> {
        if rate == 0 {
            return Err(RemitError::InvalidRate);
        }
        let amount_token = u128::from(amount_fiat) * u128::from(UNIT_SCALE) / u128::from(rate);
        let fee = u128::from(amount_fiat) * u128::from(fee_rate_percent) / 100;

        Ok(Conversion {
            amount_token: u64::try_from(amount_token).map_err(|_| RemitError::ArithmeticOverflow)?,
            fee: u64::try_from(fee).map_err(|_| RemitError::ArithmeticOverflow)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn par_rate_is_identity() {
        let c = ConversionEngine::convert(1000, 1_000_000, 1).unwrap();
        assert_eq!(c.amount_token, 1000);
        assert_eq!(c.fee, 10);
        assert_eq!(c.total_units().unwrap(), 1010);
    }

    #[test]
    fn results_are_floored() {
        // 100 × 1e6 / 3e6 = 33.3
        let c = ConversionEngine::convert(100, 3_000_000, 3).unwrap();
        assert_eq!(c.amount_token, 33);
        assert_eq!(c.fee, 3);

        let c = ConversionEngine::convert(99, 1_000_000, 1).unwrap();
        assert_eq!(c.fee, 0);
    }

    #[test]
    fn strong_rate_inflates_units() {
        let c = ConversionEngine::convert(5, 500_000, 0).unwrap();
        assert_eq!(c.amount_token, 10);
        assert_eq!(c.fee, 0);
    }

    #[test]
    fn zero_rate_rejected() {
        assert!(matches!(
            ConversionEngine::convert(100, 0, 1),
            Err(RemitError::InvalidRate)
        ));
    }

    #[test]
    fn overflow_detected() {
        assert!(matches!(
            ConversionEngine::convert(u64::MAX, 1, 0),
            Err(RemitError::ArithmeticOverflow)
        ));
        // Large but representable: intermediate product only fits in u128
        let c = ConversionEngine::convert(u64::MAX, 1_000_000, 5).unwrap();
        assert_eq!(c.amount_token, u64::MAX);
        assert!(c.total_units().is_err());
    }

    #[test]
    fn deterministic() {
        let a = ConversionEngine::convert(123_456, 1_080_000, 2).unwrap();
        let b = ConversionEngine::convert(123_456, 1_080_000, 2).unwrap();
        assert_eq!(a, b);
    }
}
