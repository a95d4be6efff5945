//! System-wide constants for the RemitFlow engine.

use rust_decimal::Decimal;

/// Fixed-point scale of oracle rates; a rate of `UNIT_SCALE` is a 1:1 peg.
pub const UNIT_SCALE: u64 = 1_000_000;

/// Upper bound for the percentage transfer fee.
pub const MAX_FEE_RATE_PERCENT: u64 = 5;

/// Upper bound for the self-cancellation grace period (blocks).
pub const MAX_GRACE_PERIOD: u64 = 144;

/// Maximum length of a sender / recipient location string (characters).
pub const MAX_LOCATION_LEN: usize = 100;

/// Default percentage fee taken on the fiat amount.
pub const DEFAULT_FEE_RATE_PERCENT: u64 = 1;

/// Default lower bound on a transfer's fiat amount.
pub const DEFAULT_MIN_TRANSFER_AMOUNT: u64 = 1;

/// Default upper bound on a transfer's fiat amount.
pub const DEFAULT_MAX_TRANSFER_AMOUNT: u64 = 1_000_000_000;

/// Default self-cancellation window (blocks).
pub const DEFAULT_GRACE_PERIOD: u64 = 144;

/// Default cap on the number of transfers ever created.
pub const DEFAULT_MAX_TRANSFERS: u64 = 1_000_000;

/// Default flat escrow creation fee (native asset).
pub const DEFAULT_CREATION_FEE: u64 = 0;

/// Default cap on the number of escrows ever created.
pub const DEFAULT_MAX_ESCROWS: u64 = 1_000_000;

/// Default dispute window / timeout threshold (blocks).
pub const DEFAULT_DISPUTE_TIMEOUT: u64 = 1_440;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "RemitFlow";

/// Render a unit amount for logs and messages.
///
/// Units are whole: the rate scale cancels in conversion, so at the 1:1 peg
/// 1010 fiat becomes 1010 units.
#[must_use]
pub fn display_units(raw: u64) -> Decimal {
    Decimal::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_units_renders_whole_units() {
        assert_eq!(display_units(1010).to_string(), "1010");
        assert_eq!(display_units(0).to_string(), "0");
        assert_eq!(display_units(u64::MAX).to_string(), u64::MAX.to_string());
    }
}
