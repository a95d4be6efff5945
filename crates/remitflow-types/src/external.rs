//! Contracts for the systems the engine queries or calls but does not own.
//!
//! All calls are synchronous and fallible with no implicit retry. The engine
//! holds implementations behind `Arc<dyn Trait>` so hosts can plug in a
//! chain client, a database, or the in-memory references used in tests.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Currency, Principal, RemitError};

/// Identity / KYC facts about a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub kyc_verified: bool,
}

/// Identity/KYC store.
pub trait IdentityRegistry: Send + Sync {
    /// `None` when the principal is unknown, which counts as not verified.
    fn user_info(&self, principal: &Principal) -> Option<UserInfo>;

    fn is_kyc_verified(&self, principal: &Principal) -> bool {
        self.user_info(principal).is_some_and(|info| info.kyc_verified)
    }
}

/// Exchange-rate feed. Rates are units-per-fiat scaled by
/// [`UNIT_SCALE`](crate::constants::UNIT_SCALE); `1_000_000` is a 1:1 peg.
pub trait RateOracle: Send + Sync {
    fn rate(&self, currency: Currency) -> Option<u64>;
}

/// Failure modes of a ledger transfer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },
    #[error("transfer failed: {0}")]
    TransferFailed(String),
}

impl From<LedgerError> for RemitError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientBalance { needed, available } => {
                Self::InsufficientBalance { needed, available }
            }
            LedgerError::TransferFailed(reason) => Self::TransferFailed { reason },
        }
    }
}

/// Balance ledger for a fungible asset: the stable unit, or the native
/// asset the escrow creation fee is paid in.
pub trait UnitLedger: Send + Sync {
    /// Ledger name for logging.
    fn name(&self) -> &'static str;

    fn balance(&self, principal: &Principal) -> u64;

    /// Move `amount` from `from` to `to`. Either the whole amount moves or nothing does.
    fn transfer(
        &self,
        amount: u64,
        from: &Principal,
        to: &Principal,
    ) -> std::result::Result<(), LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Registry;

    impl IdentityRegistry for Registry {
        fn user_info(&self, principal: &Principal) -> Option<UserInfo> {
            match principal.as_str() {
                "verified" => Some(UserInfo { kyc_verified: true }),
                "pending" => Some(UserInfo {
                    kyc_verified: false,
                }),
                _ => None,
            }
        }
    }

    #[test]
    fn absent_user_is_not_verified() {
        let registry = Registry;
        assert!(registry.is_kyc_verified(&Principal::new("verified")));
        assert!(!registry.is_kyc_verified(&Principal::new("pending")));
        assert!(!registry.is_kyc_verified(&Principal::new("stranger")));
    }

    #[test]
    fn ledger_errors_map_to_remit_errors() {
        let err: RemitError = LedgerError::InsufficientBalance {
            needed: 10,
            available: 3,
        }
        .into();
        assert!(matches!(
            err,
            RemitError::InsufficientBalance {
                needed: 10,
                available: 3
            }
        ));

        let err: RemitError = LedgerError::TransferFailed("frozen account".into()).into();
        assert_eq!(err.code(), "RF_ERR_502");
    }
}
