//! Custody reconciliation.
//!
//! Invariant checked on demand:
//! ```text
//! inflows - refunds == Σ(amount_token + fee) over PENDING and COMPLETED transfers
//!                   == vault balance
//! ```
//!
//! Completed transfers stay counted: their units remain in the vault until
//! an off-ramp pays them out, which is outside this engine.

use remitflow_types::constants::display_units;
use remitflow_types::{RemitError, Result, Transfer, TransferStatus};

/// Running totals of units moved into and refunded out of the vault.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CustodyReconciliation {
    inflows: u128,
    refunds: u128,
}

impl CustodyReconciliation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record units moved sender → vault.
    pub fn record_inflow(&mut self, amount: u64) {
        self.inflows += u128::from(amount);
    }

    /// Record units refunded vault → sender.
    pub fn record_refund(&mut self, amount: u64) {
        self.refunds += u128::from(amount);
    }

    #[must_use]
    pub fn total_inflows(&self) -> u128 {
        self.inflows
    }

    #[must_use]
    pub fn total_refunds(&self) -> u128 {
        self.refunds
    }

    /// Units the vault should hold according to the recorded movements.
    #[must_use]
    pub fn expected_custody(&self) -> u128 {
        self.inflows.saturating_sub(self.refunds)
    }

    /// Verify recorded movements, transfer rows, and the actual vault balance agree.
    ///
    /// # Errors
    /// Returns [`RemitError::CustodyInvariantViolation`] on any mismatch.
    pub fn verify<'a>(
        &self,
        transfers: impl IntoIterator<Item = &'a Transfer>,
        vault_balance: u64,
    ) -> Result<()> {
        if self.refunds > self.inflows {
            return Err(RemitError::CustodyInvariantViolation {
                reason: format!(
                    "refunds {} exceed inflows {}",
                    self.refunds, self.inflows
                ),
            });
        }
        let expected = self.expected_custody();

        let held: u128 = transfers
            .into_iter()
            .filter(|t| t.status != TransferStatus::Cancelled)
            .map(|t| u128::from(t.total_units()))
            .sum();
        if held != expected {
            return Err(RemitError::CustodyInvariantViolation {
                reason: format!(
                    "open transfers hold {held} units, movements imply {expected} \
                     (inflows={}, refunds={})",
                    self.inflows, self.refunds
                ),
            });
        }
        if u128::from(vault_balance) != expected {
            return Err(RemitError::CustodyInvariantViolation {
                reason: format!(
                    "vault holds {} units, movements imply {expected}",
                    display_units(vault_balance)
                ),
            });
        }
        Ok(())
    }
}
