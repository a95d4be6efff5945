//! # Transfer: one remittance attempt
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐  complete   ┌───────────┐
//!   │ PENDING ├────────────▶│ COMPLETED │
//!   └────┬────┘             └───────────┘
//!        │ cancel (within grace period)
//!        ▼
//!   ┌───────────┐
//!   │ CANCELLED │
//!   └───────────┘
//! ```
//!
//! Amounts are fixed at creation. Only the two location strings may change,
//! and only while the transfer is pending.

use serde::{Deserialize, Serialize};

use crate::constants::MAX_LOCATION_LEN;
use crate::{BlockHeight, Currency, EscrowId, Principal, RemitError, Result, TransferId};

/// Lifecycle state of a transfer. Transitions are monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferStatus {
    /// Funds sit in the vault, backed by a pending escrow.
    Pending,
    /// The sender confirmed the transfer; its escrow was released.
    Completed,
    /// The sender cancelled within the grace period and was refunded.
    Cancelled,
}

impl TransferStatus {
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Pending, Self::Completed | Self::Cancelled))
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// A remittance from `sender` to `recipient`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub sender: Principal,
    pub recipient: Principal,
    /// Fiat quantity requested.
    pub amount_fiat: u64,
    pub currency: Currency,
    /// Converted principal in stable units.
    pub amount_token: u64,
    /// Percentage fee, computed on the fiat amount and moved alongside the principal.
    pub fee: u64,
    /// Creation block height.
    pub timestamp: BlockHeight,
    pub status: TransferStatus,
    /// The escrow backing this transfer (plain id, not ownership).
    pub escrow_id: EscrowId,
    pub location_sender: String,
    pub location_recipient: String,
}

impl Transfer {
    /// Units held by the vault on behalf of this transfer.
    #[must_use]
    pub fn total_units(&self) -> u64 {
        self.amount_token.saturating_add(self.fee)
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == TransferStatus::Pending
    }

    /// # Errors
    /// Returns `EscrowNotPending` if the transfer already left PENDING.
    pub fn mark_completed(&mut self) -> Result<()> {
        self.transition(TransferStatus::Completed)
    }

    /// # Errors
    /// Returns `EscrowNotPending` if the transfer already left PENDING.
    pub fn mark_cancelled(&mut self) -> Result<()> {
        self.transition(TransferStatus::Cancelled)
    }

    fn transition(&mut self, target: TransferStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(RemitError::EscrowNotPending);
        }
        self.status = target;
        Ok(())
    }
}

/// Check a location string: non-empty and at most [`MAX_LOCATION_LEN`] characters.
///
/// # Errors
/// Returns `InvalidLocation` otherwise.
pub fn validate_location(location: &str) -> Result<()> {
    let len = location.chars().count();
    if len == 0 || len > MAX_LOCATION_LEN {
        return Err(RemitError::InvalidLocation);
    }
    Ok(())
}

/// Dummy transfer for testing. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Transfer {
    pub fn dummy(id: TransferId, amount_token: u64, fee: u64) -> Self {
        Self {
            id,
            sender: Principal::random(),
            recipient: Principal::random(),
            amount_fiat: amount_token,
            currency: Currency::Usd,
            amount_token,
            fee,
            timestamp: 0,
            status: TransferStatus::Pending,
            escrow_id: EscrowId(id.0),
            location_sender: "Lagos".to_string(),
            location_recipient: "London".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_transitions_valid() {
        assert!(TransferStatus::Pending.can_transition_to(TransferStatus::Completed));
        assert!(TransferStatus::Pending.can_transition_to(TransferStatus::Cancelled));
    }

    #[test]
    fn terminal_states_never_leave() {
        for terminal in [TransferStatus::Completed, TransferStatus::Cancelled] {
            assert!(terminal.is_terminal());
            for target in [
                TransferStatus::Pending,
                TransferStatus::Completed,
                TransferStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    #[test]
    fn double_complete_blocked() {
        let mut t = Transfer::dummy(TransferId(0), 1000, 10);
        t.mark_completed().unwrap();
        let err = t.mark_completed().unwrap_err();
        assert!(matches!(err, RemitError::EscrowNotPending));
        assert!(t.mark_cancelled().is_err(), "COMPLETED → CANCELLED must fail");
    }

    #[test]
    fn total_units_includes_fee() {
        let t = Transfer::dummy(TransferId(1), 1000, 10);
        assert_eq!(t.total_units(), 1010);
    }

    #[test]
    fn location_bounds() {
        assert!(validate_location("Accra").is_ok());
        assert!(validate_location(&"x".repeat(MAX_LOCATION_LEN)).is_ok());
        assert!(matches!(
            validate_location(&"x".repeat(MAX_LOCATION_LEN + 1)),
            Err(RemitError::InvalidLocation)
        ));
        assert!(matches!(validate_location(""), Err(RemitError::InvalidLocation)));
    }

    #[test]
    fn location_counts_characters_not_bytes() {
        let accented = "é".repeat(MAX_LOCATION_LEN);
        assert!(validate_location(&accented).is_ok());
    }

    #[test]
    fn serde_roundtrip() {
        let t = Transfer::dummy(TransferId(3), 500, 5);
        let json = serde_json::to_string(&t).unwrap();
        let back: Transfer = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }
}
