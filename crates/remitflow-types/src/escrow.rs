//! # Escrow: custody record backing a transfer
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐  release / resolve(release)   ┌──────────┐
//!   │ PENDING ├──────────────────────────────▶│ RELEASED │
//!   └────┬────┘                               └──────────┘
//!        │ cancel / resolve(cancel) / timeout
//!        ▼
//!   ┌───────────┐
//!   │ CANCELLED │
//!   └───────────┘
//! ```
//!
//! Orthogonal dispute sub-state: `NONE → ACTIVE → RESOLVED`. The party who
//! opens a dispute becomes its resolver.

use serde::{Deserialize, Serialize};

use crate::{BlockHeight, EscrowCurrency, EscrowId, Principal, RemitError, Result};

/// Lifecycle state of an escrow. Transitions are monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowStatus {
    Pending,
    Released,
    Cancelled,
}

impl EscrowStatus {
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!((self, target), (Self::Pending, Self::Released | Self::Cancelled))
    }
}

impl std::fmt::Display for EscrowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Released => write!(f, "RELEASED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Dispute sub-state of an escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DisputeStatus {
    None,
    Active,
    Resolved,
}

impl std::fmt::Display for DisputeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "NONE"),
            Self::Active => write!(f, "ACTIVE"),
            Self::Resolved => write!(f, "RESOLVED"),
        }
    }
}

/// Outcome chosen by a dispute resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    Release,
    Cancel,
}

impl Resolution {
    /// Parse `"release"` or `"cancel"`.
    ///
    /// # Errors
    /// Returns `InvalidResolution` for anything else.
    pub fn parse(code: &str) -> Result<Self> {
        match code {
            "release" => Ok(Self::Release),
            "cancel" => Ok(Self::Cancel),
            other => Err(RemitError::InvalidResolution(other.to_string())),
        }
    }

    /// The escrow status this resolution leads to.
    #[must_use]
    pub fn target_status(&self) -> EscrowStatus {
        match self {
            Self::Release => EscrowStatus::Released,
            Self::Cancel => EscrowStatus::Cancelled,
        }
    }
}

/// Funds held for one (sender, recipient) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    pub id: EscrowId,
    pub sender: Principal,
    pub recipient: Principal,
    /// Units held, excluding the transfer fee.
    pub amount: u64,
    pub currency: EscrowCurrency,
    pub fee: u64,
    /// Creation block height; anchors the dispute window.
    pub timestamp: BlockHeight,
    pub status: EscrowStatus,
    pub dispute_status: DisputeStatus,
    /// Set when a dispute is opened: the disputing party.
    pub resolver: Option<Principal>,
}

impl Escrow {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.status == EscrowStatus::Pending
    }

    /// Whether `who` is the sender or the recipient.
    #[must_use]
    pub fn is_party(&self, who: &Principal) -> bool {
        &self.sender == who || &self.recipient == who
    }

    /// Move to a terminal status.
    ///
    /// # Errors
    /// Returns `EscrowNotPending` if the escrow already left PENDING.
    pub fn transition(&mut self, target: EscrowStatus) -> Result<()> {
        if !self.status.can_transition_to(target) {
            return Err(RemitError::EscrowNotPending);
        }
        self.status = target;
        Ok(())
    }
}

/// Immutable record of how a dispute was settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisputeResolution {
    pub escrow_id: EscrowId,
    pub resolution: Resolution,
    pub resolved_by: Principal,
    pub resolution_timestamp: BlockHeight,
}
