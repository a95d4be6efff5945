//! Identifiers used throughout RemitFlow.
//!
//! Transfers and escrows are numbered sequentially from zero and double as
//! arena indexes. Principals are opaque identities supplied by the host.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Principal
// ---------------------------------------------------------------------------

/// An opaque identity acting as sender, recipient, caller, authority or vault.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Principal(pub String);

impl Principal {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Random principal for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl Principal {
    pub fn random() -> Self {
        Self(format!("SP{:016X}", rand::random::<u64>()))
    }
}

// ---------------------------------------------------------------------------
// TransferId
// ---------------------------------------------------------------------------

/// Sequential transfer identifier. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct TransferId(pub u64);

impl TransferId {
    /// Position of this transfer in an arena, if addressable on this host.
    #[must_use]
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transfer:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EscrowId
// ---------------------------------------------------------------------------

/// Sequential escrow identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EscrowId(pub u64);

impl EscrowId {
    #[must_use]
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl fmt::Display for EscrowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "escrow:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CallContext
// ---------------------------------------------------------------------------

/// Logical time: the block height an operation executes at.
pub type BlockHeight = u64;

/// Who is calling and when. Every state-changing operation receives one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    /// The authenticated principal issuing the call.
    pub caller: Principal,
    /// Block height at which the call executes.
    pub block_height: BlockHeight,
}

impl CallContext {
    #[must_use]
    pub fn new(caller: impl Into<Principal>, block_height: BlockHeight) -> Self {
        Self {
            caller: caller.into(),
            block_height,
        }
    }

    /// Blocks elapsed since `since`. Saturates at zero for future timestamps.
    #[must_use]
    pub fn age_of(&self, since: BlockHeight) -> u64 {
        self.block_height.saturating_sub(since)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
