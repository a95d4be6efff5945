//! In-memory [`UnitLedger`].
//!
//! Tracks one balance per principal. All mutations are atomic: either the
//! full transfer succeeds or every balance is unchanged. Hosts without a
//! chain backend use it directly; tests use its failure injection to
//! exercise the engine's rollback paths.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use remitflow_types::{LedgerError, Principal, UnitLedger};

/// A fungible-asset ledger held in process memory.
pub struct InMemoryUnitLedger {
    name: &'static str,
    balances: Mutex<HashMap<Principal, u64>>,
    /// Principals whose outgoing transfers are rejected.
    blocked_senders: Mutex<HashSet<Principal>>,
}

impl InMemoryUnitLedger {
    /// Create an empty ledger. `name` appears in logs and error messages.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            balances: Mutex::new(HashMap::new()),
            blocked_senders: Mutex::new(HashSet::new()),
        }
    }

    /// Credit `amount` to `principal` out of thin air (an on-ramp mint).
    pub fn mint(&self, principal: &Principal, amount: u64) {
        let mut balances = self.balances();
        let entry = balances.entry(principal.clone()).or_default();
        *entry = entry.saturating_add(amount);
    }

    /// Reject every subsequent transfer *from* `principal` until unblocked.
    pub fn block_sender(&self, principal: &Principal) {
        self.blocked().insert(principal.clone());
    }

    pub fn unblock_sender(&self, principal: &Principal) {
        self.blocked().remove(principal);
    }

    /// Sum of all balances.
    #[must_use]
    pub fn total_supply(&self) -> u128 {
        self.balances().values().map(|b| u128::from(*b)).sum()
    }

    // A poisoned lock still holds consistent balances: every mutation
    // completes before the guard drops.
    fn balances(&self) -> MutexGuard<'_, HashMap<Principal, u64>> {
        self.balances.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn blocked(&self) -> MutexGuard<'_, HashSet<Principal>> {
        self.blocked_senders
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl UnitLedger for InMemoryUnitLedger {
    fn name(&self) -> &'static str {
        self.name
    }

    fn balance(&self, principal: &Principal) -> u64 {
        self.balances().get(principal).copied().unwrap_or(0)
    }

    fn transfer(
        &self,
        amount: u64,
        from: &Principal,
        to: &Principal,
    ) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::TransferFailed("zero amount".to_string()));
        }
        if self.blocked().contains(from) {
            return Err(LedgerError::TransferFailed(format!(
                "{}: sender {from} is blocked",
                self.name
            )));
        }

        let mut balances = self.balances();
        let available = balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }

        let credited = balances
            .get(to)
            .copied()
            .unwrap_or(0)
            .checked_add(amount)
            .ok_or_else(|| {
                LedgerError::TransferFailed(format!("{}: balance overflow", self.name))
            })?;

        balances.insert(from.clone(), available - amount);
        balances.insert(to.clone(), credited);
        Ok(())
    }
}
