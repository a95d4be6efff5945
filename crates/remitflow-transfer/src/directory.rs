//! In-memory identity registry and rate oracle.
//!
//! Reference implementations of [`IdentityRegistry`] and [`RateOracle`] for
//! hosts without an external KYC service or price feed, and for tests.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use remitflow_types::{Currency, IdentityRegistry, Principal, RateOracle, UserInfo};

/// Identity store keyed by principal.
#[derive(Default)]
pub struct InMemoryIdentityRegistry {
    users: RwLock<HashMap<Principal, UserInfo>>,
}

impl InMemoryIdentityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `principal`, or overwrite its KYC flag.
    pub fn register(&self, principal: &Principal, kyc_verified: bool) {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(principal.clone(), UserInfo { kyc_verified });
    }

    pub fn verify(&self, principal: &Principal) {
        self.register(principal, true);
    }

    pub fn remove(&self, principal: &Principal) {
        self.users
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(principal);
    }
}

impl IdentityRegistry for InMemoryIdentityRegistry {
    fn user_info(&self, principal: &Principal) -> Option<UserInfo> {
        self.users
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(principal)
            .copied()
    }
}

/// Fixed per-currency rates, replaceable at runtime.
#[derive(Default)]
pub struct StaticRateOracle {
    rates: RwLock<HashMap<Currency, u64>>,
}

impl StaticRateOracle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every currency pegged 1:1 to the unit.
    #[must_use]
    pub fn at_par() -> Self {
        let oracle = Self::new();
        for currency in [Currency::Usd, Currency::Eur, Currency::Gbp] {
            oracle.set_rate(currency, remitflow_types::constants::UNIT_SCALE);
        }
        oracle
    }

    pub fn set_rate(&self, currency: Currency, rate: u64) {
        self.rates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(currency, rate);
    }

    pub fn clear_rate(&self, currency: Currency) {
        self.rates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&currency);
    }
}

impl RateOracle for StaticRateOracle {
    fn rate(&self, currency: Currency) -> Option<u64> {
        self.rates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&currency)
            .copied()
    }
}
