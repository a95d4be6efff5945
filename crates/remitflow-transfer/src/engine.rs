//! Remittance engine: thread-safe facade over both ledgers.
//!
//! All state sits behind one mutex, so every check-then-mutate sequence
//! (status checks, pair uniqueness, counters, vault moves) runs as a single
//! critical section. Calls on one engine are linearizable.

use std::sync::{Arc, Mutex, MutexGuard};

use remitflow_escrow::{AuthorityGate, EscrowLedger};
use remitflow_types::constants::{ENGINE_NAME, VERSION};
use remitflow_types::{
    CallContext, DisputeResolution, EngineConfig, Escrow, EscrowId, EscrowParams,
    IdentityRegistry, Principal, RateOracle, RemitError, Resolution, Result, Transfer,
    TransferId, TransferParams, TransferStatus, UnitLedger,
};
use serde::Serialize;

use crate::transfer_ledger::TransferLedger;

/// External systems the engine calls into.
#[derive(Clone)]
pub struct Collaborators {
    pub identity: Arc<dyn IdentityRegistry>,
    pub rates: Arc<dyn RateOracle>,
    /// Stable-unit ledger: sender balances and the vault.
    pub units: Arc<dyn UnitLedger>,
    /// Native-asset ledger the escrow creation fee is paid on.
    pub native: Arc<dyn UnitLedger>,
    /// Custody account holding units for open transfers.
    pub vault: Principal,
}

struct EngineState {
    escrows: EscrowLedger,
    transfers: TransferLedger,
}

/// Snapshot of every record, as written by [`RemittanceEngine::export_audit_trail`].
#[derive(Debug, Serialize)]
pub struct AuditTrail<'a> {
    pub engine: &'static str,
    pub version: &'static str,
    pub authority: Option<&'a Principal>,
    pub vault: &'a Principal,
    pub transfer_params: &'a TransferParams,
    pub escrow_params: &'a EscrowParams,
    pub transfers: &'a [Transfer],
    pub escrows: &'a [Escrow],
    pub resolutions: Vec<&'a DisputeResolution>,
    pub custody_inflows: u128,
    pub custody_refunds: u128,
}

/// The remittance engine.
pub struct RemittanceEngine {
    gate: Arc<AuthorityGate>,
    state: Mutex<EngineState>,
}

impl RemittanceEngine {
    /// Build an engine from a validated configuration.
    ///
    /// # Errors
    /// Returns the first domain-rule violation found in `config`.
    pub fn new(config: EngineConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let gate = Arc::new(AuthorityGate::new(config.admin_policy));
        let escrows = EscrowLedger::new(config.escrow, gate.clone(), collaborators.native);
        let transfers = TransferLedger::new(
            config.transfer,
            gate.clone(),
            collaborators.identity,
            collaborators.rates,
            collaborators.units,
            collaborators.vault,
        );

        tracing::info!(
            engine = ENGINE_NAME,
            version = VERSION,
            policy = ?config.admin_policy,
            "Engine started"
        );
        Ok(Self {
            gate,
            state: Mutex::new(EngineState { escrows, transfers }),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, EngineState>> {
        self.state
            .lock()
            .map_err(|_| RemitError::Internal("engine state lock poisoned".to_string()))
    }

    // =================================================================
    // Authority & administration
    // =================================================================

    pub fn set_authority(&self, ctx: &CallContext, principal: &Principal) -> Result<()> {
        self.gate.set_authority(ctx, principal)
    }

    #[must_use]
    pub fn authority(&self) -> Option<Principal> {
        self.gate.authority().cloned()
    }

    pub fn set_transfer_fee_rate(&self, ctx: &CallContext, rate: u64) -> Result<()> {
        self.lock()?.transfers.set_transfer_fee_rate(ctx, rate)
    }

    pub fn set_min_transfer_amount(&self, ctx: &CallContext, amount: u64) -> Result<()> {
        self.lock()?.transfers.set_min_transfer_amount(ctx, amount)
    }

    pub fn set_max_transfer_amount(&self, ctx: &CallContext, amount: u64) -> Result<()> {
        self.lock()?.transfers.set_max_transfer_amount(ctx, amount)
    }

    pub fn set_grace_period(&self, ctx: &CallContext, blocks: u64) -> Result<()> {
        self.lock()?.transfers.set_grace_period(ctx, blocks)
    }

    pub fn set_creation_fee(&self, ctx: &CallContext, fee: u64) -> Result<()> {
        self.lock()?.escrows.set_creation_fee(ctx, fee)
    }

    pub fn set_max_escrows(&self, ctx: &CallContext, max: u64) -> Result<()> {
        self.lock()?.escrows.set_max_escrows(ctx, max)
    }

    pub fn set_dispute_timeout(&self, ctx: &CallContext, blocks: u64) -> Result<()> {
        self.lock()?.escrows.set_dispute_timeout(ctx, blocks)
    }

    // =================================================================
    // Transfers
    // =================================================================

    pub fn initiate_transfer(
        &self,
        ctx: &CallContext,
        recipient: &Principal,
        amount_fiat: u64,
        currency: &str,
        location_sender: &str,
        location_recipient: &str,
    ) -> Result<TransferId> {
        let mut guard = self.lock()?;
        let EngineState { escrows, transfers } = &mut *guard;
        transfers.initiate_transfer(
            ctx,
            escrows,
            recipient,
            amount_fiat,
            currency,
            location_sender,
            location_recipient,
        )
    }

    pub fn complete_transfer(&self, ctx: &CallContext, id: TransferId) -> Result<()> {
        let mut guard = self.lock()?;
        let EngineState { escrows, transfers } = &mut *guard;
        transfers.complete_transfer(ctx, escrows, id)
    }

    pub fn cancel_transfer(&self, ctx: &CallContext, id: TransferId) -> Result<()> {
        let mut guard = self.lock()?;
        let EngineState { escrows, transfers } = &mut *guard;
        transfers.cancel_transfer(ctx, escrows, id)
    }

    pub fn update_transfer_location(
        &self,
        ctx: &CallContext,
        id: TransferId,
        new_location_sender: &str,
        new_location_recipient: &str,
    ) -> Result<()> {
        self.lock()?.transfers.update_transfer_location(
            ctx,
            id,
            new_location_sender,
            new_location_recipient,
        )
    }

    pub fn get_transfer_status(&self, id: TransferId) -> Result<TransferStatus> {
        self.lock()?.transfers.get_transfer_status(id)
    }

    // =================================================================
    // Escrows
    // =================================================================

    pub fn create_escrow(
        &self,
        ctx: &CallContext,
        recipient: &Principal,
        amount: u64,
        currency: &str,
        fee: u64,
    ) -> Result<EscrowId> {
        self.lock()?
            .escrows
            .create_escrow(ctx, recipient, amount, currency, fee)
    }

    pub fn release_escrow(&self, ctx: &CallContext, id: EscrowId) -> Result<()> {
        self.lock()?.escrows.release_escrow(ctx, id)
    }

    pub fn cancel_escrow(&self, ctx: &CallContext, id: EscrowId) -> Result<()> {
        self.lock()?.escrows.cancel_escrow(ctx, id)
    }

    pub fn dispute_escrow(&self, ctx: &CallContext, id: EscrowId) -> Result<()> {
        self.lock()?.escrows.dispute_escrow(ctx, id)
    }

    pub fn resolve_dispute(
        &self,
        ctx: &CallContext,
        id: EscrowId,
        resolution: &str,
    ) -> Result<Resolution> {
        self.lock()?.escrows.resolve_dispute(ctx, id, resolution)
    }

    pub fn timeout_escrow(&self, ctx: &CallContext, id: EscrowId) -> Result<()> {
        self.lock()?.escrows.timeout_escrow(ctx, id)
    }

    pub fn check_escrow_existence(
        &self,
        sender: &Principal,
        recipient: &Principal,
    ) -> Result<bool> {
        Ok(self.lock()?.escrows.check_escrow_existence(sender, recipient))
    }

    // =================================================================
    // Reads
    // =================================================================

    pub fn transfer(&self, id: TransferId) -> Result<Option<Transfer>> {
        Ok(self.lock()?.transfers.transfer(id).cloned())
    }

    pub fn transfers_by_sender(&self, principal: &Principal) -> Result<Vec<Transfer>> {
        Ok(self
            .lock()?
            .transfers
            .transfers_by_sender(principal)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn transfers_by_recipient(&self, principal: &Principal) -> Result<Vec<Transfer>> {
        Ok(self
            .lock()?
            .transfers
            .transfers_by_recipient(principal)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn transfer_count(&self) -> Result<u64> {
        Ok(self.lock()?.transfers.transfer_count())
    }

    pub fn escrow(&self, id: EscrowId) -> Result<Option<Escrow>> {
        Ok(self.lock()?.escrows.escrow(id).cloned())
    }

    pub fn dispute_resolution(&self, id: EscrowId) -> Result<Option<DisputeResolution>> {
        Ok(self.lock()?.escrows.dispute_resolution(id).cloned())
    }

    pub fn escrow_count(&self) -> Result<u64> {
        Ok(self.lock()?.escrows.escrow_count())
    }

    pub fn pending_escrows(&self) -> Result<Vec<Escrow>> {
        Ok(self
            .lock()?
            .escrows
            .pending_escrows()
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn transfer_params(&self) -> Result<TransferParams> {
        Ok(self.lock()?.transfers.params().clone())
    }

    pub fn escrow_params(&self) -> Result<EscrowParams> {
        Ok(self.lock()?.escrows.params().clone())
    }

    // =================================================================
    // Audit
    // =================================================================

    /// Check that vault custody matches the recorded transfers.
    ///
    /// # Errors
    /// `CustodyInvariantViolation` on mismatch, `Internal` on a poisoned lock.
    pub fn reconcile(&self) -> Result<()> {
        self.lock()?.transfers.reconcile()
    }

    /// Serialize every record and the current parameters as pretty JSON.
    pub fn export_audit_trail(&self) -> Result<String> {
        let state = self.lock()?;
        let custody = state.transfers.custody();
        let trail = AuditTrail {
            engine: ENGINE_NAME,
            version: VERSION,
            authority: self.gate.authority(),
            vault: state.transfers.vault(),
            transfer_params: state.transfers.params(),
            escrow_params: state.escrows.params(),
            transfers: state.transfers.transfers(),
            escrows: state.escrows.escrows(),
            resolutions: state.escrows.resolutions(),
            custody_inflows: custody.total_inflows(),
            custody_refunds: custody.total_refunds(),
        };
        Ok(serde_json::to_string_pretty(&trail)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{InMemoryIdentityRegistry, StaticRateOracle};
    use remitflow_escrow::InMemoryUnitLedger;
    use remitflow_types::AdminPolicy;

    fn p(name: &str) -> Principal {
        Principal::new(name)
    }

    fn ctx(caller: &str, height: u64) -> CallContext {
        CallContext::new(caller, height)
    }

    fn engine_with(config: EngineConfig) -> Result<RemittanceEngine> {
        let identity = Arc::new(InMemoryIdentityRegistry::new());
        identity.verify(&p("alice"));
        identity.verify(&p("bob"));
        let units = Arc::new(InMemoryUnitLedger::new("unit"));
        units.mint(&p("alice"), 10_000);
        RemittanceEngine::new(
            config,
            Collaborators {
                identity,
                rates: Arc::new(StaticRateOracle::at_par()),
                units,
                native: Arc::new(InMemoryUnitLedger::new("native")),
                vault: p("vault"),
            },
        )
    }

    #[test]
    fn invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.transfer.fee_rate_percent = 9;
        assert!(matches!(
            engine_with(config),
            Err(RemitError::InvalidFeeRate(9))
        ));
    }

    #[test]
    fn facade_round_trip() {
        let engine = engine_with(EngineConfig::default()).unwrap();
        engine.set_authority(&ctx("admin", 0), &p("admin")).unwrap();
        assert_eq!(engine.authority(), Some(p("admin")));

        let id = engine
            .initiate_transfer(&ctx("alice", 1), &p("bob"), 1000, "EUR", "Lagos", "Paris")
            .unwrap();
        assert_eq!(engine.get_transfer_status(id).unwrap(), TransferStatus::Pending);
        assert_eq!(engine.pending_escrows().unwrap().len(), 1);
        assert!(engine.check_escrow_existence(&p("alice"), &p("bob")).unwrap());

        engine.complete_transfer(&ctx("alice", 2), id).unwrap();
        assert!(engine.pending_escrows().unwrap().is_empty());
        engine.reconcile().unwrap();
    }

    #[test]
    fn setters_route_to_owning_ledger() {
        let engine = engine_with(EngineConfig::default()).unwrap();
        engine.set_authority(&ctx("admin", 0), &p("admin")).unwrap();
        let admin = ctx("admin", 0);
        engine.set_transfer_fee_rate(&admin, 3).unwrap();
        engine.set_min_transfer_amount(&admin, 10).unwrap();
        engine.set_max_transfer_amount(&admin, 20).unwrap();
        engine.set_grace_period(&admin, 6).unwrap();
        engine.set_creation_fee(&admin, 0).unwrap();
        engine.set_max_escrows(&admin, 2).unwrap();
        engine.set_dispute_timeout(&admin, 9).unwrap();

        let t = engine.transfer_params().unwrap();
        assert_eq!(
            (t.fee_rate_percent, t.min_transfer_amount, t.max_transfer_amount, t.grace_period),
            (3, 10, 20, 6)
        );
        let e = engine.escrow_params().unwrap();
        assert_eq!((e.max_escrows, e.dispute_timeout), (2, 9));
    }

    #[test]
    fn authority_only_policy_locks_setters() {
        let config = EngineConfig {
            admin_policy: AdminPolicy::AuthorityOnly,
            ..EngineConfig::default()
        };
        let engine = engine_with(config).unwrap();
        engine.set_authority(&ctx("admin", 0), &p("admin")).unwrap();
        assert!(matches!(
            engine.set_grace_period(&ctx("alice", 0), 1),
            Err(RemitError::NotAuthorized)
        ));
        engine.set_grace_period(&ctx("admin", 0), 1).unwrap();
    }

    #[test]
    fn audit_trail_is_json() {
        let engine = engine_with(EngineConfig::default()).unwrap();
        engine.set_authority(&ctx("admin", 0), &p("admin")).unwrap();
        engine
            .initiate_transfer(&ctx("alice", 1), &p("bob"), 500, "USD", "Lagos", "London")
            .unwrap();

        let json = engine.export_audit_trail().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["engine"], "RemitFlow");
        assert_eq!(value["authority"], "admin");
        assert_eq!(value["transfers"].as_array().unwrap().len(), 1);
        assert_eq!(value["escrows"].as_array().unwrap().len(), 1);
        assert_eq!(value["custody_inflows"], 505);
    }

    #[test]
    fn poisoned_lock_is_internal_error() {
        let engine = Arc::new(engine_with(EngineConfig::default()).unwrap());
        let poisoner = engine.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.state.lock().unwrap();
            panic!("poison the engine lock");
        })
        .join();

        assert!(matches!(engine.transfer_count(), Err(RemitError::Internal(_))));
        assert!(matches!(engine.reconcile(), Err(RemitError::Internal(_))));
    }
}
