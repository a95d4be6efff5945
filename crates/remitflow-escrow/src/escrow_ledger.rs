//! Escrow ledger: creates escrows and drives their lifecycle.
//!
//! The ledger owns every [`Escrow`] and [`DisputeResolution`] row. Rows live
//! in an arena indexed by [`EscrowId`] and are never deleted; terminal rows
//! stay as audit trail.
//!
//! A (sender, recipient) index maps each ordered pair to the last escrow
//! created for it. Creation is refused while the pair has an entry, and the
//! entry is never cleared when the escrow completes, so a pair can hold at
//! most one escrow over the ledger's lifetime.

use std::collections::HashMap;
use std::sync::Arc;

use remitflow_types::constants::display_units;
use remitflow_types::{
    CallContext, DisputeResolution, DisputeStatus, Escrow, EscrowCurrency, EscrowId,
    EscrowParams, EscrowStatus, Principal, RemitError, Resolution, Result, UnitLedger,
};

use crate::authority::AuthorityGate;

/// Manages the escrow lifecycle: creation, release, cancellation, disputes
/// and timeouts.
pub struct EscrowLedger {
    /// All escrows; position == id.
    escrows: Vec<Escrow>,
    /// At most one resolution per escrow.
    resolutions: HashMap<EscrowId, DisputeResolution>,
    /// (sender, recipient) → last escrow id. Never cleared.
    pair_index: HashMap<(Principal, Principal), EscrowId>,
    params: EscrowParams,
    gate: Arc<AuthorityGate>,
    /// Native-asset ledger the creation fee is paid on.
    fee_ledger: Arc<dyn UnitLedger>,
    /// Creation fee charged for the most recent escrow, kept for `abort_creation`.
    last_charge: Option<(EscrowId, u64)>,
}

impl EscrowLedger {
    #[must_use]
    pub fn new(
        params: EscrowParams,
        gate: Arc<AuthorityGate>,
        fee_ledger: Arc<dyn UnitLedger>,
    ) -> Self {
        Self {
            escrows: Vec::new(),
            resolutions: HashMap::new(),
            pair_index: HashMap::new(),
            params,
            gate,
            fee_ledger,
            last_charge: None,
        }
    }

    // =================================================================
    // Administration
    // =================================================================

    pub fn set_creation_fee(&mut self, ctx: &CallContext, fee: u64) -> Result<()> {
        self.gate.require_admin(ctx)?;
        EscrowParams::check_creation_fee(fee)?;
        self.params.creation_fee = fee;
        tracing::info!(caller = %ctx.caller, creation_fee = fee, "Creation fee updated");
        Ok(())
    }

    pub fn set_max_escrows(&mut self, ctx: &CallContext, max: u64) -> Result<()> {
        self.gate.require_admin(ctx)?;
        EscrowParams::check_max_escrows(max)?;
        self.params.max_escrows = max;
        tracing::info!(caller = %ctx.caller, max_escrows = max, "Escrow cap updated");
        Ok(())
    }

    pub fn set_dispute_timeout(&mut self, ctx: &CallContext, blocks: u64) -> Result<()> {
        self.gate.require_admin(ctx)?;
        EscrowParams::check_dispute_timeout(blocks)?;
        self.params.dispute_timeout = blocks;
        tracing::info!(caller = %ctx.caller, dispute_timeout = blocks, "Dispute timeout updated");
        Ok(())
    }

    #[must_use]
    pub fn params(&self) -> &EscrowParams {
        &self.params
    }

    // =================================================================
    // Lifecycle
    // =================================================================

    /// Create an escrow from the caller to `recipient`.
    ///
    /// 1. Validate caps, amount, currency, parties and pair uniqueness
    /// 2. Charge the flat creation fee, sender → authority
    /// 3. Store the row and index the pair
    ///
    /// If the fee charge fails, no escrow is recorded.
    ///
    /// # Errors
    /// `MaxEscrowsExceeded`, `InvalidAmount`, `InvalidCurrency`,
    /// `InvalidRecipient`, `EscrowAlreadyExists`, `AuthorityNotVerified`, or
    /// the fee ledger's failure.
    pub fn create_escrow(
        &mut self,
        ctx: &CallContext,
        recipient: &Principal,
        amount: u64,
        currency: &str,
        fee: u64,
    ) -> Result<EscrowId> {
        let sender = &ctx.caller;

        if self.escrow_count() >= self.params.max_escrows {
            return Err(RemitError::MaxEscrowsExceeded);
        }
        if amount == 0 {
            return Err(RemitError::InvalidAmount(amount));
        }
        let currency = EscrowCurrency::from_code(currency)
            .ok_or_else(|| RemitError::InvalidCurrency(currency.to_string()))?;
        if recipient == sender {
            return Err(RemitError::InvalidRecipient);
        }
        let pair = (sender.clone(), recipient.clone());
        if self.pair_index.contains_key(&pair) {
            return Err(RemitError::EscrowAlreadyExists);
        }
        let authority = self
            .gate
            .authority()
            .ok_or(RemitError::AuthorityNotVerified)?
            .clone();

        let id = EscrowId(self.escrow_count());
        let creation_fee = self.params.creation_fee;
        if creation_fee > 0 {
            self.fee_ledger
                .transfer(creation_fee, sender, &authority)
                .inspect_err(|e| {
                    tracing::warn!(
                        sender = %sender,
                        ledger = self.fee_ledger.name(),
                        error = %e,
                        "Escrow creation fee charge failed"
                    );
                })?;
        }

        self.escrows.push(Escrow {
            id,
            sender: sender.clone(),
            recipient: recipient.clone(),
            amount,
            currency,
            fee,
            timestamp: ctx.block_height,
            status: EscrowStatus::Pending,
            dispute_status: DisputeStatus::None,
            resolver: None,
        });
        self.pair_index.insert(pair, id);
        self.last_charge = Some((id, creation_fee));

        tracing::info!(
            escrow = %id,
            sender = %sender,
            recipient = %recipient,
            amount = %display_units(amount),
            fee = %display_units(fee),
            currency = %currency,
            creation_fee,
            height = ctx.block_height,
            "Escrow created"
        );
        Ok(id)
    }

    /// Release a pending, undisputed escrow. Either party may release.
    ///
    /// # Errors
    /// `EscrowNotFound`, `NotAuthorized`, `EscrowNotPending`, `DisputeActive`.
    pub fn release_escrow(&mut self, ctx: &CallContext, id: EscrowId) -> Result<()> {
        let escrow = self.get_mut(id)?;
        if !escrow.is_party(&ctx.caller) {
            return Err(RemitError::NotAuthorized);
        }
        if !escrow.is_pending() {
            return Err(RemitError::EscrowNotPending);
        }
        if escrow.dispute_status != DisputeStatus::None {
            return Err(RemitError::DisputeActive);
        }
        escrow.transition(EscrowStatus::Released)?;

        tracing::info!(escrow = %id, caller = %ctx.caller, "Escrow released");
        Ok(())
    }

    /// Check every precondition of [`cancel_escrow`](Self::cancel_escrow)
    /// without mutating anything.
    ///
    /// # Errors
    /// `EscrowNotFound`, `NotAuthorized` (caller is not the sender),
    /// `EscrowNotPending`, `DisputeActive`.
    pub fn ensure_cancellable(&self, ctx: &CallContext, id: EscrowId) -> Result<&Escrow> {
        let escrow = self.get(id)?;
        if escrow.sender != ctx.caller {
            return Err(RemitError::NotAuthorized);
        }
        if !escrow.is_pending() {
            return Err(RemitError::EscrowNotPending);
        }
        if escrow.dispute_status != DisputeStatus::None {
            return Err(RemitError::DisputeActive);
        }
        Ok(escrow)
    }

    /// Cancel a pending, undisputed escrow. Only the sender may cancel.
    pub fn cancel_escrow(&mut self, ctx: &CallContext, id: EscrowId) -> Result<()> {
        self.ensure_cancellable(ctx, id)?;
        self.get_mut(id)?.transition(EscrowStatus::Cancelled)?;

        tracing::info!(escrow = %id, caller = %ctx.caller, "Escrow cancelled");
        Ok(())
    }

    /// Open a dispute. The caller becomes the sole resolver.
    ///
    /// # Errors
    /// `EscrowNotFound`, `EscrowNotPending`, `DisputeWindowClosed` once the
    /// escrow is older than the dispute timeout, `NotAuthorized` for
    /// non-parties, `DisputeActive` if a dispute was already opened.
    pub fn dispute_escrow(&mut self, ctx: &CallContext, id: EscrowId) -> Result<()> {
        let dispute_timeout = self.params.dispute_timeout;
        let escrow = self.get_mut(id)?;
        if !escrow.is_pending() {
            return Err(RemitError::EscrowNotPending);
        }
        if ctx.age_of(escrow.timestamp) > dispute_timeout {
            return Err(RemitError::DisputeWindowClosed);
        }
        if !escrow.is_party(&ctx.caller) {
            return Err(RemitError::NotAuthorized);
        }
        if escrow.dispute_status != DisputeStatus::None {
            return Err(RemitError::DisputeActive);
        }

        escrow.dispute_status = DisputeStatus::Active;
        escrow.resolver = Some(ctx.caller.clone());

        tracing::warn!(escrow = %id, resolver = %ctx.caller, "Escrow disputed");
        Ok(())
    }

    /// Settle an active dispute as `"release"` or `"cancel"`.
    ///
    /// # Errors
    /// `EscrowNotFound`, `DisputeNotActive`, `NotResolver`,
    /// `DisputeAlreadyResolved`, `InvalidResolution`, and `EscrowNotPending`
    /// if a timeout already forced the escrow terminal.
    pub fn resolve_dispute(
        &mut self,
        ctx: &CallContext,
        id: EscrowId,
        resolution: &str,
    ) -> Result<Resolution> {
        let already_resolved = self.resolutions.contains_key(&id);
        let escrow = self.get_mut(id)?;
        if escrow.dispute_status != DisputeStatus::Active {
            return Err(RemitError::DisputeNotActive);
        }
        if escrow.resolver.as_ref() != Some(&ctx.caller) {
            return Err(RemitError::NotResolver);
        }
        if already_resolved {
            return Err(RemitError::DisputeAlreadyResolved);
        }
        let resolution = Resolution::parse(resolution)?;

        escrow.transition(resolution.target_status())?;
        escrow.dispute_status = DisputeStatus::Resolved;
        self.resolutions.insert(
            id,
            DisputeResolution {
                escrow_id: id,
                resolution,
                resolved_by: ctx.caller.clone(),
                resolution_timestamp: ctx.block_height,
            },
        );

        tracing::info!(escrow = %id, resolver = %ctx.caller, ?resolution, "Dispute resolved");
        Ok(resolution)
    }

    /// Force-cancel an escrow older than the dispute timeout. Anyone may call.
    ///
    /// # Errors
    /// `EscrowNotFound`, `TimeoutNotReached`, `EscrowNotPending`.
    pub fn timeout_escrow(&mut self, ctx: &CallContext, id: EscrowId) -> Result<()> {
        let dispute_timeout = self.params.dispute_timeout;
        let escrow = self.get_mut(id)?;
        let age = ctx.age_of(escrow.timestamp);
        if age <= dispute_timeout {
            return Err(RemitError::TimeoutNotReached);
        }
        escrow.transition(EscrowStatus::Cancelled)?;

        tracing::info!(
            escrow = %id,
            caller = %ctx.caller,
            age,
            dispute = %escrow.dispute_status,
            "Escrow timed out"
        );
        Ok(())
    }

    /// Roll back the most recent creation as if it never happened: drop the
    /// row and its pair entry, and refund the creation fee.
    ///
    /// Used when a later step of the same orchestrated call fails.
    ///
    /// # Errors
    /// - `Internal` if `id` is not the most recent, untouched escrow
    /// - `TransferFailed` if the fee refund fails (the row is still removed)
    pub fn abort_creation(&mut self, id: EscrowId) -> Result<()> {
        let is_last = self.escrows.last().is_some_and(|e| {
            e.id == id && e.is_pending() && e.dispute_status == DisputeStatus::None
        });
        if !is_last {
            return Err(RemitError::Internal(format!(
                "{id} is not the most recent untouched escrow"
            )));
        }
        let Some(escrow) = self.escrows.pop() else {
            return Err(RemitError::EscrowNotFound(id));
        };
        let pair = (escrow.sender.clone(), escrow.recipient.clone());
        if self.pair_index.get(&pair) == Some(&id) {
            self.pair_index.remove(&pair);
        }
        tracing::debug!(escrow = %id, sender = %escrow.sender, "Escrow creation rolled back");

        let charged = match self.last_charge.take() {
            Some((charged_id, fee)) if charged_id == id => fee,
            _ => 0,
        };
        if charged == 0 {
            return Ok(());
        }
        let authority = self
            .gate
            .authority()
            .ok_or(RemitError::AuthorityNotVerified)?;
        self.fee_ledger
            .transfer(charged, authority, &escrow.sender)
            .map_err(|e| {
                tracing::error!(
                    escrow = %id,
                    sender = %escrow.sender,
                    creation_fee = charged,
                    error = %e,
                    "Creation fee refund failed during rollback"
                );
                RemitError::TransferFailed {
                    reason: format!("creation fee refund for {id}: {e}"),
                }
            })
    }

    // =================================================================
    // Queries
    // =================================================================

    /// Whether the pair index has ever held an entry for this ordered pair.
    #[must_use]
    pub fn check_escrow_existence(&self, sender: &Principal, recipient: &Principal) -> bool {
        self.pair_index
            .contains_key(&(sender.clone(), recipient.clone()))
    }

    #[must_use]
    pub fn escrow(&self, id: EscrowId) -> Option<&Escrow> {
        id.index().and_then(|i| self.escrows.get(i))
    }

    #[must_use]
    pub fn dispute_resolution(&self, id: EscrowId) -> Option<&DisputeResolution> {
        self.resolutions.get(&id)
    }

    /// Number of escrows ever created (the global counter).
    #[must_use]
    pub fn escrow_count(&self) -> u64 {
        self.escrows.len() as u64
    }

    /// Every escrow still PENDING, in id order.
    #[must_use]
    pub fn pending_escrows(&self) -> Vec<&Escrow> {
        self.escrows.iter().filter(|e| e.is_pending()).collect()
    }

    /// Every escrow, in id order.
    #[must_use]
    pub fn escrows(&self) -> &[Escrow] {
        &self.escrows
    }

    /// Every dispute resolution, in escrow id order.
    #[must_use]
    pub fn resolutions(&self) -> Vec<&DisputeResolution> {
        let mut all: Vec<_> = self.resolutions.values().collect();
        all.sort_by_key(|r| r.escrow_id);
        all
    }

    fn get(&self, id: EscrowId) -> Result<&Escrow> {
        self.escrow(id).ok_or(RemitError::EscrowNotFound(id))
    }

    fn get_mut(&mut self, id: EscrowId) -> Result<&mut Escrow> {
        id.index()
            .and_then(|i| self.escrows.get_mut(i))
            .ok_or(RemitError::EscrowNotFound(id))
    }
}
