//! Transfer ledger: KYC-gated remittances backed by escrows.
//!
//! A transfer converts a fiat amount into stable units, opens an escrow
//! for the converted amount, and moves `amount_token + fee` from the sender
//! into the vault. The sender later completes it (escrow released, units
//! stay in the vault for the off-ramp) or cancels it inside the grace
//! period (units refunded, escrow cancelled).
//!
//! Every multi-step operation either commits fully or leaves local state
//! as it was before the call:
//!
//! ```text
//! initiate: create escrow ─▶ move units to vault ─▶ persist
//!                               │ fails
//!                               └─▶ abort escrow creation (fee refunded)
//! cancel:   escrow precheck ─▶ refund from vault ─▶ cancel escrow ─▶ persist
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use remitflow_escrow::{AuthorityGate, EscrowLedger};
use remitflow_types::constants::display_units;
use remitflow_types::{
    CallContext, Currency, IdentityRegistry, Principal, RateOracle, RemitError, Result,
    Transfer, TransferId, TransferParams, TransferStatus, UnitLedger, validate_location,
};

use crate::conversion::ConversionEngine;
use crate::reconciliation::CustodyReconciliation;

/// Owns transfer rows and drives them against an [`EscrowLedger`].
pub struct TransferLedger {
    /// All transfers; position == id.
    transfers: Vec<Transfer>,
    by_sender: HashMap<Principal, Vec<TransferId>>,
    by_recipient: HashMap<Principal, Vec<TransferId>>,
    params: TransferParams,
    gate: Arc<AuthorityGate>,
    identity: Arc<dyn IdentityRegistry>,
    rates: Arc<dyn RateOracle>,
    /// Stable-unit ledger holding sender balances and the vault.
    units: Arc<dyn UnitLedger>,
    vault: Principal,
    custody: CustodyReconciliation,
}

impl TransferLedger {
    #[must_use]
    pub fn new(
        params: TransferParams,
        gate: Arc<AuthorityGate>,
        identity: Arc<dyn IdentityRegistry>,
        rates: Arc<dyn RateOracle>,
        units: Arc<dyn UnitLedger>,
        vault: Principal,
    ) -> Self {
        Self {
            transfers: Vec::new(),
            by_sender: HashMap::new(),
            by_recipient: HashMap::new(),
            params,
            gate,
            identity,
            rates,
            units,
            vault,
            custody: CustodyReconciliation::new(),
        }
    }

    // =================================================================
    // Administration
    // =================================================================

    pub fn set_transfer_fee_rate(&mut self, ctx: &CallContext, rate: u64) -> Result<()> {
        self.gate.require_admin(ctx)?;
        TransferParams::check_fee_rate(rate)?;
        self.params.fee_rate_percent = rate;
        tracing::info!(caller = %ctx.caller, fee_rate_percent = rate, "Transfer fee rate updated");
        Ok(())
    }

    pub fn set_min_transfer_amount(&mut self, ctx: &CallContext, amount: u64) -> Result<()> {
        self.gate.require_admin(ctx)?;
        TransferParams::check_min_amount(amount)?;
        self.params.min_transfer_amount = amount;
        tracing::info!(caller = %ctx.caller, min = amount, "Minimum transfer amount updated");
        Ok(())
    }

    /// The new maximum must exceed the current minimum.
    pub fn set_max_transfer_amount(&mut self, ctx: &CallContext, amount: u64) -> Result<()> {
        self.gate.require_admin(ctx)?;
        self.params.check_max_amount(amount)?;
        self.params.max_transfer_amount = amount;
        tracing::info!(caller = %ctx.caller, max = amount, "Maximum transfer amount updated");
        Ok(())
    }

    pub fn set_grace_period(&mut self, ctx: &CallContext, blocks: u64) -> Result<()> {
        self.gate.require_admin(ctx)?;
        TransferParams::check_grace_period(blocks)?;
        self.params.grace_period = blocks;
        tracing::info!(caller = %ctx.caller, grace_period = blocks, "Grace period updated");
        Ok(())
    }

    #[must_use]
    pub fn params(&self) -> &TransferParams {
        &self.params
    }

    // =================================================================
    // Lifecycle
    // =================================================================

    /// Initiate a transfer from the caller to `recipient`.
    ///
    /// 1. Validate cap, parties, amount bounds, currency, KYC and rate
    /// 2. Convert and check the sender can cover `amount_token + fee`
    /// 3. Validate both locations
    /// 4. Open the backing escrow
    /// 5. Move `amount_token + fee` sender → vault
    /// 6. Persist and index the transfer
    ///
    /// If step 5 fails, the escrow from step 4 is rolled back and nothing is persisted.
    ///
    /// # Errors
    /// - `TransferAlreadyExists` once `max_transfers` transfers exist
    /// - `InvalidRecipient`, `InvalidAmount`, `InvalidCurrency`, `KycNotVerified`, `InvalidRate`
    /// - `InsufficientBalance`, `InvalidLocation`
    /// - `EscrowFailed` wrapping the escrow ledger's rejection
    /// - `TransferFailed` if the vault move fails
    #[allow(clippy::too_many_arguments)]
    pub fn initiate_transfer(
        &mut self,
        ctx: &CallContext,
        escrows: &mut EscrowLedger,
        recipient: &Principal,
        amount_fiat: u64,
        currency: &str,
        location_sender: &str,
        location_recipient: &str,
    ) -> Result<TransferId> {
        let sender = &ctx.caller;

        // Step 1: Validate
        if self.transfer_count() >= self.params.max_transfers {
            return Err(RemitError::TransferAlreadyExists);
        }
        if recipient == sender {
            return Err(RemitError::InvalidRecipient);
        }
        // The vault only takes part through custody moves.
        if sender == &self.vault || recipient == &self.vault {
            tracing::warn!(
                sender = %sender,
                recipient = %recipient,
                "Transfer rejected: vault party"
            );
            return Err(RemitError::InvalidRecipient);
        }
        if !self.params.amount_in_bounds(amount_fiat) {
            return Err(RemitError::InvalidAmount(amount_fiat));
        }
        let currency = Currency::from_code(currency)
            .ok_or_else(|| RemitError::InvalidCurrency(currency.to_string()))?;
        for party in [sender, recipient] {
            if !self.identity.is_kyc_verified(party) {
                tracing::warn!(principal = %party, "Transfer rejected: KYC not verified");
                return Err(RemitError::KycNotVerified(party.to_string()));
            }
        }
        let rate = self
            .rates
            .rate(currency)
            .filter(|rate| *rate > 0)
            .ok_or(RemitError::InvalidRate)?;

        // Step 2: Convert and check funds
        let conversion =
            ConversionEngine::convert(amount_fiat, rate, self.params.fee_rate_percent)?;
        let total = conversion.total_units()?;
        let available = self.units.balance(sender);
        if available < total {
            return Err(RemitError::InsufficientBalance {
                needed: total,
                available,
            });
        }

        // Step 3: Locations
        validate_location(location_sender)?;
        validate_location(location_recipient)?;

        // Step 4: Backing escrow
        let escrow_id = escrows
            .create_escrow(
                ctx,
                recipient,
                conversion.amount_token,
                currency.code(),
                conversion.fee,
            )
            .map_err(|source| {
                tracing::warn!(sender = %sender, error = %source, "Escrow creation rejected");
                RemitError::EscrowFailed {
                    source: Box::new(source),
                }
            })?;

        // Step 5: Custody
        if let Err(e) = self.units.transfer(total, sender, &self.vault) {
            tracing::debug!(
                escrow = %escrow_id,
                sender = %sender,
                error = %e,
                "Vault deposit failed, rolling back escrow"
            );
            if let Err(rollback) = escrows.abort_creation(escrow_id) {
                tracing::error!(escrow = %escrow_id, error = %rollback, "Escrow rollback failed");
            }
            return Err(RemitError::TransferFailed {
                reason: e.to_string(),
            });
        }
        self.custody.record_inflow(total);

        // Step 6: Persist
        let id = TransferId(self.transfer_count());
        self.transfers.push(Transfer {
            id,
            sender: sender.clone(),
            recipient: recipient.clone(),
            amount_fiat,
            currency,
            amount_token: conversion.amount_token,
            fee: conversion.fee,
            timestamp: ctx.block_height,
            status: TransferStatus::Pending,
            escrow_id,
            location_sender: location_sender.to_string(),
            location_recipient: location_recipient.to_string(),
        });
        self.by_sender.entry(sender.clone()).or_default().push(id);
        self.by_recipient.entry(recipient.clone()).or_default().push(id);

        tracing::info!(
            transfer = %id,
            escrow = %escrow_id,
            sender = %sender,
            recipient = %recipient,
            amount_fiat,
            currency = %currency,
            units = %display_units(total),
            height = ctx.block_height,
            "Transfer initiated"
        );
        Ok(id)
    }

    /// Complete a pending transfer by releasing its escrow. Sender only.
    ///
    /// The units stay in the vault.
    ///
    /// # Errors
    /// `TransferNotFound`, `NotAuthorized`, `EscrowNotPending`,
    /// `InvalidEscrowId`, or `TransferFailed` if the escrow refuses release.
    pub fn complete_transfer(
        &mut self,
        ctx: &CallContext,
        escrows: &mut EscrowLedger,
        id: TransferId,
    ) -> Result<()> {
        let escrow_id = self.check_sender_action(ctx, escrows, id)?.escrow_id;

        escrows.release_escrow(ctx, escrow_id).map_err(|e| {
            tracing::warn!(
                transfer = %id,
                escrow = %escrow_id,
                error = %e,
                "Escrow release refused"
            );
            RemitError::TransferFailed {
                reason: e.to_string(),
            }
        })?;
        self.get_mut(id)?.mark_completed()?;

        tracing::info!(transfer = %id, escrow = %escrow_id, "Transfer completed");
        Ok(())
    }

    /// Cancel a pending transfer inside the grace period. Sender only.
    ///
    /// Refunds `amount_token + fee` from the vault and cancels the escrow.
    /// The percentage fee is refunded in full; the escrow creation fee is not.
    ///
    /// # Errors
    /// - `TransferNotFound`, `NotAuthorized`, `EscrowNotPending`, `InvalidEscrowId`
    /// - `InvalidGracePeriod` once `age >= grace_period`
    /// - `RefundFailed` if the escrow cannot be cancelled or the refund fails;
    ///   both the transfer and its escrow stay pending
    pub fn cancel_transfer(
        &mut self,
        ctx: &CallContext,
        escrows: &mut EscrowLedger,
        id: TransferId,
    ) -> Result<()> {
        let grace_period = self.params.grace_period;
        let transfer = self.check_sender_action(ctx, escrows, id)?;
        let age = ctx.age_of(transfer.timestamp);
        if age >= grace_period {
            return Err(RemitError::InvalidGracePeriod);
        }
        let escrow_id = transfer.escrow_id;
        let refund = transfer.total_units();
        let sender = transfer.sender.clone();

        escrows
            .ensure_cancellable(ctx, escrow_id)
            .map_err(|e| RemitError::RefundFailed {
                reason: e.to_string(),
            })?;
        self.units
            .transfer(refund, &self.vault, &sender)
            .map_err(|e| {
                tracing::warn!(transfer = %id, error = %e, "Vault refund failed");
                RemitError::RefundFailed {
                    reason: e.to_string(),
                }
            })?;
        self.custody.record_refund(refund);

        escrows.cancel_escrow(ctx, escrow_id).map_err(|e| {
            tracing::error!(
                transfer = %id,
                escrow = %escrow_id,
                error = %e,
                "Escrow cancel failed after refund"
            );
            RemitError::RefundFailed {
                reason: e.to_string(),
            }
        })?;
        self.get_mut(id)?.mark_cancelled()?;

        tracing::info!(
            transfer = %id,
            escrow = %escrow_id,
            refund = %display_units(refund),
            age,
            "Transfer cancelled"
        );
        Ok(())
    }

    /// Replace both locations of a pending transfer. Sender only.
    ///
    /// # Errors
    /// `TransferNotFound`, `NotAuthorized`, `InvalidLocation`, `InvalidStatus`.
    pub fn update_transfer_location(
        &mut self,
        ctx: &CallContext,
        id: TransferId,
        new_location_sender: &str,
        new_location_recipient: &str,
    ) -> Result<()> {
        let transfer = self.get_mut(id)?;
        if transfer.sender != ctx.caller {
            return Err(RemitError::NotAuthorized);
        }
        validate_location(new_location_sender)?;
        validate_location(new_location_recipient)?;
        if !transfer.is_pending() {
            return Err(RemitError::InvalidStatus);
        }

        transfer.location_sender = new_location_sender.to_string();
        transfer.location_recipient = new_location_recipient.to_string();

        tracing::info!(transfer = %id, "Transfer locations updated");
        Ok(())
    }

    // =================================================================
    // Queries
    // =================================================================

    pub fn get_transfer_status(&self, id: TransferId) -> Result<TransferStatus> {
        self.get(id).map(|t| t.status)
    }

    #[must_use]
    pub fn transfer(&self, id: TransferId) -> Option<&Transfer> {
        id.index().and_then(|i| self.transfers.get(i))
    }

    /// Transfers sent by `principal`, in creation order.
    #[must_use]
    pub fn transfers_by_sender(&self, principal: &Principal) -> Vec<&Transfer> {
        self.lookup(self.by_sender.get(principal))
    }

    /// Transfers addressed to `principal`, in creation order.
    #[must_use]
    pub fn transfers_by_recipient(&self, principal: &Principal) -> Vec<&Transfer> {
        self.lookup(self.by_recipient.get(principal))
    }

    /// Number of transfers ever created (the global counter).
    #[must_use]
    pub fn transfer_count(&self) -> u64 {
        self.transfers.len() as u64
    }

    #[must_use]
    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    #[must_use]
    pub fn vault(&self) -> &Principal {
        &self.vault
    }

    #[must_use]
    pub fn custody(&self) -> &CustodyReconciliation {
        &self.custody
    }

    /// Check recorded vault movements against transfer rows and the vault balance.
    ///
    /// # Errors
    /// Returns `CustodyInvariantViolation` on mismatch.
    pub fn reconcile(&self) -> Result<()> {
        let vault_balance = self.units.balance(&self.vault);
        self.custody
            .verify(&self.transfers, vault_balance)
            .inspect_err(|e| tracing::error!(error = %e, "Custody reconciliation failed"))
    }

    // =================================================================
    // Internals
    // =================================================================

    /// Shared preconditions of complete and cancel.
    fn check_sender_action(
        &self,
        ctx: &CallContext,
        escrows: &EscrowLedger,
        id: TransferId,
    ) -> Result<&Transfer> {
        let transfer = self.get(id)?;
        if transfer.sender != ctx.caller {
            return Err(RemitError::NotAuthorized);
        }
        if !transfer.is_pending() {
            return Err(RemitError::EscrowNotPending);
        }
        if escrows.escrow(transfer.escrow_id).is_none() {
            return Err(RemitError::InvalidEscrowId(transfer.escrow_id));
        }
        Ok(transfer)
    }

    fn lookup(&self, ids: Option<&Vec<TransferId>>) -> Vec<&Transfer> {
        ids.into_iter()
            .flatten()
            .filter_map(|id| self.transfer(*id))
            .collect()
    }

    fn get(&self, id: TransferId) -> Result<&Transfer> {
        self.transfer(id).ok_or(RemitError::TransferNotFound(id))
    }

    fn get_mut(&mut self, id: TransferId) -> Result<&mut Transfer> {
        id.index()
            .and_then(|i| self.transfers.get_mut(i))
            .ok_or(RemitError::TransferNotFound(id))
    }
}
