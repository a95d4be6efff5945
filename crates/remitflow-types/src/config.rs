//! Engine configuration.
//!
//! Parameters start from [`EngineConfig`] (usually loaded from JSON) and can
//! later be changed through the administrative setters, which apply the same
//! domain rules as [`EngineConfig::validate`].

use serde::{Deserialize, Serialize};

use crate::{RemitError, Result, constants};

/// Who may call the administrative setters once an authority exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminPolicy {
    /// Any caller, as long as an authority has been set.
    #[default]
    AnyCaller,
    /// Only the authority itself.
    AuthorityOnly,
}

/// Transfer-layer parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferParams {
    /// Percentage fee on the fiat amount (`0..=5`).
    pub fee_rate_percent: u64,
    pub min_transfer_amount: u64,
    pub max_transfer_amount: u64,
    /// Self-cancellation window in blocks (`<= 144`).
    pub grace_period: u64,
    /// Cap on the transfer counter.
    pub max_transfers: u64,
}

impl Default for TransferParams {
    fn default() -> Self {
        Self {
            fee_rate_percent: constants::DEFAULT_FEE_RATE_PERCENT,
            min_transfer_amount: constants::DEFAULT_MIN_TRANSFER_AMOUNT,
            max_transfer_amount: constants::DEFAULT_MAX_TRANSFER_AMOUNT,
            grace_period: constants::DEFAULT_GRACE_PERIOD,
            max_transfers: constants::DEFAULT_MAX_TRANSFERS,
        }
    }
}

impl TransferParams {
    pub fn check_fee_rate(rate: u64) -> Result<()> {
        if rate > constants::MAX_FEE_RATE_PERCENT {
            return Err(RemitError::InvalidFeeRate(rate));
        }
        Ok(())
    }

    pub fn check_min_amount(amount: u64) -> Result<()> {
        if amount == 0 {
            return Err(RemitError::InvalidMinAmount(amount));
        }
        Ok(())
    }

    /// The maximum must exceed the current minimum.
    pub fn check_max_amount(&self, amount: u64) -> Result<()> {
        if amount <= self.min_transfer_amount {
            return Err(RemitError::InvalidMaxAmount(amount));
        }
        Ok(())
    }

    pub fn check_grace_period(blocks: u64) -> Result<()> {
        if blocks > constants::MAX_GRACE_PERIOD {
            return Err(RemitError::InvalidGracePeriod);
        }
        Ok(())
    }

    /// Whether `amount` lies within `[min, max]`.
    #[must_use]
    pub fn amount_in_bounds(&self, amount: u64) -> bool {
        (self.min_transfer_amount..=self.max_transfer_amount).contains(&amount)
    }

    pub fn validate(&self) -> Result<()> {
        Self::check_fee_rate(self.fee_rate_percent)?;
        Self::check_min_amount(self.min_transfer_amount)?;
        self.check_max_amount(self.max_transfer_amount)?;
        Self::check_grace_period(self.grace_period)
    }
}

/// Escrow-layer parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscrowParams {
    /// Flat fee in the native asset, paid by the sender to the authority.
    pub creation_fee: u64,
    /// Cap on the escrow counter.
    pub max_escrows: u64,
    /// Dispute window, and the age after which anyone may time an escrow out.
    pub dispute_timeout: u64,
}

impl Default for EscrowParams {
    fn default() -> Self {
        Self {
            creation_fee: constants::DEFAULT_CREATION_FEE,
            max_escrows: constants::DEFAULT_MAX_ESCROWS,
            dispute_timeout: constants::DEFAULT_DISPUTE_TIMEOUT,
        }
    }
}

impl EscrowParams {
    // Unsigned, so every creation fee is in domain.
    pub fn check_creation_fee(_fee: u64) -> Result<()> {
        Ok(())
    }

    pub fn check_max_escrows(max: u64) -> Result<()> {
        if max == 0 {
            return Err(RemitError::InvalidFee);
        }
        Ok(())
    }

    pub fn check_dispute_timeout(blocks: u64) -> Result<()> {
        if blocks == 0 {
            return Err(RemitError::InvalidFee);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        Self::check_creation_fee(self.creation_fee)?;
        Self::check_max_escrows(self.max_escrows)?;
        Self::check_dispute_timeout(self.dispute_timeout)
    }
}

/// Top-level configuration for a remittance engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub transfer: TransferParams,
    pub escrow: EscrowParams,
    pub admin_policy: AdminPolicy,
}

impl EngineConfig {
    /// Parse and validate a JSON document. Missing fields take their defaults.
    ///
    /// # Errors
    /// `Configuration` for malformed JSON or out-of-domain values.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| RemitError::Configuration(e.to_string()))?;
        config
            .validate()
            .map_err(|e| RemitError::Configuration(e.to_string()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.transfer.validate()?;
        self.escrow.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = EngineConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.transfer.fee_rate_percent, 1);
        assert_eq!(cfg.transfer.grace_period, 144);
        assert_eq!(cfg.admin_policy, AdminPolicy::AnyCaller);
    }

    #[test]
    fn fee_rate_bounds() {
        assert!(TransferParams::check_fee_rate(0).is_ok());
        assert!(TransferParams::check_fee_rate(5).is_ok());
        assert!(matches!(
            TransferParams::check_fee_rate(6),
            Err(RemitError::InvalidFeeRate(6))
        ));
    }

    #[test]
    fn max_must_exceed_min() {
        let params = TransferParams {
            min_transfer_amount: 100,
            ..TransferParams::default()
        };
        assert!(matches!(
            params.check_max_amount(100),
            Err(RemitError::InvalidMaxAmount(100))
        ));
        assert!(params.check_max_amount(101).is_ok());
    }

    #[test]
    fn amount_bounds_inclusive() {
        let params = TransferParams {
            min_transfer_amount: 10,
            max_transfer_amount: 20,
            ..TransferParams::default()
        };
        assert!(!params.amount_in_bounds(9));
        assert!(params.amount_in_bounds(10));
        assert!(params.amount_in_bounds(20));
        assert!(!params.amount_in_bounds(21));
    }

    #[test]
    fn escrow_params_reject_zero() {
        assert!(matches!(
            EscrowParams::check_max_escrows(0),
            Err(RemitError::InvalidFee)
        ));
        assert!(matches!(
            EscrowParams::check_dispute_timeout(0),
            Err(RemitError::InvalidFee)
        ));
        assert!(EscrowParams::check_creation_fee(0).is_ok());
    }

    #[test]
    fn from_json_partial_document() {
        let cfg = EngineConfig::from_json(
            r#"{ "transfer": { "fee_rate_percent": 2 }, "admin_policy": "authority_only" }"#,
        )
        .unwrap();
        assert_eq!(cfg.transfer.fee_rate_percent, 2);
        assert_eq!(cfg.transfer.grace_period, 144);
        assert_eq!(cfg.escrow, EscrowParams::default());
        assert_eq!(cfg.admin_policy, AdminPolicy::AuthorityOnly);
    }

    #[test]
    fn from_json_rejects_out_of_domain() {
        let err = EngineConfig::from_json(r#"{ "transfer": { "grace_period": 500 } }"#)
            .unwrap_err();
        assert!(matches!(err, RemitError::Configuration(_)));
        assert!(err.to_string().contains("RF_ERR_203"));
    }

    #[test]
    fn from_json_rejects_garbage() {
        let err = EngineConfig::from_json("not json").unwrap_err();
        assert!(matches!(err, RemitError::Configuration(_)));
    }
}
