//! Error types for the RemitFlow engine.
//!
//! All errors use the `RF_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by failure class:
//! - 1xx: Authorization
//! - 2xx: Validation
//! - 3xx: State conflict
//! - 4xx: Resource exhaustion
//! - 5xx: External dependency
//! - 9xx: General / internal errors
//!
//! The code is the stable, enumerable reason an outer layer localizes.

use std::fmt;

use thiserror::Error;

use crate::{EscrowId, TransferId};

/// Central error enum for all RemitFlow operations.
#[derive(Debug, Error)]
pub enum RemitError {
    // =================================================================
    // Authorization (1xx)
    // =================================================================
    /// The authority principal has already been set.
    #[error("RF_ERR_100: Authority already set")]
    AuthorityAlreadySet,

    /// `set_authority` must be called by the principal being appointed.
    #[error("RF_ERR_101: Caller is not the principal being appointed")]
    NotSelf,

    /// An administrative setter was called before any authority exists.
    #[error("RF_ERR_102: Authority not set")]
    AuthorityNotSet,

    /// Escrow creation requires an authority to receive the creation fee.
    #[error("RF_ERR_103: Authority not verified")]
    AuthorityNotVerified,

    /// The caller is not a party allowed to perform this operation.
    #[error("RF_ERR_104: Not authorized")]
    NotAuthorized,

    /// Only the principal who opened the dispute may resolve it.
    #[error("RF_ERR_105: Caller is not the dispute resolver")]
    NotResolver,

    // =================================================================
    // Validation (2xx)
    // =================================================================
    #[error("RF_ERR_200: Invalid fee rate: {0}%")]
    InvalidFeeRate(u64),

    #[error("RF_ERR_201: Invalid minimum transfer amount: {0}")]
    InvalidMinAmount(u64),

    #[error("RF_ERR_202: Invalid maximum transfer amount: {0}")]
    InvalidMaxAmount(u64),

    /// Either a grace-period setting out of range or a cancellation
    /// attempted after the grace window closed.
    #[error("RF_ERR_203: Invalid grace period")]
    InvalidGracePeriod,

    #[error("RF_ERR_204: Invalid fee")]
    InvalidFee,

    #[error("RF_ERR_205: Invalid amount: {0}")]
    InvalidAmount(u64),

    #[error("RF_ERR_206: Invalid currency: {0}")]
    InvalidCurrency(String),

    /// Recipient equals sender.
    #[error("RF_ERR_207: Invalid recipient")]
    InvalidRecipient,

    /// Rate missing or zero.
    #[error("RF_ERR_208: Invalid exchange rate")]
    InvalidRate,

    #[error("RF_ERR_209: Invalid location")]
    InvalidLocation,

    #[error("RF_ERR_210: Invalid resolution: {0}")]
    InvalidResolution(String),

    /// The transfer's escrow reference does not resolve.
    #[error("RF_ERR_211: Invalid escrow id: {0}")]
    InvalidEscrowId(EscrowId),

    /// A conversion result does not fit the unit amount range.
    #[error("RF_ERR_212: Arithmetic overflow")]
    ArithmeticOverflow,

    // =================================================================
    // State conflict (3xx)
    // =================================================================
    #[error("RF_ERR_300: Transfer not found: {0}")]
    TransferNotFound(TransferId),

    #[error("RF_ERR_301: Escrow not found: {0}")]
    EscrowNotFound(EscrowId),

    /// A pending escrow is already indexed for this (sender, recipient) pair.
    #[error("RF_ERR_302: Escrow already exists for this sender and recipient")]
    EscrowAlreadyExists,

    #[error("RF_ERR_303: Escrow or transfer is not pending")]
    EscrowNotPending,

    #[error("RF_ERR_304: Invalid status for this operation")]
    InvalidStatus,

    #[error("RF_ERR_305: Dispute already active")]
    DisputeActive,

    #[error("RF_ERR_306: No active dispute")]
    DisputeNotActive,

    #[error("RF_ERR_307: Dispute already resolved")]
    DisputeAlreadyResolved,

    #[error("RF_ERR_308: Dispute window closed")]
    DisputeWindowClosed,

    #[error("RF_ERR_309: Dispute timeout not reached")]
    TimeoutNotReached,

    // =================================================================
    // Resource exhaustion (4xx)
    // =================================================================
    #[error("RF_ERR_400: Maximum number of escrows reached")]
    MaxEscrowsExceeded,

    /// The transfer counter has reached its configured cap.
    #[error("RF_ERR_401: Maximum number of transfers reached")]
    TransferAlreadyExists,

    #[error("RF_ERR_402: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },

    // =================================================================
    // External dependency (5xx)
    // =================================================================
    #[error("RF_ERR_500: KYC not verified for {0}")]
    KycNotVerified(String),

    /// Escrow creation failed while initiating a transfer.
    #[error("RF_ERR_501: Escrow creation failed: {source}")]
    EscrowFailed {
        #[source]
        source: Box<RemitError>,
    },

    #[error("RF_ERR_502: Unit transfer failed: {reason}")]
    TransferFailed { reason: String },

    #[error("RF_ERR_503: Refund failed: {reason}")]
    RefundFailed { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Vault custody does not match the transfers it backs. Critical safety alert.
    #[error("RF_ERR_900: Custody invariant violation: {reason}")]
    CustodyInvariantViolation { reason: String },

    #[error("RF_ERR_901: Internal error: {0}")]
    Internal(String),

    #[error("RF_ERR_902: Serialization error: {0}")]
    Serialization(String),

    #[error("RF_ERR_903: Configuration error: {0}")]
    Configuration(String),
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, RemitError>;

/// The five failure classes plus internal faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Authorization,
    Validation,
    StateConflict,
    ResourceExhaustion,
    ExternalDependency,
    Internal,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Authorization => "AUTHORIZATION",
            Self::Validation => "VALIDATION",
            Self::StateConflict => "STATE_CONFLICT",
            Self::ResourceExhaustion => "RESOURCE_EXHAUSTION",
            Self::ExternalDependency => "EXTERNAL_DEPENDENCY",
            Self::Internal => "INTERNAL",
        };
        f.write_str(name)
    }
}

impl RemitError {
    /// Stable reason code, e.g. `RF_ERR_302`.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthorityAlreadySet => "RF_ERR_100",
            Self::NotSelf => "RF_ERR_101",
            Self::AuthorityNotSet => "RF_ERR_102",
            Self::AuthorityNotVerified => "RF_ERR_103",
            Self::NotAuthorized => "RF_ERR_104",
            Self::NotResolver => "RF_ERR_105",
            Self::InvalidFeeRate(_) => "RF_ERR_200",
            Self::InvalidMinAmount(_) => "RF_ERR_201",
            Self::InvalidMaxAmount(_) => "RF_ERR_202",
            Self::InvalidGracePeriod => "RF_ERR_203",
            Self::InvalidFee => "RF_ERR_204",
            Self::InvalidAmount(_) => "RF_ERR_205",
            Self::InvalidCurrency(_) => "RF_ERR_206",
            Self::InvalidRecipient => "RF_ERR_207",
            Self::InvalidRate => "RF_ERR_208",
            Self::InvalidLocation => "RF_ERR_209",
            Self::InvalidResolution(_) => "RF_ERR_210",
            Self::InvalidEscrowId(_) => "RF_ERR_211",
            Self::ArithmeticOverflow => "RF_ERR_212",
            Self::TransferNotFound(_) => "RF_ERR_300",
            Self::EscrowNotFound(_) => "RF_ERR_301",
            Self::EscrowAlreadyExists => "RF_ERR_302",
            Self::EscrowNotPending => "RF_ERR_303",
            Self::InvalidStatus => "RF_ERR_304",
            Self::DisputeActive => "RF_ERR_305",
            Self::DisputeNotActive => "RF_ERR_306",
            Self::DisputeAlreadyResolved => "RF_ERR_307",
            Self::DisputeWindowClosed => "RF_ERR_308",
            Self::TimeoutNotReached => "RF_ERR_309",
            Self::MaxEscrowsExceeded => "RF_ERR_400",
            Self::TransferAlreadyExists => "RF_ERR_401",
            Self::InsufficientBalance { .. } => "RF_ERR_402",
            Self::KycNotVerified(_) => "RF_ERR_500",
            Self::EscrowFailed { .. } => "RF_ERR_501",
            Self::TransferFailed { .. } => "RF_ERR_502",
            Self::RefundFailed { .. } => "RF_ERR_503",
            Self::CustodyInvariantViolation { .. } => "RF_ERR_900",
            Self::Internal(_) => "RF_ERR_901",
            Self::Serialization(_) => "RF_ERR_902",
            Self::Configuration(_) => "RF_ERR_903",
        }
    }

    /// Failure class, derived from the code's hundreds digit.
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self.code().as_bytes().get(7) {
            Some(b'1') => ErrorClass::Authorization,
            Some(b'2') => ErrorClass::Validation,
            Some(b'3') => ErrorClass::StateConflict,
            Some(b'4') => ErrorClass::ResourceExhaustion,
            Some(b'5') => ErrorClass::ExternalDependency,
            _ => ErrorClass::Internal,
        }
    }
}

impl From<serde_json::Error> for RemitError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = RemitError::TransferNotFound(TransferId(7));
        let msg = format!("{err}");
        assert!(msg.starts_with("RF_ERR_300"), "Got: {msg}");
        assert!(msg.contains("transfer:7"));
    }

    #[test]
    fn insufficient_balance_display() {
        let err = RemitError::InsufficientBalance {
            needed: 1010,
            available: 500,
        };
        let msg = format!("{err}");
        assert!(msg.contains("RF_ERR_402"));
        assert!(msg.contains("1010"));
        assert!(msg.contains("500"));
    }

    #[test]
    fn code_matches_display_prefix() {
        let errors = vec![
            RemitError::AuthorityAlreadySet,
            RemitError::InvalidFeeRate(9),
            RemitError::EscrowAlreadyExists,
            RemitError::MaxEscrowsExceeded,
            RemitError::KycNotVerified("bob".into()),
            RemitError::EscrowFailed {
                source: Box::new(RemitError::InvalidCurrency("GBP".into())),
            },
            RemitError::Internal("test".into()),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(msg.starts_with(err.code()), "{msg} vs {}", err.code());
        }
    }

    #[test]
    fn classes_follow_code_groups() {
        assert_eq!(RemitError::NotResolver.class(), ErrorClass::Authorization);
        assert_eq!(RemitError::InvalidLocation.class(), ErrorClass::Validation);
        assert_eq!(RemitError::DisputeActive.class(), ErrorClass::StateConflict);
        assert_eq!(
            RemitError::TransferAlreadyExists.class(),
            ErrorClass::ResourceExhaustion
        );
        assert_eq!(
            RemitError::RefundFailed { reason: "x".into() }.class(),
            ErrorClass::ExternalDependency
        );
        assert_eq!(RemitError::Configuration("x".into()).class(), ErrorClass::Internal);
    }

    #[test]
    fn escrow_failed_keeps_source() {
        use std::error::Error as _;
        let err = RemitError::EscrowFailed {
            source: Box::new(RemitError::EscrowAlreadyExists),
        };
        let source = err.source().expect("source attached");
        assert!(source.to_string().starts_with("RF_ERR_302"));
    }
}
