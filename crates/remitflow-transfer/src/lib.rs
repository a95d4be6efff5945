//! # remitflow-transfer
//!
//! **Transfer Plane**: fiat conversion, KYC-gated transfers, custody
//! reconciliation, and the thread-safe [`RemittanceEngine`] facade.
//!
//! ## Architecture
//!
//! 1. **ConversionEngine**: fiat → stable units plus the percentage fee
//! 2. **TransferLedger**: transfer rows; drives the escrow ledger and the vault
//! 3. **CustodyReconciliation**: vault inflows and refunds checked against open transfers
//! 4. **RemittanceEngine**: one lock over both ledgers, audit export
//!
//! ## Transfer Flow
//!
//! ```text
//! initiate: KYC + rate → convert → create escrow → sender → vault
//! complete: release escrow (units stay in vault)
//! cancel:   refund vault → sender → cancel escrow   (inside grace period)
//! ```

pub mod conversion;
pub mod directory;
pub mod engine;
pub mod reconciliation;
pub mod transfer_ledger;

pub use conversion::{Conversion, ConversionEngine};
pub use directory::{InMemoryIdentityRegistry, StaticRateOracle};
pub use engine::{AuditTrail, Collaborators, RemittanceEngine};
pub use reconciliation::CustodyReconciliation;
pub use transfer_ledger::TransferLedger;
