//! # remitflow-escrow
//!
//! **Custody Plane**: the authority gate, the escrow ledger, and an
//! in-memory unit ledger.
//!
//! ## Architecture
//!
//! 1. **AuthorityGate**: set-once authority principal; gates administrative setters
//! 2. **EscrowLedger**: escrow rows, the (sender, recipient) pair index,
//!    disputes, resolutions and permissionless timeouts
//! 3. **InMemoryUnitLedger**: reference balance ledger for the stable unit
//!    and the native fee asset
//!
//! ## Escrow Flow
//!
//! ```text
//! create (fee: sender → authority) → PENDING
//!     → release | cancel | dispute → resolve | timeout
//! ```
//!
//! The escrow ledger records custody state only. Moving the backing units
//! in and out of the vault is the caller's job.

pub mod authority;
pub mod escrow_ledger;
pub mod unit_ledger;

pub use authority::AuthorityGate;
pub use escrow_ledger::EscrowLedger;
pub use unit_ledger::InMemoryUnitLedger;
