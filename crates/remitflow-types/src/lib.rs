//! # remitflow-types
//!
//! Shared types, errors, and configuration for the **RemitFlow** remittance engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Principal`], [`TransferId`], [`EscrowId`], [`CallContext`]
//! - **Currency domains**: [`Currency`] (transfer layer), [`EscrowCurrency`] (escrow layer)
//! - **Transfer model**: [`Transfer`], [`TransferStatus`]
//! - **Escrow model**: [`Escrow`], [`EscrowStatus`], [`DisputeStatus`], [`Resolution`],
//!   [`DisputeResolution`]
//! - **Configuration**: [`EngineConfig`], [`TransferParams`], [`EscrowParams`], [`AdminPolicy`]
//! - **Errors**: [`RemitError`] with `RF_ERR_` prefix codes
//! - **Collaborators**: [`IdentityRegistry`], [`RateOracle`], [`UnitLedger`]
//! - **Constants**: fixed-point scale, domain limits and defaults

pub mod config;
pub mod constants;
pub mod currency;
pub mod error;
pub mod escrow;
pub mod external;
pub mod ids;
pub mod transfer;

// Re-export all primary types at crate root for ergonomic imports:
//   use remitflow_types::{Transfer, Escrow, Principal, RemitError, ...};

pub use config::*;
pub use currency::*;
pub use error::*;
pub use escrow::*;
pub use external::*;
pub use ids::*;
pub use transfer::*;

// Constants are accessed via `remitflow_types::constants::FOO`
// (not re-exported to avoid name collisions).
