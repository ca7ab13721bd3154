//! Types library for the escrow swap ledger
//!
//! Shared type definitions used by the ledger contract and its tooling,
//! kept in one crate so every consumer agrees on identifiers and amounts.
//!
//! # Modules
//! - `ids`: Unique identifiers (AccountId, AssetId, OperationId)
//! - `numeric`: Integral amount type backed by a fixed-point decimal
//! - `operation`: Operation record and lifecycle status

pub mod ids;
pub mod numeric;
pub mod operation;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::numeric::*;
    pub use crate::operation::*;
}
