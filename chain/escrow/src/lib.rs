//! Escrow Ledger for Bilateral Asset Swaps
//!
//! A creator deposits one asset into custody and names the price in a second
//! asset. Any other account may fulfil the offer by paying the price, or the
//! creator may withdraw it. The ledger guarantees that custodied value is
//! conserved, that only the right account can move an operation forward, and
//! that a transfer callback cannot re-enter the ledger mid-operation.
//!
//! # Modules
//! - `errors`: Ledger error taxonomy
//! - `events`: Observation records and the append-only event log
//! - `security`: Reentrancy guard and access control
//! - `allowlist`: Ordered set of assets eligible for swaps
//! - `provider`: Boundary to the external asset transfer implementation
//! - `bank`: In-memory fungible asset book implementing the provider boundary
//! - `config`: Ledger construction settings
//! - `ledger`: Operation state machine
//!
//! # Version
//! v0.1.0

pub mod allowlist;
pub mod bank;
pub mod config;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod provider;
pub mod security;

pub use ledger::{LedgerSnapshot, OperationLedger};

/// Contract ABI version, frozen after release
pub const CONTRACT_ABI_VERSION: &str = "1.0.0";
