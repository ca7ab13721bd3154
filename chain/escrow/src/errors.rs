//! Ledger error types
//!
//! Every entry point failure falls into one of five kinds: validation,
//! authorization, state, transfer, or reentrancy. Each variant names the
//! exact precondition that was violated.

use thiserror::Error;
use types::ids::OperationId;
use types::operation::OperationStatus;

/// Malformed input, rejected before any transfer or state write
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Asset identifier must not be null")]
    NullAsset,

    #[error("Asset not allowed: {asset}")]
    AssetNotAllowed { asset: String },

    #[error("Assets must differ: both sides are {asset}")]
    AssetsMustDiffer { asset: String },

    #[error("Amount must be positive")]
    NonPositiveAmount,
}

/// Wrong caller for the attempted action
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthorizationError {
    #[error("Unauthorized: caller {caller} is not the privileged account")]
    NotAuthorized { caller: String },

    #[error("Creator cannot complete own operation")]
    CreatorCannotComplete,

    #[error("Only creator can cancel")]
    OnlyCreatorCanCancel,
}

/// Missing record or wrong status for the requested transition
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    #[error("Operation does not exist: {id}")]
    OperationNotFound { id: OperationId },

    #[error("Operation not active: {id} is {status}")]
    OperationNotActive {
        id: OperationId,
        status: OperationStatus,
    },

    #[error("Asset already allowed: {asset}")]
    AssetAlreadyAllowed { asset: String },
}

/// The asset transfer provider declined a movement
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransferError {
    #[error("Insufficient balance for {asset}: account {account} required {required}, available {available}")]
    InsufficientBalance {
        asset: String,
        account: String,
        required: String,
        available: String,
    },

    #[error("Insufficient allowance for {asset}: owner {owner} granted {available} to {spender}, required {required}")]
    InsufficientAllowance {
        asset: String,
        owner: String,
        spender: String,
        required: String,
        available: String,
    },

    #[error("Arithmetic overflow in balance calculation")]
    Overflow,

    #[error("Transfer declined: {reason}")]
    Declined { reason: String },
}

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to parse ledger config: {reason}")]
    Parse { reason: String },

    #[error("Invalid ledger config: {reason}")]
    Invalid { reason: String },
}

/// Top-level ledger error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Reentrancy detected")]
    Reentrancy,

    #[error("Custody invariant violated for {asset}: expected {expected}, held {held}")]
    ConservationViolated {
        asset: String,
        expected: String,
        held: String,
    },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}
