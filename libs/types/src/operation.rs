//! Operation lifecycle types
//!
//! An operation is one escrowed offer: the creator deposits `amount_a` of
//! `token_a` and asks for `amount_b` of `token_b` in return.

use crate::ids::{AccountId, AssetId, OperationId};
use crate::numeric::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Operation status
///
/// Transitions are one-way: `Active -> Completed` or `Active -> Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationStatus {
    /// State 0: deposit held in custody, open for fulfilment
    Active,
    /// State 1: fulfilled by a counterparty (terminal)
    Completed,
    /// State 2: withdrawn by the creator (terminal)
    Cancelled,
}

impl OperationStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Completed | OperationStatus::Cancelled)
    }

    /// Get the state ID for wire protocol
    pub fn state_id(&self) -> u8 {
        match self {
            OperationStatus::Active => 0,
            OperationStatus::Completed => 1,
            OperationStatus::Cancelled => 2,
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OperationStatus::Active => "ACTIVE",
            OperationStatus::Completed => "COMPLETED",
            OperationStatus::Cancelled => "CANCELLED",
        };
        f.write_str(label)
    }
}

/// A single escrow record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub creator: AccountId,
    pub token_a: AssetId,
    pub token_b: AssetId,
    /// Held in custody while the operation is active
    pub amount_a: Amount,
    /// Price paid by the completer straight to the creator; never custodied
    pub amount_b: Amount,
    pub status: OperationStatus,
    pub completer: Option<AccountId>,
}

impl Operation {
    /// Build a freshly created, active operation.
    pub fn new(
        id: OperationId,
        creator: AccountId,
        token_a: AssetId,
        token_b: AssetId,
        amount_a: Amount,
        amount_b: Amount,
    ) -> Self {
        Self {
            id,
            creator,
            token_a,
            token_b,
            amount_a,
            amount_b,
            status: OperationStatus::Active,
            completer: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == OperationStatus::Active
    }
}
