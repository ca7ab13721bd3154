//! Asset transfer provider boundary
//!
//! The ledger never moves balances itself. It asks a provider, and a
//! provider call is an opaque external invocation: the asset implementation
//! behind it may run arbitrary logic, including calls back into the ledger.

use types::ids::{AccountId, AssetId};
use types::numeric::Amount;

use crate::errors::TransferError;

/// Marker for a transactional boundary opened with
/// [`AssetTransferProvider::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Checkpoint(pub u64);

/// Moves asset balances on behalf of the ledger.
///
/// A single failed `move_in` or `move_out` must leave no partial effects.
/// Effects of *successful* moves are undone by `rollback` to an earlier
/// checkpoint, which is how the ledger keeps multi-transfer entry points
/// all-or-nothing.
pub trait AssetTransferProvider {
    /// The account that holds custodied deposits.
    fn custody_account(&self) -> AccountId;

    /// Move `amount` of `asset` from `from` to `to`, spending the allowance
    /// `from` previously granted to the custody account.
    fn move_in(
        &self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError>;

    /// Move `amount` of `asset` out of custody to `to`.
    fn move_out(&self, asset: &AssetId, to: &AccountId, amount: Amount) -> Result<(), TransferError>;

    fn balance_of(&self, asset: &AssetId, account: &AccountId) -> Amount;

    /// Open a transactional boundary.
    fn checkpoint(&self) -> Checkpoint;

    /// Keep every effect since `checkpoint` and close it.
    fn commit(&self, checkpoint: Checkpoint);

    /// Undo every effect since `checkpoint` and close it.
    fn rollback(&self, checkpoint: Checkpoint);
}
