//! In-memory fungible asset book
//!
//! Tracks balances by (account, asset) and allowances by (owner, spender,
//! asset), with checked arithmetic on every movement. [`BankTransferProvider`]
//! binds a bank to the ledger's custody account so it can serve as the
//! ledger's [`AssetTransferProvider`].
//!
//! Checkpoints are a stack of full state snapshots. That is linear in the
//! size of the book, which is fine for tests and simulation workloads.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use types::ids::{AccountId, AssetId};
use types::numeric::Amount;

use crate::errors::TransferError;
use crate::provider::{AssetTransferProvider, Checkpoint};

#[derive(Debug, Clone, Default)]
struct BankState {
    /// Balances: account -> (asset -> amount)
    balances: HashMap<AccountId, HashMap<AssetId, Amount>>,
    /// Allowances: (owner, spender, asset) -> amount
    allowances: HashMap<(AccountId, AccountId, AssetId), Amount>,
}

impl BankState {
    fn balance(&self, account: &AccountId, asset: &AssetId) -> Amount {
        self.balances
            .get(account)
            .and_then(|assets| assets.get(asset))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    fn set_balance(&mut self, account: AccountId, asset: &AssetId, amount: Amount) {
        self.balances
            .entry(account)
            .or_default()
            .insert(asset.clone(), amount);
    }

    fn allowance(&self, owner: &AccountId, spender: &AccountId, asset: &AssetId) -> Amount {
        self.allowances
            .get(&(*owner, *spender, asset.clone()))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Credit with overflow protection.
    fn safe_credit(
        &mut self,
        account: AccountId,
        asset: &AssetId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let new_balance = self
            .balance(&account, asset)
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;
        self.set_balance(account, asset, new_balance);
        Ok(())
    }

    /// Debit-then-credit. Both sides are computed before either is written.
    fn transfer(
        &mut self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let available = self.balance(from, asset);
        let debited =
            available
                .checked_sub(amount)
                .ok_or_else(|| TransferError::InsufficientBalance {
                    asset: asset.to_string(),
                    account: from.to_string(),
                    required: amount.to_string(),
                    available: available.to_string(),
                })?;

        if from == to {
            return Ok(());
        }

        let credited = self
            .balance(to, asset)
            .checked_add(amount)
            .ok_or(TransferError::Overflow)?;

        self.set_balance(*from, asset, debited);
        self.set_balance(*to, asset, credited);
        Ok(())
    }
}

/// Multi-asset balance book with allowances and snapshot checkpoints.
#[derive(Debug, Default)]
pub struct AssetBank {
    state: RefCell<BankState>,
    snapshots: RefCell<Vec<BankState>>,
}

impl AssetBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create new units of `asset` in `account`.
    pub fn mint(&self, account: AccountId, asset: &AssetId, amount: Amount) -> Result<(), TransferError> {
        self.state.borrow_mut().safe_credit(account, asset, amount)
    }

    /// Set the amount `spender` may move out of `owner`'s balance.
    pub fn approve(&self, owner: AccountId, spender: AccountId, asset: &AssetId, amount: Amount) {
        self.state
            .borrow_mut()
            .allowances
            .insert((owner, spender, asset.clone()), amount);
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId, asset: &AssetId) -> Amount {
        self.state.borrow().allowance(owner, spender, asset)
    }

    /// Get balance for a specific account and asset.
    pub fn balance_of(&self, account: &AccountId, asset: &AssetId) -> Amount {
        self.state.borrow().balance(account, asset)
    }

    /// Get all balances for an account.
    pub fn account_balances(&self, account: &AccountId) -> HashMap<AssetId, Amount> {
        self.state
            .borrow()
            .balances
            .get(account)
            .cloned()
            .unwrap_or_default()
    }

    /// Sum of all balances of `asset` across accounts.
    pub fn total_supply(&self, asset: &AssetId) -> Amount {
        self.state
            .borrow()
            .balances
            .values()
            .filter_map(|assets| assets.get(asset))
            .sum()
    }

    pub fn transfer(
        &self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.state.borrow_mut().transfer(asset, from, to, amount)
    }

    /// Move funds on behalf of `from`, consuming `spender`'s allowance.
    pub fn transfer_from(
        &self,
        spender: &AccountId,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        let mut state = self.state.borrow_mut();
        let granted = state.allowance(from, spender, asset);
        let remaining =
            granted
                .checked_sub(amount)
                .ok_or_else(|| TransferError::InsufficientAllowance {
                    asset: asset.to_string(),
                    owner: from.to_string(),
                    spender: spender.to_string(),
                    required: amount.to_string(),
                    available: granted.to_string(),
                })?;

        state.transfer(asset, from, to, amount)?;
        state
            .allowances
            .insert((*from, *spender, asset.clone()), remaining);
        Ok(())
    }

    pub fn checkpoint(&self) -> Checkpoint {
        let mut snapshots = self.snapshots.borrow_mut();
        let depth = snapshots.len() as u64;
        snapshots.push(self.state.borrow().clone());
        Checkpoint(depth)
    }

    pub fn commit(&self, checkpoint: Checkpoint) {
        self.snapshots.borrow_mut().truncate(checkpoint.0 as usize);
    }

    pub fn rollback(&self, checkpoint: Checkpoint) {
        let mut snapshots = self.snapshots.borrow_mut();
        let depth = checkpoint.0 as usize;
        if let Some(snapshot) = snapshots.get(depth).cloned() {
            *self.state.borrow_mut() = snapshot;
        }
        snapshots.truncate(depth);
    }
}

/// An [`AssetBank`] seen from a ledger's custody account.
#[derive(Debug, Clone)]
pub struct BankTransferProvider {
    bank: Rc<AssetBank>,
    custody: AccountId,
}

impl BankTransferProvider {
    pub fn new(bank: Rc<AssetBank>, custody: AccountId) -> Self {
        Self { bank, custody }
    }

    pub fn bank(&self) -> &Rc<AssetBank> {
        &self.bank
    }
}

impl AssetTransferProvider for BankTransferProvider {
    fn custody_account(&self) -> AccountId {
        self.custody
    }

    fn move_in(
        &self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.bank.transfer_from(&self.custody, asset, from, to, amount)
    }

    fn move_out(&self, asset: &AssetId, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        self.bank.transfer(asset, &self.custody, to, amount)
    }

    fn balance_of(&self, asset: &AssetId, account: &AccountId) -> Amount {
        self.bank.balance_of(account, asset)
    }

    fn checkpoint(&self) -> Checkpoint {
        self.bank.checkpoint()
    }

    fn commit(&self, checkpoint: Checkpoint) {
        self.bank.commit(checkpoint)
    }

    fn rollback(&self, checkpoint: Checkpoint) {
        self.bank.rollback(checkpoint)
    }
}
