//! Shared fixtures and provider test doubles for the ledger integration tests.

#![allow(dead_code)]

use escrow::bank::{AssetBank, BankTransferProvider};
use escrow::errors::{LedgerError, TransferError};
use escrow::provider::{AssetTransferProvider, Checkpoint};
use escrow::OperationLedger;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use types::ids::{AccountId, AssetId, OperationId};
use types::numeric::Amount;

pub fn asset(symbol: &str) -> AssetId {
    AssetId::new(symbol)
}

pub fn amt(value: u64) -> Amount {
    Amount::from(value)
}

/// Route ledger logs to the test harness output. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Ledger over an in-memory bank with assets A, B and C allowlisted.
pub struct Harness {
    pub bank: Rc<AssetBank>,
    pub ledger: Rc<OperationLedger>,
    pub admin: AccountId,
    pub custody: AccountId,
}

impl Harness {
    pub fn new() -> Self {
        let bank = Rc::new(AssetBank::new());
        let custody = AccountId::new();
        let provider = Rc::new(BankTransferProvider::new(bank.clone(), custody));
        Self::with_provider(bank, custody, provider)
    }

    pub fn with_provider(
        bank: Rc<AssetBank>,
        custody: AccountId,
        provider: Rc<dyn AssetTransferProvider>,
    ) -> Self {
        init_tracing();
        let admin = AccountId::new();
        let ledger = Rc::new(OperationLedger::new(admin, provider));
        for symbol in ["A", "B", "C"] {
            ledger.add_asset(&admin, asset(symbol)).unwrap();
        }
        Self {
            bank,
            ledger,
            admin,
            custody,
        }
    }

    /// New account holding `amount` of `symbol`, fully approved to custody.
    pub fn funded(&self, symbol: &str, amount: u64) -> AccountId {
        let acc = AccountId::new();
        self.fund(acc, symbol, amount);
        acc
    }

    /// Mint to an existing account and raise its custody approval to match.
    pub fn fund(&self, acc: AccountId, symbol: &str, amount: u64) {
        let a = asset(symbol);
        self.bank.mint(acc, &a, amt(amount)).unwrap();
        let approved = self.bank.allowance(&acc, &self.custody, &a);
        self.bank.approve(
            acc,
            self.custody,
            &a,
            approved.checked_add(amt(amount)).unwrap(),
        );
    }

    pub fn balance(&self, acc: &AccountId, symbol: &str) -> Amount {
        self.bank.balance_of(acc, &asset(symbol))
    }

    pub fn custody_balance(&self, symbol: &str) -> Amount {
        self.bank.balance_of(&self.custody, &asset(symbol))
    }
}

/// Provider that declines chosen movements with `TransferError::Declined`.
pub struct DecliningProvider {
    inner: BankTransferProvider,
    pub decline_move_in: Cell<bool>,
    pub decline_move_out: Cell<bool>,
}

impl DecliningProvider {
    pub fn new(bank: Rc<AssetBank>, custody: AccountId) -> Self {
        Self {
            inner: BankTransferProvider::new(bank, custody),
            decline_move_in: Cell::new(false),
            decline_move_out: Cell::new(false),
        }
    }
}

impl AssetTransferProvider for DecliningProvider {
    fn custody_account(&self) -> AccountId {
        self.inner.custody_account()
    }

    fn move_in(
        &self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        if self.decline_move_in.get() {
            return Err(TransferError::Declined {
                reason: "move_in paused by asset".to_string(),
            });
        }
        self.inner.move_in(asset, from, to, amount)
    }

    fn move_out(&self, asset: &AssetId, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        if self.decline_move_out.get() {
            return Err(TransferError::Declined {
                reason: "move_out paused by asset".to_string(),
            });
        }
        self.inner.move_out(asset, to, amount)
    }

    fn balance_of(&self, asset: &AssetId, account: &AccountId) -> Amount {
        self.inner.balance_of(asset, account)
    }

    fn checkpoint(&self) -> Checkpoint {
        self.inner.checkpoint()
    }

    fn commit(&self, checkpoint: Checkpoint) {
        self.inner.commit(checkpoint)
    }

    fn rollback(&self, checkpoint: Checkpoint) {
        self.inner.rollback(checkpoint)
    }
}

/// Call a malicious asset makes back into the ledger mid-transfer.
#[derive(Debug, Clone)]
pub enum Attack {
    Complete { caller: AccountId, id: OperationId },
    Cancel { caller: AccountId, id: OperationId },
    Create { caller: AccountId, token_a: AssetId, token_b: AssetId, amount: Amount },
    AddAsset { caller: AccountId, asset: AssetId },
    Read { id: OperationId },
}

/// Provider whose transfers call back into the ledger before moving funds.
pub struct ReentrantProvider {
    inner: BankTransferProvider,
    ledger: RefCell<Weak<OperationLedger>>,
    attack: RefCell<Option<Attack>>,
    pub outcomes: RefCell<Vec<Result<(), LedgerError>>>,
}

impl ReentrantProvider {
    pub fn new(bank: Rc<AssetBank>, custody: AccountId) -> Self {
        Self {
            inner: BankTransferProvider::new(bank, custody),
            ledger: RefCell::new(Weak::new()),
            attack: RefCell::new(None),
            outcomes: RefCell::new(Vec::new()),
        }
    }

    pub fn attach(&self, ledger: &Rc<OperationLedger>) {
        *self.ledger.borrow_mut() = Rc::downgrade(ledger);
    }

    pub fn arm(&self, attack: Attack) {
        *self.attack.borrow_mut() = Some(attack);
    }

    pub fn disarm(&self) {
        *self.attack.borrow_mut() = None;
    }

    fn strike(&self) {
        let attack = self.attack.borrow().clone();
        let ledger = self.ledger.borrow().upgrade();
        let (Some(attack), Some(ledger)) = (attack, ledger) else {
            return;
        };

        let outcome = match attack {
            Attack::Complete { caller, id } => ledger.complete_operation(&caller, id),
            Attack::Cancel { caller, id } => ledger.cancel_operation(&caller, id),
            Attack::Create {
                caller,
                token_a,
                token_b,
                amount,
            } => ledger
                .create_operation(&caller, &token_a, &token_b, amount, amount)
                .map(|_| ()),
            Attack::AddAsset { caller, asset } => ledger.add_asset(&caller, asset),
            Attack::Read { id } => ledger.get_operation(id).map(|_| ()),
        };
        self.outcomes.borrow_mut().push(outcome);
    }
}

impl AssetTransferProvider for ReentrantProvider {
    fn custody_account(&self) -> AccountId {
        self.inner.custody_account()
    }

    fn move_in(
        &self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.strike();
        self.inner.move_in(asset, from, to, amount)
    }

    fn move_out(&self, asset: &AssetId, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        self.strike();
        self.inner.move_out(asset, to, amount)
    }

    fn balance_of(&self, asset: &AssetId, account: &AccountId) -> Amount {
        self.inner.balance_of(asset, account)
    }

    fn checkpoint(&self) -> Checkpoint {
        self.inner.checkpoint()
    }

    fn commit(&self, checkpoint: Checkpoint) {
        self.inner.commit(checkpoint)
    }

    fn rollback(&self, checkpoint: Checkpoint) {
        self.inner.rollback(checkpoint)
    }
}

/// Non-conforming asset that skims a fixed fee on every deposit into custody.
pub struct FeeOnTransferProvider {
    inner: BankTransferProvider,
    fee: Amount,
    fee_sink: AccountId,
}

impl FeeOnTransferProvider {
    pub fn new(bank: Rc<AssetBank>, custody: AccountId, fee: Amount) -> Self {
        Self {
            inner: BankTransferProvider::new(bank, custody),
            fee,
            fee_sink: AccountId::new(),
        }
    }
}

impl AssetTransferProvider for FeeOnTransferProvider {
    fn custody_account(&self) -> AccountId {
        self.inner.custody_account()
    }

    fn move_in(
        &self,
        asset: &AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> Result<(), TransferError> {
        self.inner.move_in(asset, from, to, amount)?;
        if *to == self.inner.custody_account() {
            self.inner
                .bank()
                .transfer(asset, to, &self.fee_sink, self.fee)?;
        }
        Ok(())
    }

    fn move_out(&self, asset: &AssetId, to: &AccountId, amount: Amount) -> Result<(), TransferError> {
        self.inner.move_out(asset, to, amount)
    }

    fn balance_of(&self, asset: &AssetId, account: &AccountId) -> Amount {
        self.inner.balance_of(asset, account)
    }

    fn checkpoint(&self) -> Checkpoint {
        self.inner.checkpoint()
    }

    fn commit(&self, checkpoint: Checkpoint) {
        self.inner.commit(checkpoint)
    }

    fn rollback(&self, checkpoint: Checkpoint) {
        self.inner.rollback(checkpoint)
    }
}
