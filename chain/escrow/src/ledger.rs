//! Operation Ledger: escrow state machine
//!
//! Accepts deposits, tracks operation state, enforces who may move an
//! operation forward, and performs the paired asset movements through the
//! [`AssetTransferProvider`].
//!
//! Every mutating entry point runs in this order:
//! 1. Reentrancy guard
//! 2. Existence / status / authorization / input checks
//! 3. Staged ledger write (complete and cancel only)
//! 4. Provider transfers under a checkpoint, rolled back together with the
//!    staged write on any failure
//! 5. Record write (create only), guard release, event emission
//!
//! The ledger is single-threaded: entry points take `&self` so that a
//! provider holding a handle to the ledger can call back into it during a
//! transfer. No `RefCell` borrow of ledger state is held across a provider
//! call, so such a callback can still read; it cannot mutate.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, info, warn};
use types::ids::{AccountId, AssetId, OperationId};
use types::numeric::Amount;
use types::operation::{Operation, OperationStatus};

use crate::allowlist::AssetAllowlist;
use crate::config::LedgerConfig;
use crate::errors::{AuthorizationError, LedgerError, StateError, TransferError, ValidationError};
use crate::events::{
    AssetAdded, EventLog, EventObserver, EventRecord, LedgerEvent, OperationCancelled,
    OperationCompleted, OperationCreated,
};
use crate::provider::AssetTransferProvider;
use crate::security::{AccessController, AccessPolicy, ReentrancyGuard, ReentrancyLock};

#[derive(Debug, Default)]
struct LedgerState {
    allowlist: AssetAllowlist,
    /// Indexed by operation id, which is also creation order.
    operations: Vec<Operation>,
    next_id: OperationId,
}

impl LedgerState {
    fn operation_mut(&mut self, id: OperationId) -> Option<&mut Operation> {
        usize::try_from(id.value())
            .ok()
            .and_then(|index| self.operations.get_mut(index))
    }

    fn operation(&self, id: OperationId) -> Option<&Operation> {
        usize::try_from(id.value())
            .ok()
            .and_then(|index| self.operations.get(index))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Complete,
    Cancel,
}

impl Transition {
    fn target(self) -> OperationStatus {
        match self {
            Transition::Complete => OperationStatus::Completed,
            Transition::Cancel => OperationStatus::Cancelled,
        }
    }
}

/// Serializable view of the full ledger state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub custody_account: AccountId,
    pub assets: Vec<AssetId>,
    pub operations: Vec<Operation>,
    pub operation_count: u64,
}

/// Escrow ledger owning all operation records.
pub struct OperationLedger {
    access: Box<dyn AccessPolicy>,
    provider: Rc<dyn AssetTransferProvider>,
    guard: ReentrancyGuard,
    state: RefCell<LedgerState>,
    events: EventLog,
}

impl OperationLedger {
    /// Create a ledger whose privileged account is `deployer`.
    pub fn new(deployer: AccountId, provider: Rc<dyn AssetTransferProvider>) -> Self {
        Self::with_access_policy(Box::new(AccessController::new(deployer)), provider)
    }

    /// Create a ledger with a custom authorization policy.
    pub fn with_access_policy(
        access: Box<dyn AccessPolicy>,
        provider: Rc<dyn AssetTransferProvider>,
    ) -> Self {
        info!(
            custody_account = %provider.custody_account(),
            "OperationLedger initialized"
        );
        Self {
            access,
            provider,
            guard: ReentrancyGuard::new(),
            state: RefCell::new(LedgerState::default()),
            events: EventLog::new(),
        }
    }

    /// Create a ledger from config, allowlisting the configured assets as
    /// the owner. Each seeded asset emits `AssetAdded`.
    pub fn from_config(
        config: LedgerConfig,
        provider: Rc<dyn AssetTransferProvider>,
    ) -> Result<Self, LedgerError> {
        config.validate()?;
        let ledger = Self::new(config.owner, provider);
        for asset in config.assets {
            ledger.add_asset(&config.owner, asset)?;
        }
        Ok(ledger)
    }

    // ───────────────────────── Allowlist ─────────────────────────

    /// Add an asset to the allowlist. Privileged account only.
    pub fn add_asset(&self, caller: &AccountId, asset: AssetId) -> Result<(), LedgerError> {
        let lock = self.lock("add_asset")?;

        if !self.access.is_authorized(caller) {
            debug!(caller = %caller, asset = %asset, "Rejected unauthorized add_asset");
            return Err(AuthorizationError::NotAuthorized {
                caller: caller.to_string(),
            }
            .into());
        }

        self.state.borrow_mut().allowlist.insert(asset.clone())?;
        drop(lock);

        info!(asset = %asset, added_by = %caller, "Asset added to allowlist");
        self.events.emit(LedgerEvent::AssetAdded(AssetAdded {
            asset,
            added_by: *caller,
        }));
        Ok(())
    }

    pub fn is_allowed(&self, asset: &AssetId) -> bool {
        self.state.borrow().allowlist.contains(asset)
    }

    /// Allowlisted assets in the order they were added.
    pub fn list_assets(&self) -> Vec<AssetId> {
        self.state.borrow().allowlist.assets().to_vec()
    }

    // ───────────────────────── Transitions ─────────────────────────

    /// Deposit `amount_a` of `token_a` into custody and open an offer for
    /// `amount_b` of `token_b`.
    ///
    /// The caller must have approved the custody account for `amount_a`.
    pub fn create_operation(
        &self,
        caller: &AccountId,
        token_a: &AssetId,
        token_b: &AssetId,
        amount_a: Amount,
        amount_b: Amount,
    ) -> Result<OperationId, LedgerError> {
        let lock = self.lock("create_operation")?;

        self.validate_offer(token_a, token_b, amount_a, amount_b)?;

        let custody = self.provider.custody_account();
        self.transact(|provider| provider.move_in(token_a, caller, &custody, amount_a))?;

        let operation = {
            let mut state = self.state.borrow_mut();
            let id = state.next_id;
            state.next_id = id.next();
            let operation = Operation::new(
                id,
                *caller,
                token_a.clone(),
                token_b.clone(),
                amount_a,
                amount_b,
            );
            state.operations.push(operation.clone());
            operation
        };
        drop(lock);

        info!(
            operation_id = %operation.id,
            creator = %caller,
            token_a = %token_a,
            token_b = %token_b,
            amount_a = %amount_a,
            amount_b = %amount_b,
            "Operation created"
        );
        self.events.emit(LedgerEvent::OperationCreated(OperationCreated {
            operation_id: operation.id,
            creator: operation.creator,
            token_a: operation.token_a,
            token_b: operation.token_b,
            amount_a,
            amount_b,
        }));
        Ok(operation.id)
    }

    /// Fulfil an active operation: the caller pays `amount_b` of `token_b`
    /// to the creator and receives the custodied `amount_a` of `token_a`.
    pub fn complete_operation(&self, caller: &AccountId, id: OperationId) -> Result<(), LedgerError> {
        let lock = self.lock("complete_operation")?;

        let operation = self.stage_transition(caller, id, Transition::Complete)?;

        let settled = self.transact(|provider| {
            provider.move_in(&operation.token_b, caller, &operation.creator, operation.amount_b)?;
            provider.move_out(&operation.token_a, caller, operation.amount_a)
        });
        if let Err(err) = settled {
            self.revert_transition(id);
            return Err(err.into());
        }
        drop(lock);

        info!(
            operation_id = %id,
            creator = %operation.creator,
            completer = %caller,
            "Operation completed"
        );
        self.events
            .emit(LedgerEvent::OperationCompleted(OperationCompleted {
                operation_id: id,
                creator: operation.creator,
                completer: *caller,
                token_a: operation.token_a,
                token_b: operation.token_b,
                amount_a: operation.amount_a,
                amount_b: operation.amount_b,
            }));
        Ok(())
    }

    /// Withdraw an active operation and return the deposit to its creator.
    pub fn cancel_operation(&self, caller: &AccountId, id: OperationId) -> Result<(), LedgerError> {
        let lock = self.lock("cancel_operation")?;

        let operation = self.stage_transition(caller, id, Transition::Cancel)?;

        let refunded = self.transact(|provider| {
            provider.move_out(&operation.token_a, &operation.creator, operation.amount_a)
        });
        if let Err(err) = refunded {
            self.revert_transition(id);
            return Err(err.into());
        }
        drop(lock);

        info!(operation_id = %id, creator = %caller, "Operation cancelled");
        self.events
            .emit(LedgerEvent::OperationCancelled(OperationCancelled {
                operation_id: id,
                creator: operation.creator,
                token_a: operation.token_a,
                amount_a: operation.amount_a,
            }));
        Ok(())
    }

    // ───────────────────────── Views ─────────────────────────

    pub fn get_operation(&self, id: OperationId) -> Result<Operation, LedgerError> {
        self.state
            .borrow()
            .operation(id)
            .cloned()
            .ok_or_else(|| StateError::OperationNotFound { id }.into())
    }

    /// All operations in creation order, any status.
    pub fn get_all_operations(&self) -> Vec<Operation> {
        self.state.borrow().operations.clone()
    }

    /// Total operations ever created.
    pub fn get_operation_count(&self) -> u64 {
        self.state.borrow().next_id.value()
    }

    pub fn operations_by_status(&self, status: OperationStatus) -> Vec<Operation> {
        self.filter_operations(|op| op.status == status)
    }

    pub fn operations_by_creator(&self, creator: &AccountId) -> Vec<Operation> {
        self.filter_operations(|op| op.creator == *creator)
    }

    pub fn active_operations(&self) -> Vec<Operation> {
        self.operations_by_status(OperationStatus::Active)
    }

    pub fn custody_account(&self) -> AccountId {
        self.provider.custody_account()
    }

    /// Amount of `asset` the ledger should hold: the sum of `amount_a` over
    /// active operations depositing that asset.
    pub fn custodied_amount(&self, asset: &AssetId) -> Amount {
        self.state
            .borrow()
            .operations
            .iter()
            .filter(|op| op.is_active() && op.token_a == *asset)
            .map(|op| op.amount_a)
            .sum()
    }

    /// Check custody conservation for every allowlisted asset against the
    /// provider's reported custody balance.
    ///
    /// Assets whose transfers do not move exactly the requested amount (for
    /// example fee-on-transfer assets) show up here as a violation.
    pub fn audit_custody(&self) -> Result<(), LedgerError> {
        let custody = self.provider.custody_account();
        for asset in self.list_assets() {
            let expected = self.custodied_amount(&asset);
            let held = self.provider.balance_of(&asset, &custody);
            if expected != held {
                warn!(
                    asset = %asset,
                    expected = %expected,
                    held = %held,
                    "Custody conservation violated"
                );
                return Err(LedgerError::ConservationViolated {
                    asset: asset.to_string(),
                    expected: expected.to_string(),
                    held: held.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = self.state.borrow();
        LedgerSnapshot {
            custody_account: self.provider.custody_account(),
            assets: state.allowlist.assets().to_vec(),
            operations: state.operations.clone(),
            operation_count: state.next_id.value(),
        }
    }

    /// SHA-256 commitment over the ledger state.
    pub fn state_root(&self) -> [u8; 32] {
        let snapshot = self.snapshot();
        let mut hasher = Sha256::new();

        hasher.update(snapshot.custody_account.as_uuid().as_bytes());
        hasher.update((snapshot.assets.len() as u64).to_be_bytes());
        for asset in &snapshot.assets {
            hash_str(&mut hasher, asset.as_str());
        }
        hasher.update(snapshot.operation_count.to_be_bytes());
        for op in &snapshot.operations {
            hasher.update(op.id.value().to_be_bytes());
            hasher.update(op.creator.as_uuid().as_bytes());
            hash_str(&mut hasher, op.token_a.as_str());
            hash_str(&mut hasher, op.token_b.as_str());
            hash_str(&mut hasher, &op.amount_a.to_string());
            hash_str(&mut hasher, &op.amount_b.to_string());
            hasher.update([op.status.state_id()]);
            match &op.completer {
                Some(completer) => {
                    hasher.update([1u8]);
                    hasher.update(completer.as_uuid().as_bytes());
                }
                None => hasher.update([0u8]),
            }
        }

        hasher.finalize().into()
    }

    // ───────────────────────── Events ─────────────────────────

    /// Get all emitted events.
    pub fn events(&self) -> Vec<EventRecord> {
        self.events.events()
    }

    pub fn events_since(&self, sequence: u64) -> Vec<EventRecord> {
        self.events.events_since(sequence)
    }

    pub fn subscribe(&self, observer: Box<dyn EventObserver>) {
        self.events.subscribe(observer);
    }

    /// Whether a mutating entry point is currently executing.
    pub fn is_locked(&self) -> bool {
        self.guard.is_locked()
    }

    // ───────────────────────── Internal ─────────────────────────

    fn lock(&self, entry_point: &'static str) -> Result<ReentrancyLock<'_>, LedgerError> {
        self.guard.acquire().ok_or_else(|| {
            warn!(entry_point, "Reentrant call rejected");
            LedgerError::Reentrancy
        })
    }

    fn validate_offer(
        &self,
        token_a: &AssetId,
        token_b: &AssetId,
        amount_a: Amount,
        amount_b: Amount,
    ) -> Result<(), LedgerError> {
        let state = self.state.borrow();
        for token in [token_a, token_b] {
            if !state.allowlist.contains(token) {
                debug!(asset = %token, "Rejected offer on asset not allowed");
                return Err(ValidationError::AssetNotAllowed {
                    asset: token.to_string(),
                }
                .into());
            }
        }
        if token_a == token_b {
            return Err(ValidationError::AssetsMustDiffer {
                asset: token_a.to_string(),
            }
            .into());
        }
        if !amount_a.is_positive() || !amount_b.is_positive() {
            return Err(ValidationError::NonPositiveAmount.into());
        }
        Ok(())
    }

    /// Check and write the terminal status before any transfer runs.
    ///
    /// Checks run in order: existence, status, caller.
    fn stage_transition(
        &self,
        caller: &AccountId,
        id: OperationId,
        transition: Transition,
    ) -> Result<Operation, LedgerError> {
        let mut state = self.state.borrow_mut();
        let operation = state
            .operation_mut(id)
            .ok_or(StateError::OperationNotFound { id })?;

        if !operation.is_active() {
            return Err(StateError::OperationNotActive {
                id,
                status: operation.status,
            }
            .into());
        }

        match transition {
            Transition::Complete => {
                if operation.creator == *caller {
                    return Err(AuthorizationError::CreatorCannotComplete.into());
                }
                operation.completer = Some(*caller);
            }
            Transition::Cancel => {
                if operation.creator != *caller {
                    return Err(AuthorizationError::OnlyCreatorCanCancel.into());
                }
            }
        }

        operation.status = transition.target();
        Ok(operation.clone())
    }

    /// Undo a staged transition after its transfers failed.
    fn revert_transition(&self, id: OperationId) {
        if let Some(operation) = self.state.borrow_mut().operation_mut(id) {
            operation.status = OperationStatus::Active;
            operation.completer = None;
        }
    }

    /// Run provider transfers under a checkpoint; roll them all back if any fails.
    fn transact<F>(&self, transfers: F) -> Result<(), TransferError>
    where
        F: FnOnce(&dyn AssetTransferProvider) -> Result<(), TransferError>,
    {
        let provider = self.provider.as_ref();
        let checkpoint = provider.checkpoint();
        debug!(checkpoint = checkpoint.0, "Provider checkpoint opened");

        match transfers(provider) {
            Ok(()) => {
                provider.commit(checkpoint);
                Ok(())
            }
            Err(err) => {
                warn!(
                    checkpoint = checkpoint.0,
                    error = %err,
                    "Transfer failed, rolling back"
                );
                provider.rollback(checkpoint);
                Err(err)
            }
        }
    }

    fn filter_operations<P>(&self, predicate: P) -> Vec<Operation>
    where
        P: Fn(&Operation) -> bool,
    {
        self.state
            .borrow()
            .operations
            .iter()
            .filter(|op| predicate(op))
            .cloned()
            .collect()
    }
}

fn hash_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
}
