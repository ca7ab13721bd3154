//! Shared security primitives for the ledger
//!
//! Provides the reentrancy guard wrapped around every mutating entry point
//! and the access check used for allowlist administration.

use std::cell::Cell;
use types::ids::AccountId;

/// Reentrancy guard preventing nested calls into protected functions.
///
/// Entry points take `&self`, so the flag lives in a `Cell`. A successful
/// `acquire` hands back a [`ReentrancyLock`] that clears the flag when it is
/// dropped, which covers early returns through `?` as well as unwinding.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    locked: Cell<bool>,
}

impl ReentrancyGuard {
    /// Create a new unlocked guard.
    pub fn new() -> Self {
        Self {
            locked: Cell::new(false),
        }
    }

    /// Acquire the guard. Returns `None` if already locked (reentrancy attempt).
    pub fn acquire(&self) -> Option<ReentrancyLock<'_>> {
        if self.locked.replace(true) {
            return None;
        }
        Some(ReentrancyLock { guard: self })
    }

    /// Check if currently locked.
    pub fn is_locked(&self) -> bool {
        self.locked.get()
    }
}

/// Scoped hold on a [`ReentrancyGuard`]; releases on drop.
#[derive(Debug)]
#[must_use = "the guard is released as soon as the lock is dropped"]
pub struct ReentrancyLock<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for ReentrancyLock<'_> {
    fn drop(&mut self) {
        self.guard.locked.set(false);
    }
}

/// Authorization policy for privileged ledger administration.
///
/// The ledger only asks whether a caller may act; swapping the policy (for
/// example a multi-key scheme) leaves the transition logic untouched.
pub trait AccessPolicy {
    fn is_authorized(&self, caller: &AccountId) -> bool;
}

/// Single-owner access control.
///
/// The owner is fixed at construction to the account that deployed the
/// ledger. There is no transfer of ownership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessController {
    owner: AccountId,
}

impl AccessController {
    pub fn new(owner: AccountId) -> Self {
        Self { owner }
    }

    /// Get the privileged account.
    pub fn owner(&self) -> &AccountId {
        &self.owner
    }
}

impl AccessPolicy for AccessController {
    fn is_authorized(&self, caller: &AccountId) -> bool {
        *caller == self.owner
    }
}
