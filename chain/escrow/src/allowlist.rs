//! Asset allowlist
//!
//! Insertion-ordered, append-only set of assets eligible for operations.
//! Authorization is checked by the ledger before `insert` is reached.

use std::collections::HashSet;
use types::ids::AssetId;

use crate::errors::{LedgerError, StateError, ValidationError};

#[derive(Debug, Clone, Default)]
pub struct AssetAllowlist {
    ordered: Vec<AssetId>,
    members: HashSet<AssetId>,
}

impl AssetAllowlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an asset.
    ///
    /// Rejects the null identifier and assets already present.
    pub fn insert(&mut self, asset: AssetId) -> Result<(), LedgerError> {
        if asset.is_null() {
            return Err(ValidationError::NullAsset.into());
        }
        if self.members.contains(&asset) {
            return Err(StateError::AssetAlreadyAllowed {
                asset: asset.to_string(),
            }
            .into());
        }
        self.members.insert(asset.clone());
        self.ordered.push(asset);
        Ok(())
    }

    pub fn contains(&self, asset: &AssetId) -> bool {
        self.members.contains(asset)
    }

    /// All assets in the order they were added.
    pub fn assets(&self) -> &[AssetId] {
        &self.ordered
    }
}
