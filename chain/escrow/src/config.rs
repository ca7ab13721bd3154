//! Ledger construction settings

use serde::{Deserialize, Serialize};
use types::ids::{AccountId, AssetId};

use crate::errors::ConfigError;

/// Settings for [`OperationLedger::from_config`](crate::ledger::OperationLedger::from_config).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Privileged account allowed to extend the allowlist.
    pub owner: AccountId,
    /// Assets allowlisted at construction, in order.
    #[serde(default)]
    pub assets: Vec<AssetId>,
}

impl LedgerConfig {
    pub fn new(owner: AccountId) -> Self {
        Self {
            owner,
            assets: Vec::new(),
        }
    }

    pub fn with_assets<I, A>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<AssetId>,
    {
        self.assets.extend(assets.into_iter().map(Into::into));
        self
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: LedgerConfig = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owner.is_nil() {
            return Err(ConfigError::Invalid {
                reason: "owner must not be the nil account".to_string(),
            });
        }
        Ok(())
    }
}
