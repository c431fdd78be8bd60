//! Revenue asset whitelist (append-only)

use crate::error::{Result, StakingError};
use crate::types::AssetId;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Approved revenue assets in registration order
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RevenueAssetRegistry {
    assets: IndexSet<AssetId>,
}

impl RevenueAssetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `asset` to the whitelist
    pub fn register(&mut self, asset: AssetId) -> Result<()> {
        if !self.assets.insert(asset) {
            return Err(StakingError::AssetAlreadyRegistered(asset));
        }
        Ok(())
    }

    pub fn contains(&self, asset: &AssetId) -> bool {
        self.assets.contains(asset)
    }

    /// Fail unless `asset` is whitelisted
    pub fn ensure_supported(&self, asset: &AssetId) -> Result<()> {
        if !self.contains(asset) {
            return Err(StakingError::UnsupportedAsset(*asset));
        }
        Ok(())
    }

    /// Whitelisted assets in registration order
    pub fn assets(&self) -> Vec<AssetId> {
        self.assets.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
