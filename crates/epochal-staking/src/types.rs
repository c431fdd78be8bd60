//! Identifier and scalar types shared by every module

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Account identifier (owner of stakes, privileged callers)
pub type AccountId = [u8; 32];

/// Sequential stake identifier, allocated from 1
pub type StakeId = u64;

/// 1-indexed epoch number
pub type Epoch = u64;

/// UNIX timestamp in whole seconds
pub type Timestamp = u64;

/// AssetId - identifier of an external fungible asset
///
/// Serialized as a 64-character hex string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AssetId {
    id: [u8; 32],
}

impl AssetId {
    /// Create a new AssetId from raw bytes
    pub const fn new(id: [u8; 32]) -> Self {
        Self { id }
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.id
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.id)
    }

    /// Parse from a 64-character hex string
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut id = [0u8; 32];
        hex::decode_to_slice(s, &mut id)?;
        Ok(Self { id })
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl Serialize for AssetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Which reward stream an amount belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RewardAsset {
    /// Protocol-asset emissions
    Emission,
    /// An external revenue asset
    Revenue(AssetId),
}

impl RewardAsset {
    /// Revenue asset id, if any
    pub fn revenue_asset(&self) -> Option<AssetId> {
        match self {
            Self::Emission => None,
            Self::Revenue(asset) => Some(*asset),
        }
    }
}

impl fmt::Display for RewardAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Emission => write!(f, "emission"),
            Self::Revenue(asset) => write!(f, "revenue:{}", asset),
        }
    }
}
