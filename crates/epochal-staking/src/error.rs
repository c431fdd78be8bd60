//! Error types for staking, reward streams and claims

use crate::transfer::TransferError;
use crate::types::{AssetId, Epoch, StakeId};
use thiserror::Error;

/// Result type alias for staking operations
pub type Result<T> = std::result::Result<T, StakingError>;

/// Coarse classification of a [`StakingError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Input rejected before any state was touched
    Validation,
    /// Operation not allowed in the current ledger state
    State,
    /// External asset movement failed; the operation was aborted
    Transfer,
    /// Checked arithmetic bound exceeded
    Arithmetic,
}

/// Errors that can occur in the staking engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StakingError {
    // === Validation ===
    /// Stake amount outside the configured bounds
    #[error("Stake amount {amount} outside allowed range [{min}, {max}]")]
    AmountOutOfRange { amount: u128, min: u128, max: u128 },

    /// Lock period outside the configured bounds
    #[error("Lock period of {weeks} weeks outside allowed range [{min}, {max}]")]
    LockOutOfRange { weeks: u32, min: u32, max: u32 },

    /// Amount must be non-zero
    #[error("Amount must be non-zero")]
    ZeroAmount,

    /// Withdrawal larger than the remaining principal
    #[error("Withdrawal of {requested} exceeds principal {principal}")]
    ExceedsPrincipal { requested: u128, principal: u128 },

    /// Stake does not exist
    #[error("Stake not found: {0}")]
    StakeNotFound(StakeId),

    /// Caller does not own the stake
    #[error("Caller is not the owner of stake {0}")]
    NotOwner(StakeId),

    /// Caller lacks the privilege for this operation
    #[error("Caller is not authorized to {0}")]
    Unauthorized(&'static str),

    /// Revenue asset is not on the whitelist
    #[error("Unsupported revenue asset: {0}")]
    UnsupportedAsset(AssetId),

    /// Revenue asset already on the whitelist
    #[error("Revenue asset already registered: {0}")]
    AssetAlreadyRegistered(AssetId),

    /// Configuration failed validation or could not be parsed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === State ===
    /// Stake principal already reached zero
    #[error("Stake {0} is closed")]
    StakeClosed(StakeId),

    /// No unlocked, unclaimed reward
    #[error("Nothing to claim")]
    NothingToClaim,

    /// Emergency exit is switched off
    #[error("Emergency exit is disabled")]
    EmergencyExitDisabled,

    /// Engine is paused by the administrator
    #[error("Staking is paused")]
    Paused,

    /// A snapshot for this epoch and stream already exists
    #[error("Epoch {epoch} already recorded for {stream}")]
    EpochAlreadyRecorded { epoch: Epoch, stream: String },

    /// Nothing is staked, so an epoch reward could never be claimed
    #[error("Cannot record rewards while total weighted stake is zero")]
    NoWeightedStake,

    /// A mutating call was made while another one is in progress
    #[error("Re-entrant call rejected")]
    Reentrant,

    /// A claim record would move backwards
    #[error("Claim record for stake {stake_id} epoch {epoch} would decrease from {current} to {proposed}")]
    ClaimRegression {
        stake_id: StakeId,
        epoch: Epoch,
        current: u128,
        proposed: u128,
    },

    // === Transfer ===
    /// External asset movement failed
    #[error("Transfer failed: {0}")]
    Transfer(#[from] TransferError),

    // === Arithmetic ===
    /// Checked arithmetic overflowed
    #[error("Arithmetic overflow in {0}")]
    Overflow(&'static str),
}

impl StakingError {
    /// Classify the error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::AmountOutOfRange { .. }
            | Self::LockOutOfRange { .. }
            | Self::ZeroAmount
            | Self::ExceedsPrincipal { .. }
            | Self::StakeNotFound(_)
            | Self::NotOwner(_)
            | Self::Unauthorized(_)
            | Self::UnsupportedAsset(_)
            | Self::AssetAlreadyRegistered(_)
            | Self::InvalidConfig(_) => ErrorCategory::Validation,
            Self::StakeClosed(_)
            | Self::NothingToClaim
            | Self::EmergencyExitDisabled
            | Self::Paused
            | Self::EpochAlreadyRecorded { .. }
            | Self::NoWeightedStake
            | Self::Reentrant
            | Self::ClaimRegression { .. } => ErrorCategory::State,
            Self::Transfer(_) => ErrorCategory::Transfer,
            Self::Overflow(_) => ErrorCategory::Arithmetic,
        }
    }
}
