//! # Epochal Staking - Weighted Locks & Epoch Reward Streams
//!
//! Users lock the protocol token for 1 to 52 weeks. Longer locks earn a higher
//! multiplier, and rewards are distributed per weekly epoch in proportion to
//! weighted stake.
//!
//! ## Key Features
//!
//! - **Lock multiplier**: linear from 1.0× (1 week) to 2.0× (52 weeks)
//! - **Epoch snapshots**: each epoch's reward and total weighted stake are frozen when recorded
//! - **Linear unlock**: an epoch's reward becomes claimable linearly over the following week
//! - **Revenue streams**: whitelisted external assets distributed exactly like emissions
//! - **Early-exit penalty**: decays stepwise over the final weeks of a lock
//!
//! ## Reward Flow
//!
//! ```text
//! ┌──────────────┐  record_epoch_emission  ┌────────────────┐
//! │ Emission op  │────────────────────────▶│ RewardStream   │──┐
//! └──────────────┘                         │ (emission)     │  │ snapshot:
//! ┌──────────────┐  deposit_revenue        ├────────────────┤  │ amount,
//! │ Depositor    │────────────────────────▶│ RewardStream   │──┤ weighted stake,
//! └──────────────┘                         │ (per asset)    │  │ ledger revision
//!                                          └────────────────┘  │
//!                                                              ▼
//! ┌──────────────┐  claim / withdraw       ┌────────────────┐ entitlement =
//! │ Staker       │◀────────────────────────│ ClaimTracker   │ amount × weight
//! └──────────────┘   unlocked − claimed    └────────────────┘   / weighted stake
//! ```
//!
//! ## Penalty Schedule (defaults)
//!
//! | Weeks left on lock | Penalty |
//! |--------------------|---------|
//! | ≥ 4 | 50% |
//! | 3 | 37.5% |
//! | 2 | 25% |
//! | 1 | 12.5% |
//! | 0 | none |

pub mod claims;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod math;
pub mod penalty;
pub mod registry;
pub mod stream;
pub mod transfer;
pub mod types;
pub mod unlock;

// Re-exports
pub use claims::{ClaimKey, ClaimTracker};
pub use clock::{Clock, EpochClock, ManualClock, SystemClock};
pub use config::{AdminConfig, MultiplierCurve};
pub use engine::{StakingEngine, UserSummary, WithdrawReceipt};
pub use error::{ErrorCategory, Result, StakingError};
pub use ledger::{LockStatus, PoolTotals, Reduction, Stake, StakeLedger, WeightCheckpoint};
pub use penalty::PenaltyCurve;
pub use registry::RevenueAssetRegistry;
pub use stream::{EpochAccrual, EpochSnapshot, RewardStream};
pub use transfer::{AssetTransfer, InMemoryBank, TransferError};
pub use types::{AccountId, AssetId, Epoch, RewardAsset, StakeId, Timestamp};

/// Protocol constants
pub mod constants {
    /// One epoch (and one lock week) in seconds
    pub const WEEK: u64 = 7 * 24 * 3600; // 604,800

    /// Basis points denominator (100%)
    pub const BPS_DENOMINATOR: u128 = 10_000;

    /// Multiplier fixed-point base (1.0×)
    pub const MULTIPLIER_BASE: u32 = 1_000;

    /// Multiplier at the maximum lock (2.0×)
    pub const MAX_MULTIPLIER: u32 = 2_000;

    /// Shortest lock in weeks
    pub const MIN_LOCK_WEEKS: u32 = 1;

    /// Longest lock in weeks
    pub const MAX_LOCK_WEEKS: u32 = 52;

    /// One token in smallest unit
    pub const ONE_TOKEN: u128 = 1_000_000_000_000_000_000; // 10^18

    /// Default minimum stake: 1 token
    pub const DEFAULT_MIN_STAKE: u128 = ONE_TOKEN;

    /// Default maximum stake: 10 million tokens
    pub const DEFAULT_MAX_STAKE: u128 = 10_000_000 * ONE_TOKEN;

    /// Default emergency-exit penalty: 50%
    pub const DEFAULT_EMERGENCY_PENALTY_BPS: u32 = 5_000;
}

pub use constants::*;
