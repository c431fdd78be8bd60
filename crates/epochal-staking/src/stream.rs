//! # Reward Streams
//!
//! One [`RewardStream`] per income source: the emission stream and one per
//! whitelisted revenue asset. All of them share the same accounting.
//!
//! ## Entitlement
//!
//! ```text
//! entitlement(stake, epoch) = snapshot.amount × weight(stake @ snapshot)
//!                             ÷ snapshot.total_weighted_stake
//! payable(stake, epoch)     = min(unlocked(entitlement, now), entitlement)
//!                             − already_claimed(stake, epoch)
//! ```
//!
//! A snapshot freezes the pool's weighted stake and the ledger revision when
//! it is recorded. Stakes opened or reduced afterwards never change an
//! existing snapshot's entitlements, and a stake only takes part in epochs
//! that start at or after its deposit.

use crate::claims::{ClaimKey, ClaimTracker, ClaimUndo};
use crate::clock::EpochClock;
use crate::error::{Result, StakingError};
use crate::ledger::{PoolTotals, Stake};
use crate::math::mul_div;
use crate::types::{Epoch, RewardAsset, Timestamp};
use crate::unlock::unlocked_amount;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reward recorded for one epoch of one stream
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochSnapshot {
    /// Epoch number
    pub epoch: Epoch,
    /// Total reward for the epoch
    pub amount: u128,
    /// Epoch start time (unlock starts here)
    pub epoch_start: Timestamp,
    /// Pool weighted stake when recorded
    pub total_weighted_stake: u128,
    /// Ledger revision when recorded
    pub ledger_revision: u64,
    /// Record timestamp
    pub recorded_at: Timestamp,
}

/// One stake's position in one epoch of a stream
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochAccrual {
    pub epoch: Epoch,
    /// Full share of the epoch's reward
    pub entitlement: u128,
    /// Portion of the entitlement unlocked so far
    pub unlocked: u128,
    /// Already paid out
    pub claimed: u128,
    /// Claimable now
    pub payable: u128,
}

impl EpochAccrual {
    /// Fully unlocked and, once `payable` is paid, fully claimed
    pub fn settles(&self) -> bool {
        self.unlocked == self.entitlement && self.claimed + self.payable == self.entitlement
    }
}

/// Snapshots of a single reward stream
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RewardStream {
    asset: RewardAsset,
    snapshots: BTreeMap<Epoch, EpochSnapshot>,
    total_recorded: u128,
}

impl RewardStream {
    pub fn new(asset: RewardAsset) -> Self {
        Self {
            asset,
            snapshots: BTreeMap::new(),
            total_recorded: 0,
        }
    }

    /// Snapshot of `epoch`, if recorded
    pub fn snapshot(&self, epoch: Epoch) -> Option<&EpochSnapshot> {
        self.snapshots.get(&epoch)
    }

    /// All snapshots, oldest first
    pub fn snapshots(&self) -> impl Iterator<Item = &EpochSnapshot> {
        self.snapshots.values()
    }

    /// Sum of all recorded epoch rewards
    pub fn total_recorded(&self) -> u128 {
        self.total_recorded
    }

    /// Finalise the current epoch's snapshot.
    ///
    /// Only the epoch containing `now` can be recorded, and only once.
    pub fn record_epoch(
        &mut self,
        amount: u128,
        totals: &PoolTotals,
        ledger_revision: u64,
        epochs: &EpochClock,
        now: Timestamp,
    ) -> Result<EpochSnapshot> {
        if amount == 0 {
            return Err(StakingError::ZeroAmount);
        }
        if totals.weighted_stake == 0 {
            return Err(StakingError::NoWeightedStake);
        }
        let epoch = epochs.current_epoch(now);
        if self.snapshots.contains_key(&epoch) {
            return Err(StakingError::EpochAlreadyRecorded {
                epoch,
                stream: self.asset.to_string(),
            });
        }
        let total_recorded = self
            .total_recorded
            .checked_add(amount)
            .ok_or(StakingError::Overflow("recorded rewards"))?;

        let snapshot = EpochSnapshot {
            epoch,
            amount,
            epoch_start: epochs.epoch_start(epoch),
            total_weighted_stake: totals.weighted_stake,
            ledger_revision,
            recorded_at: now,
        };
        self.snapshots.insert(epoch, snapshot);
        self.total_recorded = total_recorded;
        Ok(snapshot)
    }

    /// Remove a snapshot recorded by an aborted operation
    pub(crate) fn discard(&mut self, epoch: Epoch) {
        if let Some(snapshot) = self.snapshots.remove(&epoch) {
            self.total_recorded -= snapshot.amount;
        }
    }

    /// Per-epoch position of `stake` for every snapshot up to `through`
    pub fn accruals(
        &self,
        stake: &Stake,
        claims: &ClaimTracker,
        epochs: &EpochClock,
        through: Epoch,
        now: Timestamp,
    ) -> Result<Vec<EpochAccrual>> {
        let first = epochs
            .first_eligible_epoch(stake.start_time)
            .max(claims.settled_through(stake.id, self.asset) + 1);
        if first > through {
            return Ok(Vec::new());
        }

        let mut accruals = Vec::new();
        for (&epoch, snapshot) in self.snapshots.range(first..=through) {
            let weight = stake.weight_at(snapshot.ledger_revision);
            let entitlement = mul_div(snapshot.amount, weight, snapshot.total_weighted_stake)
                .ok_or(StakingError::Overflow("epoch entitlement"))?;
            let unlocked = unlocked_amount(snapshot.epoch_start, now, entitlement);
            let claimed = claims.get(&ClaimKey::new(stake.id, epoch, self.asset));
            accruals.push(EpochAccrual {
                epoch,
                entitlement,
                unlocked,
                claimed,
                payable: unlocked.saturating_sub(claimed),
            });
        }
        Ok(accruals)
    }

    /// Claimable amount for `stake` across epochs up to `through`
    pub fn pending_for(
        &self,
        stake: &Stake,
        claims: &ClaimTracker,
        epochs: &EpochClock,
        through: Epoch,
        now: Timestamp,
    ) -> Result<u128> {
        self.accruals(stake, claims, epochs, through, now)?
            .iter()
            .try_fold(0u128, |sum, accrual| sum.checked_add(accrual.payable))
            .ok_or(StakingError::Overflow("pending rewards"))
    }

    /// Write the claim records for `accruals` and advance the checkpoint.
    ///
    /// Returns the total now payable. Undo entries are appended to `undo`.
    pub(crate) fn settle(
        &self,
        stake: &Stake,
        claims: &mut ClaimTracker,
        accruals: &[EpochAccrual],
        undo: &mut Vec<ClaimUndo>,
    ) -> Result<u128> {
        let mut total = 0u128;
        let mut settled_through = None;
        let mut contiguous = true;

        for accrual in accruals {
            if accrual.payable > 0 {
                let key = ClaimKey::new(stake.id, accrual.epoch, self.asset);
                undo.push(claims.set(key, accrual.claimed + accrual.payable)?);
                total = total
                    .checked_add(accrual.payable)
                    .ok_or(StakingError::Overflow("claim total"))?;
            }
            if contiguous && accrual.settles() {
                settled_through = Some(accrual.epoch);
            } else {
                contiguous = false;
            }
        }

        if let Some(epoch) = settled_through {
            undo.extend(claims.advance_checkpoint(stake.id, self.asset, epoch));
        }
        Ok(total)
    }
}
