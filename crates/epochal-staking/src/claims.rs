//! Claim tracking
//!
//! Cumulative amount already released per (stake, epoch, stream). Records
//! only move forward; a stake can therefore claim the same epoch many times
//! as it unlocks without ever being paid a unit twice.
//!
//! A per-(stake, stream) checkpoint marks the last epoch that is fully
//! unlocked and fully paid, so later claims start scanning after it instead
//! of from the stake's inception.

use crate::error::{Result, StakingError};
use crate::types::{Epoch, RewardAsset, StakeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Key of one claim record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClaimKey {
    pub stake_id: StakeId,
    pub epoch: Epoch,
    pub asset: RewardAsset,
}

impl ClaimKey {
    pub fn new(stake_id: StakeId, epoch: Epoch, asset: RewardAsset) -> Self {
        Self {
            stake_id,
            epoch,
            asset,
        }
    }
}

/// Prior value of something the tracker changed
#[derive(Clone, Debug)]
pub(crate) enum ClaimUndo {
    Record(ClaimKey, Option<u128>),
    Checkpoint(StakeId, RewardAsset, Option<Epoch>),
}

/// Cumulative claim records
#[derive(Clone, Debug, Default)]
pub struct ClaimTracker {
    records: HashMap<ClaimKey, u128>,
    settled_through: HashMap<(StakeId, RewardAsset), Epoch>,
}

impl ClaimTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Amount already released for `key`
    pub fn get(&self, key: &ClaimKey) -> u128 {
        self.records.get(key).copied().unwrap_or(0)
    }

    /// Raise the record for `key` to `cumulative`.
    ///
    /// Returns the undo entry for the change. A decrease is a logic error:
    /// it panics in debug builds and is rejected otherwise.
    pub(crate) fn set(&mut self, key: ClaimKey, cumulative: u128) -> Result<ClaimUndo> {
        let previous = self.records.get(&key).copied();
        let current = previous.unwrap_or(0);
        debug_assert!(
            cumulative >= current,
            "claim record for {:?} would decrease from {} to {}",
            key,
            current,
            cumulative
        );
        if cumulative < current {
            return Err(StakingError::ClaimRegression {
                stake_id: key.stake_id,
                epoch: key.epoch,
                current,
                proposed: cumulative,
            });
        }
        self.records.insert(key, cumulative);
        Ok(ClaimUndo::Record(key, previous))
    }

    /// Last epoch fully settled for (`stake_id`, `asset`), 0 if none
    pub fn settled_through(&self, stake_id: StakeId, asset: RewardAsset) -> Epoch {
        self.settled_through
            .get(&(stake_id, asset))
            .copied()
            .unwrap_or(0)
    }

    /// Move the settlement checkpoint forward to `epoch`.
    ///
    /// Returns `None` when `epoch` is not ahead of the current checkpoint.
    pub(crate) fn advance_checkpoint(
        &mut self,
        stake_id: StakeId,
        asset: RewardAsset,
        epoch: Epoch,
    ) -> Option<ClaimUndo> {
        let previous = self.settled_through.get(&(stake_id, asset)).copied();
        if epoch <= previous.unwrap_or(0) {
            return None;
        }
        self.settled_through.insert((stake_id, asset), epoch);
        Some(ClaimUndo::Checkpoint(stake_id, asset, previous))
    }

    /// Undo changes, newest first
    pub(crate) fn rollback(&mut self, undo: Vec<ClaimUndo>) {
        for entry in undo.into_iter().rev() {
            match entry {
                ClaimUndo::Record(key, Some(value)) => {
                    self.records.insert(key, value);
                }
                ClaimUndo::Record(key, None) => {
                    self.records.remove(&key);
                }
                ClaimUndo::Checkpoint(stake_id, asset, Some(epoch)) => {
                    self.settled_through.insert((stake_id, asset), epoch);
                }
                ClaimUndo::Checkpoint(stake_id, asset, None) => {
                    self.settled_through.remove(&(stake_id, asset));
                }
            }
        }
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
