//! # Stake Ledger
//!
//! Lock positions and pool-wide totals.
//!
//! ## Multiplier (defaults)
//!
//! | Lock | Multiplier | Weighted value of 1 000 units |
//! |------|------------|-------------------------------|
//! | 1 week | 1.000× | 1 000 |
//! | 26 weeks | 1.490× | 1 490 |
//! | 52 weeks | 2.000× | 2 000 |
//!
//! ## Lifecycle
//!
//! ```text
//! OPEN(principal > 0) --reduce(partial)--> OPEN(reduced)
//!        |                                      |
//!        +--reduce(full) / emergency exit-------+--> CLOSED(principal = 0)
//! ```
//!
//! Every change to a stake's weight bumps the ledger revision and is appended
//! to that stake's weight history, so an epoch snapshot taken at revision `r`
//! can later recover exactly the weight each stake had at that moment.

use crate::config::AdminConfig;
use crate::constants::{MULTIPLIER_BASE, WEEK};
use crate::error::{Result, StakingError};
use crate::math::mul_div;
use crate::penalty::{apply_bps, PenaltyCurve};
use crate::types::{AccountId, RewardAsset, StakeId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Weighted value of `principal` at `multiplier`
pub fn weighted_value(principal: u128, multiplier: u32) -> Result<u128> {
    mul_div(principal, multiplier as u128, MULTIPLIER_BASE as u128)
        .ok_or(StakingError::Overflow("weighted stake"))
}

/// A stake's weight from a given ledger revision onward
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightCheckpoint {
    pub revision: u64,
    pub weighted: u128,
}

/// A locked deposit
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stake {
    /// Stake ID
    pub id: StakeId,

    /// Owner address
    pub owner: AccountId,

    /// Remaining principal
    pub principal: u128,

    /// Lock duration in weeks
    pub lock_weeks: u32,

    /// Deposit timestamp
    pub start_time: Timestamp,

    /// Lock multiplier (1000 = 1.0×)
    pub multiplier: u32,

    /// Rewards paid out so far, per stream
    pub rewards_paid: BTreeMap<RewardAsset, u128>,

    /// Weight history, ordered by revision
    weight_history: Vec<WeightCheckpoint>,
}

impl Stake {
    /// Current weighted value (0 once closed)
    pub fn weighted(&self) -> u128 {
        self.weight_history
            .last()
            .map(|checkpoint| checkpoint.weighted)
            .unwrap_or(0)
    }

    /// Lock end timestamp
    pub fn unlock_time(&self) -> Timestamp {
        self.start_time
            .saturating_add((self.lock_weeks as u64).saturating_mul(WEEK))
    }

    /// Principal not yet withdrawn
    pub fn is_open(&self) -> bool {
        self.principal > 0
    }

    /// Whether the lock is still running
    pub fn is_locked(&self, now: Timestamp) -> bool {
        now < self.unlock_time()
    }

    /// Weight the stake had at ledger revision `revision`
    pub fn weight_at(&self, revision: u64) -> u128 {
        let idx = self
            .weight_history
            .partition_point(|checkpoint| checkpoint.revision <= revision);
        if idx == 0 {
            0
        } else {
            self.weight_history[idx - 1].weighted
        }
    }

    /// Rewards paid out from `asset` so far
    pub fn rewards_paid_for(&self, asset: &RewardAsset) -> u128 {
        self.rewards_paid.get(asset).copied().unwrap_or(0)
    }
}

/// Lock status view
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockStatus {
    pub locked: bool,
    pub unlock_time: Timestamp,
}

/// Pool-wide aggregates over open stakes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolTotals {
    /// Σ principal
    pub total_principal: u128,
    /// Σ principal × multiplier / 1000
    pub weighted_stake: u128,
    /// Number of open stakes
    pub open_stakes: u64,
    /// Early-withdrawal and emergency penalties kept by the pool
    pub retained_penalties: u128,
}

/// Result of a withdrawal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reduction {
    /// Principal removed from the stake
    pub withdrawn: u128,
    /// Amount returned to the owner
    pub net: u128,
    /// Amount retained by the pool
    pub penalty: u128,
    /// Whether the stake is now closed
    pub closed: bool,
}

/// State needed to undo one ledger mutation
#[derive(Clone, Debug)]
pub(crate) struct LedgerUndo {
    stake_id: StakeId,
    previous: Option<Stake>,
    totals: PoolTotals,
    revision: u64,
    next_id: StakeId,
}

/// All stakes and their pool totals
#[derive(Clone, Debug)]
pub struct StakeLedger {
    stakes: BTreeMap<StakeId, Stake>,
    by_owner: HashMap<AccountId, Vec<StakeId>>,
    totals: PoolTotals,
    next_id: StakeId,
    revision: u64,
}

impl Default for StakeLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl StakeLedger {
    pub fn new() -> Self {
        Self {
            stakes: BTreeMap::new(),
            by_owner: HashMap::new(),
            totals: PoolTotals::default(),
            next_id: 1,
            revision: 0,
        }
    }

    /// Pool totals
    pub fn totals(&self) -> PoolTotals {
        self.totals
    }

    /// Current ledger revision
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Get a stake
    pub fn get(&self, stake_id: StakeId) -> Result<&Stake> {
        self.stakes
            .get(&stake_id)
            .ok_or(StakingError::StakeNotFound(stake_id))
    }

    /// Get a stake owned by `caller`
    pub fn get_owned(&self, stake_id: StakeId, caller: &AccountId) -> Result<&Stake> {
        let stake = self.get(stake_id)?;
        if stake.owner != *caller {
            return Err(StakingError::NotOwner(stake_id));
        }
        Ok(stake)
    }

    /// All stakes of `owner`, open and closed, in creation order
    pub fn stakes_of(&self, owner: &AccountId) -> Vec<&Stake> {
        self.by_owner
            .get(owner)
            .map(|ids| ids.iter().filter_map(|id| self.stakes.get(id)).collect())
            .unwrap_or_default()
    }

    /// Iterate over every stake
    pub fn iter(&self) -> impl Iterator<Item = &Stake> {
        self.stakes.values()
    }

    /// Open a new stake
    pub fn open(
        &mut self,
        owner: AccountId,
        amount: u128,
        lock_weeks: u32,
        config: &AdminConfig,
        now: Timestamp,
    ) -> Result<StakeId> {
        config.check_amount(amount)?;
        let multiplier = config.multiplier_for(lock_weeks)?;
        let weighted = weighted_value(amount, multiplier)?;

        let total_principal = self
            .totals
            .total_principal
            .checked_add(amount)
            .ok_or(StakingError::Overflow("pool principal"))?;
        let weighted_stake = self
            .totals
            .weighted_stake
            .checked_add(weighted)
            .ok_or(StakingError::Overflow("pool weighted stake"))?;
        let next_id = self
            .next_id
            .checked_add(1)
            .ok_or(StakingError::Overflow("stake id"))?;

        let id = self.next_id;
        self.revision += 1;
        let stake = Stake {
            id,
            owner,
            principal: amount,
            lock_weeks,
            start_time: now,
            multiplier,
            rewards_paid: BTreeMap::new(),
            weight_history: vec![WeightCheckpoint {
                revision: self.revision,
                weighted,
            }],
        };

        self.stakes.insert(id, stake);
        self.by_owner.entry(owner).or_default().push(id);
        self.next_id = next_id;
        self.totals.total_principal = total_principal;
        self.totals.weighted_stake = weighted_stake;
        self.totals.open_stakes += 1;

        Ok(id)
    }

    /// Withdraw `amount` of principal (0 = everything).
    ///
    /// Penalised by `penalty` while the lock is running. Reward settlement is
    /// the caller's job and must happen first.
    pub fn reduce(
        &mut self,
        stake_id: StakeId,
        caller: &AccountId,
        amount: u128,
        penalty: &PenaltyCurve,
        now: Timestamp,
    ) -> Result<Reduction> {
        let stake = self.open_stake_of(stake_id, caller)?;
        let withdrawn = if amount == 0 { stake.principal } else { amount };
        if withdrawn > stake.principal {
            return Err(StakingError::ExceedsPrincipal {
                requested: withdrawn,
                principal: stake.principal,
            });
        }
        let penalty = penalty.penalty_amount(withdrawn, stake.unlock_time(), now);
        self.apply_reduction(stake_id, withdrawn, penalty)
    }

    /// Close the whole stake at a flat penalty, ignoring the lock.
    ///
    /// The penalty only applies while the lock is still running.
    pub fn emergency_exit(
        &mut self,
        stake_id: StakeId,
        caller: &AccountId,
        penalty_bps: u32,
        now: Timestamp,
    ) -> Result<Reduction> {
        let stake = self.open_stake_of(stake_id, caller)?;
        let withdrawn = stake.principal;
        let penalty = if stake.is_locked(now) {
            apply_bps(withdrawn, penalty_bps)
        } else {
            0
        };
        self.apply_reduction(stake_id, withdrawn, penalty)
    }

    /// Lock status of a stake
    pub fn is_locked(&self, stake_id: StakeId, now: Timestamp) -> Result<LockStatus> {
        let stake = self.get(stake_id)?;
        Ok(LockStatus {
            locked: stake.is_open() && stake.is_locked(now),
            unlock_time: stake.unlock_time(),
        })
    }

    /// Add to a stake's paid-out counter for `asset`
    pub(crate) fn record_paid(
        &mut self,
        stake_id: StakeId,
        asset: RewardAsset,
        amount: u128,
    ) -> Result<()> {
        let stake = self
            .stakes
            .get_mut(&stake_id)
            .ok_or(StakingError::StakeNotFound(stake_id))?;
        let paid = stake.rewards_paid.entry(asset).or_insert(0);
        *paid = paid
            .checked_add(amount)
            .ok_or(StakingError::Overflow("rewards paid"))?;
        Ok(())
    }

    /// Recompute totals from the open stakes and compare
    pub fn verify_totals(&self) -> bool {
        let mut principal = 0u128;
        let mut weighted = 0u128;
        let mut open = 0u64;
        for stake in self.stakes.values().filter(|s| s.is_open()) {
            let Ok(value) = weighted_value(stake.principal, stake.multiplier) else {
                return false;
            };
            principal = principal.saturating_add(stake.principal);
            weighted = weighted.saturating_add(value);
            open += 1;
        }
        principal == self.totals.total_principal
            && weighted == self.totals.weighted_stake
            && open == self.totals.open_stakes
    }

    /// Capture what is needed to undo a mutation of `stake_id`
    pub(crate) fn undo_point(&self, stake_id: StakeId) -> LedgerUndo {
        LedgerUndo {
            stake_id,
            previous: self.stakes.get(&stake_id).cloned(),
            totals: self.totals,
            revision: self.revision,
            next_id: self.next_id,
        }
    }

    /// Capture what is needed to undo the next `open`
    pub(crate) fn undo_point_for_open(&self) -> LedgerUndo {
        self.undo_point(self.next_id)
    }

    /// Revert to an undo point
    pub(crate) fn rollback(&mut self, undo: LedgerUndo) {
        match undo.previous {
            Some(stake) => {
                self.stakes.insert(undo.stake_id, stake);
            }
            None => {
                if let Some(stake) = self.stakes.remove(&undo.stake_id) {
                    if let Some(ids) = self.by_owner.get_mut(&stake.owner) {
                        ids.retain(|id| *id != undo.stake_id);
                        if ids.is_empty() {
                            self.by_owner.remove(&stake.owner);
                        }
                    }
                }
            }
        }
        self.totals = undo.totals;
        self.revision = undo.revision;
        self.next_id = undo.next_id;
    }

    fn open_stake_of(&self, stake_id: StakeId, caller: &AccountId) -> Result<&Stake> {
        let stake = self.get_owned(stake_id, caller)?;
        if !stake.is_open() {
            return Err(StakingError::StakeClosed(stake_id));
        }
        Ok(stake)
    }

    fn apply_reduction(
        &mut self,
        stake_id: StakeId,
        withdrawn: u128,
        penalty: u128,
    ) -> Result<Reduction> {
        let stake = self.get(stake_id)?;
        let old_weighted = stake.weighted();
        let principal = stake.principal - withdrawn;
        let new_weighted = weighted_value(principal, stake.multiplier)?;
        let closed = principal == 0;

        let retained = self
            .totals
            .retained_penalties
            .checked_add(penalty)
            .ok_or(StakingError::Overflow("retained penalties"))?;

        self.revision += 1;
        let revision = self.revision;
        let stake = self
            .stakes
            .get_mut(&stake_id)
            .ok_or(StakingError::StakeNotFound(stake_id))?;
        stake.principal = principal;
        stake.weight_history.push(WeightCheckpoint {
            revision,
            weighted: new_weighted,
        });

        self.totals.total_principal -= withdrawn;
        self.totals.weighted_stake -= old_weighted - new_weighted;
        self.totals.retained_penalties = retained;
        if closed {
            self.totals.open_stakes -= 1;
        }

        Ok(Reduction {
            withdrawn,
            net: withdrawn - penalty,
            penalty,
            closed,
        })
    }
}
