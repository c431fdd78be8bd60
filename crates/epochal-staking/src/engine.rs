//! # Staking Engine
//!
//! The single logical ledger. Every operation:
//!
//! 1. takes the state lock (operations are serialised),
//! 2. clones the admin configuration and samples the clock once,
//! 3. stages all bookkeeping, recording how to undo it,
//! 4. performs at most one external transfer,
//! 5. rolls the staged bookkeeping back if that transfer fails.
//!
//! The state sits in a `RefCell` inside a re-entrant mutex. A transfer
//! callback that calls back into the engine on the same thread gets the lock
//! but finds the cell already borrowed and is rejected with
//! [`StakingError::Reentrant`]; it never sees half-finished bookkeeping.
//! Other threads simply wait for the lock.
//!
//! ## Operations
//!
//! | Operation | Caller | Transfer |
//! |-----------|--------|----------|
//! | `open_stake` | anyone | deposit staking asset |
//! | `withdraw` | owner | pay net principal + emission rewards |
//! | `emergency_exit` | owner | pay net principal |
//! | `claim_emission` / `claim_all_emissions` | owner | pay staking asset |
//! | `claim_revenue` | owner | pay revenue asset |
//! | `record_epoch_emission` | admin, emission operators | deposit staking asset |
//! | `deposit_revenue` | admin, revenue depositors | deposit revenue asset |
//! | `register_revenue_asset`, `set_paused`, `set_emergency_exit`, `update_config` | admin | none |

use crate::claims::{ClaimTracker, ClaimUndo};
use crate::clock::{Clock, EpochClock};
use crate::config::AdminConfig;
use crate::error::{Result, StakingError};
use crate::ledger::{LedgerUndo, LockStatus, PoolTotals, Reduction, Stake, StakeLedger};
use crate::registry::RevenueAssetRegistry;
use crate::stream::{EpochSnapshot, RewardStream};
use crate::transfer::{AssetTransfer, TransferError};
use crate::types::{AccountId, AssetId, Epoch, RewardAsset, StakeId, Timestamp};
use parking_lot::{ReentrantMutex, RwLock};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outcome of a withdrawal or emergency exit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawReceipt {
    pub stake_id: StakeId,
    /// Principal removed from the stake
    pub withdrawn: u128,
    /// Principal returned after penalty
    pub net: u128,
    /// Penalty retained by the pool
    pub penalty: u128,
    /// Emission rewards settled and paid alongside the principal
    pub rewards: u128,
    /// Whether the stake is now closed
    pub closed: bool,
}

/// Aggregate view of one owner's stakes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub owner: AccountId,
    /// Σ principal over open stakes
    pub total_principal: u128,
    /// Σ weighted value over open stakes
    pub weighted_stake: u128,
    /// Every stake ever opened, open or closed
    pub stake_ids: Vec<StakeId>,
    /// Claimable emission rewards across all stakes
    pub pending_emission: u128,
    /// Claimable revenue per registered asset, in registration order
    pub pending_revenue: Vec<(AssetId, u128)>,
}

/// Undo information for one operation
#[derive(Default)]
struct Journal {
    ledger: Vec<LedgerUndo>,
    claims: Vec<ClaimUndo>,
    snapshots: Vec<(RewardAsset, Epoch)>,
}

struct EngineState {
    ledger: StakeLedger,
    emission: RewardStream,
    revenue: BTreeMap<AssetId, RewardStream>,
    registry: RevenueAssetRegistry,
    claims: ClaimTracker,
}

fn stream_of<'a>(
    emission: &'a RewardStream,
    revenue: &'a BTreeMap<AssetId, RewardStream>,
    reward: RewardAsset,
) -> Result<&'a RewardStream> {
    match reward {
        RewardAsset::Emission => Ok(emission),
        RewardAsset::Revenue(asset) => revenue
            .get(&asset)
            .ok_or(StakingError::UnsupportedAsset(asset)),
    }
}

impl EngineState {
    fn pending(
        &self,
        stake_id: StakeId,
        reward: RewardAsset,
        epochs: &EpochClock,
        now: Timestamp,
    ) -> Result<u128> {
        let stream = stream_of(&self.emission, &self.revenue, reward)?;
        let stake = self.ledger.get(stake_id)?;
        stream.pending_for(stake, &self.claims, epochs, epochs.current_epoch(now), now)
    }

    /// Stage claim records for one stake in one stream; returns the payable amount
    fn settle_stake(
        &mut self,
        stake_id: StakeId,
        reward: RewardAsset,
        epochs: &EpochClock,
        through: Epoch,
        now: Timestamp,
        journal: &mut Journal,
    ) -> Result<u128> {
        let stream = stream_of(&self.emission, &self.revenue, reward)?;
        let stake = self.ledger.get(stake_id)?;
        let accruals = stream.accruals(stake, &self.claims, epochs, through, now)?;
        let paid = stream.settle(stake, &mut self.claims, &accruals, &mut journal.claims)?;
        if paid > 0 {
            journal.ledger.push(self.ledger.undo_point(stake_id));
            self.ledger.record_paid(stake_id, reward, paid)?;
            tracing::debug!(stake_id, %reward, paid, epochs = accruals.len(), "Settled rewards");
        }
        Ok(paid)
    }

    fn rollback(&mut self, journal: Journal) {
        self.claims.rollback(journal.claims);
        for undo in journal.ledger.into_iter().rev() {
            self.ledger.rollback(undo);
        }
        for (reward, epoch) in journal.snapshots {
            match reward {
                RewardAsset::Emission => self.emission.discard(epoch),
                RewardAsset::Revenue(asset) => {
                    if let Some(stream) = self.revenue.get_mut(&asset) {
                        stream.discard(epoch);
                    }
                }
            }
        }
    }

    /// Stage bookkeeping, then run the transfer; undo everything if either fails
    fn transact<T>(
        &mut self,
        stage: impl FnOnce(&mut Self, &mut Journal) -> Result<T>,
        interact: impl FnOnce(&T) -> std::result::Result<(), TransferError>,
    ) -> Result<T> {
        let mut journal = Journal::default();
        let staged = match stage(self, &mut journal) {
            Ok(staged) => staged,
            Err(e) => {
                self.rollback(journal);
                return Err(e);
            }
        };
        if let Err(e) = interact(&staged) {
            tracing::warn!("Transfer failed, operation rolled back: {}", e);
            self.rollback(journal);
            return Err(e.into());
        }
        Ok(staged)
    }
}

/// Epoch-based staking and reward distribution engine
pub struct StakingEngine {
    epochs: EpochClock,
    staking_asset: AssetId,
    config: RwLock<AdminConfig>,
    state: ReentrantMutex<RefCell<EngineState>>,
    bank: Arc<dyn AssetTransfer>,
    clock: Arc<dyn Clock>,
}

impl StakingEngine {
    /// Create an engine.
    ///
    /// `staking_asset` is the protocol asset: it is deposited as principal
    /// and by the emission source, and paid out as principal and emission
    /// rewards.
    pub fn new(
        epochs: EpochClock,
        staking_asset: AssetId,
        config: AdminConfig,
        bank: Arc<dyn AssetTransfer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let mut registry = RevenueAssetRegistry::new();
        let mut revenue = BTreeMap::new();
        for asset in &config.revenue_assets {
            if *asset == staking_asset {
                return Err(StakingError::InvalidConfig(
                    "staking asset cannot be a revenue asset".to_string(),
                ));
            }
            registry.register(*asset)?;
            revenue.insert(*asset, RewardStream::new(RewardAsset::Revenue(*asset)));
        }

        tracing::info!(
            "Staking engine created: genesis {}, staking asset {}, {} revenue assets",
            epochs.genesis(),
            staking_asset,
            registry.len()
        );

        Ok(Self {
            epochs,
            staking_asset,
            config: RwLock::new(config),
            state: ReentrantMutex::new(RefCell::new(EngineState {
                ledger: StakeLedger::new(),
                emission: RewardStream::new(RewardAsset::Emission),
                revenue,
                registry,
                claims: ClaimTracker::new(),
            })),
            bank,
            clock,
        })
    }

    /// Run a mutating operation with the state, a config snapshot and `now`
    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut EngineState, &AdminConfig, Timestamp) -> Result<T>,
    ) -> Result<T> {
        let guard = self.state.lock();
        let mut state = guard
            .try_borrow_mut()
            .map_err(|_| StakingError::Reentrant)?;
        let config = self.config.read().clone();
        let now = self.clock.now();
        op(&mut *state, &config, now)
    }

    /// Run a read-only view with the state and `now`
    fn view<T>(&self, op: impl FnOnce(&EngineState, Timestamp) -> Result<T>) -> Result<T> {
        let guard = self.state.lock();
        let state = guard.try_borrow().map_err(|_| StakingError::Reentrant)?;
        let now = self.clock.now();
        op(&*state, now)
    }

    fn ensure_active(config: &AdminConfig) -> Result<()> {
        if config.paused {
            return Err(StakingError::Paused);
        }
        Ok(())
    }

    fn ensure_admin(config: &AdminConfig, caller: &AccountId) -> Result<()> {
        if !config.is_admin(caller) {
            return Err(StakingError::Unauthorized("administer the engine"));
        }
        Ok(())
    }

    // === Stake lifecycle ===

    /// Lock `amount` of the staking asset for `lock_weeks`
    pub fn open_stake(&self, caller: AccountId, amount: u128, lock_weeks: u32) -> Result<StakeId> {
        let bank = &self.bank;
        let asset = self.staking_asset;
        self.mutate(|state, config, now| {
            Self::ensure_active(config)?;
            let stake_id = state.transact(
                |state, journal| {
                    journal.ledger.push(state.ledger.undo_point_for_open());
                    state.ledger.open(caller, amount, lock_weeks, config, now)
                },
                |_| bank.deposit(&asset, &caller, amount),
            )?;
            tracing::info!(
                stake_id,
                amount,
                lock_weeks,
                "Stake opened by {}",
                hex::encode(caller)
            );
            Ok(stake_id)
        })
    }

    /// Withdraw `amount` of principal (0 = everything).
    ///
    /// Pending emission rewards are settled first and paid together with the
    /// net principal. Revenue rewards stay claimable through
    /// [`Self::claim_revenue`], also after the stake closes.
    pub fn withdraw(&self, caller: AccountId, stake_id: StakeId, amount: u128) -> Result<WithdrawReceipt> {
        let bank = &self.bank;
        let asset = self.staking_asset;
        let epochs = self.epochs;
        self.mutate(|state, config, now| {
            Self::ensure_active(config)?;
            let stake = state.ledger.get_owned(stake_id, &caller)?;
            if !stake.is_open() {
                return Err(StakingError::StakeClosed(stake_id));
            }
            if amount > stake.principal {
                return Err(StakingError::ExceedsPrincipal {
                    requested: amount,
                    principal: stake.principal,
                });
            }

            let receipt = state.transact(
                |state, journal| {
                    let rewards = state.settle_stake(
                        stake_id,
                        RewardAsset::Emission,
                        &epochs,
                        epochs.current_epoch(now),
                        now,
                        journal,
                    )?;
                    journal.ledger.push(state.ledger.undo_point(stake_id));
                    let reduction = state
                        .ledger
                        .reduce(stake_id, &caller, amount, &config.penalty, now)?;
                    receipt_for(stake_id, reduction, rewards)
                },
                |receipt| pay(bank.as_ref(), &asset, &caller, receipt.net + receipt.rewards),
            )?;

            tracing::info!(
                stake_id,
                withdrawn = receipt.withdrawn,
                net = receipt.net,
                penalty = receipt.penalty,
                rewards = receipt.rewards,
                closed = receipt.closed,
                "Stake withdrawn"
            );
            Ok(receipt)
        })
    }

    /// Close the whole stake immediately at the emergency penalty.
    ///
    /// No reward settlement happens; accrued rewards stay claimable.
    pub fn emergency_exit(&self, caller: AccountId, stake_id: StakeId) -> Result<WithdrawReceipt> {
        let bank = &self.bank;
        let asset = self.staking_asset;
        self.mutate(|state, config, now| {
            if !config.emergency_exit_enabled {
                return Err(StakingError::EmergencyExitDisabled);
            }
            let receipt = state.transact(
                |state, journal| {
                    journal.ledger.push(state.ledger.undo_point(stake_id));
                    let reduction = state.ledger.emergency_exit(
                        stake_id,
                        &caller,
                        config.emergency_exit_penalty_bps,
                        now,
                    )?;
                    receipt_for(stake_id, reduction, 0)
                },
                |receipt| pay(bank.as_ref(), &asset, &caller, receipt.net),
            )?;
            tracing::warn!(
                stake_id,
                net = receipt.net,
                penalty = receipt.penalty,
                "Emergency exit"
            );
            Ok(receipt)
        })
    }

    // === Claims ===

    /// Claim unlocked emission rewards of one stake
    pub fn claim_emission(&self, caller: AccountId, stake_id: StakeId) -> Result<u128> {
        self.claim_stake_through(caller, stake_id, RewardAsset::Emission, Epoch::MAX)
    }

    /// Claim unlocked rewards of one stake from one stream, up to `through`.
    ///
    /// Bounding `through` caps the number of epochs visited per call.
    pub fn claim_stake_through(
        &self,
        caller: AccountId,
        stake_id: StakeId,
        reward: RewardAsset,
        through: Epoch,
    ) -> Result<u128> {
        let epochs = self.epochs;
        self.mutate(|state, config, now| {
            Self::ensure_active(config)?;
            if let RewardAsset::Revenue(asset) = reward {
                state.registry.ensure_supported(&asset)?;
            }
            state.ledger.get_owned(stake_id, &caller)?;
            let through = through.min(epochs.current_epoch(now));
            let paid = self.claim_stakes(state, caller, &[stake_id], reward, through, now)?;
            tracing::info!(stake_id, %reward, paid, through, "Rewards claimed");
            Ok(paid)
        })
    }

    /// Claim unlocked emission rewards across every stake of the caller
    pub fn claim_all_emissions(&self, caller: AccountId) -> Result<u128> {
        self.claim_all(caller, RewardAsset::Emission)
    }

    /// Claim unlocked rewards of revenue `asset` across every stake of the caller
    pub fn claim_revenue(&self, caller: AccountId, asset: AssetId) -> Result<u128> {
        self.claim_all(caller, RewardAsset::Revenue(asset))
    }

    fn claim_all(&self, caller: AccountId, reward: RewardAsset) -> Result<u128> {
        let epochs = self.epochs;
        self.mutate(|state, config, now| {
            Self::ensure_active(config)?;
            if let RewardAsset::Revenue(asset) = reward {
                state.registry.ensure_supported(&asset)?;
            }
            let stake_ids: Vec<StakeId> = state
                .ledger
                .stakes_of(&caller)
                .iter()
                .map(|stake| stake.id)
                .collect();
            let through = epochs.current_epoch(now);
            let paid = self.claim_stakes(state, caller, &stake_ids, reward, through, now)?;
            tracing::info!(
                %reward,
                paid,
                stakes = stake_ids.len(),
                "Rewards claimed by {}",
                hex::encode(caller)
            );
            Ok(paid)
        })
    }

    fn claim_stakes(
        &self,
        state: &mut EngineState,
        caller: AccountId,
        stake_ids: &[StakeId],
        reward: RewardAsset,
        through: Epoch,
        now: Timestamp,
    ) -> Result<u128> {
        let epochs = self.epochs;
        let asset = match reward {
            RewardAsset::Emission => self.staking_asset,
            RewardAsset::Revenue(asset) => asset,
        };
        let bank = &self.bank;
        state.transact(
            |state, journal| {
                let mut total = 0u128;
                for &stake_id in stake_ids {
                    let paid = state.settle_stake(stake_id, reward, &epochs, through, now, journal)?;
                    total = total
                        .checked_add(paid)
                        .ok_or(StakingError::Overflow("claim total"))?;
                }
                if total == 0 {
                    return Err(StakingError::NothingToClaim);
                }
                Ok(total)
            },
            |total| bank.withdraw(&asset, &caller, *total),
        )
    }

    // === Reward recording ===

    /// Pull `amount` of the staking asset from the caller (the emission
    /// source) and record it as this epoch's emission reward.
    ///
    /// Emission payouts come only out of funds brought in here, never out of
    /// stakers' principal. Each epoch can be recorded once; a second call in
    /// the same epoch fails with [`StakingError::EpochAlreadyRecorded`] and
    /// moves no funds.
    pub fn record_epoch_emission(&self, caller: AccountId, amount: u128) -> Result<EpochSnapshot> {
        let epochs = self.epochs;
        let bank = &self.bank;
        let asset = self.staking_asset;
        self.mutate(|state, config, now| {
            if !config.can_record_emission(&caller) {
                return Err(StakingError::Unauthorized("record emissions"));
            }
            let snapshot = state.transact(
                |state, journal| {
                    let snapshot = state.emission.record_epoch(
                        amount,
                        &state.ledger.totals(),
                        state.ledger.revision(),
                        &epochs,
                        now,
                    )?;
                    journal.snapshots.push((RewardAsset::Emission, snapshot.epoch));
                    Ok(snapshot)
                },
                |_| bank.deposit(&asset, &caller, amount),
            )?;
            tracing::info!(
                epoch = snapshot.epoch,
                amount,
                weighted_stake = snapshot.total_weighted_stake,
                "Epoch emission recorded"
            );
            Ok(snapshot)
        })
    }

    /// Pull `amount` of revenue `asset` from the caller and record it as this
    /// epoch's revenue for that asset.
    ///
    /// Each asset takes one deposit per epoch. A second deposit of the same
    /// asset in the same epoch fails with
    /// [`StakingError::EpochAlreadyRecorded`] before any funds move; batch
    /// the epoch's revenue into a single call.
    pub fn deposit_revenue(&self, caller: AccountId, asset: AssetId, amount: u128) -> Result<EpochSnapshot> {
        let epochs = self.epochs;
        let bank = &self.bank;
        self.mutate(|state, config, now| {
            if !config.can_deposit_revenue(&caller) {
                return Err(StakingError::Unauthorized("deposit revenue"));
            }
            state.registry.ensure_supported(&asset)?;
            let reward = RewardAsset::Revenue(asset);

            let snapshot = state.transact(
                |state, journal| {
                    let totals = state.ledger.totals();
                    let revision = state.ledger.revision();
                    let stream = state
                        .revenue
                        .get_mut(&asset)
                        .ok_or(StakingError::UnsupportedAsset(asset))?;
                    let snapshot = stream.record_epoch(amount, &totals, revision, &epochs, now)?;
                    journal.snapshots.push((reward, snapshot.epoch));
                    Ok(snapshot)
                },
                |_| bank.deposit(&asset, &caller, amount),
            )?;
            tracing::info!(
                epoch = snapshot.epoch,
                %asset,
                amount,
                weighted_stake = snapshot.total_weighted_stake,
                "Revenue deposited"
            );
            Ok(snapshot)
        })
    }

    // === Administration ===

    /// Whitelist a revenue asset
    pub fn register_revenue_asset(&self, caller: AccountId, asset: AssetId) -> Result<()> {
        let staking_asset = self.staking_asset;
        self.mutate(|state, config, _| {
            Self::ensure_admin(config, &caller)?;
            if asset == staking_asset {
                return Err(StakingError::UnsupportedAsset(asset));
            }
            state.registry.register(asset)?;
            state
                .revenue
                .insert(asset, RewardStream::new(RewardAsset::Revenue(asset)));
            tracing::info!("Revenue asset registered: {}", asset);
            Ok(())
        })
    }

    /// Pause or resume staking and claims
    pub fn set_paused(&self, caller: AccountId, paused: bool) -> Result<()> {
        self.mutate(|_, config, _| {
            Self::ensure_admin(config, &caller)?;
            self.config.write().paused = paused;
            tracing::warn!(paused, "Pause flag changed");
            Ok(())
        })
    }

    /// Switch emergency exit on or off
    pub fn set_emergency_exit(&self, caller: AccountId, enabled: bool) -> Result<()> {
        self.mutate(|_, config, _| {
            Self::ensure_admin(config, &caller)?;
            self.config.write().emergency_exit_enabled = enabled;
            tracing::warn!(enabled, "Emergency exit toggled");
            Ok(())
        })
    }

    /// Replace the configuration.
    ///
    /// Revenue assets listed in the new configuration that are not yet
    /// registered are registered; the whitelist never shrinks.
    pub fn update_config(&self, caller: AccountId, new_config: AdminConfig) -> Result<()> {
        let staking_asset = self.staking_asset;
        self.mutate(|state, config, _| {
            Self::ensure_admin(config, &caller)?;
            new_config.validate()?;
            if new_config.revenue_assets.contains(&staking_asset) {
                return Err(StakingError::InvalidConfig(
                    "staking asset cannot be a revenue asset".to_string(),
                ));
            }
            for asset in &new_config.revenue_assets {
                if !state.registry.contains(asset) {
                    state.registry.register(*asset)?;
                    state
                        .revenue
                        .insert(*asset, RewardStream::new(RewardAsset::Revenue(*asset)));
                }
            }
            *self.config.write() = new_config;
            tracing::info!("Configuration updated");
            Ok(())
        })
    }

    // === Views ===

    /// Epoch clock
    pub fn epochs(&self) -> EpochClock {
        self.epochs
    }

    /// Protocol asset id
    pub fn staking_asset(&self) -> AssetId {
        self.staking_asset
    }

    /// Current epoch
    pub fn current_epoch(&self) -> Epoch {
        self.epochs.current_epoch(self.clock.now())
    }

    /// Current configuration
    pub fn config(&self) -> AdminConfig {
        self.config.read().clone()
    }

    /// Pool totals
    pub fn pool_totals(&self) -> Result<PoolTotals> {
        self.view(|state, _| Ok(state.ledger.totals()))
    }

    /// A stake
    pub fn stake(&self, stake_id: StakeId) -> Result<Stake> {
        self.view(|state, _| state.ledger.get(stake_id).cloned())
    }

    /// Lock status of a stake
    pub fn lock_status(&self, stake_id: StakeId) -> Result<LockStatus> {
        self.view(|state, now| state.ledger.is_locked(stake_id, now))
    }

    /// Claimable emission rewards of a stake
    pub fn pending_emission(&self, stake_id: StakeId) -> Result<u128> {
        self.pending(stake_id, RewardAsset::Emission)
    }

    /// Claimable rewards of a stake in revenue `asset`
    pub fn pending_revenue(&self, stake_id: StakeId, asset: AssetId) -> Result<u128> {
        self.view(|state, now| {
            state.registry.ensure_supported(&asset)?;
            state.pending(stake_id, RewardAsset::Revenue(asset), &self.epochs, now)
        })
    }

    /// Claimable rewards of a stake in any stream
    pub fn pending(&self, stake_id: StakeId, reward: RewardAsset) -> Result<u128> {
        self.view(|state, now| state.pending(stake_id, reward, &self.epochs, now))
    }

    /// Whitelisted revenue assets
    pub fn supported_revenue_assets(&self) -> Result<Vec<AssetId>> {
        self.view(|state, _| Ok(state.registry.assets()))
    }

    /// Snapshot of `epoch` in a stream
    pub fn snapshot(&self, reward: RewardAsset, epoch: Epoch) -> Result<Option<EpochSnapshot>> {
        self.view(|state, _| {
            let stream = stream_of(&state.emission, &state.revenue, reward)?;
            Ok(stream.snapshot(epoch).copied())
        })
    }

    /// Every recorded snapshot of a stream, oldest epoch first
    pub fn snapshots(&self, reward: RewardAsset) -> Result<Vec<EpochSnapshot>> {
        self.view(|state, _| {
            let stream = stream_of(&state.emission, &state.revenue, reward)?;
            Ok(stream.snapshots().copied().collect())
        })
    }

    /// Aggregate principal and pending rewards of `owner`
    pub fn user_summary(&self, owner: AccountId) -> Result<UserSummary> {
        self.view(|state, now| {
            let stakes = state.ledger.stakes_of(&owner);
            let mut summary = UserSummary {
                owner,
                total_principal: 0,
                weighted_stake: 0,
                stake_ids: stakes.iter().map(|s| s.id).collect(),
                pending_emission: 0,
                pending_revenue: state.registry.assets().into_iter().map(|a| (a, 0)).collect(),
            };
            for stake in stakes {
                if stake.is_open() {
                    summary.total_principal += stake.principal;
                    summary.weighted_stake += stake.weighted();
                }
                summary.pending_emission +=
                    state.pending(stake.id, RewardAsset::Emission, &self.epochs, now)?;
                for (asset, pending) in summary.pending_revenue.iter_mut() {
                    *pending +=
                        state.pending(stake.id, RewardAsset::Revenue(*asset), &self.epochs, now)?;
                }
            }
            Ok(summary)
        })
    }

    /// Recompute pool totals from open stakes and compare
    pub fn verify_totals(&self) -> Result<bool> {
        self.view(|state, _| Ok(state.ledger.verify_totals()))
    }
}

fn receipt_for(stake_id: StakeId, reduction: Reduction, rewards: u128) -> Result<WithdrawReceipt> {
    reduction
        .net
        .checked_add(rewards)
        .ok_or(StakingError::Overflow("withdraw payout"))?;
    Ok(WithdrawReceipt {
        stake_id,
        withdrawn: reduction.withdrawn,
        net: reduction.net,
        penalty: reduction.penalty,
        rewards,
        closed: reduction.closed,
    })
}

fn pay(
    bank: &dyn AssetTransfer,
    asset: &AssetId,
    to: &AccountId,
    amount: u128,
) -> std::result::Result<(), TransferError> {
    if amount == 0 {
        return Ok(());
    }
    bank.withdraw(asset, to, amount)
}
