//! Asset transfer capability
//!
//! The engine never moves balances itself. It asks an [`AssetTransfer`]
//! implementation to pull deposits into the pool and to pay out of it; each
//! call either succeeds completely or fails with a [`TransferError`].
//!
//! [`InMemoryBank`] keeps balances in memory. It backs tests and simulations
//! and can be told to fail transfers of a given asset.

use crate::types::{AccountId, AssetId};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Transfer failures reported by the collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("Insufficient balance of {asset}: need {needed}, available {available}")]
    InsufficientBalance {
        asset: AssetId,
        needed: u128,
        available: u128,
    },

    #[error("Transfer rejected: {0}")]
    Rejected(String),

    #[error("Transfer service unavailable: {0}")]
    Unavailable(String),
}

/// External debit/credit primitive
pub trait AssetTransfer: Send + Sync {
    /// Move `amount` of `asset` from `from` into the pool
    fn deposit(&self, asset: &AssetId, from: &AccountId, amount: u128) -> Result<(), TransferError>;

    /// Move `amount` of `asset` from the pool to `to`
    fn withdraw(&self, asset: &AssetId, to: &AccountId, amount: u128) -> Result<(), TransferError>;
}

#[derive(Debug, Default)]
struct BankState {
    accounts: HashMap<(AssetId, AccountId), u128>,
    pool: HashMap<AssetId, u128>,
    failing: HashSet<AssetId>,
}

/// In-memory balances with a single pool account per asset
#[derive(Debug, Default)]
pub struct InMemoryBank {
    state: Mutex<BankState>,
}

impl InMemoryBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `account` out of thin air
    pub fn mint(&self, asset: AssetId, account: AccountId, amount: u128) {
        let mut state = self.state.lock();
        *state.accounts.entry((asset, account)).or_insert(0) += amount;
    }

    /// Make every transfer of `asset` fail until [`Self::heal`]
    pub fn fail(&self, asset: AssetId) {
        self.state.lock().failing.insert(asset);
    }

    /// Stop failing transfers of `asset`
    pub fn heal(&self, asset: AssetId) {
        self.state.lock().failing.remove(&asset);
    }

    /// Balance of `account`
    pub fn balance(&self, asset: &AssetId, account: &AccountId) -> u128 {
        self.state
            .lock()
            .accounts
            .get(&(*asset, *account))
            .copied()
            .unwrap_or(0)
    }

    /// Balance held by the pool
    pub fn pool_balance(&self, asset: &AssetId) -> u128 {
        self.state.lock().pool.get(asset).copied().unwrap_or(0)
    }
}

impl AssetTransfer for InMemoryBank {
    fn deposit(&self, asset: &AssetId, from: &AccountId, amount: u128) -> Result<(), TransferError> {
        let mut state = self.state.lock();
        if state.failing.contains(asset) {
            return Err(TransferError::Unavailable(format!("deposits of {} disabled", asset)));
        }
        let available = state.accounts.get(&(*asset, *from)).copied().unwrap_or(0);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                asset: *asset,
                needed: amount,
                available,
            });
        }
        state.accounts.insert((*asset, *from), available - amount);
        *state.pool.entry(*asset).or_insert(0) += amount;
        Ok(())
    }

    fn withdraw(&self, asset: &AssetId, to: &AccountId, amount: u128) -> Result<(), TransferError> {
        let mut state = self.state.lock();
        if state.failing.contains(asset) {
            return Err(TransferError::Unavailable(format!("withdrawals of {} disabled", asset)));
        }
        let pool = state.pool.get(asset).copied().unwrap_or(0);
        if pool < amount {
            return Err(TransferError::InsufficientBalance {
                asset: *asset,
                needed: amount,
                available: pool,
            });
        }
        state.pool.insert(*asset, pool - amount);
        *state.accounts.entry((*asset, *to)).or_insert(0) += amount;
        Ok(())
    }
}
