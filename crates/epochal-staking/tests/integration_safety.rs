//! Integration tests for atomicity, isolation and re-entrancy
//!
//! A failed transfer must leave no bookkeeping behind, a transfer callback
//! must not be able to re-enter the engine, and concurrent callers must never
//! be paid more than they are owed.

mod common;

use common::*;
use epochal_staking::constants::WEEK;
use epochal_staking::{
    AccountId, AssetId, AssetTransfer, EpochClock, InMemoryBank, ManualClock, RewardAsset,
    StakingEngine, StakingError, TransferError,
};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

mod rollback_tests {
    use super::*;

    #[test]
    fn test_failed_claim_leaves_no_trace() {
        let h = Harness::new();
        let id = h.engine.open_stake(ALICE, 1_000, 1).unwrap();
        h.engine.record_epoch_emission(ADMIN, 700).unwrap();
        h.clock.set(WEEK);

        h.bank.fail(TOKEN);
        assert!(matches!(
            h.engine.claim_emission(ALICE, id),
            Err(StakingError::Transfer(_))
        ));
        assert_eq!(h.engine.pending_emission(id).unwrap(), 700);
        assert_eq!(
            h.engine.stake(id).unwrap().rewards_paid_for(&RewardAsset::Emission),
            0
        );

        h.bank.heal(TOKEN);
        assert_eq!(h.engine.claim_emission(ALICE, id).unwrap(), 700);
    }

    #[test]
    fn test_failed_withdraw_restores_stake() {
        let h = Harness::new();
        let id = h.engine.open_stake(ALICE, 1_000, 52).unwrap();
        h.engine.record_epoch_emission(ADMIN, 700).unwrap();
        h.clock.set(WEEK);

        let stake = h.engine.stake(id).unwrap();
        let totals = h.engine.pool_totals().unwrap();

        h.bank.fail(TOKEN);
        assert!(h.engine.withdraw(ALICE, id, 0).is_err());
        assert_eq!(h.engine.stake(id).unwrap(), stake);
        assert_eq!(h.engine.pool_totals().unwrap(), totals);
        assert_eq!(h.engine.pending_emission(id).unwrap(), 700);

        h.bank.heal(TOKEN);
        let receipt = h.engine.withdraw(ALICE, id, 0).unwrap();
        assert_eq!(receipt.rewards, 700);
        assert!(h.engine.verify_totals().unwrap());
    }

    #[test]
    fn test_failed_deposit_discards_snapshot() {
        let h = Harness::new();
        h.engine.open_stake(ALICE, 1_000, 1).unwrap();

        h.bank.fail(USDC);
        assert!(h.engine.deposit_revenue(ADMIN, USDC, 500).is_err());
        assert!(h
            .engine
            .snapshot(RewardAsset::Revenue(USDC), 1)
            .unwrap()
            .is_none());

        h.bank.heal(USDC);
        h.engine.deposit_revenue(ADMIN, USDC, 500).unwrap();
        assert_eq!(h.bank.pool_balance(&USDC), 500);
    }

    #[test]
    fn test_failed_emergency_exit_keeps_stake_open() {
        let h = Harness::new();
        let id = h.engine.open_stake(ALICE, 1_000, 52).unwrap();
        h.engine.set_emergency_exit(ADMIN, true).unwrap();

        h.bank.fail(TOKEN);
        assert!(h.engine.emergency_exit(ALICE, id).is_err());
        assert!(h.engine.stake(id).unwrap().is_open());
        assert_eq!(h.engine.pool_totals().unwrap().retained_penalties, 0);
    }
}

mod isolation_tests {
    use super::*;

    #[test]
    fn test_revenue_failure_isolated() {
        let h = Harness::new();
        let id = h.engine.open_stake(ALICE, 1_000, 1).unwrap();
        h.engine.record_epoch_emission(ADMIN, 300).unwrap();
        h.engine.deposit_revenue(ADMIN, USDC, 200).unwrap();
        h.engine.deposit_revenue(ADMIN, DAI, 100).unwrap();
        h.clock.set(WEEK);

        h.bank.fail(DAI);
        assert!(h.engine.claim_revenue(ALICE, DAI).is_err());
        assert_eq!(h.engine.pending_revenue(id, DAI).unwrap(), 100);
        assert_eq!(h.engine.pending_revenue(id, USDC).unwrap(), 200);
        assert_eq!(h.engine.pending_emission(id).unwrap(), 300);

        assert_eq!(h.engine.claim_revenue(ALICE, USDC).unwrap(), 200);
        assert_eq!(h.engine.claim_emission(ALICE, id).unwrap(), 300);
        assert_eq!(h.engine.pending_revenue(id, DAI).unwrap(), 100);

        h.bank.heal(DAI);
        assert_eq!(h.engine.claim_revenue(ALICE, DAI).unwrap(), 100);
    }

    #[test]
    fn test_revenue_operations_leave_other_streams_untouched() {
        let h = Harness::new();
        let id = h.engine.open_stake(ALICE, 1_000, 1).unwrap();
        h.engine.record_epoch_emission(ADMIN, 300).unwrap();
        h.engine.deposit_revenue(ADMIN, DAI, 100).unwrap();
        h.clock.set(WEEK + 1);

        let emission_before = h.engine.pending_emission(id).unwrap();
        let dai_before = h.engine.pending_revenue(id, DAI).unwrap();
        let dai_pool = h.bank.pool_balance(&DAI);

        h.engine.deposit_revenue(ADMIN, USDC, 400).unwrap();
        h.clock.set(3 * WEEK);
        let emission_later = h.engine.pending_emission(id).unwrap();
        assert_eq!(h.engine.claim_revenue(ALICE, USDC).unwrap(), 400);

        assert_eq!(emission_before, 300);
        assert_eq!(h.engine.pending_emission(id).unwrap(), emission_later);
        assert_eq!(h.engine.pending_revenue(id, DAI).unwrap(), dai_before);
        assert_eq!(h.bank.pool_balance(&DAI), dai_pool);
        assert_eq!(h.bank.balance(&TOKEN, &ALICE), 1_000_000_000 - 1_000);
    }
}

mod solvency_tests {
    use super::*;

    #[test]
    fn test_principal_survives_emission_claims() {
        let h = Harness::new();
        let pool_before = h.bank.pool_balance(&TOKEN);
        let alice = h.engine.open_stake(ALICE, 1_000, 1).unwrap();
        let bob = h.engine.open_stake(BOB, 1_000, 1).unwrap();
        h.engine.record_epoch_emission(OPERATOR, 1_500).unwrap();
        assert_eq!(h.bank.pool_balance(&TOKEN), pool_before + 3_500);
        h.clock.set(WEEK);

        assert_eq!(h.engine.claim_emission(ALICE, alice).unwrap(), 750);
        let receipt = h.engine.withdraw(ALICE, alice, 0).unwrap();
        assert_eq!((receipt.net, receipt.rewards), (1_000, 0));

        let receipt = h.engine.withdraw(BOB, bob, 0).unwrap();
        assert_eq!((receipt.net, receipt.rewards), (1_000, 750));
        assert!(receipt.closed);

        assert_eq!(h.bank.pool_balance(&TOKEN), pool_before);
        assert_eq!(h.bank.balance(&TOKEN, &ALICE), 1_000_000_000 + 750);
        assert_eq!(h.bank.balance(&TOKEN, &BOB), 1_000_000_000 + 750);
    }

    #[test]
    fn test_every_stream_claimed_then_every_stake_withdrawn() {
        let h = Harness::new();
        let stakes = [
            (ALICE, h.engine.open_stake(ALICE, 1_000, 4).unwrap()),
            (BOB, h.engine.open_stake(BOB, 3_000, 2).unwrap()),
            (CAROL, h.engine.open_stake(CAROL, 777, 1).unwrap()),
        ];
        let principal = 1_000 + 3_000 + 777;

        h.engine.record_epoch_emission(OPERATOR, 1_000).unwrap();
        h.engine.deposit_revenue(ADMIN, USDC, 400).unwrap();
        h.clock.set(WEEK + DAY);
        h.engine.record_epoch_emission(ADMIN, 2_003).unwrap();
        h.engine.deposit_revenue(ADMIN, DAI, 91).unwrap();
        h.clock.set(2 * WEEK + DAY);
        h.engine.record_epoch_emission(OPERATOR, 50).unwrap();
        let emitted = 1_000 + 2_003 + 50;
        h.clock.set(6 * WEEK);

        let mut paid = 0u128;
        let mut usdc_paid = 0u128;
        let mut dai_paid = 0u128;
        for (owner, _) in stakes {
            paid += h.engine.claim_all_emissions(owner).unwrap();
            usdc_paid += h.engine.claim_revenue(owner, USDC).unwrap();
            dai_paid += h.engine.claim_revenue(owner, DAI).unwrap();
        }
        assert!(paid <= emitted && usdc_paid <= 400 && dai_paid <= 91);

        let mut returned = 0u128;
        for (owner, id) in stakes {
            let receipt = h.engine.withdraw(owner, id, 0).unwrap();
            assert_eq!(receipt.penalty, 0);
            assert_eq!(receipt.rewards, 0);
            assert!(receipt.closed);
            returned += receipt.net;
        }
        assert_eq!(returned, principal);

        // Only rounding dust is left behind
        let dust = emitted - paid;
        assert!(dust < stakes.len() as u128 * 3);
        assert_eq!(h.bank.pool_balance(&TOKEN), dust);
        assert_eq!(h.bank.pool_balance(&USDC), 400 - usdc_paid);
        assert_eq!(h.bank.pool_balance(&DAI), 91 - dai_paid);
        assert_eq!(h.engine.pool_totals().unwrap().total_principal, 0);
    }
}

/// Transfer collaborator that calls back into the engine before paying
struct CallbackBank {
    inner: InMemoryBank,
    engine: Mutex<Weak<StakingEngine>>,
    stake_id: Mutex<u64>,
    observed: Mutex<Vec<StakingError>>,
}

impl CallbackBank {
    fn reenter(&self) {
        let engine = self.engine.lock().upgrade();
        if let Some(engine) = engine {
            let stake_id = *self.stake_id.lock();
            let mut observed = self.observed.lock();
            if let Err(e) = engine.claim_emission(ALICE, stake_id) {
                observed.push(e);
            }
            if let Err(e) = engine.pool_totals() {
                observed.push(e);
            }
        }
    }
}

impl AssetTransfer for CallbackBank {
    fn deposit(&self, asset: &AssetId, from: &AccountId, amount: u128) -> Result<(), TransferError> {
        self.inner.deposit(asset, from, amount)
    }

    fn withdraw(&self, asset: &AssetId, to: &AccountId, amount: u128) -> Result<(), TransferError> {
        self.reenter();
        self.inner.withdraw(asset, to, amount)
    }
}

mod reentrancy_tests {
    use super::*;

    #[test]
    fn test_callback_cannot_reenter() {
        init_tracing();
        let bank = Arc::new(CallbackBank {
            inner: InMemoryBank::new(),
            engine: Mutex::new(Weak::new()),
            stake_id: Mutex::new(0),
            observed: Mutex::new(Vec::new()),
        });
        bank.inner.mint(TOKEN, ALICE, 10_000);
        bank.inner.mint(TOKEN, ADMIN, 10_000);

        let clock = Arc::new(ManualClock::new(0));
        let transfer: Arc<dyn AssetTransfer> = bank.clone();
        let engine = Arc::new(
            StakingEngine::new(EpochClock::new(0), TOKEN, test_config(), transfer, clock.clone())
                .unwrap(),
        );
        *bank.engine.lock() = Arc::downgrade(&engine);

        let id = engine.open_stake(ALICE, 1_000, 1).unwrap();
        *bank.stake_id.lock() = id;
        engine.record_epoch_emission(ADMIN, 700).unwrap();
        clock.set(WEEK);

        assert_eq!(engine.claim_emission(ALICE, id).unwrap(), 700);
        assert_eq!(
            *bank.observed.lock(),
            vec![StakingError::Reentrant, StakingError::Reentrant]
        );
        assert_eq!(bank.inner.balance(&TOKEN, &ALICE), 9_000 + 700);

        // Outside a callback the engine is usable again
        bank.observed.lock().clear();
        *bank.engine.lock() = Weak::new();
        assert!(matches!(
            engine.claim_emission(ALICE, id),
            Err(StakingError::NothingToClaim)
        ));
    }
}

mod concurrency_tests {
    use super::*;

    #[test]
    fn test_concurrent_claims_never_overpay() {
        let h = Harness::new();
        let id = h.engine.open_stake(ALICE, 1_000, 1).unwrap();
        h.engine.record_epoch_emission(ADMIN, 9_999).unwrap();
        h.clock.set(WEEK);

        let paid: Vec<u128> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let engine = h.engine.clone();
                    scope.spawn(move || engine.claim_emission(ALICE, id).unwrap_or(0))
                })
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });

        assert_eq!(paid.iter().sum::<u128>(), 9_999);
        assert_eq!(paid.iter().filter(|amount| **amount > 0).count(), 1);
    }

    #[test]
    fn test_concurrent_stakers_keep_totals() {
        let h = Harness::new();
        std::thread::scope(|scope| {
            for (i, owner) in [ALICE, BOB, CAROL].into_iter().enumerate() {
                let engine = h.engine.clone();
                scope.spawn(move || {
                    for round in 0..20u32 {
                        let id = engine
                            .open_stake(owner, 1_000 + round as u128, 1 + (round + i as u32) % 52)
                            .unwrap();
                        if round % 3 == 0 {
                            engine.withdraw(owner, id, 500).unwrap();
                        }
                    }
                });
            }
        });

        assert!(h.engine.verify_totals().unwrap());
        assert_eq!(h.engine.pool_totals().unwrap().open_stakes, 60);
    }
}
