//! Shared fixtures for engine integration tests

#![allow(dead_code)]

use epochal_staking::{
    AccountId, AdminConfig, AssetId, AssetTransfer, EpochClock, InMemoryBank, ManualClock,
    StakingEngine,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub const ADMIN: AccountId = [9u8; 32];
pub const OPERATOR: AccountId = [8u8; 32];
pub const ALICE: AccountId = [1u8; 32];
pub const BOB: AccountId = [2u8; 32];
pub const CAROL: AccountId = [3u8; 32];

pub const TOKEN: AssetId = AssetId::new([0xAA; 32]);
pub const USDC: AssetId = AssetId::new([0xBB; 32]);
pub const DAI: AssetId = AssetId::new([0xCC; 32]);

pub const DAY: u64 = 24 * 3600;

/// Route engine logs to the test writer; `RUST_LOG=debug` to see them
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Configuration with unit-sized bounds and two revenue assets
pub fn test_config() -> AdminConfig {
    let mut config = AdminConfig::new(ADMIN);
    config.min_stake = 1;
    config.emission_operators = vec![OPERATOR];
    config.revenue_assets = vec![USDC, DAI];
    config
}

pub struct Harness {
    pub engine: Arc<StakingEngine>,
    pub bank: Arc<InMemoryBank>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        let bank = Arc::new(InMemoryBank::new());
        for account in [ALICE, BOB, CAROL] {
            bank.mint(TOKEN, account, 1_000_000_000);
        }
        for source in [ADMIN, OPERATOR] {
            bank.mint(TOKEN, source, 1_000_000_000_000);
        }
        for asset in [USDC, DAI] {
            bank.mint(asset, ADMIN, 1_000_000_000);
        }
        let clock = Arc::new(ManualClock::new(0));
        let transfer: Arc<dyn AssetTransfer> = bank.clone();
        let engine = StakingEngine::new(EpochClock::new(0), TOKEN, test_config(), transfer, clock.clone())
            .expect("valid engine");
        Self {
            engine: Arc::new(engine),
            bank,
            clock,
        }
    }
}
