//! Administrative configuration
//!
//! Bounds, curve constants, the emergency-exit switch and privileged
//! identities. The engine clones the current configuration once at the start
//! of every operation, so a concurrent update never changes the rules halfway
//! through a calculation.
//!
//! Loaded from TOML:
//!
//! ```toml
//! min_stake = "1000000000000000000"
//! max_lock_weeks = 52
//! emergency_exit_enabled = false
//! admin = "0101010101010101010101010101010101010101010101010101010101010101"
//!
//! [penalty]
//! max_penalty_bps = 5000
//! reduction_window_weeks = 4
//! ```

use crate::constants::*;
use crate::error::{Result, StakingError};
use crate::math::mul_div;
use crate::penalty::PenaltyCurve;
use crate::types::{AccountId, AssetId};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Lock-duration multiplier curve (fixed point, `MULTIPLIER_BASE` = 1.0×)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiplierCurve {
    /// Multiplier at the minimum lock period
    #[serde(default = "default_base_multiplier")]
    pub base: u32,
    /// Multiplier at the maximum lock period
    #[serde(default = "default_max_multiplier")]
    pub max: u32,
}

fn default_base_multiplier() -> u32 {
    MULTIPLIER_BASE
}

fn default_max_multiplier() -> u32 {
    MAX_MULTIPLIER
}

impl Default for MultiplierCurve {
    fn default() -> Self {
        Self {
            base: default_base_multiplier(),
            max: default_max_multiplier(),
        }
    }
}

impl MultiplierCurve {
    /// Multiplier for a lock of `lock_weeks` within `[min_weeks, max_weeks]`.
    ///
    /// Linear from `base` to `max`, computed in integers and pinned to `max`
    /// at the maximum lock period.
    pub fn multiplier(&self, lock_weeks: u32, min_weeks: u32, max_weeks: u32) -> u32 {
        if lock_weeks >= max_weeks {
            return self.max;
        }
        let span = max_weeks.saturating_sub(min_weeks) as u64;
        if span == 0 {
            return self.max;
        }
        let steps = lock_weeks.saturating_sub(min_weeks) as u64;
        let range = self.max.saturating_sub(self.base) as u64;
        let bonus = (steps * range / span) as u32;
        self.base.saturating_add(bonus).min(self.max)
    }
}

/// Engine configuration owned by the administrator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Smallest accepted deposit (base units)
    #[serde(default = "default_min_stake", with = "amount_string")]
    pub min_stake: u128,

    /// Largest accepted deposit (base units)
    #[serde(default = "default_max_stake", with = "amount_string")]
    pub max_stake: u128,

    /// Shortest lock period
    #[serde(default = "default_min_lock_weeks")]
    pub min_lock_weeks: u32,

    /// Longest lock period
    #[serde(default = "default_max_lock_weeks")]
    pub max_lock_weeks: u32,

    /// Whether emergency exit is allowed
    #[serde(default)]
    pub emergency_exit_enabled: bool,

    /// Flat penalty for emergency exit of a locked stake (basis points)
    #[serde(default = "default_emergency_penalty_bps")]
    pub emergency_exit_penalty_bps: u32,

    /// Reject stake and claim operations while set
    #[serde(default)]
    pub paused: bool,

    /// Administrator
    #[serde(with = "hex_account")]
    pub admin: AccountId,

    /// Accounts allowed to record epoch emissions (besides the admin)
    #[serde(default, with = "hex_accounts")]
    pub emission_operators: Vec<AccountId>,

    /// Accounts allowed to deposit revenue (besides the admin)
    #[serde(default, with = "hex_accounts")]
    pub revenue_depositors: Vec<AccountId>,

    /// Revenue assets whitelisted at start-up
    #[serde(default)]
    pub revenue_assets: Vec<AssetId>,

    /// Lock-duration multiplier
    #[serde(default)]
    pub multiplier: MultiplierCurve,

    /// Early-withdrawal penalty ramp
    #[serde(default)]
    pub penalty: PenaltyCurve,
}

fn default_min_stake() -> u128 {
    DEFAULT_MIN_STAKE
}

fn default_max_stake() -> u128 {
    DEFAULT_MAX_STAKE
}

fn default_min_lock_weeks() -> u32 {
    MIN_LOCK_WEEKS
}

fn default_max_lock_weeks() -> u32 {
    MAX_LOCK_WEEKS
}

fn default_emergency_penalty_bps() -> u32 {
    DEFAULT_EMERGENCY_PENALTY_BPS
}

impl AdminConfig {
    /// Default configuration administered by `admin`
    pub fn new(admin: AccountId) -> Self {
        Self {
            min_stake: default_min_stake(),
            max_stake: default_max_stake(),
            min_lock_weeks: default_min_lock_weeks(),
            max_lock_weeks: default_max_lock_weeks(),
            emergency_exit_enabled: false,
            emergency_exit_penalty_bps: default_emergency_penalty_bps(),
            paused: false,
            admin,
            emission_operators: Vec::new(),
            revenue_depositors: Vec::new(),
            revenue_assets: Vec::new(),
            multiplier: MultiplierCurve::default(),
            penalty: PenaltyCurve::default(),
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| StakingError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| StakingError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| StakingError::InvalidConfig(e.to_string()))
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| -> Result<()> { Err(StakingError::InvalidConfig(msg.to_string())) };

        if self.min_stake == 0 {
            return invalid("min_stake must be non-zero");
        }
        if self.min_stake > self.max_stake {
            return invalid("min_stake exceeds max_stake");
        }
        if self.min_lock_weeks == 0 {
            return invalid("min_lock_weeks must be at least 1");
        }
        if self.min_lock_weeks > self.max_lock_weeks {
            return invalid("min_lock_weeks exceeds max_lock_weeks");
        }
        if self.multiplier.base == 0 || self.multiplier.base > self.multiplier.max {
            return invalid("multiplier base must be non-zero and not exceed max");
        }
        if mul_div(
            self.max_stake,
            self.multiplier.max as u128,
            MULTIPLIER_BASE as u128,
        )
        .is_none()
        {
            return invalid("max_stake at the maximum multiplier overflows the weighted stake");
        }
        if self.penalty.max_penalty_bps > BPS_DENOMINATOR as u32 {
            return invalid("max_penalty_bps exceeds 10000");
        }
        if self.emergency_exit_penalty_bps > BPS_DENOMINATOR as u32 {
            return invalid("emergency_exit_penalty_bps exceeds 10000");
        }
        Ok(())
    }

    /// Validate a deposit amount
    pub fn check_amount(&self, amount: u128) -> Result<()> {
        if amount < self.min_stake || amount > self.max_stake {
            return Err(StakingError::AmountOutOfRange {
                amount,
                min: self.min_stake,
                max: self.max_stake,
            });
        }
        Ok(())
    }

    /// Validate a lock period and return its multiplier
    pub fn multiplier_for(&self, lock_weeks: u32) -> Result<u32> {
        if lock_weeks < self.min_lock_weeks || lock_weeks > self.max_lock_weeks {
            return Err(StakingError::LockOutOfRange {
                weeks: lock_weeks,
                min: self.min_lock_weeks,
                max: self.max_lock_weeks,
            });
        }
        Ok(self
            .multiplier
            .multiplier(lock_weeks, self.min_lock_weeks, self.max_lock_weeks))
    }

    /// Whether `caller` is the administrator
    pub fn is_admin(&self, caller: &AccountId) -> bool {
        self.admin == *caller
    }

    /// Whether `caller` may record emissions
    pub fn can_record_emission(&self, caller: &AccountId) -> bool {
        self.is_admin(caller) || self.emission_operators.contains(caller)
    }

    /// Whether `caller` may deposit revenue
    pub fn can_deposit_revenue(&self, caller: &AccountId) -> bool {
        self.is_admin(caller) || self.revenue_depositors.contains(caller)
    }
}

/// `u128` amounts as decimal strings (TOML integers are 64-bit)
mod amount_string {
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(u64),
    }

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => s.parse().map_err(de::Error::custom),
            Repr::Number(n) => Ok(n as u128),
        }
    }
}

mod hex_account {
    use crate::types::AccountId;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &AccountId, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<AccountId, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(de::Error::custom)
    }

    pub(super) fn parse(s: &str) -> Result<AccountId, hex::FromHexError> {
        let mut id = [0u8; 32];
        hex::decode_to_slice(s, &mut id)?;
        Ok(id)
    }
}

mod hex_accounts {
    use crate::types::AccountId;
    use serde::{de, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        values: &[AccountId],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(values.len()))?;
        for value in values {
            seq.serialize_element(&hex::encode(value))?;
        }
        seq.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<AccountId>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|s| super::hex_account::parse(s).map_err(de::Error::custom))
            .collect()
    }
}
