//! # Early-Withdrawal Penalty
//!
//! Withdrawing before a lock expires costs a share of the withdrawn amount.
//! The share ramps linearly to zero over the final weeks of the lock.
//!
//! | Remaining lock | Penalty (defaults) |
//! |----------------|--------------------|
//! | ≥ 4 weeks | 50% |
//! | 3 weeks | 37.5% |
//! | 2 weeks | 25% |
//! | 1 week | 12.5% |
//! | unlocked | 0% |
//!
//! Penalties stay in the pool; they are neither burned nor redistributed.

use crate::constants::{BPS_DENOMINATOR, WEEK};
use crate::math::mul_div;
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

/// Linear penalty ramp
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyCurve {
    /// Penalty while at least `reduction_window_weeks` remain, in basis points
    pub max_penalty_bps: u32,
    /// Weeks over which the penalty ramps down to zero
    pub reduction_window_weeks: u32,
}

impl PenaltyCurve {
    pub fn new(max_penalty_bps: u32, reduction_window_weeks: u32) -> Self {
        Self {
            max_penalty_bps,
            reduction_window_weeks,
        }
    }

    /// Penalty in basis points for `remaining_weeks` of lock left
    pub fn penalty_bps(&self, remaining_weeks: u64) -> u32 {
        if remaining_weeks == 0 {
            return 0;
        }
        let window = self.reduction_window_weeks as u64;
        if window == 0 || remaining_weeks >= window {
            return self.max_penalty_bps;
        }
        (self.max_penalty_bps as u64 * remaining_weeks / window) as u32
    }

    /// Penalty in basis points for a lock ending at `unlock_time`
    pub fn penalty_bps_at(&self, unlock_time: Timestamp, now: Timestamp) -> u32 {
        self.penalty_bps(remaining_weeks(unlock_time, now))
    }

    /// Penalty owed on withdrawing `amount`
    pub fn penalty_amount(&self, amount: u128, unlock_time: Timestamp, now: Timestamp) -> u128 {
        apply_bps(amount, self.penalty_bps_at(unlock_time, now))
    }
}

impl Default for PenaltyCurve {
    fn default() -> Self {
        Self {
            max_penalty_bps: 5_000,
            reduction_window_weeks: 4,
        }
    }
}

/// Whole weeks left until `unlock_time`, rounded up
pub fn remaining_weeks(unlock_time: Timestamp, now: Timestamp) -> u64 {
    unlock_time.saturating_sub(now).div_ceil(WEEK)
}

/// `floor(amount * bps / 10_000)`, capped at `amount`
pub fn apply_bps(amount: u128, bps: u32) -> u128 {
    let bps = (bps as u128).min(BPS_DENOMINATOR);
    mul_div(amount, bps, BPS_DENOMINATOR).unwrap_or(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_penalty_ramp() {
        let curve = PenaltyCurve::new(5_000, 4);
        assert_eq!(curve.penalty_bps(52), 5_000);
        assert_eq!(curve.penalty_bps(4), 5_000);
        assert_eq!(curve.penalty_bps(3), 3_750);
        assert_eq!(curve.penalty_bps(2), 2_500);
        assert_eq!(curve.penalty_bps(1), 1_250);
        assert_eq!(curve.penalty_bps(0), 0);
    }

    #[test]
    fn test_remaining_weeks_rounds_up() {
        assert_eq!(remaining_weeks(WEEK, 0), 1);
        assert_eq!(remaining_weeks(WEEK + 1, 0), 2);
        assert_eq!(remaining_weeks(WEEK, WEEK), 0);
        assert_eq!(remaining_weeks(WEEK, 2 * WEEK), 0);
    }

    #[test]
    fn test_penalty_amount() {
        let curve = PenaltyCurve::default();
        // 10 weeks left: full 50%
        assert_eq!(curve.penalty_amount(1_000, 10 * WEEK, 0), 500);
        // Two weeks left: 25%
        assert_eq!(curve.penalty_amount(1_000, 10 * WEEK, 8 * WEEK), 250);
        // Unlocked
        assert_eq!(curve.penalty_amount(1_000, 10 * WEEK, 10 * WEEK), 0);
    }

    #[test]
    fn test_zero_window_is_flat() {
        let curve = PenaltyCurve::new(1_000, 0);
        assert_eq!(curve.penalty_bps(1), 1_000);
        assert_eq!(curve.penalty_bps(0), 0);
    }

    #[test]
    fn test_apply_bps_caps() {
        assert_eq!(apply_bps(100, 20_000), 100);
        assert_eq!(apply_bps(u128::MAX, 10_000), u128::MAX);
    }
}
