//! # Linear Unlock
//!
//! An epoch's reward becomes claimable continuously across the epoch:
//!
//! ```text
//! claimable
//!   100% |                 ________
//!        |               /
//!        |             /
//!        |           /
//!     0% |_________/
//!        +---------|-------|------> time
//!              start   start + W
//! ```

use crate::constants::WEEK;
use crate::math::mul_div;
use crate::types::Timestamp;

/// Amount of `total` unlocked at `now` for an epoch starting at `epoch_start`.
///
/// Zero until the epoch starts, `floor(total * elapsed / WEEK)` during it,
/// and exactly `total` from `epoch_start + WEEK` onward. Never exceeds
/// `total`, whatever the clock says.
pub fn unlocked_amount(epoch_start: Timestamp, now: Timestamp, total: u128) -> u128 {
    if now >= epoch_start.saturating_add(WEEK) {
        return total;
    }
    if now <= epoch_start {
        return 0;
    }
    let elapsed = (now - epoch_start) as u128;
    // elapsed < WEEK, so the quotient is below `total` and always fits
    mul_div(total, elapsed, WEEK as u128)
        .unwrap_or(total)
        .min(total)
}
