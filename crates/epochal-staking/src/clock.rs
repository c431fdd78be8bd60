//! # Epoch Clock
//!
//! Maps wall-clock time onto weekly accounting epochs.
//!
//! ```text
//! genesis                genesis + W            genesis + 2W
//!    |--------- epoch 1 -------|-------- epoch 2 -------|---- ...
//! ```
//!
//! Every component of an engine shares one [`EpochClock`], and so one
//! genesis. Time itself comes from a [`Clock`], sampled once per operation.

use crate::constants::WEEK;
use crate::types::{Epoch, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    /// Current UNIX time in seconds
    fn now(&self) -> Timestamp;
}

/// Clock backed by the system time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp().max(0) as Timestamp
    }
}

/// A deterministic clock for testing.
///
/// Time only advances when you tell it to.
#[derive(Debug, Default)]
pub struct ManualClock {
    current: AtomicU64,
}

impl ManualClock {
    pub fn new(initial_secs: Timestamp) -> Self {
        Self {
            current: AtomicU64::new(initial_secs),
        }
    }

    /// Advance time by a number of seconds
    pub fn advance(&self, secs: u64) {
        self.current.fetch_add(secs, Ordering::SeqCst);
    }

    /// Set the time to a specific value
    pub fn set(&self, secs: Timestamp) {
        self.current.store(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.current.load(Ordering::SeqCst)
    }
}

/// Pure mapping between timestamps and epochs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochClock {
    /// Start of epoch 1 (UNIX seconds)
    genesis: Timestamp,
}

impl EpochClock {
    /// Create a clock anchored at `genesis`
    pub fn new(genesis: Timestamp) -> Self {
        Self { genesis }
    }

    /// Clock anchored at midnight UTC of a calendar date
    pub fn from_date(year: i32, month: u32, day: u32) -> Option<Self> {
        let genesis = chrono::NaiveDate::from_ymd_opt(year, month, day)?
            .and_hms_opt(0, 0, 0)?
            .and_utc()
            .timestamp();
        u64::try_from(genesis).ok().map(Self::new)
    }

    /// Genesis timestamp
    pub fn genesis(&self) -> Timestamp {
        self.genesis
    }

    /// Epoch containing `now`. Times before genesis belong to epoch 1.
    pub fn current_epoch(&self, now: Timestamp) -> Epoch {
        now.saturating_sub(self.genesis) / WEEK + 1
    }

    /// Start time of `epoch` (epoch 0 is treated as epoch 1)
    pub fn epoch_start(&self, epoch: Epoch) -> Timestamp {
        self.genesis
            .saturating_add(epoch.saturating_sub(1).saturating_mul(WEEK))
    }

    /// End time of `epoch` (exclusive)
    pub fn epoch_end(&self, epoch: Epoch) -> Timestamp {
        self.epoch_start(epoch).saturating_add(WEEK)
    }

    /// First epoch whose start is at or after `start_time`.
    ///
    /// A stake opened at `start_time` takes part in this epoch and every
    /// later one.
    pub fn first_eligible_epoch(&self, start_time: Timestamp) -> Epoch {
        let epoch = self.current_epoch(start_time);
        if self.epoch_start(epoch) >= start_time {
            epoch
        } else {
            epoch + 1
        }
    }
}
