//! Time sources for the bond engine
//!
//! Every date rule (record date reached, fixing date freshness, maturity)
//! is evaluated against an injected [`Clock`]. Production hosts use
//! [`SystemClock`]; tests and scripted scenarios use [`ManualClock`] so time
//! can be moved forward deterministically.

use crate::models::types::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds in a 365-day year, the day-count basis for coupon accrual.
pub const SECONDS_PER_YEAR: u64 = 365 * 24 * 3600;

/// Seconds in one week.
pub const SECONDS_PER_WEEK: u64 = 7 * 24 * 3600;

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current time in seconds since the Unix epoch
    fn now(&self) -> Timestamp;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// Manually advanced clock for deterministic runs
///
/// Clones share the same underlying time, so a test can hand one clone to
/// a bond and keep another to move time.
///
/// # Example
/// ```
/// use bond_coupon_engine::{Clock, ManualClock};
///
/// let clock = ManualClock::new(1_000);
/// let handle = clock.clone();
/// handle.advance(400);
/// assert_eq!(clock.now(), 1_400);
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock frozen at `start`
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Move time forward by `seconds`
    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }

    /// Jump to an absolute time
    ///
    /// # Panics
    /// Panics if `timestamp` is earlier than the current time; the engine
    /// assumes time never runs backwards. The clock keeps its current time.
    pub fn set(&self, timestamp: Timestamp) {
        let previous = self.now.fetch_max(timestamp, Ordering::SeqCst);
        assert!(
            timestamp >= previous,
            "clock cannot move backwards ({} -> {})",
            previous,
            timestamp
        );
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "clock cannot move backwards")]
    fn test_manual_clock_rejects_going_backwards() {
        let clock = ManualClock::new(100);
        clock.set(99);
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.now() > 1_577_836_800);
    }
}
