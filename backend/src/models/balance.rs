//! Per-holder, per-partition balance split into encumbrance buckets
//!
//! # Buckets
//!
//! - `free`: unencumbered units (includes any cleared reservation)
//! - `locked`: units locked until an expiration date
//! - `held`: units escrowed under a hold
//! - `frozen`: units frozen by an operator
//! - `cleared`: reservation drawn from `free` by pending clearing
//!   operations; a deduction view, not an additional bucket
//!
//! # Critical Invariants
//!
//! 1. `cleared <= free`
//! 2. total = free + locked + held + frozen (cleared never double-counts)
//! 3. No bucket is ever negative (unsigned, checked arithmetic)

use crate::models::types::Amount;
use serde::{Deserialize, Serialize};

/// Encumbrance buckets for one holder in one partition
///
/// # Example
/// ```
/// use bond_coupon_engine::HolderBalance;
///
/// let balance = HolderBalance { free: 700, locked: 100, held: 100, frozen: 100, cleared: 200 };
/// assert_eq!(balance.total(), 1_000);
/// assert_eq!(balance.available(), 500);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderBalance {
    pub free: Amount,
    pub locked: Amount,
    pub held: Amount,
    pub frozen: Amount,
    pub cleared: Amount,
}

impl HolderBalance {
    /// Economic exposure: every bucket that counts toward entitlement.
    ///
    /// Saturates rather than wrapping; the ledger keeps each partition's
    /// supply within `u64`, so saturation never triggers in practice.
    pub fn total(&self) -> Amount {
        self.free
            .saturating_add(self.locked)
            .saturating_add(self.held)
            .saturating_add(self.frozen)
    }

    /// Freely transferable units (free minus cleared reservations)
    pub fn available(&self) -> Amount {
        self.free.saturating_sub(self.cleared)
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
