//! Coupon accrual and entitlement
//!
//! Entitlements are exact rationals. Nothing here ever produces a float;
//! callers divide only when presenting a figure.
//!
//! # Formula
//!
//! ```text
//! numerator   = token_balance × nominal_value × rate × period
//! denominator = 10^(token_decimals + nominal_value_decimals + rate_decimals)
//!               × SECONDS_PER_YEAR
//! ```
//!
//! Both sides are evaluated in [`U256`] with checked multiplication. Four
//! `u64` factors always fit, and the bond caps every decimals field at 18, so
//! the denominator fits too; overflow would surface as
//! [`AccrualError::ArithmeticOverflow`], never wrap.
//!
//! # Which balance counts
//!
//! - record date not reached: 0 (the amount is the undefined sentinel 0/0)
//! - reached, snapshot taken: the snapshot's total for the holder
//! - reached, no snapshot yet: the live total. No mutating command has run
//!   since the record date (it would have triggered the snapshot), so live
//!   balances still equal the record-date balances.

use crate::core::time::SECONDS_PER_YEAR;
use crate::models::bond_details::BondDetails;
use crate::models::corporate_action::{ActionError, ActionId, CorporateActionStore, Coupon};
use crate::models::ledger::PartitionedBalanceLedger;
use crate::models::types::{Address, Amount, Timestamp};
use crate::snapshot::SnapshotEngine;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while computing entitlements
#[derive(Debug, Error, PartialEq)]
pub enum AccrualError {
    #[error("Wrong index for action: {id}")]
    WrongIndexForAction { id: u64 },

    #[error("Arithmetic overflow computing entitlement")]
    ArithmeticOverflow,
}

impl From<ActionError> for AccrualError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::WrongIndexForAction { id } => AccrualError::WrongIndexForAction { id },
        }
    }
}

/// Exact non-negative rational `numerator / denominator`
///
/// A zero denominator is the "undefined" sentinel. Both sides serialize as
/// 0x-prefixed hex strings.
///
/// # Example
/// ```
/// use bond_coupon_engine::{Rational, U256};
///
/// let a = Rational::new(10, 4);
/// let b = Rational::new(5, 2);
/// assert!(a.same_value(&b));
/// assert_eq!(a.floor(), Some(U256::from(2)));
/// assert!(Rational::UNDEFINED.is_undefined());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rational {
    pub numerator: U256,
    pub denominator: U256,
}

impl Rational {
    pub const UNDEFINED: Rational = Rational {
        numerator: U256::zero(),
        denominator: U256::zero(),
    };

    pub fn new(numerator: impl Into<U256>, denominator: impl Into<U256>) -> Self {
        Self {
            numerator: numerator.into(),
            denominator: denominator.into(),
        }
    }

    pub fn is_undefined(&self) -> bool {
        self.denominator.is_zero()
    }

    /// Integer part, or `None` when undefined
    pub fn floor(&self) -> Option<U256> {
        self.numerator.checked_div(self.denominator)
    }

    /// Lowest terms (undefined stays undefined)
    pub fn reduced(&self) -> Rational {
        if self.is_undefined() {
            return *self;
        }
        let g = gcd(self.numerator, self.denominator);
        Rational::new(self.numerator / g, self.denominator / g)
    }

    /// Exact value equality, independent of representation
    pub fn same_value(&self, other: &Rational) -> bool {
        self.reduced() == other.reduced()
    }
}

fn gcd(mut a: U256, mut b: U256) -> U256 {
    while !b.is_zero() {
        (a, b) = (b, a % b);
    }
    a
}

/// Balance that counts for a coupon, plus the coupon itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponFor {
    pub token_balance: Amount,
    pub record_date_reached: bool,
    pub coupon: Coupon,
}

/// Coupon entitlement as an exact rational
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponAmountFor {
    pub numerator: U256,
    pub denominator: U256,
    pub record_date_reached: bool,
}

impl CouponAmountFor {
    pub fn as_rational(&self) -> Rational {
        Rational::new(self.numerator, self.denominator)
    }
}

/// Read-only view over the bond state that answers entitlement queries
pub struct CouponAccrualCalculator<'a> {
    pub store: &'a CorporateActionStore,
    pub snapshots: &'a SnapshotEngine,
    pub ledger: &'a PartitionedBalanceLedger,
    pub details: &'a BondDetails,
    pub now: Timestamp,
}

impl<'a> CouponAccrualCalculator<'a> {
    fn coupon(&self, action_id: ActionId) -> Result<&'a Coupon, AccrualError> {
        self.store
            .get(action_id)?
            .as_coupon()
            .ok_or(AccrualError::WrongIndexForAction { id: action_id })
    }

    /// Balance of `holder` that counts for coupon `action_id`
    pub fn coupon_for(&self, action_id: ActionId, holder: &Address) -> Result<CouponFor, AccrualError> {
        let action = self.store.get(action_id)?;
        let coupon = action
            .as_coupon()
            .ok_or(AccrualError::WrongIndexForAction { id: action_id })?;

        let record_date_reached = self.now >= coupon.record_date;
        let token_balance = if !record_date_reached {
            0
        } else if let Some(snapshot) = self.snapshots.get(action.snapshot_id) {
            snapshot.balance_of(holder)
        } else {
            self.ledger.total_balance_across(holder)
        };

        Ok(CouponFor {
            token_balance,
            record_date_reached,
            coupon: coupon.clone(),
        })
    }

    /// Exact coupon entitlement of `holder` for coupon `action_id`
    pub fn coupon_amount_for(
        &self,
        action_id: ActionId,
        holder: &Address,
    ) -> Result<CouponAmountFor, AccrualError> {
        let coupon_for = self.coupon_for(action_id, holder)?;
        if !coupon_for.record_date_reached {
            return Ok(CouponAmountFor {
                numerator: U256::zero(),
                denominator: U256::zero(),
                record_date_reached: false,
            });
        }
        let coupon = &coupon_for.coupon;

        let numerator = checked_product(&[
            U256::from(coupon_for.token_balance),
            U256::from(self.details.nominal_value),
            U256::from(coupon.rate),
            U256::from(coupon.period()),
        ])?;
        let decimals = u32::from(self.details.token_decimals)
            + u32::from(self.details.nominal_value_decimals)
            + u32::from(coupon.rate_decimals);
        let denominator = scale(decimals)?
            .checked_mul(U256::from(SECONDS_PER_YEAR))
            .ok_or(AccrualError::ArithmeticOverflow)?;

        Ok(CouponAmountFor {
            numerator,
            denominator,
            record_date_reached: true,
        })
    }

    /// Principal owed to `holder` at nominal value, from live balances
    pub fn principal_for(&self, holder: &Address) -> Result<Rational, AccrualError> {
        let balance = self.ledger.total_balance_across(holder);
        let numerator = checked_product(&[U256::from(balance), U256::from(self.details.nominal_value)])?;
        let decimals =
            u32::from(self.details.token_decimals) + u32::from(self.details.nominal_value_decimals);
        Ok(Rational::new(numerator, scale(decimals)?))
    }

    /// Page of holders entitled to coupon `action_id`
    ///
    /// Snapshot holders once the snapshot exists, current holders otherwise.
    pub fn coupon_holders(&self, action_id: ActionId, start: usize, end: usize) -> Result<Vec<Address>, AccrualError> {
        self.coupon(action_id)?;
        let action = self.store.get(action_id)?;
        Ok(match self.snapshots.get(action.snapshot_id) {
            Some(snapshot) => snapshot.slice_holders(start, end),
            None => self.ledger.registry().slice_all(start, end),
        })
    }

    /// Number of holders entitled to coupon `action_id`
    pub fn total_coupon_holders(&self, action_id: ActionId) -> Result<usize, AccrualError> {
        self.coupon(action_id)?;
        let action = self.store.get(action_id)?;
        Ok(match self.snapshots.get(action.snapshot_id) {
            Some(snapshot) => snapshot.holder_count(),
            None => self.ledger.registry().total_count(),
        })
    }
}

fn checked_product(factors: &[U256]) -> Result<U256, AccrualError> {
    factors
        .iter()
        .try_fold(U256::one(), |acc, factor| acc.checked_mul(*factor))
        .ok_or(AccrualError::ArithmeticOverflow)
}

/// `10^decimals`
fn scale(decimals: u32) -> Result<U256, AccrualError> {
    U256::from(10u8)
        .checked_pow(U256::from(decimals))
        .ok_or(AccrualError::ArithmeticOverflow)
}
