//! Coupon date validation
//!
//! A coupon carries five dates. Before it is accepted they must be in
//! chronological order and must not already lie in the past:
//!
//! ```text
//! record_date  <  execution_date
//! fixing_date  <= execution_date
//! start_date   <= end_date            (a zero-length period is allowed)
//! fixing_date  >= now
//! record_date  >= now
//! ```
//!
//! Ordering violations are reported as `WrongDates`, freshness violations as
//! `WrongTimestamp`. Ordering is checked first.

use crate::models::corporate_action::Coupon;
use crate::models::types::Timestamp;
use thiserror::Error;

/// Reasons a coupon's dates are rejected
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum DateError {
    #[error("Wrong dates: coupon dates are not in chronological order")]
    WrongDates,

    #[error("Wrong timestamp: coupon date lies in the past")]
    WrongTimestamp,
}

/// Validate a coupon's dates against `now`
///
/// Pure function of its inputs.
///
/// # Example
/// ```
/// use bond_coupon_engine::{validate_coupon_dates, Coupon, DateError, RateStatus};
///
/// let coupon = Coupon {
///     record_date: 1_400,
///     execution_date: 2_000,
///     start_date: 500,
///     end_date: 400, // ends before it starts
///     fixing_date: 2_000,
///     rate: 50,
///     rate_decimals: 1,
///     rate_status: RateStatus::Set,
/// };
/// assert_eq!(validate_coupon_dates(&coupon, 1_000), Err(DateError::WrongDates));
/// ```
pub fn validate_coupon_dates(coupon: &Coupon, now: Timestamp) -> Result<(), DateError> {
    if coupon.record_date >= coupon.execution_date {
        return Err(DateError::WrongDates);
    }
    if coupon.fixing_date > coupon.execution_date {
        return Err(DateError::WrongDates);
    }
    if coupon.start_date > coupon.end_date {
        return Err(DateError::WrongDates);
    }
    if coupon.fixing_date < now {
        return Err(DateError::WrongTimestamp);
    }
    if coupon.record_date < now {
        return Err(DateError::WrongTimestamp);
    }
    Ok(())
}
