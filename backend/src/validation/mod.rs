//! Input validation applied before any command mutates state

pub mod dates;

pub use dates::{validate_coupon_dates, DateError};
