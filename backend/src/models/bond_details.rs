//! Bond terms
//!
//! Nominal value, decimals and the current maturity date. The maturity date
//! only ever moves forward.

use crate::models::types::Timestamp;
use serde::{Deserialize, Serialize};

/// Static and slowly-changing terms of the bond
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondDetails {
    /// ISO 4217 currency code, e.g. "EUR"
    pub currency: String,
    /// Nominal (face) value per token, scaled by `10^nominal_value_decimals`
    pub nominal_value: u64,
    pub nominal_value_decimals: u8,
    /// Decimals of the token itself
    pub token_decimals: u8,
    pub starting_date: Timestamp,
    current_maturity_date: Timestamp,
    pub is_multi_partition: bool,
}

impl BondDetails {
    pub fn new(
        currency: String,
        nominal_value: u64,
        nominal_value_decimals: u8,
        token_decimals: u8,
        starting_date: Timestamp,
        maturity_date: Timestamp,
        is_multi_partition: bool,
    ) -> Self {
        Self {
            currency,
            nominal_value,
            nominal_value_decimals,
            token_decimals,
            starting_date,
            current_maturity_date: maturity_date,
            is_multi_partition,
        }
    }

    pub fn maturity_date(&self) -> Timestamp {
        self.current_maturity_date
    }

    /// Move the maturity date forward
    ///
    /// Returns the previous date, or `None` (leaving the details untouched)
    /// if `new_date` is not strictly later than the current one.
    ///
    /// # Example
    /// ```
    /// use bond_coupon_engine::BondDetails;
    ///
    /// let mut details = BondDetails::new("EUR".into(), 100, 0, 2, 0, 1_000, false);
    /// assert_eq!(details.extend_maturity(2_000), Some(1_000));
    /// assert_eq!(details.extend_maturity(2_000), None);
    /// assert_eq!(details.maturity_date(), 2_000);
    /// ```
    pub fn extend_maturity(&mut self, new_date: Timestamp) -> Option<Timestamp> {
        if new_date <= self.current_maturity_date {
            return None;
        }
        let previous = self.current_maturity_date;
        self.current_maturity_date = new_date;
        Some(previous)
    }

    /// Whether the bond has matured at `now` (strictly after maturity)
    pub fn is_matured(&self, now: Timestamp) -> bool {
        now > self.current_maturity_date
    }
}
