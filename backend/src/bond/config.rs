//! Bond configuration
//!
//! Deserialized from JSON by hosts and the CLI, validated once at
//! construction. A checkpoint remembers the hash of the config it was taken
//! under and refuses to load under a different one.

use crate::bond::engine::BondError;
use crate::models::bond_details::BondDetails;
use crate::models::types::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Largest decimals accepted for the token, the nominal value or a coupon rate
pub const MAX_DECIMALS: u8 = 18;

/// Complete bond configuration
///
/// # Example
/// ```
/// use bond_coupon_engine::BondConfig;
///
/// let config: BondConfig = serde_json::from_str(r#"{
///     "currency": "EUR",
///     "nominal_value": 100,
///     "nominal_value_decimals": 2,
///     "token_decimals": 0,
///     "starting_date": 1000,
///     "maturity_date": 2000
/// }"#).unwrap();
/// assert!(config.validate().is_ok());
/// assert!(!config.is_multi_partition);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BondConfig {
    /// Identifies the bond instance; generated when absent
    #[serde(default = "Uuid::new_v4")]
    pub bond_id: Uuid,

    /// ISO 4217 currency code
    pub currency: String,

    /// Face value per token, scaled by `10^nominal_value_decimals`
    pub nominal_value: u64,

    #[serde(default)]
    pub nominal_value_decimals: u8,

    #[serde(default)]
    pub token_decimals: u8,

    pub starting_date: Timestamp,

    pub maturity_date: Timestamp,

    /// Allow partitions other than the default one
    #[serde(default)]
    pub is_multi_partition: bool,
}

impl BondConfig {
    /// Check the config for internal consistency
    pub fn validate(&self) -> Result<(), BondError> {
        if self.currency.len() != 3 || !self.currency.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(BondError::InvalidConfig(format!(
                "currency must be a 3-letter uppercase code, got {:?}",
                self.currency
            )));
        }
        if self.nominal_value == 0 {
            return Err(BondError::InvalidConfig(
                "nominal_value must be positive".to_string(),
            ));
        }
        if self.nominal_value_decimals > MAX_DECIMALS || self.token_decimals > MAX_DECIMALS {
            return Err(BondError::InvalidConfig(format!(
                "decimals must not exceed {}",
                MAX_DECIMALS
            )));
        }
        if self.starting_date >= self.maturity_date {
            return Err(BondError::InvalidConfig(format!(
                "starting_date {} must precede maturity_date {}",
                self.starting_date, self.maturity_date
            )));
        }
        Ok(())
    }

    /// Initial bond terms described by this config
    pub fn details(&self) -> BondDetails {
        BondDetails::new(
            self.currency.clone(),
            self.nominal_value,
            self.nominal_value_decimals,
            self.token_decimals,
            self.starting_date,
            self.maturity_date,
            self.is_multi_partition,
        )
    }
}
