//! Bond engine
//!
//! Ties the ledger, corporate actions, snapshots and guards together behind
//! one command path, and exposes the coupon queries.

pub mod checkpoint;
pub mod command;
pub mod config;
pub mod engine;

pub use checkpoint::{compute_config_hash, validate_checkpoint, BondCheckpoint};
pub use command::{BondCommand, BondQuery, CommandOutcome, QueryResult};
pub use config::{BondConfig, MAX_DECIMALS};
pub use engine::{Bond, BondError, RegisteredCoupon};
