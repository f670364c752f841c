//! Domain models for the bond engine

pub mod balance;
pub mod bond_details;
pub mod corporate_action;
pub mod event;
pub mod holders;
pub mod ledger;
pub mod types;

// Re-exports
pub use balance::HolderBalance;
pub use bond_details::BondDetails;
pub use corporate_action::{
    ActionError, ActionId, ActionKind, ActionType, CorporateAction, CorporateActionStore, Coupon,
    Dividend, RateStatus, SnapshotId,
};
pub use event::{BondEvent, EventLog};
pub use holders::HolderRegistry;
pub use ledger::{Clearing, ClearingId, Hold, HoldId, LedgerError, Lock, LockId, PartitionedBalanceLedger};
pub use types::{Address, Amount, ParseIdError, Partition, Timestamp};
