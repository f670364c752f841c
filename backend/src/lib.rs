//! Bond Coupon Engine
//!
//! Coupon accrual and entitlement for a partitioned bond token: holders'
//! balances at each coupon's record date are frozen in a snapshot, and
//! entitlements are computed from them as exact rationals.
//!
//! # Architecture
//!
//! - **core**: Clock abstraction and time constants
//! - **models**: Domain types (addresses, balances, ledger, corporate actions, events)
//! - **validation**: Coupon date checks
//! - **snapshot**: Record-date snapshot capture
//! - **accrual**: Entitlement arithmetic
//! - **guards**: Pause / control list / KYC / clearing checks run before commands
//! - **bond**: The bond engine, command dispatch and checkpoints
//!
//! # Critical Invariants
//!
//! 1. All amounts are unsigned integers; entitlements are `U256` rationals
//! 2. A snapshot is taken at most once per corporate action
//! 3. Commands apply completely or not at all
//! 4. The maturity date only moves forward

// Module declarations
pub mod accrual;
pub mod bond;
pub mod core;
pub mod guards;
pub mod models;
pub mod snapshot;
pub mod validation;

// Re-exports for convenience
pub use accrual::{AccrualError, CouponAccrualCalculator, CouponAmountFor, CouponFor, Rational};
pub use bond::{
    compute_config_hash, validate_checkpoint, Bond, BondCheckpoint, BondCommand, BondConfig,
    BondError, BondQuery, CommandOutcome, QueryResult, RegisteredCoupon, MAX_DECIMALS,
};
pub use core::time::{Clock, ManualClock, SystemClock, SECONDS_PER_WEEK, SECONDS_PER_YEAR};
pub use guards::{
    ClearingMode, CommandContext, CommandGuard, ControlList, GuardChain, GuardError, KycRegistry,
    Operation, PauseSwitch, RecoveredWallets,
};
pub use models::{
    ActionError, ActionId, ActionKind, ActionType, Address, Amount, BondDetails, BondEvent,
    Clearing, ClearingId, CorporateAction, CorporateActionStore, Coupon, Dividend, EventLog, Hold,
    HoldId, HolderBalance, HolderRegistry, LedgerError, Lock, LockId, ParseIdError, Partition,
    PartitionedBalanceLedger, RateStatus, SnapshotId, Timestamp,
};
pub use primitive_types::U256;
pub use snapshot::{Snapshot, SnapshotEngine};
pub use validation::{validate_coupon_dates, DateError};
