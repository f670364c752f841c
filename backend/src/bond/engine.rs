//! Bond Engine
//!
//! Owns every component of a bond (terms, ledger, corporate actions,
//! snapshots, events) and serializes all state changes through one path:
//!
//! ```text
//! For each command:
//! 1. Validate inputs (zero address, partition mode, ids)
//! 2. Run the guard chain (pause, control list, KYC, ...)
//! 3. Capture snapshots for every record date that has come due
//! 4. Apply the command (may still fail → captures are discarded)
//! 5. Commit captures, then log snapshot and command events
//! ```
//!
//! Queries never mutate. Between a record date and the next command they
//! read live balances, which at that point still equal the record-date
//! balances.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use bond_coupon_engine::{Address, Bond, BondConfig, Coupon, ManualClock, Partition, RateStatus};
//!
//! let clock = ManualClock::new(1_000);
//! let config: BondConfig = serde_json::from_str(r#"{
//!     "currency": "EUR", "nominal_value": 100, "starting_date": 0, "maturity_date": 100000
//! }"#).unwrap();
//! let mut bond = Bond::new(config, Arc::new(clock.clone())).unwrap();
//!
//! let holder = Address::from_low_u64(1);
//! bond.issue(holder, Partition::DEFAULT, 1_000).unwrap();
//! let coupon_id = bond.set_coupon(Coupon {
//!     record_date: 1_400,
//!     execution_date: 2_200,
//!     start_date: 1_000,
//!     end_date: 2_000,
//!     fixing_date: 2_200,
//!     rate: 50,
//!     rate_decimals: 1,
//!     rate_status: RateStatus::Set,
//! }).unwrap();
//!
//! clock.advance(500);
//! let entitlement = bond.get_coupon_for(coupon_id, &holder).unwrap();
//! assert!(entitlement.record_date_reached);
//! assert_eq!(entitlement.token_balance, 1_000);
//! ```

use crate::accrual::{AccrualError, CouponAccrualCalculator, CouponAmountFor, CouponFor, Rational};
use crate::bond::config::{BondConfig, MAX_DECIMALS};
use crate::core::time::Clock;
use crate::guards::{CommandContext, CommandGuard, GuardChain, GuardError, Operation};
use crate::models::balance::HolderBalance;
use crate::models::bond_details::BondDetails;
use crate::models::corporate_action::{
    ActionError, ActionId, ActionKind, ActionType, CorporateActionStore, Coupon, SnapshotId,
};
use crate::models::event::{BondEvent, EventLog};
use crate::models::ledger::{ClearingId, HoldId, LedgerError, LockId, PartitionedBalanceLedger};
use crate::models::types::{Address, Amount, Partition, Timestamp};
use crate::snapshot::{Snapshot, SnapshotEngine};
use crate::validation::{validate_coupon_dates, DateError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// Errors
// ============================================================================

/// Errors returned by bond commands and queries
#[derive(Debug, Error, PartialEq)]
pub enum BondError {
    #[error(transparent)]
    Dates(#[from] DateError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error("Zero address not allowed")]
    ZeroAddressNotAllowed,

    #[error("Partition {0} not allowed in single partition mode")]
    PartitionNotAllowedInSinglePartitionMode(Partition),

    #[error("Bond maturity date wrong: maturity {maturity_date}, requested {requested}")]
    BondMaturityDateWrong {
        maturity_date: Timestamp,
        requested: Timestamp,
    },

    #[error("Rate decimals {rate_decimals} exceed the maximum of {max}")]
    RateDecimalsOutOfRange { rate_decimals: u8, max: u8 },

    #[error("Arithmetic overflow computing entitlement")]
    ArithmeticOverflow,

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("State validation error: {0}")]
    StateValidationError(String),
}

impl From<AccrualError> for BondError {
    fn from(err: AccrualError) -> Self {
        match err {
            AccrualError::WrongIndexForAction { id } => {
                BondError::Action(ActionError::WrongIndexForAction { id })
            }
            AccrualError::ArithmeticOverflow => BondError::ArithmeticOverflow,
        }
    }
}

/// Coupon as stored, with its bookkeeping ids
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredCoupon {
    pub coupon_id: u64,
    pub action_id: ActionId,
    pub coupon: Coupon,
    /// 0 until the record-date snapshot is taken
    pub snapshot_id: SnapshotId,
}

// ============================================================================
// Bond
// ============================================================================

/// A single bond instance
pub struct Bond {
    config: BondConfig,
    details: BondDetails,
    ledger: PartitionedBalanceLedger,
    actions: CorporateActionStore,
    snapshots: SnapshotEngine,
    events: EventLog,
    guards: GuardChain,
    /// Account attributed to subsequent commands, seen by guards
    operator: Option<Address>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Bond {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bond")
            .field("bond_id", &self.config.bond_id)
            .field("details", &self.details)
            .field("actions", &self.actions.count())
            .field("snapshots", &self.snapshots.count())
            .field("guards", &self.guards)
            .finish()
    }
}

impl Bond {
    /// Create a bond from a validated config
    ///
    /// # Errors
    /// `InvalidConfig` if [`BondConfig::validate`] fails
    pub fn new(config: BondConfig, clock: Arc<dyn Clock>) -> Result<Self, BondError> {
        config.validate()?;
        info!(bond_id = %config.bond_id, currency = %config.currency, "Bond created");
        Ok(Self {
            details: config.details(),
            config,
            ledger: PartitionedBalanceLedger::new(),
            actions: CorporateActionStore::new(),
            snapshots: SnapshotEngine::new(),
            events: EventLog::new(),
            guards: GuardChain::new(),
            operator: None,
            clock,
        })
    }

    /// Reassemble a bond from restored parts (checkpoint loading)
    pub(crate) fn from_parts(
        config: BondConfig,
        details: BondDetails,
        ledger: PartitionedBalanceLedger,
        actions: CorporateActionStore,
        mut snapshots: SnapshotEngine,
        events: EventLog,
        clock: Arc<dyn Clock>,
    ) -> Self {
        snapshots.rebuild_pending(&actions);
        Self {
            config,
            details,
            ledger,
            actions,
            snapshots,
            events,
            guards: GuardChain::new(),
            operator: None,
            clock,
        }
    }

    /// Append a guard to the chain run before every command
    pub fn add_guard(&mut self, guard: impl CommandGuard + 'static) {
        self.guards.push(guard);
    }

    /// Builder form of [`Bond::add_guard`]
    pub fn with_guard(mut self, guard: impl CommandGuard + 'static) -> Self {
        self.add_guard(guard);
        self
    }

    /// Attribute subsequent commands to `operator` (`None` clears it)
    pub fn set_operator(&mut self, operator: Option<Address>) {
        self.operator = operator;
    }

    // =========================================================================
    // Command path
    // =========================================================================

    /// Run one command through guards, snapshot capture, apply and commit
    fn run<T>(
        &mut self,
        mut ctx: CommandContext,
        apply: impl FnOnce(&mut Self, Timestamp, &mut Vec<BondEvent>) -> Result<T, BondError>,
    ) -> Result<T, BondError> {
        let now = self.clock.now();
        if ctx.operator.is_none() {
            ctx.operator = self.operator;
        }
        if let Err(err) = self.guards.check(&ctx) {
            warn!(operation = %ctx.operation, error = %err, "Command rejected by guard");
            return Err(err.into());
        }

        let captures = self.snapshots.capture_due(now, &self.actions, &self.ledger);
        let mut emitted = Vec::new();
        let value = match apply(self, now, &mut emitted) {
            Ok(value) => value,
            Err(err) => {
                warn!(operation = %ctx.operation, error = %err, "Command rejected");
                return Err(err);
            }
        };

        for committed in self.snapshots.commit(captures, &mut self.actions) {
            self.events.log(BondEvent::SnapshotTaken {
                timestamp: now,
                snapshot_id: committed.snapshot_id,
                action_id: committed.action_id,
                holders: committed.holders,
            });
        }
        for event in emitted {
            self.events.log(event);
        }
        debug!(operation = %ctx.operation, now, "Command applied");
        Ok(value)
    }

    fn ensure_holder(address: &Address) -> Result<(), BondError> {
        if address.is_zero() {
            return Err(BondError::ZeroAddressNotAllowed);
        }
        Ok(())
    }

    fn ensure_partition(&self, partition: &Partition) -> Result<(), BondError> {
        if !self.details.is_multi_partition && !partition.is_default() {
            return Err(BondError::PartitionNotAllowedInSinglePartitionMode(*partition));
        }
        Ok(())
    }

    fn ensure_matured(&self, now: Timestamp) -> Result<(), BondError> {
        if !self.details.is_matured(now) {
            return Err(BondError::BondMaturityDateWrong {
                maturity_date: self.details.maturity_date(),
                requested: now,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Coupons and maturity
    // =========================================================================

    /// Validate and register a new coupon; returns its coupon id (1-based)
    ///
    /// # Errors
    /// - `WrongDates` if the dates are out of order
    /// - `WrongTimestamp` if the record or fixing date lies in the past
    /// - `RateDecimalsOutOfRange` if `rate_decimals` exceeds [`MAX_DECIMALS`]
    pub fn set_coupon(&mut self, coupon: Coupon) -> Result<u64, BondError> {
        self.run(CommandContext::new(Operation::SetCoupon), |bond, now, events| {
            validate_coupon_dates(&coupon, now)?;
            if coupon.rate_decimals > MAX_DECIMALS {
                return Err(BondError::RateDecimalsOutOfRange {
                    rate_decimals: coupon.rate_decimals,
                    max: MAX_DECIMALS,
                });
            }
            let record_date = coupon.record_date;
            let execution_date = coupon.execution_date;
            let action_id = bond.actions.append(ActionKind::Coupon(coupon));
            bond.snapshots.schedule(action_id, record_date);
            let coupon_id = bond.actions.count_of(ActionType::Coupon) as u64;
            info!(coupon_id, action_id, record_date, "Coupon set");
            events.push(BondEvent::CouponSet {
                timestamp: now,
                coupon_id,
                action_id,
                record_date,
                execution_date,
            });
            Ok(coupon_id)
        })
    }

    /// Move the maturity date strictly forward; returns the previous date
    pub fn update_maturity_date(&mut self, new_date: Timestamp) -> Result<Timestamp, BondError> {
        self.run(
            CommandContext::new(Operation::UpdateMaturityDate),
            |bond, now, events| {
                let current = bond.details.maturity_date();
                let previous = bond
                    .details
                    .extend_maturity(new_date)
                    .ok_or(BondError::BondMaturityDateWrong {
                        maturity_date: current,
                        requested: new_date,
                    })?;
                info!(previous, new = new_date, "Maturity date updated");
                events.push(BondEvent::MaturityDateUpdated {
                    timestamp: now,
                    previous,
                    new: new_date,
                });
                Ok(previous)
            },
        )
    }

    /// Redeem `amount` of `holder`'s units in `partition` after maturity
    ///
    /// A zero amount succeeds without touching any balance.
    pub fn redeem_at_maturity_by_partition(
        &mut self,
        holder: Address,
        partition: Partition,
        amount: Amount,
    ) -> Result<(), BondError> {
        Self::ensure_holder(&holder)?;
        self.ensure_partition(&partition)?;
        let ctx = CommandContext::new(Operation::RedeemAtMaturity)
            .with_accounts([holder])
            .with_partition(partition);
        self.run(ctx, |bond, now, events| {
            bond.ensure_matured(now)?;
            if amount == 0 {
                return Ok(());
            }
            bond.ledger.redeem(holder, partition, amount)?;
            info!(%holder, %partition, amount, "Redeemed at maturity");
            events.push(BondEvent::RedeemedAtMaturity {
                timestamp: now,
                holder,
                partition,
                amount,
            });
            Ok(())
        })
    }

    /// Redeem every available unit `holder` has, partition by partition
    ///
    /// Returns the redeemed amount per partition; partitions with nothing
    /// available are skipped, so a zero-balance holder gets an empty result.
    pub fn full_redeem_at_maturity(&mut self, holder: Address) -> Result<Vec<(Partition, Amount)>, BondError> {
        Self::ensure_holder(&holder)?;
        let ctx = CommandContext::new(Operation::RedeemAtMaturity).with_accounts([holder]);
        self.run(ctx, |bond, now, events| {
            bond.ensure_matured(now)?;
            let plan: Vec<(Partition, Amount)> = bond
                .ledger
                .partitions_of(&holder)
                .into_iter()
                .map(|partition| (partition, bond.ledger.balance_of(&holder, &partition).available()))
                .filter(|(_, amount)| *amount > 0)
                .collect();

            for (partition, amount) in &plan {
                bond.ledger.redeem(holder, *partition, *amount)?;
                events.push(BondEvent::RedeemedAtMaturity {
                    timestamp: now,
                    holder,
                    partition: *partition,
                    amount: *amount,
                });
            }
            info!(%holder, partitions = plan.len(), "Fully redeemed at maturity");
            Ok(plan)
        })
    }

    // =========================================================================
    // Ledger commands
    // =========================================================================

    /// Mint `amount` units to `to`
    ///
    /// Zero amounts, here and in [`Bond::transfer`] and [`Bond::redeem`],
    /// succeed without an event.
    pub fn issue(&mut self, to: Address, partition: Partition, amount: Amount) -> Result<(), BondError> {
        Self::ensure_holder(&to)?;
        self.ensure_partition(&partition)?;
        let ctx = CommandContext::new(Operation::Issue)
            .with_accounts([to])
            .with_partition(partition);
        self.run(ctx, |bond, now, events| {
            bond.ledger.issue(to, partition, amount)?;
            if amount == 0 {
                return Ok(());
            }
            events.push(BondEvent::Issued {
                timestamp: now,
                holder: to,
                partition,
                amount,
            });
            Ok(())
        })
    }

    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        partition: Partition,
        amount: Amount,
    ) -> Result<(), BondError> {
        Self::ensure_holder(&from)?;
        Self::ensure_holder(&to)?;
        self.ensure_partition(&partition)?;
        let ctx = CommandContext::new(Operation::Transfer)
            .with_accounts([from, to])
            .with_partition(partition);
        self.run(ctx, |bond, now, events| {
            bond.ledger.transfer(from, to, partition, amount)?;
            if amount == 0 {
                return Ok(());
            }
            events.push(BondEvent::Transferred {
                timestamp: now,
                from,
                to,
                partition,
                amount,
            });
            Ok(())
        })
    }

    pub fn redeem(&mut self, from: Address, partition: Partition, amount: Amount) -> Result<(), BondError> {
        Self::ensure_holder(&from)?;
        self.ensure_partition(&partition)?;
        let ctx = CommandContext::new(Operation::Redeem)
            .with_accounts([from])
            .with_partition(partition);
        self.run(ctx, |bond, now, events| {
            bond.ledger.redeem(from, partition, amount)?;
            if amount == 0 {
                return Ok(());
            }
            events.push(BondEvent::Redeemed {
                timestamp: now,
                holder: from,
                partition,
                amount,
            });
            Ok(())
        })
    }

    pub fn lock(
        &mut self,
        holder: Address,
        partition: Partition,
        amount: Amount,
        expiration: Timestamp,
    ) -> Result<LockId, BondError> {
        Self::ensure_holder(&holder)?;
        self.ensure_partition(&partition)?;
        let ctx = CommandContext::new(Operation::Lock)
            .with_accounts([holder])
            .with_partition(partition);
        self.run(ctx, |bond, now, events| {
            let lock_id = bond.ledger.lock(holder, partition, amount, expiration)?;
            events.push(BondEvent::Locked {
                timestamp: now,
                lock_id,
                holder,
                partition,
                amount,
                expiration,
            });
            Ok(lock_id)
        })
    }

    /// Release an expired lock back to the holder's free bucket
    pub fn release_lock(&mut self, lock_id: LockId) -> Result<(), BondError> {
        let lock = self
            .ledger
            .lock_record(lock_id)
            .ok_or(LedgerError::LockNotFound(lock_id))?;
        let ctx = CommandContext::new(Operation::ReleaseLock)
            .with_accounts([lock.holder])
            .with_partition(lock.partition);
        self.run(ctx, |bond, now, events| {
            let lock = bond.ledger.release_lock(lock_id, now)?;
            events.push(BondEvent::LockReleased {
                timestamp: now,
                lock_id,
                holder: lock.holder,
                partition: lock.partition,
                amount: lock.amount,
            });
            Ok(())
        })
    }

    pub fn create_hold(
        &mut self,
        holder: Address,
        partition: Partition,
        amount: Amount,
        escrow: Address,
        to: Option<Address>,
        expiration: Timestamp,
    ) -> Result<HoldId, BondError> {
        Self::ensure_holder(&holder)?;
        Self::ensure_holder(&escrow)?;
        if let Some(to) = &to {
            Self::ensure_holder(to)?;
        }
        self.ensure_partition(&partition)?;
        let ctx = CommandContext::new(Operation::CreateHold)
            .with_accounts([holder])
            .with_partition(partition);
        self.run(ctx, |bond, now, events| {
            let hold_id = bond
                .ledger
                .create_hold(holder, partition, amount, escrow, to, expiration)?;
            events.push(BondEvent::HoldCreated {
                timestamp: now,
                hold_id,
                holder,
                partition,
                amount,
                escrow,
            });
            Ok(hold_id)
        })
    }

    /// Pay `amount` of a hold out to `to`
    pub fn execute_hold(&mut self, hold_id: HoldId, to: Address, amount: Amount) -> Result<(), BondError> {
        Self::ensure_holder(&to)?;
        let hold = self
            .ledger
            .hold_record(hold_id)
            .ok_or(LedgerError::HoldNotFound(hold_id))?;
        let (holder, partition) = (hold.holder, hold.partition);
        let ctx = CommandContext::new(Operation::ExecuteHold)
            .with_accounts([holder, to])
            .with_partition(partition);
        self.run(ctx, |bond, now, events| {
            bond.ledger.execute_hold(hold_id, to, amount, now)?;
            events.push(BondEvent::HoldExecuted {
                timestamp: now,
                hold_id,
                holder,
                to,
                partition,
                amount,
            });
            Ok(())
        })
    }

    /// Return `amount` of a hold to its holder
    pub fn release_hold(&mut self, hold_id: HoldId, amount: Amount) -> Result<(), BondError> {
        let hold = self
            .ledger
            .hold_record(hold_id)
            .ok_or(LedgerError::HoldNotFound(hold_id))?;
        let (holder, partition) = (hold.holder, hold.partition);
        let ctx = CommandContext::new(Operation::ReleaseHold)
            .with_accounts([holder])
            .with_partition(partition);
        self.run(ctx, |bond, now, events| {
            bond.ledger.release_hold(hold_id, amount)?;
            events.push(BondEvent::HoldReleased {
                timestamp: now,
                hold_id,
                holder,
                partition,
                amount,
            });
            Ok(())
        })
    }

    pub fn freeze(&mut self, holder: Address, partition: Partition, amount: Amount) -> Result<(), BondError> {
        Self::ensure_holder(&holder)?;
        self.ensure_partition(&partition)?;
        let ctx = CommandContext::new(Operation::Freeze)
            .with_accounts([holder])
            .with_partition(partition);
        self.run(ctx, |bond, now, events| {
            bond.ledger.freeze(holder, partition, amount)?;
            events.push(BondEvent::Frozen {
                timestamp: now,
                holder,
                partition,
                amount,
            });
            Ok(())
        })
    }

    pub fn unfreeze(&mut self, holder: Address, partition: Partition, amount: Amount) -> Result<(), BondError> {
        Self::ensure_holder(&holder)?;
        self.ensure_partition(&partition)?;
        let ctx = CommandContext::new(Operation::Unfreeze)
            .with_accounts([holder])
            .with_partition(partition);
        self.run(ctx, |bond, now, events| {
            bond.ledger.unfreeze(holder, partition, amount)?;
            events.push(BondEvent::Unfrozen {
                timestamp: now,
                holder,
                partition,
                amount,
            });
            Ok(())
        })
    }

    pub fn create_clearing(
        &mut self,
        from: Address,
        to: Address,
        partition: Partition,
        amount: Amount,
        expiration: Timestamp,
    ) -> Result<ClearingId, BondError> {
        Self::ensure_holder(&from)?;
        Self::ensure_holder(&to)?;
        self.ensure_partition(&partition)?;
        let ctx = CommandContext::new(Operation::CreateClearing)
            .with_accounts([from, to])
            .with_partition(partition);
        self.run(ctx, |bond, now, events| {
            let clearing_id = bond
                .ledger
                .create_clearing(from, to, partition, amount, expiration)?;
            events.push(BondEvent::ClearingCreated {
                timestamp: now,
                clearing_id,
                from,
                to,
                partition,
                amount,
            });
            Ok(clearing_id)
        })
    }

    pub fn approve_clearing(&mut self, clearing_id: ClearingId) -> Result<(), BondError> {
        let clearing = self
            .ledger
            .clearing_record(clearing_id)
            .ok_or(LedgerError::ClearingNotFound(clearing_id))?;
        let ctx = CommandContext::new(Operation::ApproveClearing)
            .with_accounts([clearing.from, clearing.to])
            .with_partition(clearing.partition);
        self.run(ctx, |bond, now, events| {
            let clearing = bond.ledger.approve_clearing(clearing_id, now)?;
            events.push(BondEvent::ClearingApproved {
                timestamp: now,
                clearing_id,
                from: clearing.from,
                to: clearing.to,
                partition: clearing.partition,
                amount: clearing.amount,
            });
            Ok(())
        })
    }

    pub fn cancel_clearing(&mut self, clearing_id: ClearingId) -> Result<(), BondError> {
        let clearing = self
            .ledger
            .clearing_record(clearing_id)
            .ok_or(LedgerError::ClearingNotFound(clearing_id))?;
        let ctx = CommandContext::new(Operation::CancelClearing)
            .with_accounts([clearing.from])
            .with_partition(clearing.partition);
        self.run(ctx, |bond, now, events| {
            let clearing = bond.ledger.cancel_clearing(clearing_id)?;
            events.push(BondEvent::ClearingCancelled {
                timestamp: now,
                clearing_id,
                from: clearing.from,
                partition: clearing.partition,
                amount: clearing.amount,
            });
            Ok(())
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    fn calculator(&self) -> CouponAccrualCalculator<'_> {
        CouponAccrualCalculator {
            store: &self.actions,
            snapshots: &self.snapshots,
            ledger: &self.ledger,
            details: &self.details,
            now: self.clock.now(),
        }
    }

    fn coupon_action_id(&self, coupon_id: u64) -> Result<ActionId, BondError> {
        Ok(self.actions.id_by_kind_index(ActionType::Coupon, coupon_id)?)
    }

    /// Coupon `coupon_id` (1-based) with its snapshot id
    pub fn get_coupon(&self, coupon_id: u64) -> Result<RegisteredCoupon, BondError> {
        let action_id = self.coupon_action_id(coupon_id)?;
        let action = self.actions.get(action_id)?;
        let coupon = action
            .as_coupon()
            .ok_or(ActionError::WrongIndexForAction { id: coupon_id })?;
        Ok(RegisteredCoupon {
            coupon_id,
            action_id,
            coupon: coupon.clone(),
            snapshot_id: action.snapshot_id,
        })
    }

    pub fn get_coupon_for(&self, coupon_id: u64, holder: &Address) -> Result<CouponFor, BondError> {
        let action_id = self.coupon_action_id(coupon_id)?;
        Ok(self.calculator().coupon_for(action_id, holder)?)
    }

    pub fn get_coupon_amount_for(&self, coupon_id: u64, holder: &Address) -> Result<CouponAmountFor, BondError> {
        let action_id = self.coupon_action_id(coupon_id)?;
        Ok(self.calculator().coupon_amount_for(action_id, holder)?)
    }

    pub fn get_coupon_holders(&self, coupon_id: u64, start: usize, end: usize) -> Result<Vec<Address>, BondError> {
        let action_id = self.coupon_action_id(coupon_id)?;
        Ok(self.calculator().coupon_holders(action_id, start, end)?)
    }

    pub fn get_total_coupon_holders(&self, coupon_id: u64) -> Result<usize, BondError> {
        let action_id = self.coupon_action_id(coupon_id)?;
        Ok(self.calculator().total_coupon_holders(action_id)?)
    }

    pub fn get_coupon_count(&self) -> usize {
        self.actions.count_of(ActionType::Coupon)
    }

    /// Principal at nominal value for `holder`'s live balance
    pub fn get_principal_for(&self, holder: &Address) -> Result<Rational, BondError> {
        Ok(self.calculator().principal_for(holder)?)
    }

    pub fn get_bond_details(&self) -> &BondDetails {
        &self.details
    }

    pub fn balance_of(&self, holder: &Address, partition: &Partition) -> HolderBalance {
        self.ledger.balance_of(holder, partition)
    }

    /// Total balance across every partition
    pub fn total_balance_of(&self, holder: &Address) -> Amount {
        self.ledger.total_balance_across(holder)
    }

    pub fn total_supply(&self, partition: &Partition) -> Amount {
        self.ledger.total_supply(partition)
    }

    pub fn snapshot(&self, snapshot_id: SnapshotId) -> Option<&Snapshot> {
        self.snapshots.get(snapshot_id)
    }

    pub fn ledger(&self) -> &PartitionedBalanceLedger {
        &self.ledger
    }

    pub fn actions(&self) -> &CorporateActionStore {
        &self.actions
    }

    pub(crate) fn snapshot_engine(&self) -> &SnapshotEngine {
        &self.snapshots
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn config(&self) -> &BondConfig {
        &self.config
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }
}
