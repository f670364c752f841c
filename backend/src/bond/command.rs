//! Serializable commands and queries
//!
//! [`BondCommand`] and [`BondQuery`] mirror the typed methods on [`Bond`] so
//! hosts and the CLI can replay a scripted sequence from JSON:
//!
//! ```json
//! { "command": "issue", "to": "0x…01", "amount": 1000 }
//! { "query": "coupon_for", "coupon_id": 1, "holder": "0x…01" }
//! ```
//!
//! `partition` defaults to [`Partition::DEFAULT`] wherever it is accepted.

use crate::accrual::{CouponAmountFor, CouponFor, Rational};
use crate::bond::engine::{Bond, BondError, RegisteredCoupon};
use crate::models::balance::HolderBalance;
use crate::models::bond_details::BondDetails;
use crate::models::corporate_action::{Coupon, SnapshotId};
use crate::models::ledger::{ClearingId, HoldId, LockId};
use crate::models::types::{Address, Amount, Partition, Timestamp};
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use tracing::instrument;

// ============================================================================
// Commands
// ============================================================================

/// Every state-changing operation on a bond
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum BondCommand {
    SetCoupon {
        coupon: Coupon,
    },
    UpdateMaturityDate {
        maturity_date: Timestamp,
    },
    Issue {
        to: Address,
        #[serde(default)]
        partition: Partition,
        amount: Amount,
    },
    Transfer {
        from: Address,
        to: Address,
        #[serde(default)]
        partition: Partition,
        amount: Amount,
    },
    Redeem {
        from: Address,
        #[serde(default)]
        partition: Partition,
        amount: Amount,
    },
    Lock {
        holder: Address,
        #[serde(default)]
        partition: Partition,
        amount: Amount,
        expiration: Timestamp,
    },
    ReleaseLock {
        lock_id: LockId,
    },
    CreateHold {
        holder: Address,
        #[serde(default)]
        partition: Partition,
        amount: Amount,
        escrow: Address,
        #[serde(default)]
        to: Option<Address>,
        expiration: Timestamp,
    },
    ExecuteHold {
        hold_id: HoldId,
        to: Address,
        amount: Amount,
    },
    ReleaseHold {
        hold_id: HoldId,
        amount: Amount,
    },
    Freeze {
        holder: Address,
        #[serde(default)]
        partition: Partition,
        amount: Amount,
    },
    Unfreeze {
        holder: Address,
        #[serde(default)]
        partition: Partition,
        amount: Amount,
    },
    CreateClearing {
        from: Address,
        to: Address,
        #[serde(default)]
        partition: Partition,
        amount: Amount,
        expiration: Timestamp,
    },
    ApproveClearing {
        clearing_id: ClearingId,
    },
    CancelClearing {
        clearing_id: ClearingId,
    },
    RedeemAtMaturityByPartition {
        holder: Address,
        #[serde(default)]
        partition: Partition,
        amount: Amount,
    },
    FullRedeemAtMaturity {
        holder: Address,
    },
}

impl BondCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BondCommand::SetCoupon { .. } => "set_coupon",
            BondCommand::UpdateMaturityDate { .. } => "update_maturity_date",
            BondCommand::Issue { .. } => "issue",
            BondCommand::Transfer { .. } => "transfer",
            BondCommand::Redeem { .. } => "redeem",
            BondCommand::Lock { .. } => "lock",
            BondCommand::ReleaseLock { .. } => "release_lock",
            BondCommand::CreateHold { .. } => "create_hold",
            BondCommand::ExecuteHold { .. } => "execute_hold",
            BondCommand::ReleaseHold { .. } => "release_hold",
            BondCommand::Freeze { .. } => "freeze",
            BondCommand::Unfreeze { .. } => "unfreeze",
            BondCommand::CreateClearing { .. } => "create_clearing",
            BondCommand::ApproveClearing { .. } => "approve_clearing",
            BondCommand::CancelClearing { .. } => "cancel_clearing",
            BondCommand::RedeemAtMaturityByPartition { .. } => "redeem_at_maturity_by_partition",
            BondCommand::FullRedeemAtMaturity { .. } => "full_redeem_at_maturity",
        }
    }
}

/// What an applied command returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Applied,
    CouponSet { coupon_id: u64 },
    MaturityDateUpdated { previous: Timestamp },
    Locked { lock_id: LockId },
    HoldCreated { hold_id: HoldId },
    ClearingCreated { clearing_id: ClearingId },
    FullyRedeemed { redeemed: Vec<(Partition, Amount)> },
}

// ============================================================================
// Queries
// ============================================================================

/// Every read-only question a bond answers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "query", rename_all = "snake_case")]
pub enum BondQuery {
    Coupon {
        coupon_id: u64,
    },
    CouponFor {
        coupon_id: u64,
        holder: Address,
    },
    CouponAmountFor {
        coupon_id: u64,
        holder: Address,
    },
    CouponHolders {
        coupon_id: u64,
        start: usize,
        end: usize,
    },
    TotalCouponHolders {
        coupon_id: u64,
    },
    CouponCount,
    PrincipalFor {
        holder: Address,
    },
    BondDetails,
    BalanceOf {
        holder: Address,
        #[serde(default)]
        partition: Partition,
    },
    TotalBalanceOf {
        holder: Address,
    },
    TotalSupply {
        #[serde(default)]
        partition: Partition,
    },
    Snapshot {
        snapshot_id: SnapshotId,
    },
}

/// Answer to a [`BondQuery`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum QueryResult {
    Coupon(RegisteredCoupon),
    CouponFor(CouponFor),
    CouponAmountFor(CouponAmountFor),
    Holders { holders: Vec<Address> },
    Count { count: usize },
    Principal(Rational),
    BondDetails(BondDetails),
    Balance(HolderBalance),
    Amount { amount: Amount },
    Snapshot { snapshot: Option<Snapshot> },
}

// ============================================================================
// Dispatch
// ============================================================================

impl Bond {
    /// Apply a serialized command through the typed front doors
    #[instrument(skip_all, fields(command = command.name()))]
    pub fn execute(&mut self, command: BondCommand) -> Result<CommandOutcome, BondError> {
        let outcome = match command {
            BondCommand::SetCoupon { coupon } => CommandOutcome::CouponSet {
                coupon_id: self.set_coupon(coupon)?,
            },
            BondCommand::UpdateMaturityDate { maturity_date } => CommandOutcome::MaturityDateUpdated {
                previous: self.update_maturity_date(maturity_date)?,
            },
            BondCommand::Issue { to, partition, amount } => {
                self.issue(to, partition, amount)?;
                CommandOutcome::Applied
            }
            BondCommand::Transfer {
                from,
                to,
                partition,
                amount,
            } => {
                self.transfer(from, to, partition, amount)?;
                CommandOutcome::Applied
            }
            BondCommand::Redeem { from, partition, amount } => {
                self.redeem(from, partition, amount)?;
                CommandOutcome::Applied
            }
            BondCommand::Lock {
                holder,
                partition,
                amount,
                expiration,
            } => CommandOutcome::Locked {
                lock_id: self.lock(holder, partition, amount, expiration)?,
            },
            BondCommand::ReleaseLock { lock_id } => {
                self.release_lock(lock_id)?;
                CommandOutcome::Applied
            }
            BondCommand::CreateHold {
                holder,
                partition,
                amount,
                escrow,
                to,
                expiration,
            } => CommandOutcome::HoldCreated {
                hold_id: self.create_hold(holder, partition, amount, escrow, to, expiration)?,
            },
            BondCommand::ExecuteHold { hold_id, to, amount } => {
                self.execute_hold(hold_id, to, amount)?;
                CommandOutcome::Applied
            }
            BondCommand::ReleaseHold { hold_id, amount } => {
                self.release_hold(hold_id, amount)?;
                CommandOutcome::Applied
            }
            BondCommand::Freeze {
                holder,
                partition,
                amount,
            } => {
                self.freeze(holder, partition, amount)?;
                CommandOutcome::Applied
            }
            BondCommand::Unfreeze {
                holder,
                partition,
                amount,
            } => {
                self.unfreeze(holder, partition, amount)?;
                CommandOutcome::Applied
            }
            BondCommand::CreateClearing {
                from,
                to,
                partition,
                amount,
                expiration,
            } => CommandOutcome::ClearingCreated {
                clearing_id: self.create_clearing(from, to, partition, amount, expiration)?,
            },
            BondCommand::ApproveClearing { clearing_id } => {
                self.approve_clearing(clearing_id)?;
                CommandOutcome::Applied
            }
            BondCommand::CancelClearing { clearing_id } => {
                self.cancel_clearing(clearing_id)?;
                CommandOutcome::Applied
            }
            BondCommand::RedeemAtMaturityByPartition {
                holder,
                partition,
                amount,
            } => {
                self.redeem_at_maturity_by_partition(holder, partition, amount)?;
                CommandOutcome::Applied
            }
            BondCommand::FullRedeemAtMaturity { holder } => CommandOutcome::FullyRedeemed {
                redeemed: self.full_redeem_at_maturity(holder)?,
            },
        };
        Ok(outcome)
    }

    /// Answer a serialized query
    pub fn query(&self, query: BondQuery) -> Result<QueryResult, BondError> {
        Ok(match query {
            BondQuery::Coupon { coupon_id } => QueryResult::Coupon(self.get_coupon(coupon_id)?),
            BondQuery::CouponFor { coupon_id, holder } => {
                QueryResult::CouponFor(self.get_coupon_for(coupon_id, &holder)?)
            }
            BondQuery::CouponAmountFor { coupon_id, holder } => {
                QueryResult::CouponAmountFor(self.get_coupon_amount_for(coupon_id, &holder)?)
            }
            BondQuery::CouponHolders { coupon_id, start, end } => QueryResult::Holders {
                holders: self.get_coupon_holders(coupon_id, start, end)?,
            },
            BondQuery::TotalCouponHolders { coupon_id } => QueryResult::Count {
                count: self.get_total_coupon_holders(coupon_id)?,
            },
            BondQuery::CouponCount => QueryResult::Count {
                count: self.get_coupon_count(),
            },
            BondQuery::PrincipalFor { holder } => QueryResult::Principal(self.get_principal_for(&holder)?),
            BondQuery::BondDetails => QueryResult::BondDetails(self.get_bond_details().clone()),
            BondQuery::BalanceOf { holder, partition } => {
                QueryResult::Balance(self.balance_of(&holder, &partition))
            }
            BondQuery::TotalBalanceOf { holder } => QueryResult::Amount {
                amount: self.total_balance_of(&holder),
            },
            BondQuery::TotalSupply { partition } => QueryResult::Amount {
                amount: self.total_supply(&partition),
            },
            BondQuery::Snapshot { snapshot_id } => QueryResult::Snapshot {
                snapshot: self.snapshot(snapshot_id).cloned(),
            },
        })
    }
}
