//! Record-date snapshots
//!
//! A corporate action moves through `NoSnapshot → Taken` exactly once. The
//! snapshot is not taken proactively at the record date: every action with a
//! record date sits in a queue of pending triggers, and at the start of each
//! mutating command the bond engine captures every trigger that has come due.
//! Because capture happens before the command touches the ledger, the
//! snapshot holds exactly the balances that were live at the record date.
//!
//! Capture and commit are separate steps so a command that fails validation
//! leaves no trace:
//!
//! ```text
//! capture_due(now, store, ledger)   read-only, returns SnapshotCapture list
//! <command mutates ledger>          may fail → captures are dropped
//! commit(captures, store)           assigns ids, writes action.snapshot_id
//! ```
//!
//! # Critical Invariants
//!
//! 1. At most one snapshot per action (`set_snapshot` is write-once)
//! 2. Snapshot ids are sequential from 1 and never reused
//! 3. Snapshots are immutable after commit

use crate::models::corporate_action::{ActionId, CorporateActionStore, SnapshotId};
use crate::models::ledger::PartitionedBalanceLedger;
use crate::models::types::{Address, Amount, Partition, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Immutable point-in-time capture of holder balances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub action_id: ActionId,
    pub taken_at: Timestamp,
    /// Holders in registry order at capture time
    holders: Vec<Address>,
    /// Total balance across partitions per holder
    totals: BTreeMap<Address, Amount>,
    by_partition: BTreeMap<Partition, BTreeMap<Address, Amount>>,
}

impl Snapshot {
    /// Total balance of `holder` at capture time (0 if not a holder)
    pub fn balance_of(&self, holder: &Address) -> Amount {
        self.totals.get(holder).copied().unwrap_or(0)
    }

    /// Balance of `holder` in `partition` at capture time
    pub fn balance_of_by_partition(&self, holder: &Address, partition: &Partition) -> Amount {
        self.by_partition
            .get(partition)
            .and_then(|balances| balances.get(holder))
            .copied()
            .unwrap_or(0)
    }

    pub fn holders(&self) -> &[Address] {
        &self.holders
    }

    pub fn holder_count(&self) -> usize {
        self.holders.len()
    }

    /// Page through captured holders; bounds are clamped
    pub fn slice_holders(&self, start: usize, end: usize) -> Vec<Address> {
        let end = end.min(self.holders.len());
        if start >= end {
            return Vec::new();
        }
        self.holders[start..end].to_vec()
    }

    /// Sum of captured totals, widened to avoid overflow
    pub fn total_supply(&self) -> u128 {
        self.totals.values().map(|v| u128::from(*v)).sum()
    }
}

/// Captured balances awaiting commit
#[derive(Debug, Clone)]
pub struct SnapshotCapture {
    action_id: ActionId,
    record_date: Timestamp,
    taken_at: Timestamp,
    holders: Vec<Address>,
    totals: BTreeMap<Address, Amount>,
    by_partition: BTreeMap<Partition, BTreeMap<Address, Amount>>,
}

impl SnapshotCapture {
    pub fn action_id(&self) -> ActionId {
        self.action_id
    }
}

/// Result of committing one capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommittedSnapshot {
    pub snapshot_id: SnapshotId,
    pub action_id: ActionId,
    pub holders: usize,
}

/// Arena of snapshots plus the queue of pending record-date triggers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotEngine {
    snapshots: Vec<Snapshot>,
    /// (record_date, action_id) of actions still without a snapshot
    #[serde(skip)]
    pending: BTreeSet<(Timestamp, ActionId)>,
}

impl SnapshotEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action's record date as a pending trigger
    pub fn schedule(&mut self, action_id: ActionId, record_date: Timestamp) {
        self.pending.insert((record_date, action_id));
    }

    /// Rebuild pending triggers from the store (after checkpoint restore)
    pub fn rebuild_pending(&mut self, store: &CorporateActionStore) {
        self.pending = store
            .iter()
            .filter(|action| !action.has_snapshot())
            .map(|action| (action.kind.record_date(), action.id))
            .collect();
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether any trigger is due at `now`
    pub fn has_due(&self, now: Timestamp) -> bool {
        self.pending
            .first()
            .is_some_and(|(record_date, _)| *record_date <= now)
    }

    /// Capture balances for every trigger due at `now`, without committing
    pub fn capture_due(
        &self,
        now: Timestamp,
        store: &CorporateActionStore,
        ledger: &PartitionedBalanceLedger,
    ) -> Vec<SnapshotCapture> {
        if !self.has_due(now) {
            return Vec::new();
        }
        self.pending
            .range(..=(now, ActionId::MAX))
            .filter(|(_, action_id)| {
                store
                    .get(*action_id)
                    .is_ok_and(|action| !action.has_snapshot())
            })
            .map(|(record_date, action_id)| Self::capture(ledger, *action_id, *record_date, now))
            .collect()
    }

    fn capture(
        ledger: &PartitionedBalanceLedger,
        action_id: ActionId,
        record_date: Timestamp,
        now: Timestamp,
    ) -> SnapshotCapture {
        let registry = ledger.registry();
        let holders = registry.all_holders();
        let totals = holders
            .iter()
            .map(|holder| (*holder, ledger.total_balance_across(holder)))
            .collect();
        let by_partition = registry
            .partitions()
            .map(|partition| {
                let balances = registry
                    .holders(partition)
                    .into_iter()
                    .map(|holder| (holder, ledger.total_balance_of(&holder, partition)))
                    .collect();
                (*partition, balances)
            })
            .collect();
        debug!(action_id, record_date, holders = holders.len(), "Captured record-date balances");

        SnapshotCapture {
            action_id,
            record_date,
            taken_at: now,
            holders,
            totals,
            by_partition,
        }
    }

    /// Turn captures into snapshots and link them to their actions
    ///
    /// Captures whose action already has a snapshot are dropped.
    pub fn commit(
        &mut self,
        captures: Vec<SnapshotCapture>,
        store: &mut CorporateActionStore,
    ) -> Vec<CommittedSnapshot> {
        let mut committed = Vec::with_capacity(captures.len());
        for capture in captures {
            let snapshot_id = self.snapshots.len() as SnapshotId + 1;
            match store.set_snapshot(capture.action_id, snapshot_id) {
                Ok(true) => {}
                Ok(false) | Err(_) => {
                    self.pending.remove(&(capture.record_date, capture.action_id));
                    continue;
                }
            }
            self.pending.remove(&(capture.record_date, capture.action_id));
            info!(
                snapshot_id,
                action_id = capture.action_id,
                holders = capture.holders.len(),
                "Snapshot taken"
            );
            committed.push(CommittedSnapshot {
                snapshot_id,
                action_id: capture.action_id,
                holders: capture.holders.len(),
            });
            self.snapshots.push(Snapshot {
                id: snapshot_id,
                action_id: capture.action_id,
                taken_at: capture.taken_at,
                holders: capture.holders,
                totals: capture.totals,
                by_partition: capture.by_partition,
            });
        }
        committed
    }

    /// Capture and commit in one step
    pub fn take_due(
        &mut self,
        now: Timestamp,
        store: &mut CorporateActionStore,
        ledger: &PartitionedBalanceLedger,
    ) -> Vec<CommittedSnapshot> {
        let captures = self.capture_due(now, store, ledger);
        self.commit(captures, store)
    }

    /// Look up a snapshot by id (1-based)
    pub fn get(&self, id: SnapshotId) -> Option<&Snapshot> {
        id.checked_sub(1)
            .and_then(|index| usize::try_from(index).ok())
            .and_then(|index| self.snapshots.get(index))
    }

    pub fn count(&self) -> usize {
        self.snapshots.len()
    }
}
