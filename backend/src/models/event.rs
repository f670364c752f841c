//! Event logging for auditing and replay
//!
//! Every applied bond command appends one or more [`BondEvent`]s, and every
//! record-date snapshot capture appends a [`BondEvent::SnapshotTaken`].
//! Rejected commands log nothing.
//!
//! # Example
//!
//! ```rust
//! use bond_coupon_engine::{Address, BondEvent, EventLog, Partition};
//!
//! let mut log = EventLog::new();
//! log.log(BondEvent::Issued {
//!     timestamp: 10,
//!     holder: Address::from_low_u64(1),
//!     partition: Partition::DEFAULT,
//!     amount: 1_000,
//! });
//! assert_eq!(log.events_of_type("Issued").len(), 1);
//! ```

use crate::models::corporate_action::{ActionId, SnapshotId};
use crate::models::ledger::{ClearingId, HoldId, LockId};
use crate::models::types::{Address, Amount, Partition, Timestamp};
use serde::{Deserialize, Serialize};

/// Bond event capturing an applied state change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BondEvent {
    Issued {
        timestamp: Timestamp,
        holder: Address,
        partition: Partition,
        amount: Amount,
    },

    Transferred {
        timestamp: Timestamp,
        from: Address,
        to: Address,
        partition: Partition,
        amount: Amount,
    },

    Redeemed {
        timestamp: Timestamp,
        holder: Address,
        partition: Partition,
        amount: Amount,
    },

    Locked {
        timestamp: Timestamp,
        lock_id: LockId,
        holder: Address,
        partition: Partition,
        amount: Amount,
        expiration: Timestamp,
    },

    LockReleased {
        timestamp: Timestamp,
        lock_id: LockId,
        holder: Address,
        partition: Partition,
        amount: Amount,
    },

    HoldCreated {
        timestamp: Timestamp,
        hold_id: HoldId,
        holder: Address,
        partition: Partition,
        amount: Amount,
        escrow: Address,
    },

    HoldExecuted {
        timestamp: Timestamp,
        hold_id: HoldId,
        holder: Address,
        to: Address,
        partition: Partition,
        amount: Amount,
    },

    HoldReleased {
        timestamp: Timestamp,
        hold_id: HoldId,
        holder: Address,
        partition: Partition,
        amount: Amount,
    },

    Frozen {
        timestamp: Timestamp,
        holder: Address,
        partition: Partition,
        amount: Amount,
    },

    Unfrozen {
        timestamp: Timestamp,
        holder: Address,
        partition: Partition,
        amount: Amount,
    },

    ClearingCreated {
        timestamp: Timestamp,
        clearing_id: ClearingId,
        from: Address,
        to: Address,
        partition: Partition,
        amount: Amount,
    },

    ClearingApproved {
        timestamp: Timestamp,
        clearing_id: ClearingId,
        from: Address,
        to: Address,
        partition: Partition,
        amount: Amount,
    },

    ClearingCancelled {
        timestamp: Timestamp,
        clearing_id: ClearingId,
        from: Address,
        partition: Partition,
        amount: Amount,
    },

    /// New coupon accepted
    CouponSet {
        timestamp: Timestamp,
        coupon_id: u64,
        action_id: ActionId,
        record_date: Timestamp,
        execution_date: Timestamp,
    },

    /// Record-date snapshot captured for an action
    SnapshotTaken {
        timestamp: Timestamp,
        snapshot_id: SnapshotId,
        action_id: ActionId,
        holders: usize,
    },

    /// Maturity date moved forward; `previous` is kept for audit
    MaturityDateUpdated {
        timestamp: Timestamp,
        previous: Timestamp,
        new: Timestamp,
    },

    /// Units redeemed after maturity (one event per non-empty partition)
    RedeemedAtMaturity {
        timestamp: Timestamp,
        holder: Address,
        partition: Partition,
        amount: Amount,
    },
}

impl BondEvent {
    /// Time at which the event was applied
    pub fn timestamp(&self) -> Timestamp {
        match self {
            BondEvent::Issued { timestamp, .. }
            | BondEvent::Transferred { timestamp, .. }
            | BondEvent::Redeemed { timestamp, .. }
            | BondEvent::Locked { timestamp, .. }
            | BondEvent::LockReleased { timestamp, .. }
            | BondEvent::HoldCreated { timestamp, .. }
            | BondEvent::HoldExecuted { timestamp, .. }
            | BondEvent::HoldReleased { timestamp, .. }
            | BondEvent::Frozen { timestamp, .. }
            | BondEvent::Unfrozen { timestamp, .. }
            | BondEvent::ClearingCreated { timestamp, .. }
            | BondEvent::ClearingApproved { timestamp, .. }
            | BondEvent::ClearingCancelled { timestamp, .. }
            | BondEvent::CouponSet { timestamp, .. }
            | BondEvent::SnapshotTaken { timestamp, .. }
            | BondEvent::MaturityDateUpdated { timestamp, .. }
            | BondEvent::RedeemedAtMaturity { timestamp, .. } => *timestamp,
        }
    }

    /// Short name of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            BondEvent::Issued { .. } => "Issued",
            BondEvent::Transferred { .. } => "Transferred",
            BondEvent::Redeemed { .. } => "Redeemed",
            BondEvent::Locked { .. } => "Locked",
            BondEvent::LockReleased { .. } => "LockReleased",
            BondEvent::HoldCreated { .. } => "HoldCreated",
            BondEvent::HoldExecuted { .. } => "HoldExecuted",
            BondEvent::HoldReleased { .. } => "HoldReleased",
            BondEvent::Frozen { .. } => "Frozen",
            BondEvent::Unfrozen { .. } => "Unfrozen",
            BondEvent::ClearingCreated { .. } => "ClearingCreated",
            BondEvent::ClearingApproved { .. } => "ClearingApproved",
            BondEvent::ClearingCancelled { .. } => "ClearingCancelled",
            BondEvent::CouponSet { .. } => "CouponSet",
            BondEvent::SnapshotTaken { .. } => "SnapshotTaken",
            BondEvent::MaturityDateUpdated { .. } => "MaturityDateUpdated",
            BondEvent::RedeemedAtMaturity { .. } => "RedeemedAtMaturity",
        }
    }

    /// Whether `address` is a party to this event
    pub fn involves(&self, address: &Address) -> bool {
        match self {
            BondEvent::Transferred { from, to, .. }
            | BondEvent::ClearingCreated { from, to, .. }
            | BondEvent::ClearingApproved { from, to, .. } => from == address || to == address,
            BondEvent::HoldExecuted { holder, to, .. } => holder == address || to == address,
            BondEvent::HoldCreated { holder, escrow, .. } => holder == address || escrow == address,
            BondEvent::ClearingCancelled { from, .. } => from == address,
            BondEvent::Issued { holder, .. }
            | BondEvent::Redeemed { holder, .. }
            | BondEvent::Locked { holder, .. }
            | BondEvent::LockReleased { holder, .. }
            | BondEvent::HoldReleased { holder, .. }
            | BondEvent::Frozen { holder, .. }
            | BondEvent::Unfrozen { holder, .. }
            | BondEvent::RedeemedAtMaturity { holder, .. } => holder == address,
            BondEvent::CouponSet { .. }
            | BondEvent::SnapshotTaken { .. }
            | BondEvent::MaturityDateUpdated { .. } => false,
        }
    }
}

/// Append-only log of bond events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<BondEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn log(&mut self, event: BondEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[BondEvent] {
        &self.events
    }

    /// Events applied at or after `timestamp`
    pub fn events_since(&self, timestamp: Timestamp) -> Vec<&BondEvent> {
        self.events
            .iter()
            .filter(|e| e.timestamp() >= timestamp)
            .collect()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<&BondEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Events in which `holder` is a party
    pub fn events_for_holder(&self, holder: &Address) -> Vec<&BondEvent> {
        self.events.iter().filter(|e| e.involves(holder)).collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::from_low_u64(1)
    }

    fn bob() -> Address {
        Address::from_low_u64(2)
    }

    #[test]
    fn test_event_log_query_by_holder() {
        let mut log = EventLog::new();
        log.log(BondEvent::Issued {
            timestamp: 1,
            holder: alice(),
            partition: Partition::DEFAULT,
            amount: 100,
        });
        log.log(BondEvent::Transferred {
            timestamp: 2,
            from: alice(),
            to: bob(),
            partition: Partition::DEFAULT,
            amount: 40,
        });
        log.log(BondEvent::MaturityDateUpdated {
            timestamp: 3,
            previous: 10,
            new: 20,
        });

        assert_eq!(log.events_for_holder(&alice()).len(), 2);
        assert_eq!(log.events_for_holder(&bob()).len(), 1);
        assert_eq!(log.events_since(2).len(), 2);
    }

    #[test]
    fn test_event_log_clear() {
        let mut log = EventLog::new();
        log.log(BondEvent::SnapshotTaken {
            timestamp: 5,
            snapshot_id: 1,
            action_id: 1,
            holders: 3,
        });
        assert_eq!(log.len(), 1);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_events_serialize_with_type_tag() {
        let event = BondEvent::MaturityDateUpdated {
            timestamp: 3,
            previous: 10,
            new: 20,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "MaturityDateUpdated");
        assert_eq!(json["previous"], 10);
    }
}
