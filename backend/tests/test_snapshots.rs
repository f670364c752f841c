//! Record-date snapshot tests
//!
//! Critical invariants tested:
//! - The first mutating command after a record date captures the balances
//!   that were live at the record date, before it applies
//! - Until then, queries read live balances, which are the same
//! - A snapshot is taken at most once per coupon

use bond_coupon_engine::{
    Address, Bond, BondConfig, BondEvent, Coupon, ManualClock, Partition, RateStatus,
};
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Test Helpers
// ============================================================================

const T: u64 = 1_000_000;

fn alice() -> Address {
    Address::from_low_u64(1)
}

fn bob() -> Address {
    Address::from_low_u64(2)
}

fn config(multi: bool) -> BondConfig {
    BondConfig {
        bond_id: Uuid::nil(),
        currency: "EUR".to_string(),
        nominal_value: 100,
        nominal_value_decimals: 0,
        token_decimals: 0,
        starting_date: 0,
        maturity_date: T + 1_000_000,
        is_multi_partition: multi,
    }
}

fn new_bond(multi: bool) -> (Bond, ManualClock) {
    let clock = ManualClock::new(T);
    let bond = Bond::new(config(multi), Arc::new(clock.clone())).unwrap();
    (bond, clock)
}

fn coupon(record_offset: u64) -> Coupon {
    Coupon {
        record_date: T + record_offset,
        execution_date: T + record_offset + 1_000,
        start_date: T,
        end_date: T + 500,
        fixing_date: T + record_offset + 1_000,
        rate: 50,
        rate_decimals: 1,
        rate_status: RateStatus::Set,
    }
}

// ============================================================================
// Lazy capture
// ============================================================================

#[test]
fn test_no_snapshot_before_record_date() {
    let (mut bond, clock) = new_bond(false);
    bond.issue(alice(), Partition::DEFAULT, 1_000).unwrap();
    let id = bond.set_coupon(coupon(400)).unwrap();

    clock.advance(399);
    bond.transfer(alice(), bob(), Partition::DEFAULT, 100).unwrap();

    assert_eq!(bond.get_coupon(id).unwrap().snapshot_id, 0);
    let entitlement = bond.get_coupon_for(id, &alice()).unwrap();
    assert!(!entitlement.record_date_reached);
    assert_eq!(entitlement.token_balance, 0);
}

#[test]
fn test_live_balance_used_until_first_mutation() {
    let (mut bond, clock) = new_bond(false);
    bond.issue(alice(), Partition::DEFAULT, 1_000).unwrap();
    let id = bond.set_coupon(coupon(400)).unwrap();

    clock.advance(500);
    assert_eq!(bond.get_coupon(id).unwrap().snapshot_id, 0);
    let entitlement = bond.get_coupon_for(id, &alice()).unwrap();
    assert!(entitlement.record_date_reached);
    assert_eq!(entitlement.token_balance, 1_000);
}

#[test]
fn test_first_mutation_captures_pre_mutation_balances() {
    let (mut bond, clock) = new_bond(false);
    bond.issue(alice(), Partition::DEFAULT, 1_000).unwrap();
    let id = bond.set_coupon(coupon(400)).unwrap();

    clock.advance(500);
    bond.transfer(alice(), bob(), Partition::DEFAULT, 600).unwrap();

    let registered = bond.get_coupon(id).unwrap();
    assert_eq!(registered.snapshot_id, 1);
    assert_eq!(bond.get_coupon_for(id, &alice()).unwrap().token_balance, 1_000);
    assert_eq!(bond.get_coupon_for(id, &bob()).unwrap().token_balance, 0);
    assert_eq!(bond.total_balance_of(&alice()), 400);

    let snapshot = bond.snapshot(1).unwrap();
    assert_eq!(snapshot.action_id, registered.action_id);
    assert_eq!(snapshot.total_supply(), 1_000);
}

#[test]
fn test_snapshot_event_precedes_command_event() {
    let (mut bond, clock) = new_bond(false);
    bond.issue(alice(), Partition::DEFAULT, 1_000).unwrap();
    bond.set_coupon(coupon(400)).unwrap();

    clock.advance(500);
    bond.redeem(alice(), Partition::DEFAULT, 1).unwrap();

    let events = bond.events().events();
    let tail: Vec<&str> = events[events.len() - 2..].iter().map(|e| e.event_type()).collect();
    assert_eq!(tail, vec!["SnapshotTaken", "Redeemed"]);
    match &events[events.len() - 2] {
        BondEvent::SnapshotTaken { snapshot_id, holders, .. } => {
            assert_eq!(*snapshot_id, 1);
            assert_eq!(*holders, 1);
        }
        other => panic!("unexpected event {:?}", other),
    }
}

#[test]
fn test_snapshot_taken_once() {
    let (mut bond, clock) = new_bond(false);
    bond.issue(alice(), Partition::DEFAULT, 1_000).unwrap();
    let id = bond.set_coupon(coupon(400)).unwrap();

    clock.advance(500);
    bond.transfer(alice(), bob(), Partition::DEFAULT, 100).unwrap();
    bond.transfer(alice(), bob(), Partition::DEFAULT, 100).unwrap();

    assert_eq!(bond.get_coupon(id).unwrap().snapshot_id, 1);
    assert!(bond.snapshot(2).is_none());
    assert_eq!(bond.events().events_of_type("SnapshotTaken").len(), 1);
}

#[test]
fn test_several_due_coupons_captured_in_record_date_order() {
    let (mut bond, clock) = new_bond(false);
    bond.issue(alice(), Partition::DEFAULT, 1_000).unwrap();
    let late = bond.set_coupon(coupon(800)).unwrap();
    let early = bond.set_coupon(coupon(400)).unwrap();

    clock.advance(900);
    bond.transfer(alice(), bob(), Partition::DEFAULT, 1_000).unwrap();

    assert_eq!(bond.get_coupon(early).unwrap().snapshot_id, 1);
    assert_eq!(bond.get_coupon(late).unwrap().snapshot_id, 2);
    assert_eq!(bond.get_coupon_for(late, &alice()).unwrap().token_balance, 1_000);
    assert_eq!(bond.get_coupon_for(early, &bob()).unwrap().token_balance, 0);
}

#[test]
fn test_failed_command_takes_no_snapshot() {
    let (mut bond, clock) = new_bond(false);
    bond.issue(alice(), Partition::DEFAULT, 1_000).unwrap();
    let id = bond.set_coupon(coupon(400)).unwrap();

    clock.advance(500);
    assert!(bond.transfer(alice(), bob(), Partition::DEFAULT, 5_000).is_err());
    assert_eq!(bond.get_coupon(id).unwrap().snapshot_id, 0);

    bond.transfer(alice(), bob(), Partition::DEFAULT, 5).unwrap();
    assert_eq!(bond.get_coupon(id).unwrap().snapshot_id, 1);
    assert_eq!(bond.get_coupon_for(id, &alice()).unwrap().token_balance, 1_000);
}

// ============================================================================
// Holders and partitions
// ============================================================================

#[test]
fn test_coupon_holders_frozen_at_record_date() {
    let (mut bond, clock) = new_bond(false);
    bond.issue(alice(), Partition::DEFAULT, 1_000).unwrap();
    let id = bond.set_coupon(coupon(400)).unwrap();

    clock.advance(500);
    bond.transfer(alice(), bob(), Partition::DEFAULT, 1_000).unwrap();

    assert_eq!(bond.get_total_coupon_holders(id).unwrap(), 1);
    assert_eq!(bond.get_coupon_holders(id, 0, 10).unwrap(), vec![alice()]);
    assert_eq!(bond.ledger().registry().all_holders(), vec![bob()]);
}

#[test]
fn test_coupon_holders_live_before_snapshot() {
    let (mut bond, _clock) = new_bond(false);
    bond.issue(alice(), Partition::DEFAULT, 1_000).unwrap();
    bond.issue(bob(), Partition::DEFAULT, 1).unwrap();
    let id = bond.set_coupon(coupon(400)).unwrap();

    assert_eq!(bond.get_total_coupon_holders(id).unwrap(), 2);
    assert_eq!(bond.get_coupon_holders(id, 1, 2).unwrap(), vec![bob()]);
}

#[test]
fn test_snapshot_sums_across_partitions() {
    let (mut bond, clock) = new_bond(true);
    let tranche = Partition::from_low_u64(2);
    bond.issue(alice(), Partition::DEFAULT, 700).unwrap();
    bond.issue(alice(), tranche, 300).unwrap();
    let id = bond.set_coupon(coupon(400)).unwrap();

    clock.advance(500);
    bond.redeem(alice(), tranche, 300).unwrap();

    assert_eq!(bond.get_coupon_for(id, &alice()).unwrap().token_balance, 1_000);
    let snapshot = bond.snapshot(1).unwrap();
    assert_eq!(snapshot.balance_of_by_partition(&alice(), &Partition::DEFAULT), 700);
    assert_eq!(snapshot.balance_of_by_partition(&alice(), &tranche), 300);
}

#[test]
fn test_encumbered_units_count_in_snapshot() {
    let (mut bond, clock) = new_bond(false);
    bond.issue(alice(), Partition::DEFAULT, 1_000).unwrap();
    bond.lock(alice(), Partition::DEFAULT, 200, T + 10_000).unwrap();
    bond.freeze(alice(), Partition::DEFAULT, 100).unwrap();
    let id = bond.set_coupon(coupon(400)).unwrap();

    clock.advance(500);
    bond.unfreeze(alice(), Partition::DEFAULT, 100).unwrap();
    assert_eq!(bond.get_coupon_for(id, &alice()).unwrap().token_balance, 1_000);
}
