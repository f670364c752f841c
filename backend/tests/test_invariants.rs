//! Property tests for the bond's core invariants
//!
//! - Conservation: per-partition holder totals equal supply after any sequence
//! - Record consistency: encumbrance records explain the encumbered buckets
//! - Monotonic maturity: the maturity date never decreases
//! - Snapshot consistency: the live view just before the first post-record
//!   mutation equals the snapshot view just after it
//! - Entitlement exactness: numerator/denominator equals an independent
//!   recomputation of the formula
//! - Zero redemption is idempotent

use bond_coupon_engine::{
    Address, Bond, BondConfig, Coupon, ManualClock, Partition, RateStatus, SECONDS_PER_YEAR, U256,
};
use proptest::prelude::*;
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Test Helpers
// ============================================================================

const T: u64 = 1_000_000;
const MATURITY: u64 = T + 1_000_000;
const HOLDERS: u64 = 4;

fn holder(n: u64) -> Address {
    Address::from_low_u64(n + 1)
}

fn partition(n: u8) -> Partition {
    Partition::from_low_u64(u64::from(n) + 1)
}

fn config(nominal_value: u64, nominal_value_decimals: u8, token_decimals: u8) -> BondConfig {
    BondConfig {
        bond_id: Uuid::nil(),
        currency: "EUR".to_string(),
        nominal_value,
        nominal_value_decimals,
        token_decimals,
        starting_date: 0,
        maturity_date: MATURITY,
        is_multi_partition: true,
    }
}

fn new_bond() -> (Bond, ManualClock) {
    let clock = ManualClock::new(T);
    let bond = Bond::new(config(100, 0, 0), Arc::new(clock.clone())).unwrap();
    (bond, clock)
}

fn coupon(record_date: u64, start_date: u64, end_date: u64, rate: u64, rate_decimals: u8) -> Coupon {
    Coupon {
        record_date,
        execution_date: record_date + 10,
        start_date,
        end_date,
        fixing_date: record_date + 10,
        rate,
        rate_decimals,
        rate_status: RateStatus::Set,
    }
}

#[derive(Debug, Clone)]
enum Op {
    Issue(u64, u8, u64),
    Transfer(u64, u64, u8, u64),
    Redeem(u64, u8, u64),
    Lock(u64, u8, u64),
    Hold(u64, u8, u64),
    Freeze(u64, u8, u64),
    Unfreeze(u64, u8, u64),
    Clearing(u64, u64, u8, u64),
    ApproveClearing(u64),
    CancelClearing(u64),
    ReleaseHold(u64, u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let h = 0..HOLDERS;
    let p = 0u8..2;
    let amount = 0u64..500;
    prop_oneof![
        (h.clone(), p.clone(), amount.clone()).prop_map(|(a, p, x)| Op::Issue(a, p, x)),
        (h.clone(), h.clone(), p.clone(), amount.clone()).prop_map(|(a, b, p, x)| Op::Transfer(a, b, p, x)),
        (h.clone(), p.clone(), amount.clone()).prop_map(|(a, p, x)| Op::Redeem(a, p, x)),
        (h.clone(), p.clone(), amount.clone()).prop_map(|(a, p, x)| Op::Lock(a, p, x)),
        (h.clone(), p.clone(), amount.clone()).prop_map(|(a, p, x)| Op::Hold(a, p, x)),
        (h.clone(), p.clone(), amount.clone()).prop_map(|(a, p, x)| Op::Freeze(a, p, x)),
        (h.clone(), p.clone(), amount.clone()).prop_map(|(a, p, x)| Op::Unfreeze(a, p, x)),
        (h.clone(), h.clone(), p, amount.clone()).prop_map(|(a, b, p, x)| Op::Clearing(a, b, p, x)),
        (1u64..6, any::<bool>()).prop_map(|(id, approve)| if approve {
            Op::ApproveClearing(id)
        } else {
            Op::CancelClearing(id)
        }),
        (1u64..6, amount).prop_map(|(id, x)| Op::ReleaseHold(id, x)),
    ]
}

/// Apply an op, ignoring rejections (they must leave no trace anyway)
fn apply(bond: &mut Bond, op: &Op) {
    let far = MATURITY * 2;
    let _ = match *op {
        Op::Issue(a, p, x) => bond.issue(holder(a), partition(p), x),
        Op::Transfer(a, b, p, x) => bond.transfer(holder(a), holder(b), partition(p), x),
        Op::Redeem(a, p, x) => bond.redeem(holder(a), partition(p), x),
        Op::Lock(a, p, x) => bond.lock(holder(a), partition(p), x, far).map(|_| ()),
        Op::Hold(a, p, x) => bond
            .create_hold(holder(a), partition(p), x, holder(HOLDERS), None, far)
            .map(|_| ()),
        Op::Freeze(a, p, x) => bond.freeze(holder(a), partition(p), x),
        Op::Unfreeze(a, p, x) => bond.unfreeze(holder(a), partition(p), x),
        Op::Clearing(a, b, p, x) => bond
            .create_clearing(holder(a), holder(b), partition(p), x, far)
            .map(|_| ()),
        Op::ApproveClearing(id) => bond.approve_clearing(id),
        Op::CancelClearing(id) => bond.cancel_clearing(id),
        Op::ReleaseHold(id, x) => bond.release_hold(id, x),
    };
}

fn holder_sum(bond: &Bond, p: u8) -> u128 {
    (0..=HOLDERS)
        .map(|n| u128::from(bond.ledger().total_balance_of(&holder(n), &partition(p))))
        .sum()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_supply_is_conserved(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let (mut bond, _clock) = new_bond();
        for op in &ops {
            apply(&mut bond, op);
            prop_assert!(bond.ledger().verify_conservation().is_ok());
            prop_assert!(bond.ledger().verify_records().is_ok());
            for p in 0..2u8 {
                prop_assert_eq!(holder_sum(&bond, p), u128::from(bond.total_supply(&partition(p))));
            }
            for n in 0..=HOLDERS {
                for p in 0..2u8 {
                    let balance = bond.balance_of(&holder(n), &partition(p));
                    prop_assert!(balance.cleared <= balance.free);
                }
            }
        }
    }

    #[test]
    fn prop_maturity_never_decreases(requests in prop::collection::vec(0u64..3 * MATURITY, 1..30)) {
        let (mut bond, _clock) = new_bond();
        let mut expected = MATURITY;
        for requested in requests {
            let before = bond.get_bond_details().maturity_date();
            let result = bond.update_maturity_date(requested);
            let after = bond.get_bond_details().maturity_date();
            prop_assert!(after >= before);
            if requested > expected {
                prop_assert_eq!(result, Ok(expected));
                expected = requested;
            } else {
                prop_assert!(result.is_err());
            }
            prop_assert_eq!(after, expected);
        }
    }

    #[test]
    fn prop_snapshot_matches_live_view(
        before in prop::collection::vec(op_strategy(), 0..30),
        trigger in op_strategy(),
    ) {
        let (mut bond, clock) = new_bond();
        let id = bond.set_coupon(coupon(T + 100, 0, 1_000, 5, 0)).unwrap();
        for op in &before {
            apply(&mut bond, op);
        }

        clock.advance(200);
        let live: Vec<_> = (0..=HOLDERS)
            .map(|n| bond.get_coupon_for(id, &holder(n)).unwrap())
            .collect();
        let live_holders = bond.get_total_coupon_holders(id).unwrap();

        // A rejected trigger takes no snapshot; fall back to a trivially valid one
        apply(&mut bond, &trigger);
        if bond.get_coupon(id).unwrap().snapshot_id == 0 {
            bond.issue(holder(0), partition(0), 1).unwrap();
        }
        prop_assert_ne!(bond.get_coupon(id).unwrap().snapshot_id, 0);

        for n in 0..=HOLDERS {
            prop_assert_eq!(&bond.get_coupon_for(id, &holder(n)).unwrap(), &live[n as usize]);
        }
        prop_assert_eq!(bond.get_total_coupon_holders(id).unwrap(), live_holders);
    }

    #[test]
    fn prop_entitlement_is_exact(
        balance in 0u64..1_000_000_000,
        nominal in 1u64..1_000_000,
        nominal_decimals in 0u8..6,
        token_decimals in 0u8..8,
        rate in 0u64..100_000,
        rate_decimals in 0u8..4,
        period in 0u64..SECONDS_PER_YEAR,
    ) {
        let clock = ManualClock::new(T);
        let mut bond = Bond::new(
            config(nominal, nominal_decimals, token_decimals),
            Arc::new(clock.clone()),
        ).unwrap();
        bond.issue(holder(0), Partition::DEFAULT, balance).unwrap();
        let id = bond.set_coupon(coupon(T + 10, 0, period, rate, rate_decimals)).unwrap();
        clock.advance(20);

        let amount = bond.get_coupon_amount_for(id, &holder(0)).unwrap();
        let expected_numerator =
            u128::from(balance) * u128::from(nominal) * u128::from(rate) * u128::from(period);
        let expected_denominator = 10u128
            .pow(u32::from(token_decimals) + u32::from(nominal_decimals) + u32::from(rate_decimals))
            * u128::from(SECONDS_PER_YEAR);
        prop_assert!(amount.record_date_reached);
        prop_assert_eq!(amount.numerator, U256::from(expected_numerator));
        prop_assert_eq!(amount.denominator, U256::from(expected_denominator));
    }

    #[test]
    fn prop_zero_redemption_is_idempotent(amount in 0u64..1_000, repeats in 1usize..5) {
        let (mut bond, clock) = new_bond();
        bond.issue(holder(0), partition(0), amount).unwrap();
        clock.set(MATURITY + 1);

        let first = bond.full_redeem_at_maturity(holder(0)).unwrap();
        prop_assert_eq!(first.iter().map(|(_, x)| *x).sum::<u64>(), amount);
        for _ in 0..repeats {
            let events = bond.events().len();
            prop_assert_eq!(bond.full_redeem_at_maturity(holder(0)), Ok(vec![]));
            prop_assert!(bond
                .redeem_at_maturity_by_partition(holder(0), partition(0), 0)
                .is_ok());
            prop_assert_eq!(bond.events().len(), events);
        }
        prop_assert_eq!(bond.total_supply(&partition(0)), 0);
    }
}
