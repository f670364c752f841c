//! Tests for the clock abstraction

use bond_coupon_engine::{Clock, ManualClock, SystemClock, SECONDS_PER_WEEK, SECONDS_PER_YEAR};
use std::sync::Arc;

#[test]
fn test_manual_clock_starts_where_told() {
    let clock = ManualClock::new(1_700_000_000);
    assert_eq!(clock.now(), 1_700_000_000);
}

#[test]
fn test_advance_moves_every_clone() {
    let clock = ManualClock::new(0);
    let shared: Arc<dyn Clock> = Arc::new(clock.clone());

    clock.advance(400);
    assert_eq!(shared.now(), 400);

    clock.advance(SECONDS_PER_WEEK);
    assert_eq!(shared.now(), 400 + 7 * 24 * 3600);
}

#[test]
fn test_set_jumps_forward() {
    let clock = ManualClock::new(10);
    clock.set(10);
    clock.set(5_000);
    assert_eq!(clock.now(), 5_000);
}

#[test]
#[should_panic(expected = "clock cannot move backwards")]
fn test_set_backwards_panics() {
    let clock = ManualClock::new(5_000);
    clock.set(4_999);
}

#[test]
fn test_rejected_backwards_set_keeps_current_time() {
    let clock = ManualClock::new(5_000);
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| clock.set(4_999)));
    assert!(result.is_err());
    assert_eq!(clock.now(), 5_000);
}

#[test]
fn test_day_count_basis() {
    assert_eq!(SECONDS_PER_YEAR, 31_536_000);
    assert_eq!(SECONDS_PER_WEEK, 604_800);
}

#[test]
fn test_system_clock_is_monotone_enough() {
    let a = SystemClock.now();
    let b = SystemClock.now();
    assert!(b >= a);
}
