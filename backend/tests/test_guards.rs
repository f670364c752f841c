//! Guard chain tests
//!
//! Guards run before a command reaches the core. A rejected command must
//! leave balances, snapshots and the event log untouched.

use bond_coupon_engine::{
    Address, Bond, BondConfig, BondError, ClearingMode, CommandContext, CommandGuard, ControlList,
    Coupon, GuardError, KycRegistry, ManualClock, Operation, Partition, PauseSwitch, RateStatus,
    RecoveredWallets,
};
use std::sync::Arc;
use uuid::Uuid;

// ============================================================================
// Test Helpers
// ============================================================================

fn alice() -> Address {
    Address::from_low_u64(1)
}

fn bob() -> Address {
    Address::from_low_u64(2)
}

fn new_bond() -> (Bond, ManualClock) {
    let config = BondConfig {
        bond_id: Uuid::nil(),
        currency: "EUR".to_string(),
        nominal_value: 100,
        nominal_value_decimals: 0,
        token_decimals: 0,
        starting_date: 0,
        maturity_date: 1_000_000,
        is_multi_partition: false,
    };
    let clock = ManualClock::new(1_000);
    let bond = Bond::new(config, Arc::new(clock.clone())).unwrap();
    (bond, clock)
}

fn coupon() -> Coupon {
    Coupon {
        record_date: 1_100,
        execution_date: 2_000,
        start_date: 0,
        end_date: 1_000,
        fixing_date: 1_500,
        rate: 1,
        rate_decimals: 0,
        rate_status: RateStatus::Set,
    }
}

/// Host role guard: only the configured operator may set coupons
struct CouponAgent(Address);

impl CommandGuard for CouponAgent {
    fn check(&self, ctx: &CommandContext) -> Result<(), GuardError> {
        if ctx.operation != Operation::SetCoupon {
            return Ok(());
        }
        match ctx.operator {
            Some(operator) if operator == self.0 => Ok(()),
            other => Err(GuardError::AccountHasNoRole {
                account: other.unwrap_or(Address::ZERO),
                operation: ctx.operation,
            }),
        }
    }
}

// ============================================================================
// Individual guards
// ============================================================================

#[test]
fn test_paused_token_rejects_every_command() {
    let (mut bond, _clock) = new_bond();
    let pause = PauseSwitch::new();
    bond.add_guard(pause.clone());

    bond.issue(alice(), Partition::DEFAULT, 10).unwrap();
    pause.pause();
    assert_eq!(
        bond.issue(alice(), Partition::DEFAULT, 10),
        Err(BondError::Guard(GuardError::TokenIsPaused))
    );
    assert_eq!(
        bond.set_coupon(coupon()),
        Err(BondError::Guard(GuardError::TokenIsPaused))
    );

    pause.unpause();
    bond.issue(alice(), Partition::DEFAULT, 10).unwrap();
    assert_eq!(bond.total_balance_of(&alice()), 20);
}

#[test]
fn test_blocked_account_rejected() {
    let (mut bond, _clock) = new_bond();
    let list = ControlList::new();
    bond.add_guard(list.clone());
    bond.issue(alice(), Partition::DEFAULT, 100).unwrap();

    list.block(bob());
    assert_eq!(
        bond.transfer(alice(), bob(), Partition::DEFAULT, 10),
        Err(BondError::Guard(GuardError::AccountIsBlocked(bob())))
    );
    assert_eq!(bond.total_balance_of(&bob()), 0);
}

#[test]
fn test_kyc_required_for_balance_commands() {
    let (mut bond, _clock) = new_bond();
    let kyc = KycRegistry::new();
    kyc.grant(alice());
    bond.add_guard(kyc.clone());

    bond.issue(alice(), Partition::DEFAULT, 100).unwrap();
    assert_eq!(
        bond.transfer(alice(), bob(), Partition::DEFAULT, 10),
        Err(BondError::Guard(GuardError::InvalidKycStatus(bob())))
    );
    assert!(bond.set_coupon(coupon()).is_ok());

    kyc.grant(bob());
    bond.transfer(alice(), bob(), Partition::DEFAULT, 10).unwrap();
    kyc.revoke(&alice());
    assert_eq!(
        bond.redeem(alice(), Partition::DEFAULT, 1),
        Err(BondError::Guard(GuardError::InvalidKycStatus(alice())))
    );
}

#[test]
fn test_clearing_mode_blocks_direct_transfers_only() {
    let (mut bond, _clock) = new_bond();
    let clearing = ClearingMode::new();
    bond.add_guard(clearing.clone());
    bond.issue(alice(), Partition::DEFAULT, 100).unwrap();

    clearing.activate();
    assert_eq!(
        bond.transfer(alice(), bob(), Partition::DEFAULT, 10),
        Err(BondError::Guard(GuardError::ClearingIsActivated))
    );
    let id = bond
        .create_clearing(alice(), bob(), Partition::DEFAULT, 10, 5_000)
        .unwrap();
    bond.approve_clearing(id).unwrap();
    assert_eq!(bond.total_balance_of(&bob()), 10);

    clearing.deactivate();
    bond.transfer(alice(), bob(), Partition::DEFAULT, 10).unwrap();
}

#[test]
fn test_recovered_wallet_rejected() {
    let (mut bond, _clock) = new_bond();
    let recovered = RecoveredWallets::new();
    bond.add_guard(recovered.clone());
    bond.issue(alice(), Partition::DEFAULT, 100).unwrap();

    recovered.mark_recovered(alice());
    assert_eq!(
        bond.lock(alice(), Partition::DEFAULT, 10, 5_000),
        Err(BondError::Guard(GuardError::WalletRecovered(alice())))
    );
}

#[test]
fn test_custom_role_guard() {
    let (bond, _clock) = new_bond();
    let agent = Address::from_low_u64(77);
    let mut bond = bond.with_guard(CouponAgent(agent));

    assert_eq!(
        bond.set_coupon(coupon()),
        Err(BondError::Guard(GuardError::AccountHasNoRole {
            account: Address::ZERO,
            operation: Operation::SetCoupon,
        }))
    );
    assert_eq!(bond.get_coupon_count(), 0);

    bond.set_operator(Some(agent));
    assert_eq!(bond.set_coupon(coupon()), Ok(1));
}

// ============================================================================
// Atomicity
// ============================================================================

#[test]
fn test_rejected_command_takes_no_snapshot() {
    let (mut bond, clock) = new_bond();
    let pause = PauseSwitch::new();
    bond.add_guard(pause.clone());
    bond.issue(alice(), Partition::DEFAULT, 100).unwrap();
    bond.set_coupon(coupon()).unwrap();
    let logged = bond.events().len();

    clock.advance(200);
    pause.pause();
    assert!(bond.transfer(alice(), bob(), Partition::DEFAULT, 10).is_err());
    assert_eq!(bond.get_coupon(1).unwrap().snapshot_id, 0);
    assert_eq!(bond.events().len(), logged);

    pause.unpause();
    bond.transfer(alice(), bob(), Partition::DEFAULT, 10).unwrap();
    assert_eq!(bond.get_coupon(1).unwrap().snapshot_id, 1);
    assert_eq!(bond.get_coupon_for(1, &alice()).unwrap().token_balance, 100);
}

#[test]
fn test_input_checks_precede_guards() {
    let (mut bond, _clock) = new_bond();
    let pause = PauseSwitch::new();
    pause.pause();
    bond.add_guard(pause);
    assert_eq!(
        bond.issue(Address::ZERO, Partition::DEFAULT, 1),
        Err(BondError::ZeroAddressNotAllowed)
    );
}
