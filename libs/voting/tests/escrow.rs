//! Vote-escrow lifecycle tests

use config::protocol::escrow::{MAXTIME, WEEK};
use voting::{DepositKind, EscrowError, LockedBalance, VotingEscrow};
use types::{account, ErrorCategory, Tx};

const UNIT: u128 = 1_000_000_000_000_000_000;
const T0: u64 = 200 * WEEK;

fn slope_of(amount: u128) -> i128 {
    amount as i128 / MAXTIME as i128
}

#[test]
fn test_create_lock_guards() {
    let mut ve = VotingEscrow::new(T0);
    let alice = Tx::new(account(1), T0);

    assert_eq!(
        ve.create_lock(&alice, 0, T0 + WEEK).unwrap_err(),
        EscrowError::ZeroValue
    );
    // Rounds down to `T0`, which is not in the future
    assert_eq!(
        ve.create_lock(&alice, UNIT, T0 + WEEK - 1).unwrap_err(),
        EscrowError::LockNotInFuture
    );
    assert_eq!(
        ve.create_lock(&alice, UNIT, T0 + MAXTIME + WEEK).unwrap_err(),
        EscrowError::LockTooLong
    );

    ve.create_lock(&alice, UNIT, T0 + 10 * WEEK).unwrap();
    assert_eq!(
        ve.create_lock(&alice, UNIT, T0 + 20 * WEEK).unwrap_err(),
        EscrowError::WithdrawOldTokensFirst
    );
    assert_eq!(
        ve.locked(&alice.sender),
        LockedBalance {
            amount: UNIT as i128,
            end: T0 + 10 * WEEK
        }
    );
}

#[test]
fn test_increase_amount_keeps_end() {
    let mut ve = VotingEscrow::new(T0);
    let alice = Tx::new(account(1), T0);

    assert_eq!(
        ve.increase_lock_amount(&alice, UNIT).unwrap_err(),
        EscrowError::NoExistingLock
    );

    ve.create_lock(&alice, UNIT, T0 + 52 * WEEK).unwrap();
    let (event, supply) = ve
        .increase_lock_amount(&alice.at(T0 + WEEK), 2 * UNIT)
        .unwrap();

    assert_eq!(event.kind, DepositKind::IncreaseLockAmount);
    assert_eq!(event.locktime, T0 + 52 * WEEK);
    assert_eq!(supply.prev_supply, UNIT as i128);
    assert_eq!(supply.supply, 3 * UNIT as i128);
    assert_eq!(ve.get_last_user_slope(&alice.sender), slope_of(3 * UNIT));
    assert_eq!(
        ve.balance_of(&alice.sender, T0 + WEEK),
        slope_of(3 * UNIT) * (51 * WEEK) as i128
    );
}

#[test]
fn test_increase_unlock_time() {
    let mut ve = VotingEscrow::new(T0);
    let alice = Tx::new(account(1), T0);

    assert_eq!(
        ve.increase_unlock_time(&alice, T0 + 10 * WEEK).unwrap_err(),
        EscrowError::LockExpired
    );

    ve.create_lock(&alice, UNIT, T0 + 10 * WEEK).unwrap();
    assert_eq!(
        ve.increase_unlock_time(&alice, T0 + 10 * WEEK + 3).unwrap_err(),
        EscrowError::CanOnlyIncreaseDuration
    );
    assert_eq!(
        ve.increase_unlock_time(&alice, T0 + MAXTIME + WEEK).unwrap_err(),
        EscrowError::LockTooLong
    );

    let (event, _) = ve.increase_unlock_time(&alice, T0 + 20 * WEEK).unwrap();
    assert_eq!(event.kind, DepositKind::IncreaseUnlockTime);
    assert_eq!(event.value, 0);
    assert_eq!(ve.locked_end(&alice.sender), T0 + 20 * WEEK);

    // Slope drop moved from the old end to the new one
    assert_eq!(ve.slope_change(T0 + 10 * WEEK), 0);
    assert_eq!(ve.slope_change(T0 + 20 * WEEK), -slope_of(UNIT));
    assert!(ve.balance_of(&alice.sender, T0 + 15 * WEEK) > 0);
}

#[test]
fn test_deposit_for_tops_up_another_lock() {
    let mut ve = VotingEscrow::new(T0);
    let alice = account(1);
    let bob = Tx::new(account(2), T0);

    assert_eq!(
        ve.deposit_for(&bob, alice, UNIT).unwrap_err(),
        EscrowError::NoExistingLock
    );

    ve.create_lock(&Tx::new(alice, T0), UNIT, T0 + 4 * WEEK)
        .unwrap();
    let (event, _) = ve.deposit_for(&bob, alice, UNIT).unwrap();
    assert_eq!(event.provider, alice);
    assert_eq!(event.kind, DepositKind::DepositFor);
    assert_eq!(ve.locked(&alice).amount, 2 * UNIT as i128);
    assert_eq!(ve.locked(&bob.sender).amount, 0);

    assert_eq!(
        ve.deposit_for(&bob.at(T0 + 4 * WEEK), alice, UNIT)
            .unwrap_err(),
        EscrowError::ExpiredLock
    );
}

#[test]
fn test_withdraw_after_expiry() {
    let mut ve = VotingEscrow::new(T0);
    let alice = Tx::new(account(1), T0);
    ve.create_lock(&alice, 5 * UNIT, T0 + 3 * WEEK).unwrap();

    let early = ve.withdraw(&alice.at(T0 + 3 * WEEK - 1)).unwrap_err();
    assert_eq!(early, EscrowError::LockNotExpired);
    assert_eq!(early.category(), ErrorCategory::Lifecycle);

    let (event, supply) = ve.withdraw(&alice.at(T0 + 3 * WEEK)).unwrap();
    assert_eq!(event.value, 5 * UNIT);
    assert_eq!(supply.supply, 0);
    assert_eq!(ve.locked(&alice.sender), LockedBalance::default());
    assert_eq!(ve.total_supply(T0 + 3 * WEEK), 0);

    // The slot is free again
    ve.create_lock(&alice.at(T0 + 4 * WEEK), UNIT, T0 + 8 * WEEK)
        .unwrap();
}

#[test]
fn test_historical_balances_survive_later_changes() {
    let mut ve = VotingEscrow::new(T0);
    let alice = Tx::new(account(1), T0);
    ve.create_lock(&alice, UNIT, T0 + 100 * WEEK).unwrap();
    let before = ve.balance_of(&alice.sender, T0 + 2 * WEEK);
    let supply_before = ve.total_supply(T0 + 2 * WEEK);

    ve.increase_lock_amount(&alice.at(T0 + 5 * WEEK), 10 * UNIT)
        .unwrap();

    assert_eq!(ve.balance_of(&alice.sender, T0 + 2 * WEEK), before);
    assert_eq!(ve.total_supply(T0 + 2 * WEEK), supply_before);
    assert!(ve.balance_of(&alice.sender, T0 + 5 * WEEK) > before);
}

#[test]
fn test_checkpoint_sweeps_weekly_points() {
    let mut ve = VotingEscrow::new(T0);
    ve.create_lock(&Tx::new(account(1), T0), UNIT, T0 + 2 * WEEK)
        .unwrap();
    let epoch = ve.epoch();

    ve.checkpoint(&Tx::new(account(9), T0 + 3 * WEEK + 10))
        .unwrap();

    // Two live week boundaries plus the checkpoint itself; the spent
    // curve is not swept week by week
    assert_eq!(ve.epoch(), epoch + 3);
    let last = ve.point_history().last().copied().unwrap();
    assert_eq!(last.ts, T0 + 3 * WEEK + 10);
    assert_eq!(last.bias, 0);
    assert_eq!(last.slope, 0);
}

#[test]
fn test_far_future_supply_and_checkpoint() {
    let mut ve = VotingEscrow::new(T0);
    let user = Tx::new(account(1), T0);
    ve.create_lock(&user, UNIT * 100, T0 + 4 * WEEK).unwrap();

    assert_eq!(ve.total_supply(200_000_000 * WEEK), 0);
    assert_eq!(ve.total_supply(u64::MAX), 0);
    assert_eq!(ve.balance_of(&user.sender, u64::MAX), 0);

    let epoch = ve.epoch();
    ve.checkpoint(&Tx::new(account(9), u64::MAX)).unwrap();
    assert_eq!(ve.epoch(), epoch + 5);
    let last = ve.point_history().last().copied().unwrap();
    assert_eq!(last.ts, u64::MAX);
    assert_eq!(last.bias, 0);
    assert_eq!(ve.total_supply(u64::MAX), 0);
}
