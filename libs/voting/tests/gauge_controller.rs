//! Gauge voting driven by real escrow locks

use config::protocol::escrow::WEEK;
use config::protocol::gauge::MULTIPLIER;
use config::{GaugeTypeSettings, VotingSettings};
use proptest::prelude::*;
use types::{account, Roles, Tx, U256Ext, U256};
use voting::{GaugeController, GaugeError, GaugeKey, VotingEscrow};

const UNIT: u128 = 1_000_000_000_000_000_000;
const T0: u64 = 500 * WEEK;
const ADMIN: u64 = 1;

fn gauge(n: u64) -> GaugeKey {
    GaugeKey::new(account(1_000 + n), 1)
}

fn admin_at(t: u64) -> Tx {
    Tx::new(account(ADMIN), t)
}

/// Two gauge types, the second weighted twice as heavily
fn setup(gauges_per_type: u64) -> GaugeController {
    let settings = VotingSettings {
        gauge_types: vec![
            GaugeTypeSettings {
                name: "stable".to_string(),
                weight: 1,
            },
            GaugeTypeSettings {
                name: "volatile".to_string(),
                weight: 2,
            },
        ],
        ..VotingSettings::default()
    };
    let mut controller =
        GaugeController::new(&settings, Roles::single(account(ADMIN)), T0).unwrap();
    for type_id in 0..2u64 {
        for i in 0..gauges_per_type {
            controller
                .add_gauge(
                    &admin_at(T0),
                    gauge(type_id * 100 + i),
                    type_id as usize,
                    U256::zero(),
                )
                .unwrap();
        }
    }
    controller
}

fn lock(ve: &mut VotingEscrow, user: u64, amount: u128, weeks: u64) {
    ve.create_lock(&Tx::new(account(user), T0), amount * UNIT, T0 + weeks * WEEK)
        .unwrap();
}

#[test]
fn test_type_weights_scale_relative_weight() {
    let mut ve = VotingEscrow::new(T0);
    let mut controller = setup(1);
    lock(&mut ve, 2, 1_000, 104);

    let voter = Tx::new(account(2), T0);
    controller
        .vote_for_gauge_weights_bulk(&voter, &ve, &[gauge(0), gauge(100)], &[5_000, 5_000])
        .unwrap();

    let next = T0 + WEEK;
    let stable = controller.gauge_relative_weight(&gauge(0), next);
    let volatile = controller.gauge_relative_weight(&gauge(100), next);

    // Equal votes, double type weight: one third and two thirds
    let third = U256::from(MULTIPLIER) / 3;
    assert!(stable.abs_diff(third) <= U256::one());
    assert!(volatile.abs_diff(third * 2) <= U256::from(2));
    assert!(stable + volatile <= U256::from(MULTIPLIER));
}

#[test]
fn test_relock_extends_vote_after_delay() {
    let mut ve = VotingEscrow::new(T0);
    let mut controller = setup(1);
    lock(&mut ve, 2, 100, 10);

    let voter = Tx::new(account(2), T0);
    controller
        .vote_for_gauge_weights(&voter, &ve, gauge(0), 10_000)
        .unwrap();
    let slope = controller.vote_user_slope(&voter.sender, &gauge(0));
    assert_eq!(slope.end, T0 + 10 * WEEK);
    assert_eq!(slope.power, 10_000);

    let later = voter.at(T0 + 2 * WEEK);
    ve.increase_unlock_time(&later, T0 + 50 * WEEK).unwrap();
    controller
        .vote_for_gauge_weights(&later, &ve, gauge(0), 10_000)
        .unwrap();

    let slope = controller.vote_user_slope(&voter.sender, &gauge(0));
    assert_eq!(slope.end, T0 + 50 * WEEK);

    // Only the new vote's decay remains scheduled
    controller
        .checkpoint_gauge(&admin_at(T0 + 20 * WEEK), gauge(0))
        .unwrap();
    assert!(!controller.get_gauge_weight(&gauge(0)).is_zero());
    assert_eq!(
        controller.gauge_relative_weight(&gauge(0), T0 + 20 * WEEK),
        U256::from(MULTIPLIER)
    );
}

#[test]
fn test_withdrawing_vote_clears_weight() {
    let mut ve = VotingEscrow::new(T0);
    let mut controller = setup(1);
    lock(&mut ve, 2, 100, 52);
    let voter = Tx::new(account(2), T0);

    controller
        .vote_for_gauge_weights(&voter, &ve, gauge(0), 10_000)
        .unwrap();
    controller
        .vote_for_gauge_weights(&voter.at(T0 + 2 * WEEK), &ve, gauge(0), 0)
        .unwrap();

    assert_eq!(controller.vote_user_power(&voter.sender), 0);
    assert!(controller
        .points_weight(&gauge(0), T0 + 3 * WEEK)
        .bias
        .is_zero());
    assert!(controller.points_total(T0 + 3 * WEEK).is_zero());
    // Weight already in effect for the current week is untouched
    assert!(!controller.points_total(T0 + 2 * WEEK).is_zero());
}

#[test]
fn test_revote_after_kill_sets_power() {
    let mut ve = VotingEscrow::new(T0);
    let mut controller = setup(2);
    lock(&mut ve, 2, 100, 52);
    let voter = Tx::new(account(2), T0);

    controller
        .vote_for_gauge_weights(&voter, &ve, gauge(0), 6_000)
        .unwrap();
    controller
        .vote_for_gauge_weights(&voter, &ve, gauge(1), 4_000)
        .unwrap();

    controller.kill_gauge(&admin_at(T0), gauge(0)).unwrap();
    assert_eq!(controller.vote_user_power(&voter.sender), 4_000);
    assert_eq!(controller.vote_user_slope(&voter.sender, &gauge(0)).power, 0);

    controller.unkill_gauge(&admin_at(T0), gauge(0)).unwrap();
    controller
        .vote_for_gauge_weights(&voter.at(T0 + 1), &ve, gauge(0), 3_000)
        .unwrap();
    assert_eq!(controller.vote_user_power(&voter.sender), 7_000);

    assert_eq!(controller.vote_user_slope(&voter.sender, &gauge(0)).power, 3_000);
    assert_eq!(controller.vote_user_slope(&voter.sender, &gauge(1)).power, 4_000);
}

#[test]
fn test_no_lock_cannot_vote() {
    let ve = VotingEscrow::new(T0);
    let mut controller = setup(1);
    assert_eq!(
        controller.vote_for_gauge_weights(&Tx::new(account(7), T0), &ve, gauge(0), 100),
        Err(GaugeError::LockExpiresTooSoon)
    );
}

#[test]
fn test_admin_vote_sits_beside_user_votes() {
    let mut ve = VotingEscrow::new(T0);
    let mut controller = setup(1);
    lock(&mut ve, 2, 100, 52);

    controller
        .vote_for_gauge_weights(&Tx::new(account(2), T0), &ve, gauge(0), 10_000)
        .unwrap();
    let user_weight = controller.points_weight(&gauge(0), T0 + WEEK).bias;

    let slope = U256::from(ve.get_last_user_slope(&account(2)) as u128);
    controller
        .vote_from_admin(&admin_at(T0), gauge(100), slope, T0 + 52 * WEEK)
        .unwrap();
    assert_eq!(controller.points_weight(&gauge(100), T0 + WEEK).bias, user_weight);
    assert_eq!(controller.vote_user_power(&account(ADMIN)), 0);

    // Same raw weight, double type weight
    let volatile = controller.gauge_relative_weight(&gauge(100), T0 + WEEK);
    let stable = controller.gauge_relative_weight(&gauge(0), T0 + WEEK);
    assert!(volatile > stable);

    controller
        .vote_from_admin(&admin_at(T0 + WEEK), gauge(100), U256::zero(), 0)
        .unwrap();
    assert!(controller
        .points_weight(&gauge(100), T0 + 2 * WEEK)
        .bias
        .is_zero());

    assert_eq!(
        controller.vote_from_admin(&Tx::new(account(2), T0), gauge(0), slope, T0 + 52 * WEEK),
        Err(GaugeError::Unauthorized(types::AuthError::NotAdmin))
    );
}

#[test]
fn test_change_weights_and_setters() {
    let mut controller = setup(1);
    let admin = admin_at(T0);

    controller
        .change_gauge_weight(&admin, gauge(0), U256::from(1_000))
        .unwrap();
    controller
        .change_gauge_weight(&admin, gauge(100), U256::from(1_000))
        .unwrap();
    let event = controller
        .change_type_weight(&admin, 1, U256::from(3))
        .unwrap();
    assert_eq!(event.total_weight, U256::from(4_000));
    assert_eq!(controller.get_total_weight(), U256::from(4_000));
    assert_eq!(
        controller.gauge_relative_weight(&gauge(0), T0 + WEEK),
        U256::from(MULTIPLIER / 4)
    );

    assert_eq!(
        controller.change_type_weight(&admin, 5, U256::one()),
        Err(GaugeError::InvalidGaugeType)
    );
    assert_eq!(
        controller.set_weight_vote_delay(&admin, WEEK - 1),
        Err(GaugeError::DelayTooShort)
    );
    controller.set_weight_vote_delay(&admin, 2 * WEEK).unwrap();
    assert_eq!(controller.weight_vote_delay(), 2 * WEEK);
    assert_eq!(
        controller.set_admin_only_period(&admin, WEEK),
        Err(GaugeError::AdminOnlyPeriodTooLong)
    );
}

#[test]
fn test_add_type_after_deployment() {
    let mut controller = setup(0);
    let event = controller
        .add_type(&admin_at(T0), "bridge", U256::from(5))
        .unwrap();
    assert_eq!(event.type_id, 2);
    assert_eq!(controller.get_type_weight(2), U256::from(5));

    controller
        .add_gauge(&admin_at(T0), gauge(7), 2, U256::from(10))
        .unwrap();
    assert_eq!(controller.get_weights_sum_per_type(2), U256::from(10));
    assert_eq!(controller.get_total_weight(), U256::from(50));
    assert_eq!(
        controller.gauge_relative_weight(&gauge(7), T0 + WEEK),
        U256::from(MULTIPLIER)
    );
}

proptest! {
    #[test]
    fn prop_relative_weights_never_exceed_one(
        votes in prop::collection::vec((2u64..6, 0u64..4, 1u64..10_000, 2u64..150), 1..12),
        week in 1u64..30,
    ) {
        let mut ve = VotingEscrow::new(T0);
        let mut controller = setup(2);
        let keys = [gauge(0), gauge(1), gauge(100), gauge(101)];

        for (user, key, weight, weeks) in votes {
            if ve.locked(&account(user)).amount == 0 {
                lock(&mut ve, user, 1_000, weeks);
            }
            let tx = Tx::new(account(user), T0);
            // Over-budget and repeated votes are rejected; the rest must land
            match controller.vote_for_gauge_weights(&tx, &ve, keys[key as usize], weight) {
                Ok(_)
                | Err(GaugeError::TooMuchPowerUsed)
                | Err(GaugeError::VoteTooOften)
                | Err(GaugeError::LockExpiresTooSoon) => {}
                Err(other) => prop_assert!(false, "unexpected {:?}", other),
            }
            prop_assert!(controller.vote_user_power(&account(user)) <= 10_000);
        }

        let at = T0 + week * WEEK;
        controller.checkpoint(&admin_at(at));
        for key in &keys {
            controller.checkpoint_gauge(&admin_at(at), *key).unwrap();
        }
        let total: U256 = keys
            .iter()
            .map(|k| controller.gauge_relative_weight(k, at))
            .fold(U256::zero(), |acc, w| acc + w);
        prop_assert!(total <= U256::from(MULTIPLIER));
        if !controller.points_total(at).is_zero() {
            prop_assert!(total + U256::from(keys.len()) >= U256::from(MULTIPLIER));
        }
    }
}
