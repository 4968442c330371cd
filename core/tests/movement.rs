//! Roster stepping: shape invariants and forced-branch scenarios.

use chrono::{DateTime, Utc};
use collections_core::{
    config::MovementConfig,
    customer::{Customer, CustomerStatus, PAYMENT_DETECTED_ACTION},
    movement::{step, Movement, MovementRoll},
    rng::{RngBank, SubsystemSlot},
    stage::{classify, Stage},
};
use std::collections::{HashSet, VecDeque};
use uuid::Uuid;

/// Replays a fixed list of rolls, then holds at 0.5.
struct ScriptedRolls {
    rolls: VecDeque<f64>,
    tokens: u128,
}

impl ScriptedRolls {
    fn new(rolls: &[f64]) -> Self {
        Self {
            rolls: rolls.iter().copied().collect(),
            tokens: 0,
        }
    }
}

impl MovementRoll for ScriptedRolls {
    fn roll(&mut self) -> f64 {
        self.rolls.pop_front().unwrap_or(0.5)
    }

    fn token(&mut self) -> Uuid {
        self.tokens += 1;
        Uuid::from_u128(self.tokens)
    }
}

fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_740_000_000, 0).expect("valid timestamp")
}

fn roster(lags: &[i32]) -> Vec<Customer> {
    lags.iter()
        .enumerate()
        .map(|(i, &lag)| Customer::new(format!("cust-{i}"), "Jane Cooper", lag))
        .collect()
}

#[test]
fn paying_customer_restarts_at_reset_lag() {
    let before = roster(&[3]);
    assert_eq!(before[0].stage(), Stage::PostPayment);

    let mut rolls = ScriptedRolls::new(&[0.01]);
    let outcome = step(&before, &MovementConfig::default(), &mut rolls, 4, now());

    let after = &outcome.roster[0];
    assert_eq!(after.lag(), -30);
    assert_eq!(after.stage(), Stage::Preventive);
    assert_eq!(after.status(), CustomerStatus::Active);

    assert_eq!(outcome.paid.len(), 1);
    let paid = &outcome.paid[0];
    assert_eq!(paid.status(), CustomerStatus::Paid);
    assert_eq!(paid.lag(), 3);
    assert_eq!(paid.source_id(), "cust-0");
    assert_eq!(paid.tick(), 4);
    let last = paid.history().last().expect("history entry");
    assert_eq!(last.action, PAYMENT_DETECTED_ACTION);
    assert_eq!(last.date, now());
    assert_eq!(
        outcome.movements[0],
        Movement::Paid { lag_at_payment: 3, reset_to: -30 }
    );
}

#[test]
fn advancing_customer_moves_one_day() {
    let before = roster(&[-10]);
    let mut rolls = ScriptedRolls::new(&[0.95]);
    let outcome = step(&before, &MovementConfig::default(), &mut rolls, 1, now());

    assert_eq!(outcome.roster[0].lag(), -9);
    assert_eq!(outcome.roster[0].status(), CustomerStatus::Active);
    assert!(outcome.paid.is_empty());
    assert_eq!(outcome.advanced_count(), 1);
}

#[test]
fn low_roll_before_due_date_holds() {
    let before = roster(&[-4]);
    let mut rolls = ScriptedRolls::new(&[0.01]);
    let outcome = step(&before, &MovementConfig::default(), &mut rolls, 1, now());

    assert_eq!(outcome.roster[0].lag(), -4);
    assert!(outcome.paid.is_empty());
    assert_eq!(outcome.movements[0], Movement::Held);
}

#[test]
fn input_roster_is_left_untouched() {
    let before = roster(&[0, 7, -2]);
    let copy = before.clone();
    let mut rolls = ScriptedRolls::new(&[0.01, 0.99, 0.99]);
    let outcome = step(&before, &MovementConfig::default(), &mut rolls, 1, now());

    assert_eq!(before, copy);
    assert_eq!(outcome.roster[0].lag(), -30);
    assert_eq!(outcome.roster[1].lag(), 8);
    assert_eq!(outcome.roster[2].lag(), -1);
}

#[test]
fn random_rosters_keep_shape_and_invariants() {
    let bank = RngBank::new(0x5eed);
    let mut source = bank.stream(SubsystemSlot::Roster, 0);
    let lags: Vec<i32> = (0..200).map(|_| source.lag_between(-40, 40)).collect();
    let mut current = roster(&lags);

    for tick in 1..=60 {
        let mut rng = bank.stream(SubsystemSlot::Movement, tick);
        let outcome = step(&current, &MovementConfig::default(), &mut rng, tick, now());

        assert_eq!(outcome.roster.len(), current.len());
        assert!(outcome.paid.len() <= current.len());
        for (before, after) in current.iter().zip(&outcome.roster) {
            assert_eq!(before.id, after.id, "tick {tick} reordered the roster");
            assert_eq!(after.stage(), classify(after.lag()));
            assert_eq!(after.status(), CustomerStatus::Active);
        }

        let live_ids: HashSet<&str> = outcome.roster.iter().map(|c| c.id.as_str()).collect();
        for paid in &outcome.paid {
            assert!(!live_ids.contains(paid.id()), "snapshot id {} collides", paid.id());
            assert_ne!(paid.id(), paid.source_id());
        }

        current = outcome.roster;
    }
}

#[test]
fn two_payments_in_one_tick_get_distinct_ids() {
    let before = roster(&[0, 0]);
    let mut rolls = ScriptedRolls::new(&[0.0, 0.0]);
    let outcome = step(&before, &MovementConfig::default(), &mut rolls, 1, now());

    assert_eq!(outcome.paid.len(), 2);
    assert_ne!(outcome.paid[0].id(), outcome.paid[1].id());
}
