//! Population stepping: one tick of random movement over the roster.
//!
//! Per customer, exactly one roll decides the outcome:
//!   - roll > advance_threshold             → lag + 1
//!   - else roll < payment_threshold, lag ≥ 0 → paid snapshot, lag reset
//!   - else                                 → unchanged
//!
//! The payment branch is only reached when the advance branch did not
//! fire. This ordering is behaviour and must not be "fixed" into two
//! independent draws.

use crate::{
    config::MovementConfig,
    customer::{Customer, PaidSnapshot},
    rng::SubsystemRng,
    types::{Lag, Tick},
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Source of the per-customer roll and the snapshot uniqueness token.
pub trait MovementRoll {
    /// Uniform in [0, 1).
    fn roll(&mut self) -> f64;

    fn token(&mut self) -> Uuid;
}

impl MovementRoll for SubsystemRng {
    fn roll(&mut self) -> f64 {
        self.next_f64()
    }

    fn token(&mut self) -> Uuid {
        self.uuid()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Advanced { from: Lag, to: Lag },
    Paid { lag_at_payment: Lag, reset_to: Lag },
    Held,
}

/// The result of one tick.
#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    /// Same length, ids and order as the input roster.
    pub roster: Vec<Customer>,
    pub paid: Vec<PaidSnapshot>,
    /// One entry per roster position.
    pub movements: Vec<Movement>,
}

impl StepOutcome {
    pub fn advanced_count(&self) -> usize {
        self.movements
            .iter()
            .filter(|m| matches!(m, Movement::Advanced { .. }))
            .count()
    }
}

/// Decide the movement for a single customer from one roll.
pub fn decide(lag: Lag, roll: f64, params: &MovementConfig) -> Movement {
    if roll > params.advance_threshold {
        Movement::Advanced {
            from: lag,
            to: lag.saturating_add(1),
        }
    } else if roll < params.payment_threshold && lag >= 0 {
        Movement::Paid {
            lag_at_payment: lag,
            reset_to: params.reset_lag,
        }
    } else {
        Movement::Held
    }
}

/// Produce the next roster and the payments detected this tick.
/// The input roster is left untouched.
pub fn step<R: MovementRoll + ?Sized>(
    roster: &[Customer],
    params: &MovementConfig,
    rng: &mut R,
    tick: Tick,
    now: DateTime<Utc>,
) -> StepOutcome {
    let mut outcome = StepOutcome {
        roster: Vec::with_capacity(roster.len()),
        paid: Vec::new(),
        movements: Vec::with_capacity(roster.len()),
    };

    for customer in roster {
        let movement = decide(customer.lag(), rng.roll(), params);
        let mut next = customer.clone();
        match movement {
            Movement::Advanced { to, .. } => next.set_lag(to),
            Movement::Paid { reset_to, .. } => {
                outcome
                    .paid
                    .push(PaidSnapshot::record(customer, rng.token(), tick, now));
                next.set_lag(reset_to);
            }
            Movement::Held => {}
        }
        outcome.roster.push(next);
        outcome.movements.push(movement);
    }

    outcome
}
