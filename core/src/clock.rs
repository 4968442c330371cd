//! Simulation clock: owns tick state, run/pause and the tick interval.

use crate::{config::ClockConfig, types::Tick};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    pub current_tick: Tick,
    pub paused: bool,
    pub tick_interval_ms: u64,
    pub origin: DateTime<Utc>,
}

impl SimClock {
    pub fn new(config: &ClockConfig) -> Self {
        Self {
            current_tick: 0,
            paused: true,
            tick_interval_ms: config.tick_interval_ms,
            origin: config.origin,
        }
    }

    /// Advance one tick. Returns the new tick number.
    /// Panics if called while paused; callers must check.
    pub fn advance(&mut self) -> Tick {
        assert!(!self.paused, "advance() called on paused clock");
        self.current_tick += 1;
        self.current_tick
    }

    pub fn pause(&mut self)  { self.paused = true;  }
    pub fn resume(&mut self) { self.paused = false; }

    /// Flip between running and paused. Returns true when now running.
    pub fn toggle(&mut self) -> bool {
        self.paused = !self.paused;
        !self.paused
    }

    pub fn is_running(&self) -> bool {
        !self.paused
    }

    /// Simulated date of `tick`. One tick is one day.
    pub fn date_at(&self, tick: Tick) -> DateTime<Utc> {
        self.origin + Duration::days(tick as i64)
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.date_at(self.current_tick)
    }

    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }
}
