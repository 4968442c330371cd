//! The simulation event stream.
//!
//! Every state change the engine makes is described by a SimEvent and
//! appended to the event log. Consumers (the runner, tests, replay)
//! read events; they never reach into engine internals to infer change.

use crate::{
    catalog::Channel,
    customer::Provider,
    stage::Stage,
    types::{EntityId, Lag, RunId, Tick},
};
use serde::{Deserialize, Serialize};

/// Every event emitted during simulation.
/// Variants are appended only, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Engine events ──────────────────────────────
    TickStarted {
        tick: Tick,
    },
    TickCompleted {
        tick: Tick,
        advanced: usize,
        paid: usize,
    },
    RunInitialized {
        run_id: RunId,
        seed: u64,
    },
    SimulationStarted {
        tick: Tick,
    },
    SimulationPaused {
        tick: Tick,
    },

    // ── Roster events ──────────────────────────────
    RosterGenerated {
        tick: Tick,
        customers: usize,
    },
    RosterReset {
        tick: Tick,
        customers: usize,
        cleared_payments: usize,
    },

    // ── Movement events ────────────────────────────
    CustomerAdvanced {
        tick: Tick,
        customer_id: EntityId,
        lag: Lag,
        stage: Stage,
    },
    StageChanged {
        tick: Tick,
        customer_id: EntityId,
        from: Stage,
        to: Stage,
    },
    PaymentDetected {
        tick: Tick,
        customer_id: EntityId,
        snapshot_id: EntityId,
        payment_id: EntityId,
        provider: Provider,
        lag_at_payment: Lag,
    },
    CycleRestarted {
        tick: Tick,
        customer_id: EntityId,
        lag: Lag,
    },

    // ── Outreach events ────────────────────────────
    OutreachTriggered {
        tick: Tick,
        customer_id: EntityId,
        playbook_id: EntityId,
        framework_id: EntityId,
        action_id: EntityId,
        channel: Channel,
    },

    // ── Operator events ────────────────────────────
    TourCompleted {
        tick: Tick,
    },
}

impl SimEvent {
    /// Stable string name for the event_type column in event_log.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::TickStarted { .. }       => "tick_started",
            Self::TickCompleted { .. }     => "tick_completed",
            Self::RunInitialized { .. }    => "run_initialized",
            Self::SimulationStarted { .. } => "simulation_started",
            Self::SimulationPaused { .. }  => "simulation_paused",
            Self::RosterGenerated { .. }   => "roster_generated",
            Self::RosterReset { .. }       => "roster_reset",
            Self::CustomerAdvanced { .. }  => "customer_advanced",
            Self::StageChanged { .. }      => "stage_changed",
            Self::PaymentDetected { .. }   => "payment_detected",
            Self::CycleRestarted { .. }    => "cycle_restarted",
            Self::OutreachTriggered { .. } => "outreach_triggered",
            Self::TourCompleted { .. }     => "tour_completed",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id: Option<i64>,
    pub run_id: RunId,
    pub tick: Tick,
    pub source: String,
    pub event_type: String,
    pub payload: String, // JSON-serialized SimEvent
}
