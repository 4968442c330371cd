use crate::filter::FilterState;
use serde::{Deserialize, Serialize};

/// All operator-issued commands.
/// Variants are appended only, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum PlayerCommand {
    // ── Simulation control ────────────────────────
    StartSimulation,
    PauseSimulation,
    ToggleSimulation,
    /// Fresh roster, empty ledger, simulation stopped, filters cleared.
    Reset,

    // ── Board ─────────────────────────────────────
    SetFilter { filters: FilterState },
    ClearFilters,

    // ── Onboarding ────────────────────────────────
    CompleteTour,
}

impl PlayerCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::StartSimulation  => "start_simulation",
            Self::PauseSimulation  => "pause_simulation",
            Self::ToggleSimulation => "toggle_simulation",
            Self::Reset            => "reset",
            Self::SetFilter { .. } => "set_filter",
            Self::ClearFilters     => "clear_filters",
            Self::CompleteTour     => "complete_tour",
        }
    }
}
