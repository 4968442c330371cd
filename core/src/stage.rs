//! Lifecycle stages and the lag → stage classifier.
//!
//! The range table covers the whole integer line with no gaps and no
//! overlaps. `classify` is a pure, total function over `Lag`.

use crate::types::Lag;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Preventive,
    PaymentDay,
    PostPayment,
    Reframing,
    Escalation,
}

impl Stage {
    /// All stages in lifecycle order.
    pub const ALL: [Stage; 5] = [
        Stage::Preventive,
        Stage::PaymentDay,
        Stage::PostPayment,
        Stage::Reframing,
        Stage::Escalation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preventive => "preventive",
            Self::PaymentDay => "payment_day",
            Self::PostPayment => "post_payment",
            Self::Reframing => "reframing",
            Self::Escalation => "escalation",
        }
    }

    /// The table row describing this stage.
    pub fn range(&self) -> &'static StageRange {
        // Every stage has exactly one row; the fallback is unreachable.
        STAGE_RANGES
            .iter()
            .find(|r| r.stage == *self)
            .unwrap_or(&STAGE_RANGES[STAGE_RANGES.len() - 1])
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ColorTheme {
    Emerald,
    Blue,
    Amber,
    Orange,
    Rose,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageRange {
    pub stage: Stage,
    pub min_lag: Lag,
    pub max_lag: Lag,
    pub label: &'static str,
    pub description: &'static str,
    pub color: ColorTheme,
    /// Lag window the board actually displays for this column.
    pub nominal_min: Lag,
    pub nominal_max: Lag,
}

impl StageRange {
    pub fn contains(&self, lag: Lag) -> bool {
        self.min_lag <= lag && lag <= self.max_lag
    }
}

pub static STAGE_RANGES: [StageRange; 5] = [
    StageRange {
        stage: Stage::Preventive,
        min_lag: Lag::MIN,
        max_lag: -1,
        label: "Preventive",
        description: "Upcoming payments",
        color: ColorTheme::Emerald,
        nominal_min: -30,
        nominal_max: -1,
    },
    StageRange {
        stage: Stage::PaymentDay,
        min_lag: 0,
        max_lag: 0,
        label: "Payment Day",
        description: "Due today",
        color: ColorTheme::Blue,
        nominal_min: 0,
        nominal_max: 0,
    },
    StageRange {
        stage: Stage::PostPayment,
        min_lag: 1,
        max_lag: 5,
        label: "Post Payment",
        description: "Grace period",
        color: ColorTheme::Amber,
        nominal_min: 1,
        nominal_max: 5,
    },
    StageRange {
        stage: Stage::Reframing,
        min_lag: 6,
        max_lag: 15,
        label: "Reframing",
        description: "Agreement phase",
        color: ColorTheme::Orange,
        nominal_min: 6,
        nominal_max: 15,
    },
    StageRange {
        stage: Stage::Escalation,
        min_lag: 16,
        max_lag: Lag::MAX,
        label: "Escalation",
        description: "Critical attention",
        color: ColorTheme::Rose,
        nominal_min: 16,
        nominal_max: 999,
    },
];

/// Map a lag to its lifecycle stage.
pub fn classify(lag: Lag) -> Stage {
    classify_in(&STAGE_RANGES, lag)
}

/// Classify against an arbitrary table. Falls back to `Escalation`
/// when no row matches.
pub fn classify_in(table: &[StageRange], lag: Lag) -> Stage {
    table
        .iter()
        .find(|r| r.contains(lag))
        .map(|r| r.stage)
        .unwrap_or(Stage::Escalation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_contiguous_and_ordered() {
        assert_eq!(STAGE_RANGES[0].min_lag, Lag::MIN);
        assert_eq!(STAGE_RANGES[STAGE_RANGES.len() - 1].max_lag, Lag::MAX);
        for pair in STAGE_RANGES.windows(2) {
            assert_eq!(
                pair[0].max_lag + 1,
                pair[1].min_lag,
                "gap or overlap between {} and {}",
                pair[0].stage,
                pair[1].stage
            );
            assert!(pair[0].stage < pair[1].stage);
        }
    }

    #[test]
    fn extremes_are_covered() {
        assert_eq!(classify(Lag::MIN), Stage::Preventive);
        assert_eq!(classify(Lag::MAX), Stage::Escalation);
    }

    #[test]
    fn empty_table_falls_back_to_escalation() {
        assert_eq!(classify_in(&[], 0), Stage::Escalation);
        assert_eq!(classify_in(&STAGE_RANGES[1..2], -5), Stage::Escalation);
    }

    #[test]
    fn every_stage_has_its_own_row() {
        for stage in Stage::ALL {
            assert_eq!(stage.range().stage, stage);
        }
    }
}
