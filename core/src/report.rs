//! Read-only summaries for the board header and the reports view.

use crate::{
    customer::{Customer, Provider, TicketResult},
    filter::BoardEntry,
    ledger::PaymentRecord,
    stage::Stage,
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StageColumn {
    pub stage: Stage,
    pub label: &'static str,
    pub count: usize,
}

/// Count of visible entries per stage, in lifecycle order.
pub fn stage_board(entries: &[BoardEntry<'_>]) -> Vec<StageColumn> {
    Stage::ALL
        .iter()
        .map(|&stage| StageColumn {
            stage,
            label: stage.range().label,
            count: entries.iter().filter(|e| e.stage() == stage).count(),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProviderTotal {
    pub provider: Provider,
    pub payments: usize,
}

pub fn payments_by_provider<'a>(
    records: impl IntoIterator<Item = &'a PaymentRecord>,
) -> Vec<ProviderTotal> {
    let mut totals: Vec<ProviderTotal> = Provider::ALL
        .iter()
        .map(|&provider| ProviderTotal { provider, payments: 0 })
        .collect();
    for record in records {
        if let Some(t) = totals.iter_mut().find(|t| t.provider == record.provider) {
            t.payments += 1;
        }
    }
    totals
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TicketOutcomes {
    pub on_time: usize,
    pub late: usize,
    pub very_late: usize,
    pub pending: usize,
}

impl TicketOutcomes {
    pub fn total(&self) -> usize {
        self.on_time + self.late + self.very_late + self.pending
    }

    /// Share of billed cycles that were eventually paid.
    pub fn recovery_rate(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            n => (n - self.pending) as f64 / n as f64,
        }
    }
}

/// Outcome breakdown across the historical tickets of `customers`.
pub fn ticket_outcomes<'a>(customers: impl IntoIterator<Item = &'a Customer>) -> TicketOutcomes {
    let mut outcomes = TicketOutcomes::default();
    for ticket in customers.into_iter().flat_map(|c| c.tickets.iter()) {
        match ticket.result {
            TicketResult::OnTime => outcomes.on_time += 1,
            TicketResult::Late => outcomes.late += 1,
            TicketResult::VeryLate => outcomes.very_late += 1,
            TicketResult::Pending => outcomes.pending += 1,
        }
    }
    outcomes
}
