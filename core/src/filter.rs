//! Board filtering over the live roster and the paid history.

use crate::{
    customer::{Customer, CustomerStatus, PaidSnapshot},
    stage::Stage,
    types::Lag,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
    #[default]
    Active,
    Paid,
    All,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilterState {
    /// Empty = every campaign.
    #[serde(default)]
    pub campaigns: Vec<String>,
    #[serde(default)]
    pub status: StatusFilter,
    /// Empty = every stage.
    #[serde(default)]
    pub stages: Vec<Stage>,
    #[serde(default)]
    pub search: String,
}

/// One card on the board: either a live customer or a paid snapshot.
#[derive(Debug, Clone, Copy)]
pub enum BoardEntry<'a> {
    Live(&'a Customer),
    Paid(&'a PaidSnapshot),
}

impl<'a> BoardEntry<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            Self::Live(c) => &c.id,
            Self::Paid(p) => p.id(),
        }
    }

    pub fn customer(&self) -> &'a Customer {
        match self {
            Self::Live(c) => c,
            Self::Paid(p) => p.customer(),
        }
    }

    pub fn status(&self) -> CustomerStatus {
        match self {
            Self::Live(c) => c.status(),
            Self::Paid(p) => p.status(),
        }
    }

    pub fn lag(&self) -> Lag {
        self.customer().lag()
    }

    pub fn stage(&self) -> Stage {
        self.customer().stage()
    }
}

impl FilterState {
    pub fn toggle_campaign(&mut self, campaign: &str) {
        if let Some(pos) = self.campaigns.iter().position(|c| c == campaign) {
            self.campaigns.remove(pos);
        } else {
            self.campaigns.push(campaign.to_string());
        }
    }

    pub fn toggle_stage(&mut self, stage: Stage) {
        if let Some(pos) = self.stages.iter().position(|s| *s == stage) {
            self.stages.remove(pos);
        } else {
            self.stages.push(stage);
        }
    }

    /// Reset everything but the search term.
    pub fn clear(&mut self) {
        let search = std::mem::take(&mut self.search);
        *self = Self {
            search,
            ..Self::default()
        };
    }

    pub fn active_count(&self) -> usize {
        self.campaigns.len() + self.stages.len()
    }

    pub fn matches(&self, entry: &BoardEntry<'_>) -> bool {
        let customer = entry.customer();
        if !self.campaigns.is_empty() && !self.campaigns.contains(&customer.campaign) {
            return false;
        }
        if !self.stages.is_empty() && !self.stages.contains(&entry.stage()) {
            return false;
        }
        if !self.search.is_empty() {
            let term = self.search.to_lowercase();
            return customer.name.to_lowercase().contains(&term)
                || customer.email.to_lowercase().contains(&term);
        }
        true
    }

    /// Entries visible under this filter. Live entries come first.
    pub fn apply<'a>(
        &self,
        roster: &'a [Customer],
        paid: impl IntoIterator<Item = &'a PaidSnapshot>,
    ) -> Vec<BoardEntry<'a>> {
        let live = roster.iter().map(BoardEntry::Live);
        let paid = paid.into_iter().map(BoardEntry::Paid);
        match self.status {
            StatusFilter::Active => live.filter(|e| self.matches(e)).collect(),
            StatusFilter::Paid => paid.filter(|e| self.matches(e)).collect(),
            StatusFilter::All => live.chain(paid).filter(|e| self.matches(e)).collect(),
        }
    }

    /// Header context for the current view.
    pub fn breadcrumb(&self) -> &'static str {
        if !self.search.is_empty() {
            return "Search Results";
        }
        match self.status {
            StatusFilter::Paid => "Payment History",
            StatusFilter::All => "Overview",
            StatusFilter::Active => "Commitment Map",
        }
    }
}
