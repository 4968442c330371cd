//! Live customer records and the immutable paid snapshots spun off them.
//!
//! A `Customer` owns its lag privately; the stage is never stored and is
//! always derived through `stage::classify`. `set_lag` is the only write
//! path for the lag.

use crate::{
    stage::{classify, Stage},
    types::{EntityId, Lag, Tick},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const PAYMENT_DETECTED_ACTION: &str = "Payment detected";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Provider {
    Stripe,
    Link,
    External,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Stripe, Provider::Link, Provider::External];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stripe => "Stripe",
            Self::Link => "Link",
            Self::External => "External",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CustomerStatus {
    Active,
    Paid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryEntry {
    pub date: DateTime<Utc>,
    pub action: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Email,
    Sms,
    Call,
    Payment,
    Note,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TicketActivity {
    pub id: EntityId,
    pub date: DateTime<Utc>,
    pub kind: ActivityKind,
    pub description: String,
    pub user: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Paid,
    Open,
    Overdue,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TicketResult {
    OnTime,
    Late,
    VeryLate,
    Pending,
}

/// One historical billing cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    pub id: EntityId,
    pub period: String,
    pub due_date: DateTime<Utc>,
    pub paid_date: Option<DateTime<Utc>>,
    pub status: TicketStatus,
    pub result: TicketResult,
    pub resolution_stage: Stage,
    pub days_diff: i64,
    /// Newest first.
    pub activities: Vec<TicketActivity>,
}

/// A customer on the live roster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: EntityId,
    pub name: String,
    pub email: String,
    pub avatar_url: String,
    pub provider: Provider,
    pub campaign: String,
    pub due_date: DateTime<Utc>,
    pub risk_score: u8,
    pub history: Vec<HistoryEntry>,
    pub tickets: Vec<Ticket>,
    lag: Lag,
}

impl Customer {
    /// A bare customer with derived contact details and no history.
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>, lag: Lag) -> Self {
        let id = id.into();
        let name = name.into();
        Self {
            email: email_for(&name),
            avatar_url: format!("https://picsum.photos/seed/{id}/200/200"),
            id,
            name,
            provider: Provider::Stripe,
            campaign: String::new(),
            due_date: DateTime::<Utc>::default(),
            risk_score: 0,
            history: Vec::new(),
            tickets: Vec::new(),
            lag,
        }
    }

    pub fn lag(&self) -> Lag {
        self.lag
    }

    pub fn stage(&self) -> Stage {
        classify(self.lag)
    }

    /// Roster entries are always active; paid records live in `PaidSnapshot`.
    pub fn status(&self) -> CustomerStatus {
        CustomerStatus::Active
    }

    pub fn set_lag(&mut self, lag: Lag) {
        self.lag = lag;
    }

    pub fn with_lag(mut self, lag: Lag) -> Self {
        self.set_lag(lag);
        self
    }
}

/// Point-in-time copy of a customer taken when a payment was detected.
///
/// The copy keeps the lag and stage the customer had at payment time and
/// carries its own identifier, distinct from the live record's.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaidSnapshot {
    id: EntityId,
    source_id: EntityId,
    tick: Tick,
    paid_at: DateTime<Utc>,
    customer: Customer,
}

impl PaidSnapshot {
    pub fn record(live: &Customer, token: Uuid, tick: Tick, paid_at: DateTime<Utc>) -> Self {
        let mut customer = live.clone();
        customer.history.push(HistoryEntry {
            date: paid_at,
            action: PAYMENT_DETECTED_ACTION.to_string(),
        });
        Self {
            id: format!("{}-paid-{}", live.id, token.simple()),
            source_id: live.id.clone(),
            tick,
            paid_at,
            customer,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn paid_at(&self) -> DateTime<Utc> {
        self.paid_at
    }

    pub fn status(&self) -> CustomerStatus {
        CustomerStatus::Paid
    }

    pub fn lag(&self) -> Lag {
        self.customer.lag()
    }

    pub fn stage(&self) -> Stage {
        self.customer.stage()
    }

    /// The customer as it looked at payment time, history included.
    pub fn customer(&self) -> &Customer {
        &self.customer
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.customer.history
    }
}

fn email_for(name: &str) -> String {
    format!("{}@example.com", name.to_lowercase().replacen(' ', ".", 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_follows_every_lag_write() {
        let mut c = Customer::new("cust-1", "Alice Freeman", -3);
        assert_eq!(c.stage(), Stage::Preventive);
        c.set_lag(0);
        assert_eq!(c.stage(), Stage::PaymentDay);
        let c = c.with_lag(20);
        assert_eq!(c.stage(), Stage::Escalation);
    }

    #[test]
    fn email_is_derived_from_name() {
        let c = Customer::new("cust-1", "Fiona Gallagher", 0);
        assert_eq!(c.email, "fiona.gallagher@example.com");
    }

    #[test]
    fn snapshot_keeps_payment_time_state() {
        let live = Customer::new("cust-9", "Ian Scott", 4);
        let at = DateTime::<Utc>::default();
        let snap = PaidSnapshot::record(&live, Uuid::nil(), 3, at);
        assert_eq!(snap.source_id(), "cust-9");
        assert_ne!(snap.id(), live.id);
        assert_eq!(snap.lag(), 4);
        assert_eq!(snap.stage(), Stage::PostPayment);
        assert_eq!(snap.status(), CustomerStatus::Paid);
        let last = snap.history().last().expect("payment entry");
        assert_eq!(last.action, PAYMENT_DETECTED_ACTION);
        assert_eq!(last.date, at);
        assert!(live.history.is_empty(), "live record must not be touched");
    }
}
