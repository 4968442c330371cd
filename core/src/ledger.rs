//! Session payment ledger.
//!
//! Append-only record of every paid snapshot and its payment record for
//! the current session. Cleared only by an explicit reset. With a
//! capacity set, the oldest entries are evicted first.

use crate::{
    customer::{PaidSnapshot, Provider},
    rng::SubsystemRng,
    types::{EntityId, Tick},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentRecord {
    pub id: EntityId,
    pub snapshot_id: EntityId,
    pub customer_name: String,
    pub avatar_url: String,
    pub date: DateTime<Utc>,
    pub provider: Provider,
    pub tick: Tick,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentLedger {
    capacity: Option<usize>,
    snapshots: VecDeque<PaidSnapshot>,
    records: VecDeque<PaymentRecord>,
    /// Payments seen this session, including evicted ones.
    total_recorded: u64,
}

impl PaymentLedger {
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Fold one tick's paid snapshots into the ledger.
    pub fn record_all(
        &mut self,
        paid: Vec<PaidSnapshot>,
        rng: &mut SubsystemRng,
    ) -> Vec<PaymentRecord> {
        let mut new_records = Vec::with_capacity(paid.len());
        for snapshot in paid {
            let record = PaymentRecord {
                id: rng.uuid().simple().to_string(),
                snapshot_id: snapshot.id().to_string(),
                customer_name: snapshot.customer().name.clone(),
                avatar_url: snapshot.customer().avatar_url.clone(),
                date: snapshot.paid_at(),
                provider: snapshot.customer().provider,
                tick: snapshot.tick(),
            };
            self.snapshots.push_back(snapshot);
            self.records.push_back(record.clone());
            self.total_recorded += 1;
            new_records.push(record);
        }
        self.evict();
        new_records
    }

    fn evict(&mut self) {
        let Some(cap) = self.capacity else { return };
        while self.snapshots.len() > cap {
            self.snapshots.pop_front();
        }
        while self.records.len() > cap {
            self.records.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
        self.records.clear();
        self.total_recorded = 0;
    }

    /// Oldest first.
    pub fn snapshots(&self) -> impl Iterator<Item = &PaidSnapshot> {
        self.snapshots.iter()
    }

    /// Newest first, as the payment history panel lists them.
    pub fn recent_records(&self) -> impl Iterator<Item = &PaymentRecord> {
        self.records.iter().rev()
    }

    pub fn records(&self) -> impl Iterator<Item = &PaymentRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn total_recorded(&self) -> u64 {
        self.total_recorded
    }
}
