//! Synthetic roster generation.
//!
//! Always returns exactly `initial_size` customers. Content is random
//! but fully determined by the RNG stream passed in.

use crate::{
    config::RosterConfig,
    customer::{
        ActivityKind, Customer, HistoryEntry, Provider, Ticket, TicketActivity, TicketResult,
        TicketStatus, PAYMENT_DETECTED_ACTION,
    },
    name_generator::NameGenerator,
    rng::SubsystemRng,
    stage::Stage,
};
use chrono::{DateTime, Datelike, Duration, Months, NaiveDate, NaiveTime, TimeZone, Utc};

const LAST_ACTIONS: [&str; 9] = [
    "Reminder 1 sent",
    "Reminder 2 sent",
    "Call pending",
    "Promise to pay",
    "Invoice viewed",
    "Email delivered",
    "SMS sent",
    "Charge attempt failed",
    "Agreement proposed",
];

const HISTORICAL_PAID_SHARE: f64 = 0.9;
const HISTORICAL_LATE_SHARE: f64 = 0.3;
const MAX_HISTORICAL_DELAY: u64 = 20;
const MAX_EARLY_DAYS: u64 = 5;
const BILLING_DAY: u32 = 15;

pub fn generate_roster(
    config: &RosterConfig,
    rng: &mut SubsystemRng,
    now: DateTime<Utc>,
) -> Vec<Customer> {
    let roster: Vec<Customer> = (0..config.initial_size)
        .map(|index| generate_customer(index, config, rng, now))
        .collect();
    log::info!("roster: generated {} customers", roster.len());
    roster
}

fn generate_customer(
    index: usize,
    config: &RosterConfig,
    rng: &mut SubsystemRng,
    now: DateTime<Utc>,
) -> Customer {
    let lag = rng.lag_between(config.initial_lag_min, config.initial_lag_max);
    let provider = *rng.pick(&Provider::ALL);
    let last_action = *rng.pick(&LAST_ACTIONS);
    let campaign = rng.pick(&config.campaigns).clone();
    let name = NameGenerator::for_index(index);

    let mut customer = Customer::new(format!("cust-{index}"), name, lag);
    customer.avatar_url = format!("https://picsum.photos/seed/{index}/200/200");
    customer.provider = provider;
    customer.campaign = campaign;
    customer.due_date = now - Duration::days(lag as i64);
    customer.risk_score = rng.next_u64_below(100) as u8;
    customer.history = vec![
        HistoryEntry {
            date: now - Duration::days(5),
            action: "Invoice created".into(),
        },
        HistoryEntry {
            date: now - Duration::days(2),
            action: "Payment reminder sent".into(),
        },
        HistoryEntry {
            date: now,
            action: last_action.into(),
        },
    ];
    customer.tickets = generate_ticket_history(config.ticket_months, rng, now);
    customer
}

/// One ticket per past month, most recent month first.
pub fn generate_ticket_history(
    months: u32,
    rng: &mut SubsystemRng,
    now: DateTime<Utc>,
) -> Vec<Ticket> {
    let anchor = NaiveDate::from_ymd_opt(now.year(), now.month(), BILLING_DAY)
        .unwrap_or_else(|| now.date_naive());

    (1..=months)
        .map(|i| {
            let due_day = anchor.checked_sub_months(Months::new(i)).unwrap_or(anchor);
            let due_date = Utc.from_utc_datetime(&due_day.and_time(NaiveTime::default()));
            generate_ticket(i, due_date, rng, now)
        })
        .collect()
}

fn generate_ticket(
    i: u32,
    due_date: DateTime<Utc>,
    rng: &mut SubsystemRng,
    now: DateTime<Utc>,
) -> Ticket {
    let is_paid = rng.chance(HISTORICAL_PAID_SHARE);

    let (paid_date, days_diff, resolution_stage, result) = if is_paid {
        if rng.chance(HISTORICAL_LATE_SHARE) {
            let delay = 1 + rng.next_u64_below(MAX_HISTORICAL_DELAY) as i64;
            let (stage, result) = match delay {
                1..=5 => (Stage::PostPayment, TicketResult::Late),
                6..=15 => (Stage::Reframing, TicketResult::Late),
                _ => (Stage::Escalation, TicketResult::VeryLate),
            };
            (Some(due_date + Duration::days(delay)), delay, stage, result)
        } else {
            let early = rng.next_u64_below(MAX_EARLY_DAYS) as i64;
            (
                Some(due_date - Duration::days(early)),
                -early,
                Stage::Preventive,
                TicketResult::OnTime,
            )
        }
    } else {
        (
            None,
            (now - due_date).num_days(),
            Stage::Preventive,
            TicketResult::Pending,
        )
    };

    let mut activities = vec![
        TicketActivity {
            id: format!("act-{i}-1"),
            date: due_date - Duration::days(10),
            kind: ActivityKind::System,
            description: format!("Invoice generated #INV-{}", rng.next_u64_below(10_000)),
            user: None,
        },
        TicketActivity {
            id: format!("act-{i}-2"),
            date: due_date - Duration::days(3),
            kind: ActivityKind::Email,
            description: "Automatic reminder sent".into(),
            user: None,
        },
    ];
    if days_diff > 0 {
        activities.push(TicketActivity {
            id: format!("act-{i}-3"),
            date: due_date + Duration::days(1),
            kind: ActivityKind::Sms,
            description: "Overdue notice".into(),
            user: None,
        });
    }
    if let Some(paid) = paid_date {
        activities.push(TicketActivity {
            id: format!("act-{i}-pay"),
            date: paid,
            kind: ActivityKind::Payment,
            description: PAYMENT_DETECTED_ACTION.into(),
            user: None,
        });
    }
    activities.sort_by(|a, b| b.date.cmp(&a.date));

    Ticket {
        id: format!("ticket-{i}"),
        period: due_date.format("%B %Y").to_string(),
        due_date,
        paid_date,
        status: if is_paid {
            TicketStatus::Paid
        } else {
            TicketStatus::Overdue
        },
        result,
        resolution_stage,
        days_diff,
        activities,
    }
}
