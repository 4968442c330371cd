//! Engine session tests: run control, payments, reset, tour flag,
//! snapshots and restore.

use collections_core::{
    command::PlayerCommand,
    config::SimConfig,
    customer::CustomerStatus,
    engine::SimEngine,
    error::SimError,
    event::SimEvent,
    filter::{FilterState, StatusFilter},
    snapshot::SNAPSHOT_INTERVAL,
    stage::{classify, Stage},
    store::SimStore,
};

#[test]
fn engine_starts_paused_at_tick_zero() {
    let engine = SimEngine::build_test("session-start".into(), 1).unwrap();
    assert_eq!(engine.clock.current_tick, 0);
    assert!(!engine.clock.is_running());
    assert_eq!(engine.store.event_count("session-start", "run_initialized").unwrap(), 1);
    assert_eq!(engine.store.event_count("session-start", "roster_generated").unwrap(), 1);
}

#[test]
#[should_panic(expected = "paused engine")]
fn ticking_a_paused_engine_panics() {
    let mut engine = SimEngine::build_test("session-paused".into(), 1).unwrap();
    let _ = engine.tick();
}

#[test]
fn toggle_flips_between_running_and_paused() {
    let mut engine = SimEngine::build_test("session-toggle".into(), 2).unwrap();

    let events = engine.apply_command(PlayerCommand::ToggleSimulation).unwrap();
    assert_eq!(events, vec![SimEvent::SimulationStarted { tick: 0 }]);
    assert!(engine.clock.is_running());

    engine.tick().unwrap();

    let events = engine.toggle_simulation().unwrap();
    assert_eq!(events, vec![SimEvent::SimulationPaused { tick: 1 }]);
    assert!(!engine.clock.is_running());

    // Pausing twice is a no-op.
    assert!(engine.pause_simulation().unwrap().is_empty());
}

#[test]
fn run_ticks_leaves_run_state_as_found() {
    let mut engine = SimEngine::build_test("session-run-ticks".into(), 3).unwrap();
    engine.run_ticks(5).unwrap();
    assert_eq!(engine.clock.current_tick, 5);
    assert!(!engine.clock.is_running());

    engine.start_simulation().unwrap();
    engine.run_ticks(5).unwrap();
    assert_eq!(engine.clock.current_tick, 10);
    assert!(engine.clock.is_running());
}

#[test]
fn roster_invariants_hold_across_a_long_run() {
    let mut engine = SimEngine::build_test("session-invariants".into(), 17).unwrap();
    let ids: Vec<String> = engine.roster().iter().map(|c| c.id.clone()).collect();

    engine.run_ticks(200).unwrap();

    let after: Vec<String> = engine.roster().iter().map(|c| c.id.clone()).collect();
    assert_eq!(ids, after, "roster membership or order changed");
    for customer in engine.roster() {
        assert_eq!(customer.stage(), classify(customer.lag()));
        assert_eq!(customer.status(), CustomerStatus::Active);
    }
}

#[test]
fn payments_reach_the_ledger_and_the_event_log() {
    let mut engine = SimEngine::build_test("session-payments".into(), 21).unwrap();
    engine.run_ticks(200).unwrap();

    let ledger = engine.ledger();
    assert!(!ledger.is_empty(), "no payments in 200 ticks across 50 customers");
    assert_eq!(ledger.len() as u64, ledger.total_recorded());

    let detected = engine.store.event_count("session-payments", "payment_detected").unwrap();
    let restarted = engine.store.event_count("session-payments", "cycle_restarted").unwrap();
    assert_eq!(detected as usize, ledger.len());
    assert_eq!(restarted, detected);

    for snapshot in ledger.snapshots() {
        assert_eq!(snapshot.status(), CustomerStatus::Paid);
        assert!(snapshot.lag() >= 0, "paid before the due date at lag {}", snapshot.lag());
        assert!(engine.roster().iter().all(|c| c.id != snapshot.id()));
    }

    let newest = ledger.recent_records().next().unwrap();
    let oldest = ledger.records().next().unwrap();
    assert!(newest.tick >= oldest.tick);
}

#[test]
fn paid_filter_shows_the_payment_history() {
    let mut engine = SimEngine::build_test("session-paid-filter".into(), 21).unwrap();
    engine.run_ticks(200).unwrap();

    engine
        .apply_command(PlayerCommand::SetFilter {
            filters: FilterState {
                status: StatusFilter::Paid,
                ..FilterState::default()
            },
        })
        .unwrap();
    let visible = engine.visible_entries();
    assert_eq!(visible.len(), engine.ledger().len());
    assert!(visible.iter().all(|e| e.status() == CustomerStatus::Paid));

    engine.filters.status = StatusFilter::All;
    assert_eq!(
        engine.visible_entries().len(),
        engine.roster().len() + engine.ledger().len()
    );
}

#[test]
fn stage_board_counts_the_visible_roster() {
    let mut engine = SimEngine::build_test("session-board".into(), 5).unwrap();
    engine.run_ticks(10).unwrap();

    let board = engine.stage_board();
    assert_eq!(board.len(), 5);
    assert_eq!(board.iter().map(|c| c.count).sum::<usize>(), engine.roster().len());

    engine.filters.toggle_stage(Stage::Preventive);
    let board = engine.stage_board();
    let preventive = engine
        .roster()
        .iter()
        .filter(|c| c.stage() == Stage::Preventive)
        .count();
    assert_eq!(board[0].count, preventive);
    assert!(board[1..].iter().all(|c| c.count == 0));
}

#[test]
fn reset_regenerates_roster_and_clears_session() {
    let mut engine = SimEngine::build_test("session-reset".into(), 21).unwrap();
    engine.start_simulation().unwrap();
    engine.run_ticks(200).unwrap();
    let before = engine.roster().to_vec();
    let payments = engine.ledger().len();
    assert!(payments > 0);

    engine.filters.toggle_campaign("Annual Plan");
    engine.filters.status = StatusFilter::Paid;
    engine.filters.search = "cooper".into();

    let events = engine.apply_command(PlayerCommand::Reset).unwrap();

    assert!(events.contains(&SimEvent::SimulationPaused { tick: 200 }));
    assert!(events.contains(&SimEvent::RosterReset {
        tick: 200,
        customers: 50,
        cleared_payments: payments,
    }));
    assert!(!engine.clock.is_running());
    assert_eq!(engine.clock.current_tick, 200, "reset must not rewind the tick counter");
    assert!(engine.ledger().is_empty());
    assert_eq!(engine.roster().len(), 50);
    assert_ne!(engine.roster(), before.as_slice());
    assert!(engine.filters.campaigns.is_empty());
    assert_eq!(engine.filters.status, StatusFilter::Active);
    assert_eq!(engine.filters.search, "cooper");
}

#[test]
fn tour_flag_is_persisted_once_completed() {
    let mut engine = SimEngine::build_test("session-tour".into(), 4).unwrap();
    assert!(engine.tour_pending().unwrap());

    engine.apply_command(PlayerCommand::CompleteTour).unwrap();
    assert!(!engine.tour_pending().unwrap());
    assert_eq!(
        engine.store.preference(collections_core::store::TOUR_SEEN_KEY).unwrap(),
        Some("true".to_string())
    );

    // Completing it again keeps it completed.
    engine.complete_tour().unwrap();
    assert!(!engine.tour_pending().unwrap());
}

#[test]
fn outreach_fires_when_a_subscribed_customer_reaches_an_action() {
    let mut engine = SimEngine::build_test("session-outreach".into(), 8).unwrap();
    engine.run_ticks(120).unwrap();

    let subscribed: Vec<&str> = engine
        .roster()
        .iter()
        .filter(|c| c.campaign == "March Subscription")
        .map(|c| c.id.as_str())
        .collect();

    for tick in 1..=engine.clock.current_tick {
        let events: Vec<SimEvent> = engine
            .store_events_for_tick("session-outreach", tick)
            .unwrap()
            .into_iter()
            .map(|e| serde_json::from_str(&e.payload).unwrap())
            .collect();

        for event in &events {
            match event {
                SimEvent::CustomerAdvanced { customer_id, lag, .. } => {
                    // fw-001 acts at -5 and -2, fw-002 twice on the due date.
                    let due = match (subscribed.contains(&customer_id.as_str()), *lag) {
                        (true, -5) | (true, -2) => 1,
                        (true, 0) => 2,
                        _ => 0,
                    };
                    let fired = events
                        .iter()
                        .filter(|e| matches!(e,
                            SimEvent::OutreachTriggered { customer_id: id, .. } if id == customer_id))
                        .count();
                    assert_eq!(fired, due, "tick {tick}: {customer_id} at lag {lag}");
                }
                SimEvent::OutreachTriggered { playbook_id, framework_id, customer_id, .. } => {
                    assert_eq!(playbook_id, "pb-001");
                    assert!(subscribed.contains(&customer_id.as_str()));
                    assert!(
                        ["fw-001", "fw-002"].contains(&framework_id.as_str()),
                        "paused framework {framework_id} fired"
                    );
                }
                _ => {}
            }
        }
    }
}

#[test]
fn snapshots_are_saved_on_the_interval() {
    let mut engine = SimEngine::build_test("session-snapshot".into(), 6).unwrap();
    engine.run_ticks(SNAPSHOT_INTERVAL - 1).unwrap();
    assert!(engine
        .store
        .latest_snapshot_before("session-snapshot", SNAPSHOT_INTERVAL)
        .unwrap()
        .is_none());

    engine.run_ticks(1).unwrap();
    let (tick, _) = engine
        .store
        .latest_snapshot_before("session-snapshot", SNAPSHOT_INTERVAL)
        .unwrap()
        .expect("snapshot at the interval");
    assert_eq!(tick, SNAPSHOT_INTERVAL);
}

#[test]
fn restore_resumes_from_latest_snapshot() {
    let uri = "file:session_restore?mode=memory&cache=shared";
    let store = SimStore::open(uri).unwrap();
    store.migrate().unwrap();
    store.insert_run("session-restore", 77, "0.1.0-test").unwrap();

    let mut engine = SimEngine::new("session-restore".into(), 77, SimConfig::default_test(), store);
    engine.initialize().unwrap();
    engine.run_ticks(SNAPSHOT_INTERVAL).unwrap();

    let second = SimStore::open(uri).unwrap();
    let restored =
        SimEngine::restore("session-restore".into(), SimConfig::default_test(), second).unwrap();

    assert_eq!(restored.clock.current_tick, SNAPSHOT_INTERVAL);
    assert!(!restored.clock.is_running());
    assert_eq!(restored.seed(), 77);
    assert_eq!(restored.roster(), engine.roster());
    assert_eq!(restored.ledger().len(), engine.ledger().len());
}

#[test]
fn reset_after_restore_matches_the_original_run() {
    let uri = "file:session_restore_reset?mode=memory&cache=shared";
    let store = SimStore::open(uri).unwrap();
    store.migrate().unwrap();
    store.insert_run("session-restore-reset", 31, "0.1.0-test").unwrap();

    let mut original =
        SimEngine::new("session-restore-reset".into(), 31, SimConfig::default_test(), store);
    original.initialize().unwrap();
    original.run_ticks(5).unwrap();
    original.apply_command(PlayerCommand::Reset).unwrap();
    original.run_ticks(SNAPSHOT_INTERVAL - 5).unwrap();

    let second = SimStore::open(uri).unwrap();
    let mut restored =
        SimEngine::restore("session-restore-reset".into(), SimConfig::default_test(), second)
            .unwrap();
    assert_eq!(restored.roster(), original.roster());

    original.apply_command(PlayerCommand::Reset).unwrap();
    restored.apply_command(PlayerCommand::Reset).unwrap();
    assert_eq!(
        restored.roster(),
        original.roster(),
        "a reset after restore must draw the same roster stream"
    );
}

#[test]
fn restore_discards_events_past_the_snapshot() {
    let uri = "file:session_restore_rewind?mode=memory&cache=shared";
    let store = SimStore::open(uri).unwrap();
    store.migrate().unwrap();
    store.insert_run("session-rewind", 12, "0.1.0-test").unwrap();

    let mut engine = SimEngine::new("session-rewind".into(), 12, SimConfig::default_test(), store);
    engine.initialize().unwrap();
    engine.run_ticks(SNAPSHOT_INTERVAL + 3).unwrap();

    let second = SimStore::open(uri).unwrap();
    let mut restored =
        SimEngine::restore("session-rewind".into(), SimConfig::default_test(), second).unwrap();
    assert_eq!(
        restored.store.event_count("session-rewind", "tick_started").unwrap(),
        SNAPSHOT_INTERVAL as i64
    );

    restored.run_ticks(3).unwrap();
    for tick in SNAPSHOT_INTERVAL + 1..=SNAPSHOT_INTERVAL + 3 {
        let started = restored
            .store_events_for_tick("session-rewind", tick)
            .unwrap()
            .into_iter()
            .filter(|e| e.event_type == "tick_started")
            .count();
        assert_eq!(started, 1, "tick {tick} logged more than one start");
    }
    assert_eq!(
        restored.store.event_count("session-rewind", "tick_started").unwrap(),
        (SNAPSHOT_INTERVAL + 3) as i64
    );
}

#[test]
fn restore_without_snapshot_is_rejected() {
    let store = SimStore::in_memory().unwrap();
    store.migrate().unwrap();
    store.insert_run("session-empty", 1, "0.1.0-test").unwrap();

    let result = SimEngine::restore("session-empty".into(), SimConfig::default_test(), store);
    assert!(matches!(result, Err(SimError::RunNotInitialized)));
}
