//! The simulation engine: owns the roster and drives every tick.
//!
//! TICK ORDER (fixed, documented, never reordered):
//!   1. Clock advance
//!   2. Movement   (roster stepping, one roll per customer)
//!   3. Ledger     (paid snapshots folded into the session ledger)
//!   4. Outreach   (catalog actions due at each customer's new lag)
//!   5. Snapshot   (every SNAPSHOT_INTERVAL ticks)
//!
//! RULES:
//!   - The roster is replaced wholesale each tick; the stepper never
//!     mutates it in place.
//!   - All randomness flows through the RngBank.
//!   - All state changes are recorded in the event log.

use crate::{
    catalog::Catalog,
    clock::SimClock,
    command::PlayerCommand,
    config::SimConfig,
    customer::Customer,
    error::{SimError, SimResult},
    event::{EventLogEntry, SimEvent},
    filter::{BoardEntry, FilterState},
    ledger::PaymentLedger,
    movement::{self, Movement},
    report::{self, StageColumn},
    rng::{RngBank, SubsystemSlot},
    roster::generate_roster,
    snapshot::{SimSnapshot, SNAPSHOT_INTERVAL},
    store::SimStore,
    types::{RunId, Tick},
};

pub struct SimEngine {
    pub run_id:  RunId,
    pub clock:   SimClock,
    pub rng_bank: RngBank,
    pub filters: FilterState,
    pub store:   SimStore,
    seed:        u64,
    config:      SimConfig,
    catalog:     Catalog,
    roster:      Vec<Customer>,
    ledger:      PaymentLedger,
    /// Number of rosters generated so far; indexes the roster RNG stream.
    generation:  u64,
}

impl SimEngine {
    /// An engine with an empty roster. Call `initialize()` before ticking.
    pub fn new(run_id: RunId, seed: u64, config: SimConfig, store: SimStore) -> Self {
        Self {
            clock:      SimClock::new(&config.clock),
            rng_bank:   RngBank::new(seed),
            filters:    FilterState::default(),
            ledger:     PaymentLedger::new(config.ledger.capacity),
            catalog:    config.catalog.clone(),
            roster:     Vec::new(),
            generation: 0,
            seed,
            config,
            store,
            run_id,
        }
    }

    /// Build a fully initialized engine from the data/ directory.
    pub fn build(run_id: RunId, seed: u64, store: SimStore, data_dir: &str) -> SimResult<Self> {
        let config = SimConfig::load(data_dir)?;
        let mut engine = SimEngine::new(run_id, seed, config, store);
        engine.initialize()?;
        Ok(engine)
    }

    /// In-memory engine with test config, already initialized.
    pub fn build_test(run_id: RunId, seed: u64) -> SimResult<Self> {
        Self::build_with_config(run_id, seed, SimConfig::default_test())
    }

    /// In-memory engine with a caller-supplied config, already initialized.
    pub fn build_with_config(run_id: RunId, seed: u64, config: SimConfig) -> SimResult<Self> {
        let store = SimStore::in_memory()?;
        store.migrate()?;
        store.insert_run(&run_id, seed, env!("CARGO_PKG_VERSION"))?;
        let mut engine = SimEngine::new(run_id, seed, config, store);
        engine.initialize()?;
        Ok(engine)
    }

    /// Rebuild an engine from the latest snapshot of `run_id` in `store`.
    pub fn restore(run_id: RunId, config: SimConfig, store: SimStore) -> SimResult<Self> {
        let seed = store.run_seed(&run_id)?.ok_or(SimError::RunNotInitialized)?;
        let (tick, json) = store
            .latest_snapshot_before(&run_id, i64::MAX as Tick)?
            .ok_or(SimError::RunNotInitialized)?;
        let snapshot: SimSnapshot = serde_json::from_str(&json)?;

        let mut engine = SimEngine::new(run_id, seed, config, store);
        engine.clock = snapshot.clock;
        engine.clock.pause();
        engine.roster = snapshot.roster;
        engine.ledger = snapshot.ledger;
        engine.filters = snapshot.filters;
        engine.generation = snapshot.generation;

        // Events logged after the snapshot belong to the abandoned timeline.
        let dropped = engine.store.discard_events_after_snapshot(&engine.run_id, tick)?;
        log::info!(
            "tick={tick} engine: restored {} customers from snapshot, {dropped} later events discarded",
            engine.roster.len()
        );
        Ok(engine)
    }

    /// Record the run start and generate the first roster.
    pub fn initialize(&mut self) -> SimResult<Vec<SimEvent>> {
        if self.generation > 0 {
            return Ok(Vec::new());
        }
        let init = SimEvent::RunInitialized {
            run_id: self.run_id.clone(),
            seed:   self.seed,
        };
        self.log_event(0, "engine", &init)?;

        self.roster = self.fresh_roster();
        let generated = SimEvent::RosterGenerated {
            tick:      self.clock.current_tick,
            customers: self.roster.len(),
        };
        self.log_event(self.clock.current_tick, "roster", &generated)?;
        Ok(vec![init, generated])
    }

    fn fresh_roster(&mut self) -> Vec<Customer> {
        let mut rng = self.rng_bank.stream(SubsystemSlot::Roster, self.generation);
        self.generation += 1;
        generate_roster(&self.config.roster, &mut rng, self.clock.now())
    }

    /// Advance one tick. This is the core simulation step.
    pub fn tick(&mut self) -> SimResult<Vec<SimEvent>> {
        assert!(!self.clock.paused, "tick() called on paused engine");

        let tick = self.clock.advance();
        let now = self.clock.now();
        let mut events = vec![SimEvent::TickStarted { tick }];
        self.log_event(tick, "engine", &events[0])?;

        // Movement.
        let mut rng = self.rng_bank.stream(SubsystemSlot::Movement, tick);
        let outcome = movement::step(&self.roster, &self.config.movement, &mut rng, tick, now);
        let advanced = outcome.advanced_count();

        let mut movement_events = Vec::new();
        for (before, movement) in self.roster.iter().zip(&outcome.movements) {
            if let Movement::Advanced { to, .. } = *movement {
                let stage = crate::stage::classify(to);
                movement_events.push(SimEvent::CustomerAdvanced {
                    tick,
                    customer_id: before.id.clone(),
                    lag: to,
                    stage,
                });
                if stage != before.stage() {
                    movement_events.push(SimEvent::StageChanged {
                        tick,
                        customer_id: before.id.clone(),
                        from: before.stage(),
                        to: stage,
                    });
                }
            }
        }
        self.log_events(tick, "movement", &movement_events)?;
        events.extend(movement_events);

        // Ledger.
        let paid_meta: Vec<_> = outcome
            .paid
            .iter()
            .map(|p| (p.source_id().to_string(), p.lag()))
            .collect();
        let mut ledger_rng = self.rng_bank.stream(SubsystemSlot::Ledger, tick);
        let records = self.ledger.record_all(outcome.paid, &mut ledger_rng);
        let reset_lag = self.config.movement.reset_lag;

        let mut ledger_events = Vec::new();
        for ((customer_id, lag_at_payment), record) in paid_meta.into_iter().zip(&records) {
            ledger_events.push(SimEvent::PaymentDetected {
                tick,
                customer_id: customer_id.clone(),
                snapshot_id: record.snapshot_id.clone(),
                payment_id: record.id.clone(),
                provider: record.provider,
                lag_at_payment,
            });
            ledger_events.push(SimEvent::CycleRestarted {
                tick,
                customer_id,
                lag: reset_lag,
            });
        }
        self.log_events(tick, "ledger", &ledger_events)?;
        events.extend(ledger_events);

        self.roster = outcome.roster;

        // Outreach, only for customers whose lag moved this tick.
        let outreach_events: Vec<SimEvent> = self
            .roster
            .iter()
            .zip(&outcome.movements)
            .filter(|(_, m)| **m != Movement::Held)
            .flat_map(|(c, _)| {
                self.catalog.outreach_for(c).into_iter().map(move |step| {
                    SimEvent::OutreachTriggered {
                        tick,
                        customer_id:  c.id.clone(),
                        playbook_id:  step.playbook.id.clone(),
                        framework_id: step.framework.id.clone(),
                        action_id:    step.action.id.clone(),
                        channel:      step.action.channel,
                    }
                })
            })
            .collect();
        self.log_events(tick, "outreach", &outreach_events)?;
        events.extend(outreach_events);

        let completed = SimEvent::TickCompleted {
            tick,
            advanced,
            paid: records.len(),
        };
        self.log_event(tick, "engine", &completed)?;
        events.push(completed);

        if !records.is_empty() {
            log::info!("tick={tick} ledger: {} payments detected", records.len());
        }
        log::debug!("tick={tick} movement: {advanced} customers advanced");

        // Snapshot every SNAPSHOT_INTERVAL ticks.
        if tick % SNAPSHOT_INTERVAL == 0 {
            self.take_snapshot(tick)?;
        }

        Ok(events)
    }

    /// Run n ticks in a loop. Used for testing and fast-forward.
    /// Leaves the clock in the running/paused state it was found in.
    pub fn run_ticks(&mut self, n: u64) -> SimResult<()> {
        let was_running = self.clock.is_running();
        self.clock.resume();
        for _ in 0..n {
            self.tick()?;
        }
        if !was_running {
            self.clock.pause();
        }
        Ok(())
    }

    // ── Operator actions ───────────────────────────────────────

    pub fn start_simulation(&mut self) -> SimResult<Vec<SimEvent>> {
        if self.clock.is_running() {
            return Ok(Vec::new());
        }
        self.clock.resume();
        let event = SimEvent::SimulationStarted { tick: self.clock.current_tick };
        self.log_event(self.clock.current_tick, "engine", &event)?;
        Ok(vec![event])
    }

    pub fn pause_simulation(&mut self) -> SimResult<Vec<SimEvent>> {
        if !self.clock.is_running() {
            return Ok(Vec::new());
        }
        self.clock.pause();
        let event = SimEvent::SimulationPaused { tick: self.clock.current_tick };
        self.log_event(self.clock.current_tick, "engine", &event)?;
        Ok(vec![event])
    }

    pub fn toggle_simulation(&mut self) -> SimResult<Vec<SimEvent>> {
        if self.clock.is_running() {
            self.pause_simulation()
        } else {
            self.start_simulation()
        }
    }

    /// Fresh roster, empty ledger, simulation stopped, filters cleared
    /// (search kept). The tick counter keeps counting.
    pub fn reset(&mut self) -> SimResult<Vec<SimEvent>> {
        let mut events = self.pause_simulation()?;
        let cleared_payments = self.ledger.len();
        self.ledger.clear();
        self.roster = self.fresh_roster();
        self.filters.clear();

        let event = SimEvent::RosterReset {
            tick: self.clock.current_tick,
            customers: self.roster.len(),
            cleared_payments,
        };
        self.log_event(self.clock.current_tick, "roster", &event)?;
        log::info!(
            "tick={} roster: reset to {} customers, {cleared_payments} payments cleared",
            self.clock.current_tick,
            self.roster.len()
        );
        events.push(event);
        Ok(events)
    }

    /// Whether the onboarding tour still has to be shown.
    pub fn tour_pending(&self) -> SimResult<bool> {
        Ok(!self.store.has_seen_tour()?)
    }

    pub fn complete_tour(&mut self) -> SimResult<Vec<SimEvent>> {
        self.store.mark_tour_seen()?;
        let event = SimEvent::TourCompleted { tick: self.clock.current_tick };
        self.log_event(self.clock.current_tick, "engine", &event)?;
        Ok(vec![event])
    }

    pub fn apply_command(&mut self, command: PlayerCommand) -> SimResult<Vec<SimEvent>> {
        log::debug!("tick={} engine: command {}", self.clock.current_tick, command.name());
        match command {
            PlayerCommand::StartSimulation  => self.start_simulation(),
            PlayerCommand::PauseSimulation  => self.pause_simulation(),
            PlayerCommand::ToggleSimulation => self.toggle_simulation(),
            PlayerCommand::Reset            => self.reset(),
            PlayerCommand::SetFilter { filters } => {
                self.filters = filters;
                Ok(Vec::new())
            }
            PlayerCommand::ClearFilters => {
                self.filters.clear();
                Ok(Vec::new())
            }
            PlayerCommand::CompleteTour => self.complete_tour(),
        }
    }

    // ── Read access ────────────────────────────────────────────

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn roster(&self) -> &[Customer] {
        &self.roster
    }

    pub fn ledger(&self) -> &PaymentLedger {
        &self.ledger
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut Catalog {
        &mut self.catalog
    }

    /// Cards visible under the current filters.
    pub fn visible_entries(&self) -> Vec<BoardEntry<'_>> {
        self.filters.apply(&self.roster, self.ledger.snapshots())
    }

    pub fn stage_board(&self) -> Vec<StageColumn> {
        report::stage_board(&self.visible_entries())
    }

    pub fn snapshot(&self) -> SimSnapshot {
        SimSnapshot {
            run_id:  self.run_id.clone(),
            tick:    self.clock.current_tick,
            clock:   self.clock.clone(),
            roster:  self.roster.clone(),
            ledger:  self.ledger.clone(),
            filters: self.filters.clone(),
            generation: self.generation,
        }
    }

    /// Query events for a specific tick from the store.
    /// Used by the determinism test and replay tooling.
    pub fn store_events_for_tick(
        &self,
        run_id: &str,
        tick: Tick,
    ) -> SimResult<Vec<EventLogEntry>> {
        self.store.events_for_tick(run_id, tick)
    }

    // ── Internals ──────────────────────────────────────────────

    fn take_snapshot(&self, tick: Tick) -> SimResult<()> {
        let json = serde_json::to_string(&self.snapshot())?;
        self.store.save_snapshot(&self.run_id, tick, &json)?;
        log::debug!("Snapshot saved at tick {tick}");
        Ok(())
    }

    fn log_event(&self, tick: Tick, source: &str, event: &SimEvent) -> SimResult<()> {
        let entry = EventLogEntry {
            id:         None,
            run_id:     self.run_id.clone(),
            tick,
            source:     source.to_string(),
            event_type: event.type_name().to_string(),
            payload:    serde_json::to_string(event)?,
        };
        self.store.append_event(&entry)
    }

    fn log_events(&self, tick: Tick, source: &str, events: &[SimEvent]) -> SimResult<()> {
        for event in events {
            self.log_event(tick, source, event)?;
        }
        Ok(())
    }
}
