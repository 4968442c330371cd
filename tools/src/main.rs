//! sim-runner: headless runner for the collections commitment map.
//!
//! Usage:
//!   sim-runner --seed 12345 --ticks 90 --db run.db
//!   sim-runner --seed 12345 --realtime --ticks 30
//!   sim-runner --seed 12345 --ipc-mode

use anyhow::Result;
use chrono::{DateTime, Utc};
use collections_core::{
    command::PlayerCommand,
    engine::SimEngine,
    report::{self, StageColumn},
    stage::Stage,
    store::SimStore,
    types::{Lag, Tick},
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Tick {
        count: u64,
    },
    Command {
        cmd: String,
        #[serde(default)]
        payload: serde_json::Value,
    },
    Quit,
}

#[derive(serde::Serialize)]
struct CardView {
    id: String,
    name: String,
    avatar_url: String,
    campaign: String,
    lag: Lag,
    stage: Stage,
    status: collections_core::customer::CustomerStatus,
}

#[derive(serde::Serialize)]
struct PaymentView {
    id: String,
    customer_name: String,
    provider: &'static str,
    date: DateTime<Utc>,
}

#[derive(serde::Serialize)]
struct UiState {
    tick: Tick,
    running: bool,
    date: DateTime<Utc>,
    breadcrumb: &'static str,
    active_filters: usize,
    board: Vec<StageColumn>,
    cards: Vec<CardView>,
    payments: Vec<PaymentView>,
    tour_pending: bool,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ticks = parse_arg(&args, "--ticks", 90u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let realtime = args.iter().any(|a| a == "--realtime");
    let db = args
        .windows(2)
        .find(|w| w[0] == "--db")
        .map(|w| w[1].as_str())
        .unwrap_or(":memory:");
    let data_dir = args
        .windows(2)
        .find(|w| w[0] == "--data-dir")
        .map(|w| w[1].as_str())
        .unwrap_or("./data");

    if !ipc_mode {
        println!("Collections commitment map: sim-runner");
        println!("  seed:      {seed}");
        println!("  ticks:     {ticks}");
        println!("  db:        {db}");
        println!("  data_dir:  {data_dir}");
        println!();
    }

    let store = SimStore::open(db)?;
    store.migrate()?;

    let run_id = format!("run-{seed}-{}", wall_clock_secs());
    store.insert_run(&run_id, seed, env!("CARGO_PKG_VERSION"))?;

    let mut engine = SimEngine::build(run_id.clone(), seed, store, data_dir)?;

    if ipc_mode {
        run_ipc_loop(&mut engine)?;
    } else if realtime {
        run_realtime(&mut engine, ticks)?;
        print_summary(&engine, &run_id, ticks)?;
    } else {
        engine.run_ticks(ticks)?;
        print_summary(&engine, &run_id, ticks)?;
    }

    Ok(())
}

/// Tick at the configured interval, printing the board after each tick.
fn run_realtime(engine: &mut SimEngine, ticks: u64) -> Result<()> {
    let interval = engine.clock.interval();
    engine.start_simulation()?;
    for _ in 0..ticks {
        std::thread::sleep(interval);
        let events = engine.tick()?;
        let paid = events
            .iter()
            .filter(|e| e.type_name() == "payment_detected")
            .count();
        let board: Vec<String> = engine
            .stage_board()
            .iter()
            .map(|c| format!("{}={}", c.label, c.count))
            .collect();
        println!(
            "  tick {:>4} | {} | paid {paid}",
            engine.clock.current_tick,
            board.join("  ")
        );
    }
    engine.pause_simulation()?;
    Ok(())
}

fn run_ipc_loop(engine: &mut SimEngine) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Tick { count } => {
                engine.run_ticks(count)?;
                let state = build_ui_state(engine)?;
                writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
            }
            IpcCommand::GetState => {
                let state = build_ui_state(engine)?;
                writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
            }
            IpcCommand::Command { cmd, payload } => {
                if let Err(e) = handle_command(engine, &cmd, payload) {
                    let err_json = serde_json::json!({ "error": e.to_string() });
                    writeln!(stdout, "{}", err_json)?;
                } else {
                    let state = build_ui_state(engine)?;
                    writeln!(stdout, "{}", serde_json::to_string(&state)?)?;
                }
            }
        }
        stdout.flush()?;
    }
    Ok(())
}

/// Map `{cmd, payload}` onto a PlayerCommand. The payload's fields are
/// merged next to the `cmd` tag.
fn handle_command(engine: &mut SimEngine, cmd: &str, payload: serde_json::Value) -> Result<()> {
    let mut object = match payload {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Null => serde_json::Map::new(),
        other => anyhow::bail!("payload for {cmd} must be an object, got {other}"),
    };
    object.insert("cmd".into(), serde_json::Value::String(cmd.to_string()));

    let command: PlayerCommand = serde_json::from_value(serde_json::Value::Object(object))
        .map_err(|e| anyhow::anyhow!("Unknown command {cmd}: {e}"))?;
    let events = engine.apply_command(command)?;
    log::debug!("command {cmd} produced {} events", events.len());
    Ok(())
}

fn build_ui_state(engine: &SimEngine) -> Result<UiState> {
    let cards = engine
        .visible_entries()
        .iter()
        .map(|entry| {
            let customer = entry.customer();
            CardView {
                id: entry.id().to_string(),
                name: customer.name.clone(),
                avatar_url: customer.avatar_url.clone(),
                campaign: customer.campaign.clone(),
                lag: entry.lag(),
                stage: entry.stage(),
                status: entry.status(),
            }
        })
        .collect();

    let payments = engine
        .ledger()
        .recent_records()
        .map(|r| PaymentView {
            id: r.id.clone(),
            customer_name: r.customer_name.clone(),
            provider: r.provider.as_str(),
            date: r.date,
        })
        .collect();

    Ok(UiState {
        tick: engine.clock.current_tick,
        running: engine.clock.is_running(),
        date: engine.clock.now(),
        breadcrumb: engine.filters.breadcrumb(),
        active_filters: engine.filters.active_count(),
        board: engine.stage_board(),
        cards,
        payments,
        tour_pending: engine.tour_pending()?,
    })
}

fn print_summary(engine: &SimEngine, run_id: &str, ticks: u64) -> Result<()> {
    let ledger = engine.ledger();
    let advanced = engine.store.event_count(run_id, "customer_advanced")?;
    let outreach = engine.store.event_count(run_id, "outreach_triggered")?;

    println!("=== RUN SUMMARY ===");
    println!("  run_id:         {run_id}");
    println!("  ticks run:      {ticks}");
    println!("  final tick:     {}", engine.clock.current_tick);
    println!("  sim date:       {}", engine.clock.now().format("%Y-%m-%d"));
    println!("  customers:      {}", engine.roster().len());
    println!("  advances:       {advanced}");
    println!("  payments:       {}", ledger.len());
    println!("  outreach sent:  {outreach}");

    println!();
    println!("=== COMMITMENT MAP ===");
    for column in engine.stage_board() {
        println!("  {:<14} {:>4}", column.label, column.count);
    }

    println!();
    println!("=== PAYMENTS BY PROVIDER ===");
    for total in report::payments_by_provider(ledger.records()) {
        println!("  {:<14} {:>4}", total.provider.as_str(), total.payments);
    }

    println!();
    println!("=== TICKET HISTORY ===");
    let outcomes = report::ticket_outcomes(engine.roster());
    println!("  on time:        {}", outcomes.on_time);
    println!("  late:           {}", outcomes.late);
    println!("  very late:      {}", outcomes.very_late);
    println!("  pending:        {}", outcomes.pending);
    println!("  recovery rate:  {:.1}%", outcomes.recovery_rate() * 100.0);
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn wall_clock_secs() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
