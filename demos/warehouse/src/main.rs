//! warehouse: five robots crossing a small warehouse floor.
//!
//! Robots start at the four corner bays and the charging dock, cross to
//! the opposite side, then return.  Opposing traffic shares the middle
//! aisles, so the run exercises lane reservation, waiting queues and
//! congestion-aware re-routing.  Every lifecycle event is appended to
//! `output/warehouse/robot_events.csv`.
//!
//! Run with:
//!   RUST_LOG=debug cargo run -p warehouse

mod network;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use env_logger::Env;
use log::{info, warn};

use fl_core::{FleetConfig, Point, RobotId, RobotStatus};
use fl_fleet::{FleetBuilder, FleetObserver};
use fl_output::{CsvWriter, EventLogObserver};

use network::{build_floor, cell, COLS, ROWS};

// ── Constants ─────────────────────────────────────────────────────────────────

const SEED:           u64 = 7;
const OUTPUT_DIR:     &str = "output/warehouse";
/// Give up waiting for the fleet after this long.
const RUN_TIMEOUT:    Duration = Duration::from_secs(60);
/// How often the main thread samples collisions while robots move.
const POLL_INTERVAL:  Duration = Duration::from_millis(100);

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    println!("=== warehouse — fleet traffic demo ===");

    // 1. Floor plan.
    let (graph, dock) = build_floor()?;
    println!(
        "Floor: {} vertices, {} lanes ({COLS}×{ROWS} grid + dock)",
        graph.vertex_count(),
        graph.lane_count()
    );

    // 2. Event log.
    std::fs::create_dir_all(OUTPUT_DIR)?;
    let csv = CsvWriter::new(Path::new(OUTPUT_DIR))?;
    let csv_path = csv.path().to_path_buf();
    let log = Arc::new(EventLogObserver::new(csv));

    // 3. Controller.
    let config = FleetConfig {
        step_delay_ms: 20,
        backoff_ms:    50,
        ..FleetConfig::default()
    };
    let fleet = FleetBuilder::new(graph)
        .config(config)
        .event_log(log.clone())
        .build()?;

    // 4. Robots at the corners and the dock.
    let corners = [
        (cell(0, 0), cell(COLS - 1, ROWS - 1)),
        (cell(COLS - 1, ROWS - 1), cell(0, 0)),
        (cell(COLS - 1, 0), cell(0, ROWS - 1)),
        (cell(0, ROWS - 1), cell(COLS - 1, 0)),
    ];
    let mut robots = Vec::with_capacity(corners.len() + 1);
    for (start, goal) in corners {
        let (id, msg) = fleet.spawn_robot(start)?;
        info!("{id}: {msg}");
        fleet.set_destination(&id, goal)?;
        fleet.queue_destination(&id, start)?;
        robots.push(id);
    }

    let (charger, msg) = fleet.spawn_robot(dock)?;
    info!("{charger}: {msg}");
    fleet.set_priority(&charger, 2.0)?;
    robots.push(charger.clone());

    // The charger gets whichever reachable vertex the seeded draw picks.
    for line in fleet.assign_random_destinations(SEED)? {
        info!("{line}");
    }

    let winner = fleet.negotiate_priority(&robots[0], &charger)?;
    println!("Priority between {} and {charger}: {winner} wins", robots[0]);
    println!();

    // 5. Move.
    let steps = Arc::new(AtomicU64::new(0));
    let progress: Arc<dyn FleetObserver> = {
        let steps = Arc::clone(&steps);
        Arc::new(move |_robot: &RobotId, _pos: Point, status: RobotStatus| {
            if status == RobotStatus::Moving {
                steps.fetch_add(1, Ordering::Relaxed);
            }
        })
    };

    let t0 = Instant::now();
    let launched = fleet.start_movement(progress)?;
    println!("Launched {launched} movement workers");

    let mut near_misses = 0usize;
    while !fleet.wait_idle(POLL_INTERVAL) {
        for pair in fleet.detect_collisions_default() {
            warn!("proximity alert: {pair}");
            near_misses += 1;
        }
        if t0.elapsed() > RUN_TIMEOUT {
            println!("{}", fleet.clear_all());
            bail!("fleet still moving after {RUN_TIMEOUT:?}");
        }
    }
    let elapsed = t0.elapsed();

    // 6. Flush the log.
    log.finish().context("flushing event log")?;
    if let Some(e) = log.take_error() {
        eprintln!("event log error: {e}");
    }

    // 7. Summary.
    println!(
        "All robots idle in {:.2} s  |  {} movement steps  |  {near_misses} proximity alerts",
        elapsed.as_secs_f64(),
        steps.load(Ordering::Relaxed)
    );
    println!("Events written to {}", csv_path.display());
    println!();

    println!("{:<6} {:<8} {:<18} {:>5}  {}", "Robot", "Status", "At", "Hops", "History");
    println!("{}", "-".repeat(64));
    for snap in fleet.all_robot_status() {
        let history: Vec<String> = snap.path_history.iter().map(|v| v.0.to_string()).collect();
        println!(
            "{:<6} {:<8} {:<18} {:>5}  {}",
            snap.id.as_str(),
            snap.status.as_str(),
            snap.vertex_name,
            snap.path_history.len().saturating_sub(1),
            history.join("→"),
        );
    }
    println!();

    let snapshot = fleet.congestion_snapshot();
    let mut busiest: Vec<_> = snapshot.iter().collect();
    busiest.sort_by(|a, b| b.1.total_cmp(&a.1));
    println!("Busiest lanes:");
    for (lane, score) in busiest.into_iter().take(5) {
        println!("  {:<6} → {:<6}  {score:.3}", lane.lo().0, lane.hi().0);
    }

    Ok(())
}
