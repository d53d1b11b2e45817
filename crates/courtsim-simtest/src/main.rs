//! CourtSim Headless Simulation Harness
//!
//! Runs the facility scenarios in `data/scenarios.json` through the pure
//! geometry crate and the full engine, and prints a pass/fail report.
//! No rendering, no host loop, no wall-clock time.
//!
//! Usage:
//!   cargo run -p courtsim-simtest
//!   cargo run -p courtsim-simtest -- --verbose

use std::collections::HashSet;

use courtsim_core::config::{DropRange, LifecycleTuning};
use courtsim_core::prelude::*;
use courtsim_logic::{
    court_id, parse_court_id, path_length, CleaningPattern, FacilityLayout, PathFollower,
    Pathfinder, Point,
};
use serde::Deserialize;

// ── Scenario manifest ───────────────────────────────────────────────────
const SCENARIOS_JSON: &str = include_str!("../../../data/scenarios.json");

#[derive(Debug, Deserialize)]
struct Scenario {
    name: String,
    columns_per_row: Vec<u32>,
    spacing: f32,
    robot_count: u32,
    seed: u64,
    hours: u32,
}

impl Scenario {
    fn dock(&self) -> Point {
        FacilityConfig::default().dock
    }

    fn layout(&self) -> Option<FacilityLayout> {
        FacilityLayout::new(self.columns_per_row.clone(), self.spacing, self.dock()).ok()
    }

    fn config(&self) -> SimConfig {
        SimConfig {
            facility: FacilityConfig {
                columns_per_row: self.columns_per_row.clone(),
                spacing: self.spacing,
                dock: self.dock(),
            },
            robot_count: self.robot_count,
            seed: self.seed,
            start_minute: 6.0 * 60.0,
            time_scale: 60.0,
            ..Default::default()
        }
    }
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== CourtSim Simulation Harness ===\n");

    let mut results = Vec::new();

    let scenarios: Vec<Scenario> = match serde_json::from_str(SCENARIOS_JSON) {
        Ok(s) => s,
        Err(e) => {
            println!("  ✗ scenarios_parse: JSON parse error: {}", e);
            std::process::exit(1);
        }
    };
    results.push(TestResult {
        name: "scenarios_parse".into(),
        passed: !scenarios.is_empty(),
        detail: format!("{} scenarios", scenarios.len()),
    });

    // 1. Layout geometry
    results.extend(validate_layouts(&scenarios, verbose));

    // 2. Routing and sweeps
    results.extend(validate_pathfinding(&scenarios, verbose));

    // 3. Court lifecycle end to end
    results.extend(validate_lifecycle(verbose));

    // 4. Full-day fleet runs
    results.extend(validate_day_runs(&scenarios, verbose));

    // 5. Save / load
    results.extend(validate_persistence(&scenarios, verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Layouts ──────────────────────────────────────────────────────────

fn validate_layouts(scenarios: &[Scenario], _verbose: bool) -> Vec<TestResult> {
    println!("--- Layouts ---");
    let mut results = Vec::new();

    for s in scenarios {
        let Some(layout) = s.layout() else {
            results.push(TestResult {
                name: format!("{}_layout", s.name),
                passed: false,
                detail: "layout rejected".into(),
            });
            continue;
        };

        let expected: usize = s.columns_per_row.iter().map(|&c| c as usize).sum();
        results.push(TestResult {
            name: format!("{}_court_count", s.name),
            passed: layout.court_count() == expected,
            detail: format!("{} courts", layout.court_count()),
        });

        let ids: Vec<String> = layout.courts().map(|(r, c)| court_id(r, c)).collect();
        let unique: HashSet<&String> = ids.iter().collect();
        let round_trip = layout
            .courts()
            .all(|(r, c)| parse_court_id(&court_id(r, c)) == Some((r, c)));
        results.push(TestResult {
            name: format!("{}_court_ids", s.name),
            passed: unique.len() == ids.len() && round_trip,
            detail: "ids unique and parse back".into(),
        });

        // Courts in a row sit one width + spacing apart and never overlap
        let stride = layout.court_width() + layout.spacing();
        let spaced = layout.courts().filter(|&(_, c)| c > 0).all(|(r, c)| {
            let a = layout.court_origin(r, c - 1);
            let b = layout.court_origin(r, c);
            ((b.x - a.x) - stride).abs() < 1e-3 && (b.z - a.z).abs() < 1e-6
        });
        results.push(TestResult {
            name: format!("{}_court_spacing", s.name),
            passed: spaced,
            detail: format!("stride {:.2} m", stride),
        });

        let on_aisle = layout
            .courts()
            .all(|(r, c)| (layout.court_entrance(r, c).z - layout.row_aisle_z(r)).abs() < 1e-6);
        results.push(TestResult {
            name: format!("{}_entrances_on_aisle", s.name),
            passed: on_aisle,
            detail: "every entrance lies on its row aisle".into(),
        });
    }

    results
}

// ── 2. Pathfinding ──────────────────────────────────────────────────────

fn validate_pathfinding(scenarios: &[Scenario], verbose: bool) -> Vec<TestResult> {
    println!("--- Pathfinding ---");
    let mut results = Vec::new();

    for s in scenarios {
        let Some(layout) = s.layout() else {
            continue;
        };
        let dock = layout.dock_position();
        let courts: Vec<(u32, u32)> = layout.courts().collect();
        let mut pf = Pathfinder::new(layout, CleaningPattern::default());

        // Every entrance reachable from the dock, and back again
        let mut reachable = true;
        let mut longest = 0.0f32;
        for &(r, c) in &courts {
            let entrance = pf.layout().court_entrance(r, c);
            match pf.path_to_court_entrance(dock, r, c) {
                Some(path) => {
                    reachable &= path.last().map(|p| p.approx_eq(&entrance, 1e-4)).unwrap_or(false);
                    longest = longest.max(path_length(dock, &path));
                }
                None => reachable = false,
            }
            let home = pf.path_to_dock(entrance);
            reachable &= home.last().map(|p| p.approx_eq(&dock, 1e-4)).unwrap_or(false);
            reachable &= pf
                .path_to_court_entrance(entrance, r, c)
                .map(|p| p.is_empty())
                .unwrap_or(false);
        }
        results.push(TestResult {
            name: format!("{}_routes", s.name),
            passed: reachable,
            detail: format!("longest dock→entrance {:.1} m", longest),
        });

        // Same court shape → same sweep length, and the cache fills once
        let mut lengths = Vec::new();
        for &(r, c) in &courts {
            if let Some(route) = pf.cleaning_path(r, c) {
                lengths.push(route.length);
            }
        }
        let first = lengths.first().copied().unwrap_or(0.0);
        let uniform = lengths.len() == courts.len()
            && lengths.iter().all(|l| (l - first).abs() / first < 1e-2);
        results.push(TestResult {
            name: format!("{}_sweep_lengths", s.name),
            passed: uniform && pf.cached_routes() == courts.len(),
            detail: format!("{:.1} m per court, {} cached", first, pf.cached_routes()),
        });

        // Following a sweep in ragged steps covers exactly its length
        if let Some(&(r, c)) = courts.last() {
            if let Some(route) = pf.cleaning_path(r, c) {
                let chunks = [0.013f32, 0.4, 0.07, 1.3];
                let mut follower = PathFollower::new(route.waypoints[0]);
                let mut covered = 0.0f64;
                let mut i = 0;
                while !follower.is_done(&route.waypoints) && i < 1_000_000 {
                    covered += follower.advance(&route.waypoints, chunks[i % chunks.len()]) as f64;
                    i += 1;
                }
                let rel = (covered as f32 - route.length).abs() / route.length;
                results.push(TestResult {
                    name: format!("{}_sweep_follow", s.name),
                    passed: follower.is_done(&route.waypoints) && rel < 1e-3,
                    detail: format!("covered {:.2} of {:.2} m in {} steps", covered, route.length, i),
                });
                if verbose {
                    println!("  {}: sweep has {} waypoints", s.name, route.waypoints.len());
                }
            }
        }
    }

    results
}

// ── 3. Lifecycle ────────────────────────────────────────────────────────

fn validate_lifecycle(_verbose: bool) -> Vec<TestResult> {
    println!("--- Court Lifecycle ---");
    let mut results = Vec::new();

    let config = SimConfig {
        facility: FacilityConfig {
            columns_per_row: vec![2],
            ..Default::default()
        },
        robot_count: 1,
        assignment_interval_secs: 0.0,
        lifecycle: LifecycleTuning {
            session_end_drop: DropRange::new(45.0, 45.0),
            ..Default::default()
        },
        ..Default::default()
    };
    let mut engine = match SimulationEngine::new(config) {
        Ok(e) => e,
        Err(e) => {
            results.push(TestResult {
                name: "lifecycle_engine".into(),
                passed: false,
                detail: e.to_string(),
            });
            return results;
        }
    };

    let booked = engine
        .add_booking("0-0", 60.0, 90.0, BookingKind::OpenPlay, 4)
        .is_ok();
    let overlap_rejected = engine
        .add_booking("0-0", 80.0, 100.0, BookingKind::Lesson, 2)
        .is_err();
    results.push(TestResult {
        name: "lifecycle_booking_rules".into(),
        passed: booked && overlap_rejected,
        detail: "booking accepted, overlapping one rejected".into(),
    });

    let mut in_use_at = None;
    let mut dirty_at = None;
    let mut refused_in_use = false;
    for minute in 1..=95 {
        engine.tick(1.0);
        let status = engine.court("0-0").map(|c| c.status).ok();
        if status == Some(CourtStatus::InUse) && in_use_at.is_none() {
            in_use_at = Some(minute);
            refused_in_use = engine.force_clean("0-0") == Ok(false);
        }
        if status == Some(CourtStatus::NeedsCleaning) && dirty_at.is_none() {
            dirty_at = Some(minute);
        }
    }
    results.push(TestResult {
        name: "lifecycle_transitions".into(),
        passed: in_use_at == Some(60) && dirty_at == Some(90) && engine.jobs().len() == 1,
        detail: format!("in use at {:?}, dirty at {:?}", in_use_at, dirty_at),
    });
    results.push(TestResult {
        name: "lifecycle_force_clean_in_use".into(),
        passed: refused_in_use,
        detail: "force clean refused during a session".into(),
    });

    let mut steps = 0;
    while engine.court("0-0").map(|c| c.status) != Ok(CourtStatus::AvailableClean)
        && steps < 100_000
    {
        engine.update(0.1);
        steps += 1;
    }
    let court = engine.court("0-0").ok();
    let robot = engine.robot("robot-1").ok();
    results.push(TestResult {
        name: "lifecycle_robot_cleans".into(),
        passed: court.map(|c| c.cleanliness == 100.0).unwrap_or(false)
            && robot.as_ref().map(|r| r.jobs_completed == 1).unwrap_or(false),
        detail: format!("cleaned after {:.1} s", steps as f32 * 0.1),
    });

    let neighbour = engine.court("0-1").map(|c| c.status);
    results.push(TestResult {
        name: "lifecycle_independent_courts".into(),
        passed: neighbour == Ok(CourtStatus::AvailableClean),
        detail: "court 0-1 untouched".into(),
    });

    results
}

// ── 4. Day runs ─────────────────────────────────────────────────────────

struct DayOutcome {
    stats: FacilityStats,
    robots: Vec<Robot>,
    bounded: bool,
    consistent: bool,
}

fn run_day(s: &Scenario) -> Option<DayOutcome> {
    let mut engine = SimulationEngine::new(s.config()).ok()?;
    engine.set_events_enabled(false);
    engine.generate_schedule();

    let mut bounded = true;
    let mut consistent = true;
    // 60x, 10 frames per real second → 6 simulated seconds per frame
    let frames = s.hours * 60 * 10;
    for _ in 0..frames {
        engine.advance(0.1);

        for robot in engine.robots() {
            bounded &= (0.0..=100.0).contains(&robot.battery);
            bounded &= (0.0..=100.0).contains(&robot.cleaning_progress);
            if let Some(job_id) = &robot.current_job_id {
                consistent &= engine.jobs().iter().any(|j| {
                    &j.id == job_id && j.assigned_robot_id.as_deref() == Some(robot.id.as_str())
                });
            }
        }
        let courts_with_jobs: HashSet<&str> =
            engine.jobs().iter().map(|j| j.court_id.as_str()).collect();
        consistent &= courts_with_jobs.len() == engine.jobs().len();
    }

    Some(DayOutcome {
        stats: engine.stats(),
        robots: engine.robots(),
        bounded,
        consistent,
    })
}

fn validate_day_runs(scenarios: &[Scenario], verbose: bool) -> Vec<TestResult> {
    println!("--- Day Runs ---");
    let mut results = Vec::new();

    for s in scenarios {
        let Some(outcome) = run_day(s) else {
            results.push(TestResult {
                name: format!("{}_day", s.name),
                passed: false,
                detail: "engine rejected config".into(),
            });
            continue;
        };

        results.push(TestResult {
            name: format!("{}_day_jobs", s.name),
            passed: outcome.stats.completed_jobs > 0,
            detail: format!(
                "{} cleaned, {} still queued",
                outcome.stats.completed_jobs, outcome.stats.queued_jobs
            ),
        });
        results.push(TestResult {
            name: format!("{}_day_bounds", s.name),
            passed: outcome.bounded,
            detail: "battery and progress stayed within 0-100".into(),
        });
        results.push(TestResult {
            name: format!("{}_day_consistency", s.name),
            passed: outcome.consistent,
            detail: "one job per court, robots hold only live jobs".into(),
        });

        let rerun = run_day(s);
        let same = rerun
            .map(|r| r.stats == outcome.stats && r.robots == outcome.robots)
            .unwrap_or(false);
        results.push(TestResult {
            name: format!("{}_day_deterministic", s.name),
            passed: same,
            detail: format!("seed {}", s.seed),
        });

        if verbose {
            let distance: f32 = outcome.robots.iter().map(|r| r.distance_travelled).sum();
            println!(
                "  {}: mean cleanliness {:.1}, fleet drove {:.0} m",
                s.name, outcome.stats.mean_cleanliness, distance
            );
        }
    }

    results
}

// ── 5. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(scenarios: &[Scenario], _verbose: bool) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();

    let Some(s) = scenarios.iter().max_by_key(|s| s.robot_count) else {
        return results;
    };
    let Ok(mut engine) = SimulationEngine::new(s.config()) else {
        return results;
    };
    engine.generate_schedule();
    for _ in 0..3000 {
        engine.advance(0.1);
    }

    let json = engine.export_json();
    let mut loaded = SimulationEngine::new(SimConfig::default()).ok();
    let imported = match (&json, loaded.as_mut()) {
        (Ok(text), Some(target)) => target.import_json(text).is_ok(),
        _ => false,
    };
    let matches = loaded
        .as_ref()
        .map(|l| {
            l.bookings() == engine.bookings()
                && l.now() == engine.now()
                && l.courts().len() == engine.courts().len()
        })
        .unwrap_or(false);
    results.push(TestResult {
        name: "persistence_json".into(),
        passed: imported && matches,
        detail: format!("{} bytes", json.as_ref().map(|j| j.len()).unwrap_or(0)),
    });

    let mut buf = Vec::new();
    let saved = engine.save(&mut buf).is_ok();
    let restored = SimulationEngine::new(SimConfig::default())
        .ok()
        .and_then(|mut e| e.load(&buf[..]).ok().map(|_| e));
    let parked = restored
        .as_ref()
        .map(|e| e.robots().iter().all(|r| r.status == RobotStatus::Idle))
        .unwrap_or(false);
    results.push(TestResult {
        name: "persistence_binary".into(),
        passed: saved && parked,
        detail: format!("{} bytes", buf.len()),
    });

    results
}
