//! Save/load round trips through the engine.
//!
//! Exercises: SimulationEngine → SaveData → JSON / bincode → SimulationEngine

use courtsim_core::persistence::{SaveError, SAVE_VERSION};
use courtsim_core::prelude::*;

fn config() -> SimConfig {
    SimConfig {
        facility: FacilityConfig {
            columns_per_row: vec![3, 2],
            ..Default::default()
        },
        robot_count: 2,
        seed: 7,
        start_minute: 6.0 * 60.0,
        assignment_interval_secs: 0.0,
        ..Default::default()
    }
}

/// Mid-morning: a schedule, some dirty courts and robots on their way.
fn busy_engine() -> SimulationEngine {
    let mut engine = SimulationEngine::new(config()).unwrap();
    engine.generate_schedule();
    engine.tick(240.0);
    engine.dispatch_priority("1-1").unwrap();
    engine.update(0.0);
    engine
}

fn assert_same_facility(a: &SimulationEngine, b: &SimulationEngine) {
    assert_eq!(a.now(), b.now());
    assert_eq!(a.bookings(), b.bookings());
    assert_eq!(a.courts().len(), b.courts().len());
    for (x, y) in a.courts().iter().zip(b.courts()) {
        assert_eq!(x.id, y.id);
        assert_eq!(x.status, y.status);
        assert_eq!(x.active_booking_id, y.active_booking_id);
        assert!((x.cleanliness - y.cleanliness).abs() < 1e-3);
    }
    let jobs_a: Vec<_> = a.jobs().iter().map(|j| (&j.id, &j.court_id, j.priority)).collect();
    let jobs_b: Vec<_> = b.jobs().iter().map(|j| (&j.id, &j.court_id, j.priority)).collect();
    assert_eq!(jobs_a, jobs_b);
}

fn assert_parked(engine: &SimulationEngine) {
    let dock = engine.layout().dock_position();
    for robot in engine.robots() {
        assert_eq!(robot.status, RobotStatus::Idle);
        assert_eq!(robot.position, dock);
        assert_eq!(robot.current_job_id, None);
    }
    assert!(engine.jobs().iter().all(|j| j.assigned_robot_id.is_none()));
}

#[test]
fn json_roundtrip() {
    let engine = busy_engine();
    assert!(engine.jobs().iter().any(|j| j.assigned_robot_id.is_some()));

    let json = engine.export_json().expect("export failed");
    let mut loaded = SimulationEngine::new(SimConfig::default()).unwrap();
    loaded.import_json(&json).expect("import failed");

    assert_same_facility(&engine, &loaded);
    assert_parked(&loaded);
    assert_eq!(loaded.courts().len(), 5);
    assert_eq!(loaded.robots().len(), 2);
}

#[test]
fn binary_roundtrip() {
    let engine = busy_engine();
    let mut buf = Vec::new();
    engine.save(&mut buf).expect("save failed");

    let mut loaded = SimulationEngine::new(config()).unwrap();
    loaded.load(&buf[..]).expect("load failed");

    assert_same_facility(&engine, &loaded);
    assert_parked(&loaded);
}

#[test]
fn cleaning_courts_wait_for_a_new_robot() {
    let mut engine = SimulationEngine::new(config()).unwrap();
    engine.dispatch_priority("0-0").unwrap();
    engine.update(0.0);
    while engine.court("0-0").unwrap().status != CourtStatus::Cleaning {
        engine.update(0.1);
    }

    let json = engine.export_json().unwrap();
    let mut loaded = SimulationEngine::new(config()).unwrap();
    loaded.import_json(&json).unwrap();
    assert_eq!(loaded.court("0-0").unwrap().status, CourtStatus::NeedsCleaning);

    // The queued job is still there and gets picked up again
    loaded.update(0.0);
    assert_eq!(loaded.jobs()[0].court_id, "0-0");
    assert!(loaded.jobs()[0].assigned_robot_id.is_some());
}

#[test]
fn loaded_state_replays_identically() {
    let engine = busy_engine();
    let mut buf = Vec::new();
    engine.save(&mut buf).unwrap();

    let mut a = SimulationEngine::new(config()).unwrap();
    let mut b = SimulationEngine::new(config()).unwrap();
    a.load(&buf[..]).unwrap();
    b.load(&buf[..]).unwrap();
    for _ in 0..600 {
        a.tick(0.1);
        a.update(6.0);
        b.tick(0.1);
        b.update(6.0);
    }
    assert_eq!(a.robots(), b.robots());
    assert_eq!(a.courts(), b.courts());
    assert_eq!(a.stats(), b.stats());
}

#[test]
fn failed_import_leaves_state_alone() {
    let mut engine = busy_engine();
    let before = engine.export_json().unwrap();

    assert!(matches!(engine.import_json("{ broken"), Err(SaveError::Json(_))));

    // Decodes fine but names a court the layout does not have
    let mut data = engine.snapshot();
    data.courts[0].id = "9-9".into();
    let bad = serde_json::to_string(&data).unwrap();
    assert!(matches!(
        engine.import_json(&bad),
        Err(SaveError::Sim(SimError::CourtNotFound(_)))
    ));

    // A session whose booking is gone could never end
    let mut data = engine.snapshot();
    data.courts[0].status = CourtStatus::InUse;
    data.courts[0].active_booking_id = Some("booking-missing".into());
    let orphaned = serde_json::to_string(&data).unwrap();
    assert!(matches!(
        engine.import_json(&orphaned),
        Err(SaveError::Sim(SimError::BookingNotFound(_)))
    ));

    // Two sessions on one court at once
    let mut data = engine.snapshot();
    let court = data.courts[0].id.clone();
    for (id, start) in [("booking-900", 1300.0), ("booking-901", 1310.0)] {
        data.bookings.push(Booking {
            id: id.into(),
            court_id: court.clone(),
            start_time: start,
            end_time: start + 30.0,
            kind: BookingKind::Lesson,
            player_count: 2,
        });
    }
    let overlapping = serde_json::to_string(&data).unwrap();
    assert!(matches!(
        engine.import_json(&overlapping),
        Err(SaveError::Sim(SimError::BookingOverlap { .. }))
    ));

    let mut data = engine.snapshot();
    data.version = SAVE_VERSION + 1;
    let future = serde_json::to_string(&data).unwrap();
    assert!(matches!(
        engine.import_json(&future),
        Err(SaveError::VersionMismatch { .. })
    ));

    assert_eq!(engine.export_json().unwrap(), before);
}
