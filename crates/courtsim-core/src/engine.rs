//! Simulation engine - main entry point for running the simulation

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{Read, Write};

use courtsim_logic::constants::MINUTES_PER_DAY;
use courtsim_logic::{FacilityLayout, Pathfinder};

use crate::clock::SimulationClock;
use crate::components::*;
use crate::config::{FacilityConfig, SimConfig};
use crate::error::SimError;
use crate::events::{EventLog, SimEvent};
use crate::generation::generate_schedule;
use crate::persistence::{self, SaveData, SaveError, SAVE_VERSION};
use crate::systems::*;

/// Main simulation engine
pub struct SimulationEngine {
    config: SimConfig,
    /// Owns the current layout and the cleaning route cache
    pathfinder: Pathfinder,
    courts: CourtStore,
    queue: JobQueue,
    fleet: Fleet,
    clock: SimulationClock,
    events: EventLog,
    /// Every random draw comes from here so runs are reproducible
    rng: StdRng,
}

impl SimulationEngine {
    /// Build a facility with clean courts and a charged fleet at the dock.
    ///
    /// Events are recorded from the start. Hosts should call
    /// `drain_events` regularly or turn recording off; an undrained log
    /// keeps only the newest `events::DEFAULT_EVENT_CAPACITY` events.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        let layout = config.facility.build_layout()?;

        log::info!(
            "Facility ready: {} courts in {} rows, {} robots",
            layout.court_count(),
            layout.rows(),
            config.robot_count
        );

        let courts = CourtStore::new(&layout, config.lifecycle);
        let fleet = Fleet::new(
            config.robot_count,
            config.robots,
            layout.dock_position(),
            config.assignment_interval_secs,
        );
        let clock = SimulationClock::new(
            config.start_minute,
            config.time_scale,
            config.lifecycle_interval_secs,
        );

        Ok(Self {
            pathfinder: Pathfinder::new(layout, config.cleaning),
            courts,
            queue: JobQueue::new(),
            fleet,
            clock,
            events: EventLog::new(),
            rng: StdRng::seed_from_u64(config.seed),
            config,
        })
    }

    /// Advance virtual time by `delta_minutes` and fire every booking start
    /// and end that falls in the elapsed interval.
    pub fn tick(&mut self, delta_minutes: f64) {
        let Some((prev, now)) = self.clock.advance_minutes(delta_minutes) else {
            return;
        };
        self.courts
            .process_tick(prev, now, &mut self.queue, &mut self.rng, &mut self.events);
    }

    /// Step every robot by `delta_seconds` of simulated time, then hand out
    /// jobs. The delta is not scaled.
    pub fn update(&mut self, delta_seconds: f32) {
        let now = self.clock.now();
        let mut ctx = FleetContext {
            courts: &mut self.courts,
            queue: &mut self.queue,
            pathfinder: &mut self.pathfinder,
            events: &mut self.events,
        };
        self.fleet.update(delta_seconds, now, &mut ctx);
    }

    /// Host-loop entry point: scale real seconds, run a lifecycle tick when
    /// one is due, then update robots.
    pub fn advance(&mut self, real_seconds: f32) {
        let sim_seconds = self.clock.scale(real_seconds);
        if let Some(minutes) = self.clock.accumulate(sim_seconds) {
            self.tick(minutes);
        }
        self.update(sim_seconds);
    }

    /// Rebuild the facility on a new layout. Courts, bookings and queued
    /// jobs start over; robots are parked at the new dock.
    pub fn reconfigure(&mut self, facility: FacilityConfig) -> Result<(), SimError> {
        let layout = facility.build_layout()?;
        let now = self.clock.now();

        let mut ctx = FleetContext {
            courts: &mut self.courts,
            queue: &mut self.queue,
            pathfinder: &mut self.pathfinder,
            events: &mut self.events,
        };
        self.fleet.reset_all(layout.dock_position(), now, &mut ctx);

        self.pathfinder.sync_layout(&layout);
        self.courts = CourtStore::new(&layout, self.config.lifecycle);
        self.queue = JobQueue::restore(
            Vec::new(),
            self.queue.next_seq(),
            self.queue.completed_count(),
        );
        self.config.facility = facility;

        log::info!(
            "Facility reconfigured: {} courts in {} rows",
            layout.court_count(),
            layout.rows()
        );
        Ok(())
    }

    /// Replace the schedule with a generated day of bookings for the current
    /// day. Sessions already running are kept. Returns how many were added.
    pub fn generate_schedule(&mut self) -> usize {
        let day_start = self.clock.day() as f64 * MINUTES_PER_DAY;
        let bookings = generate_schedule(
            self.pathfinder.layout(),
            &self.config.schedule,
            day_start,
            &mut self.rng,
        );
        self.courts.replace_bookings(bookings)
    }

    pub fn add_booking(
        &mut self,
        court_id: &str,
        start_time: f64,
        end_time: f64,
        kind: BookingKind,
        player_count: u8,
    ) -> Result<String, SimError> {
        self.courts
            .add_booking(court_id, start_time, end_time, kind, player_count)
    }

    pub fn remove_booking(&mut self, booking_id: &str) -> Result<Booking, SimError> {
        let now = self.clock.now();
        self.courts.remove_booking(
            booking_id,
            now,
            &mut self.queue,
            &mut self.rng,
            &mut self.events,
        )
    }

    pub fn force_clean(&mut self, court_id: &str) -> Result<bool, SimError> {
        let now = self.clock.now();
        self.courts
            .force_clean(court_id, now, &mut self.queue, &mut self.events)
    }

    pub fn force_end_session(&mut self, court_id: &str) -> Result<bool, SimError> {
        let now = self.clock.now();
        self.courts.force_end_session(
            court_id,
            now,
            &mut self.queue,
            &mut self.rng,
            &mut self.events,
        )
    }

    pub fn set_out_of_service(
        &mut self,
        court_id: &str,
        out_of_service: bool,
    ) -> Result<bool, SimError> {
        let now = self.clock.now();
        self.courts.set_out_of_service(
            court_id,
            out_of_service,
            now,
            &mut self.queue,
            &mut self.events,
        )
    }

    /// Put a court at the front of the queue, marking it dirty if needed.
    pub fn dispatch_priority(&mut self, court_id: &str) -> Result<bool, SimError> {
        let now = self.clock.now();
        self.courts.request_cleaning(
            court_id,
            JobPriority::High,
            now,
            &mut self.queue,
            &mut self.events,
        )
    }

    pub fn reset_robot(&mut self, robot_id: &str) -> Result<(), SimError> {
        let now = self.clock.now();
        let mut ctx = FleetContext {
            courts: &mut self.courts,
            queue: &mut self.queue,
            pathfinder: &mut self.pathfinder,
            events: &mut self.events,
        };
        self.fleet.reset_robot(robot_id, now, &mut ctx)
    }

    /// Restart the random stream, e.g. to replay a scenario.
    pub fn reseed(&mut self, seed: u64) {
        self.config.seed = seed;
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Set time scale (1.0 = real-time, 60.0 = a minute per second, etc.)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.clock.set_time_scale(scale);
        self.config.time_scale = self.clock.time_scale();
    }

    pub fn time_scale(&self) -> f32 {
        self.clock.time_scale()
    }

    /// Current virtual minute
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Minute within the current day (0-1440)
    pub fn time_of_day(&self) -> f64 {
        self.clock.time_of_day()
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn layout(&self) -> &FacilityLayout {
        self.pathfinder.layout()
    }

    pub fn pathfinder(&self) -> &Pathfinder {
        &self.pathfinder
    }

    pub fn court(&self, court_id: &str) -> Result<&Court, SimError> {
        self.courts.court(court_id)
    }

    pub fn courts(&self) -> &[Court] {
        self.courts.courts()
    }

    pub fn robot(&self, robot_id: &str) -> Result<Robot, SimError> {
        self.fleet.robot(robot_id)
    }

    pub fn robots(&self) -> Vec<Robot> {
        self.fleet.robots()
    }

    /// Queued and in-progress jobs in queue order
    pub fn jobs(&self) -> &[CleaningJob] {
        self.queue.as_slice()
    }

    pub fn bookings(&self) -> &[Booking] {
        self.courts.bookings()
    }

    pub fn stats(&self) -> FacilityStats {
        FacilityStats {
            queued_jobs: self.queue.len(),
            completed_jobs: self.queue.completed_count(),
            ..self.courts.stats()
        }
    }

    /// Take every event recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        self.events.drain().collect()
    }

    /// Hosts that never drain can turn recording off.
    pub fn set_events_enabled(&mut self, enabled: bool) {
        self.events.set_enabled(enabled);
    }

    /// Cap on undrained events; past it the oldest are dropped.
    pub fn set_event_capacity(&mut self, capacity: usize) {
        self.events.set_capacity(capacity);
    }

    /// Events lost because the host did not drain in time.
    pub fn dropped_events(&self) -> u64 {
        self.events.dropped()
    }

    /// Serializable snapshot of the current state
    pub fn snapshot(&self) -> SaveData {
        SaveData {
            version: SAVE_VERSION,
            time_minutes: self.clock.now(),
            time_scale: self.clock.time_scale(),
            facility: self.config.facility.clone(),
            courts: self.courts.courts().to_vec(),
            bookings: self.courts.bookings().to_vec(),
            next_booking_id: self.courts.next_booking_id(),
            jobs: self.queue.clone(),
            robots: self.fleet.robots(),
        }
    }

    /// Replace the running state with `data`. Nothing changes if the
    /// snapshot is inconsistent.
    pub fn restore(&mut self, data: SaveData) -> Result<(), SaveError> {
        let layout = data.facility.build_layout().map_err(SimError::from)?;

        let courts = CourtStore::restore(
            &layout,
            self.config.lifecycle,
            data.courts,
            data.bookings,
            data.next_booking_id,
        )?;
        let fleet = Fleet::restore(
            data.robots,
            self.config.robots,
            layout.dock_position(),
            self.config.assignment_interval_secs,
        )?;
        let jobs: Vec<CleaningJob> = data
            .jobs
            .iter()
            .filter(|job| courts.status(&job.court_id).is_some())
            .cloned()
            .collect();
        let mut queue = JobQueue::restore(jobs, data.jobs.next_seq(), data.jobs.completed_count());
        queue.unassign_all();

        self.pathfinder.sync_layout(&layout);
        self.courts = courts;
        self.fleet = fleet;
        self.queue = queue;
        self.clock = SimulationClock::new(
            data.time_minutes,
            data.time_scale,
            self.config.lifecycle_interval_secs,
        );
        self.config.facility = data.facility;
        self.config.time_scale = self.clock.time_scale();

        log::info!(
            "Restored state at minute {:.1}: {} bookings, {} queued jobs",
            self.clock.now(),
            self.courts.bookings().len(),
            self.queue.len()
        );
        Ok(())
    }

    /// Export state as JSON
    pub fn export_json(&self) -> Result<String, SaveError> {
        let mut buf = Vec::new();
        persistence::save_json(&mut buf, &self.snapshot())?;
        String::from_utf8(buf)
            .map_err(|e| SaveError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }

    /// Import state from JSON produced by `export_json`
    pub fn import_json(&mut self, json: &str) -> Result<(), SaveError> {
        let data = persistence::load_json(json.as_bytes())?;
        self.restore(data)
    }

    /// Save simulation state to a writer (binary)
    pub fn save<W: Write>(&self, writer: W) -> Result<(), SaveError> {
        persistence::save_binary(writer, &self.snapshot())
    }

    /// Load simulation state from a reader (binary)
    pub fn load<R: Read>(&mut self, reader: R) -> Result<(), SaveError> {
        let data = persistence::load_binary(reader)?;
        self.restore(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SimConfig {
        SimConfig {
            facility: FacilityConfig {
                columns_per_row: vec![2],
                ..Default::default()
            },
            robot_count: 1,
            assignment_interval_secs: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_engine_creation() {
        let engine = SimulationEngine::new(SimConfig::default()).unwrap();
        assert_eq!(engine.courts().len(), 8);
        assert_eq!(engine.robots().len(), 2);
        assert_eq!(engine.now(), 0.0);
        assert!(engine.jobs().is_empty());
        assert_eq!(engine.stats().available, 8);
    }

    #[test]
    fn test_rejects_bad_config() {
        let mut config = small_config();
        config.facility.columns_per_row = vec![];
        assert!(matches!(
            SimulationEngine::new(config),
            Err(SimError::Layout(_))
        ));

        let mut config = small_config();
        config.robots.cleaning_speed = -1.0;
        assert!(matches!(
            SimulationEngine::new(config),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_tick_drives_lifecycle() {
        let mut engine = SimulationEngine::new(small_config()).unwrap();
        engine
            .add_booking("0-0", 10.0, 40.0, BookingKind::OpenPlay, 4)
            .unwrap();
        engine.tick(15.0);
        assert_eq!(engine.court("0-0").unwrap().status, CourtStatus::InUse);
        engine.tick(30.0);
        assert_eq!(engine.court("0-0").unwrap().status, CourtStatus::NeedsCleaning);
        assert_eq!(engine.jobs().len(), 1);
        assert_eq!(engine.stats().queued_jobs, 1);

        // Negative deltas never move time backwards
        engine.tick(-10.0);
        assert_eq!(engine.now(), 45.0);
    }

    #[test]
    fn test_advance_scales_time() {
        let mut config = small_config();
        config.time_scale = 60.0;
        let mut engine = SimulationEngine::new(config).unwrap();
        engine.advance(1.0);
        assert!((engine.now() - 1.0).abs() < 1e-6);

        engine.set_time_scale(0.0);
        engine.advance(1.0);
        assert!((engine.now() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_dispatch_priority() {
        let mut engine = SimulationEngine::new(small_config()).unwrap();
        assert!(engine.dispatch_priority("0-1").unwrap());
        assert_eq!(engine.jobs()[0].priority, JobPriority::High);
        assert_eq!(engine.court("0-1").unwrap().status, CourtStatus::NeedsCleaning);
        assert!(matches!(
            engine.dispatch_priority("5-5"),
            Err(SimError::CourtNotFound(_))
        ));

        engine.update(0.0);
        assert_eq!(engine.robot("robot-1").unwrap().status, RobotStatus::Navigating);
    }

    #[test]
    fn test_reconfigure() {
        let mut engine = SimulationEngine::new(small_config()).unwrap();
        engine.dispatch_priority("0-0").unwrap();
        engine.update(0.0);

        engine
            .reconfigure(FacilityConfig {
                columns_per_row: vec![3, 3, 1],
                ..Default::default()
            })
            .unwrap();
        assert_eq!(engine.courts().len(), 7);
        assert!(engine.jobs().is_empty());
        let robot = engine.robot("robot-1").unwrap();
        assert_eq!(robot.status, RobotStatus::Idle);
        assert_eq!(robot.position, engine.layout().dock_position());

        assert!(engine
            .reconfigure(FacilityConfig {
                spacing: -1.0,
                ..Default::default()
            })
            .is_err());
        assert_eq!(engine.courts().len(), 7);
    }

    #[test]
    fn test_generate_schedule_is_seeded() {
        let mut a = SimulationEngine::new(small_config()).unwrap();
        let mut b = SimulationEngine::new(small_config()).unwrap();
        assert_eq!(a.generate_schedule(), b.generate_schedule());
        assert_eq!(a.bookings(), b.bookings());

        b.reseed(99);
        b.generate_schedule();
        assert!(b.bookings().iter().all(|x| x.id.starts_with("booking-")));
    }

    #[test]
    fn test_events_are_drained() {
        let mut engine = SimulationEngine::new(small_config()).unwrap();
        engine.dispatch_priority("0-0").unwrap();
        let events = engine.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, SimEvent::JobEnqueued { court_id, .. } if court_id == "0-0")));
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn test_undrained_events_are_capped() {
        let mut engine = SimulationEngine::new(small_config()).unwrap();
        engine.set_event_capacity(2);
        for id in ["0-0", "0-1"] {
            engine.dispatch_priority(id).unwrap();
        }
        assert!(engine.dropped_events() > 0);
        let events = engine.drain_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events.last(),
            Some(SimEvent::JobEnqueued { court_id, .. }) if court_id == "0-1"
        ));
    }
}
