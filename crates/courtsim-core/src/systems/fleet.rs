//! Robot fleet - per-robot state machine and job assignment
//!
//! Robots live in a hecs `World`, one entity per robot carrying `Robot` and
//! `RobotRuntime`. `order` keeps spawn order so every pass visits robots the
//! same way and runs stay reproducible.

use hecs::{Entity, World};
use std::collections::HashMap;

use courtsim_logic::constants::robot::DOCK_TOLERANCE;
use courtsim_logic::{parse_court_id, Pathfinder, Point};

use crate::components::{CourtStatus, Robot, RobotRuntime, RobotStatus};
use crate::config::RobotTuning;
use crate::error::SimError;
use crate::events::{EventLog, SimEvent};
use crate::systems::{CourtStore, JobQueue};

/// Everything a robot touches while it steps.
pub struct FleetContext<'a> {
    pub courts: &'a mut CourtStore,
    pub queue: &'a mut JobQueue,
    pub pathfinder: &'a mut Pathfinder,
    pub events: &'a mut EventLog,
}

pub struct Fleet {
    world: World,
    order: Vec<Entity>,
    index: HashMap<String, Entity>,
    tuning: RobotTuning,
    dock: Point,
    since_assignment: f32,
    assignment_interval: f32,
}

fn set_status(robot: &mut Robot, to: RobotStatus, events: &mut EventLog) {
    if robot.status == to {
        return;
    }
    let from = robot.status;
    robot.status = to;
    log::debug!("{}: {} -> {}", robot.name, from.label(), to.label());
    events.push(SimEvent::RobotStatusChanged {
        robot_id: robot.id.clone(),
        from,
        to,
    });
}

/// Drop the current route and job references and stand still.
fn go_idle(robot: &mut Robot, rt: &mut RobotRuntime, events: &mut EventLog) {
    robot.target_court_id = None;
    robot.current_job_id = None;
    robot.cleaning_progress = 0.0;
    rt.nav_path.clear();
    rt.cleaning_path.clear();
    rt.follower.restart();
    rt.cleaning_length = 0.0;
    rt.cleaned_distance = 0.0;
    set_status(robot, RobotStatus::Idle, events);
}

/// Still holding a job that is still queued?
fn job_alive(robot: &Robot, queue: &JobQueue) -> bool {
    robot
        .current_job_id
        .as_deref()
        .map(|job_id| queue.is_held_by(job_id, &robot.id))
        .unwrap_or(false)
}

/// Record distance driven under power and drain the battery for it.
fn drive(robot: &mut Robot, moved: f32, tuning: &RobotTuning) {
    robot.distance_travelled += moved;
    robot.adjust_battery(-tuning.battery_drain_per_meter * moved);
}

/// Arrived at the court entrance: load the sweep and start cleaning.
fn start_sweep(robot: &mut Robot, rt: &mut RobotRuntime, now: f64, ctx: &mut FleetContext<'_>) {
    let route = match robot.target_court_id.as_deref().and_then(parse_court_id) {
        Some((row, col)) => ctx.pathfinder.cleaning_path(row, col),
        None => None,
    };
    let Some(route) = route else {
        log::warn!("{} has no sweep for its target court, giving up", robot.name);
        if let Some(job_id) = robot.current_job_id.as_deref() {
            ctx.queue.unassign(job_id);
        }
        go_idle(robot, rt, ctx.events);
        return;
    };

    rt.cleaning_path.clear();
    rt.cleaning_path.extend_from_slice(&route.waypoints);
    rt.cleaning_length = route.length;
    rt.cleaned_distance = 0.0;
    rt.follower.restart();

    let court_id = robot.target_court_id.as_deref().unwrap_or_default();
    if !ctx.courts.begin_cleaning(court_id, now, ctx.events) {
        // Court was taken out of the cleaning cycle while we drove over
        if let Some(job_id) = robot.current_job_id.as_deref() {
            ctx.queue.unassign(job_id);
        }
        go_idle(robot, rt, ctx.events);
        return;
    }
    robot.cleaning_progress = 0.0;
    set_status(robot, RobotStatus::Cleaning, ctx.events);
}

fn finish_sweep(
    robot: &mut Robot,
    rt: &mut RobotRuntime,
    tuning: &RobotTuning,
    now: f64,
    ctx: &mut FleetContext<'_>,
) {
    let court_id = robot.target_court_id.as_deref().unwrap_or_default();
    ctx.courts.finish_cleaning(court_id, now, ctx.events);

    if let Some(job_id) = robot.current_job_id.as_deref() {
        if let Ok(job) = ctx.queue.complete(job_id) {
            log::info!("{} finished cleaning court {}", robot.name, job.court_id);
            ctx.events.push(SimEvent::JobCompleted {
                job_id: job.id,
                court_id: job.court_id,
                robot_id: robot.id.clone(),
            });
        }
    }

    robot.adjust_battery(-tuning.battery_drain_per_court);
    robot.jobs_completed += 1;
    go_idle(robot, rt, ctx.events);
}

/// Advance one robot by `dt` simulated seconds.
fn step_robot(
    robot: &mut Robot,
    rt: &mut RobotRuntime,
    tuning: &RobotTuning,
    dt: f32,
    now: f64,
    ctx: &mut FleetContext<'_>,
) {
    match robot.status {
        RobotStatus::Idle => {}
        RobotStatus::Navigating => {
            if !job_alive(robot, ctx.queue) {
                go_idle(robot, rt, ctx.events);
                return;
            }
            let moved = rt.follower.advance(&rt.nav_path, tuning.navigation_speed * dt);
            drive(robot, moved, tuning);
            if rt.follower.is_done(&rt.nav_path) {
                start_sweep(robot, rt, now, ctx);
            }
        }
        RobotStatus::Cleaning => {
            if !job_alive(robot, ctx.queue) {
                // Whoever removed the job owns the court's state now
                go_idle(robot, rt, ctx.events);
                return;
            }
            let moved = rt.follower.advance(&rt.cleaning_path, tuning.cleaning_speed * dt);
            robot.distance_travelled += moved;
            rt.cleaned_distance += moved;
            robot.cleaning_progress = if rt.cleaning_length > 0.0 {
                (rt.cleaned_distance / rt.cleaning_length * 100.0).min(100.0)
            } else {
                100.0
            };

            let court_id = robot.target_court_id.as_deref().unwrap_or_default();
            ctx.courts
                .apply_cleaning(court_id, dt / tuning.cleanliness_time_constant_secs);

            if rt.follower.is_done(&rt.cleaning_path) {
                finish_sweep(robot, rt, tuning, now, ctx);
            }
        }
        RobotStatus::Returning => {
            let moved = rt.follower.advance(&rt.nav_path, tuning.navigation_speed * dt);
            drive(robot, moved, tuning);
            if rt.follower.is_done(&rt.nav_path) {
                rt.nav_path.clear();
                rt.follower.restart();
                set_status(robot, RobotStatus::Charging, ctx.events);
            }
        }
        RobotStatus::Charging => {
            robot.adjust_battery(tuning.recharge_rate_per_minute * dt / 60.0);
            if robot.battery >= tuning.charge_resume_threshold {
                set_status(robot, RobotStatus::Idle, ctx.events);
            }
        }
    }

    robot.position = rt.follower.position;
    robot.rotation = rt.follower.rotation;
}

impl Fleet {
    /// Spawn `count` robots at the dock.
    pub fn new(count: u32, tuning: RobotTuning, dock: Point, assignment_interval: f32) -> Self {
        let mut fleet = Self::empty(tuning, dock, assignment_interval);
        for i in 1..=count {
            fleet.spawn(Robot::new(format!("robot-{}", i), format!("Sweeper {}", i), dock));
        }
        fleet
    }

    fn empty(tuning: RobotTuning, dock: Point, assignment_interval: f32) -> Self {
        Self {
            world: World::new(),
            order: Vec::new(),
            index: HashMap::new(),
            tuning,
            dock,
            since_assignment: 0.0,
            assignment_interval,
        }
    }

    fn spawn(&mut self, robot: Robot) {
        let id = robot.id.clone();
        let runtime = RobotRuntime::new(robot.position);
        let entity = self.world.spawn((robot, runtime));
        self.order.push(entity);
        self.index.insert(id, entity);
    }

    /// Rebuild from saved robots. Routes are not saved, so every robot comes
    /// back idle at the dock with its battery and counters intact.
    pub fn restore(
        robots: Vec<Robot>,
        tuning: RobotTuning,
        dock: Point,
        assignment_interval: f32,
    ) -> Result<Self, SimError> {
        let mut fleet = Self::empty(tuning, dock, assignment_interval);
        for mut robot in robots {
            if fleet.index.contains_key(&robot.id) {
                return Err(SimError::InvalidConfig(format!(
                    "robot {} saved twice",
                    robot.id
                )));
            }
            robot.status = RobotStatus::Idle;
            robot.position = dock;
            robot.target_court_id = None;
            robot.current_job_id = None;
            robot.cleaning_progress = 0.0;
            robot.battery = robot.battery.clamp(0.0, 100.0);
            fleet.spawn(robot);
        }
        Ok(fleet)
    }

    pub fn tuning(&self) -> RobotTuning {
        self.tuning
    }

    pub fn set_tuning(&mut self, tuning: RobotTuning) {
        self.tuning = tuning;
    }

    pub fn dock(&self) -> Point {
        self.dock
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn entity(&self, robot_id: &str) -> Result<Entity, SimError> {
        self.index
            .get(robot_id)
            .copied()
            .ok_or_else(|| SimError::RobotNotFound(robot_id.to_string()))
    }

    pub fn robot(&self, robot_id: &str) -> Result<Robot, SimError> {
        let entity = self.entity(robot_id)?;
        self.world
            .get::<&Robot>(entity)
            .map(|r| (*r).clone())
            .map_err(|_| SimError::RobotNotFound(robot_id.to_string()))
    }

    /// Public state of every robot in spawn order.
    pub fn robots(&self) -> Vec<Robot> {
        self.order
            .iter()
            .filter_map(|&e| self.world.get::<&Robot>(e).ok().map(|r| (*r).clone()))
            .collect()
    }

    /// Step every robot, then run the assignment pass if it is due.
    pub fn update(&mut self, dt: f32, now: f64, ctx: &mut FleetContext<'_>) {
        if !(dt >= 0.0) {
            return;
        }
        let tuning = self.tuning;

        for &entity in &self.order {
            if let Ok((robot, rt)) = self
                .world
                .query_one_mut::<(&mut Robot, &mut RobotRuntime)>(entity)
            {
                step_robot(robot, rt, &tuning, dt, now, ctx);
            }
        }

        self.since_assignment += dt;
        if self.assignment_interval <= 0.0 || self.since_assignment >= self.assignment_interval {
            self.since_assignment = 0.0;
            self.assign_jobs(ctx);
        }
    }

    /// Give idle robots work, or send them home to charge.
    pub fn assign_jobs(&mut self, ctx: &mut FleetContext<'_>) {
        let tuning = self.tuning;
        let dock = self.dock;

        for &entity in &self.order {
            let Ok((robot, rt)) = self
                .world
                .query_one_mut::<(&mut Robot, &mut RobotRuntime)>(entity)
            else {
                continue;
            };
            if robot.status != RobotStatus::Idle {
                continue;
            }

            if robot.battery <= tuning.low_battery_threshold {
                if robot.position.distance(&dock) > DOCK_TOLERANCE {
                    ctx.pathfinder.path_to_dock_into(robot.position, &mut rt.nav_path);
                    rt.follower.restart();
                    log::info!("{} low on battery ({:.0}%), returning", robot.name, robot.battery);
                    set_status(robot, RobotStatus::Returning, ctx.events);
                } else {
                    set_status(robot, RobotStatus::Charging, ctx.events);
                }
                continue;
            }

            let courts = &*ctx.courts;
            let next = ctx
                .queue
                .next_unassigned(|job| courts.status(&job.court_id) == Some(CourtStatus::NeedsCleaning))
                .map(|job| (job.id.clone(), job.court_id.clone()));
            let Some((job_id, court_id)) = next else {
                continue;
            };
            let Some((row, col)) = parse_court_id(&court_id) else {
                continue;
            };
            if !ctx
                .pathfinder
                .path_to_court_entrance_into(robot.position, row, col, &mut rt.nav_path)
            {
                continue;
            }
            if !matches!(ctx.queue.assign(&job_id, &robot.id), Ok(true)) {
                continue;
            }

            log::debug!("{} takes {} for court {}", robot.name, job_id, court_id);
            rt.follower.restart();
            ctx.events.push(SimEvent::JobAssigned {
                job_id: job_id.clone(),
                robot_id: robot.id.clone(),
            });
            robot.target_court_id = Some(court_id);
            robot.current_job_id = Some(job_id);
            set_status(robot, RobotStatus::Navigating, ctx.events);
        }
    }

    /// Force a robot idle at the dock, releasing its job back to the queue.
    pub fn reset_robot(
        &mut self,
        robot_id: &str,
        now: f64,
        ctx: &mut FleetContext<'_>,
    ) -> Result<(), SimError> {
        let entity = self.entity(robot_id)?;
        let dock = self.dock;
        let (robot, rt) = self
            .world
            .query_one_mut::<(&mut Robot, &mut RobotRuntime)>(entity)
            .map_err(|_| SimError::RobotNotFound(robot_id.to_string()))?;
        release(robot, rt, dock, now, ctx);
        log::info!("{} reset to dock", robot.name);
        Ok(())
    }

    /// Put every robot back at `dock`, releasing all jobs.
    pub fn reset_all(&mut self, dock: Point, now: f64, ctx: &mut FleetContext<'_>) {
        self.dock = dock;
        self.since_assignment = 0.0;
        for &entity in &self.order {
            if let Ok((robot, rt)) = self
                .world
                .query_one_mut::<(&mut Robot, &mut RobotRuntime)>(entity)
            {
                release(robot, rt, dock, now, ctx);
            }
        }
    }
}

fn release(
    robot: &mut Robot,
    rt: &mut RobotRuntime,
    dock: Point,
    now: f64,
    ctx: &mut FleetContext<'_>,
) {
    if let Some(job_id) = robot.current_job_id.as_deref() {
        ctx.queue.unassign(job_id);
    }
    if robot.status == RobotStatus::Cleaning {
        if let Some(court_id) = robot.target_court_id.as_deref() {
            ctx.courts.abort_cleaning(court_id, now, ctx.events);
        }
    }
    go_idle(robot, rt, ctx.events);
    rt.reset(dock);
    robot.position = dock;
}
