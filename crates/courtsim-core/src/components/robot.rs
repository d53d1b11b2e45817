//! Cleaning robots.
//!
//! Each robot is one ECS entity carrying two components: `Robot`, the public
//! state that snapshots and saves expose, and `RobotRuntime`, the private
//! path-following state the fleet controller mutates in place every update.

use serde::{Deserialize, Serialize};

use courtsim_logic::{PathFollower, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RobotStatus {
    Idle,
    Navigating,
    Cleaning,
    Returning,
    Charging,
}

impl RobotStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RobotStatus::Idle => "idle",
            RobotStatus::Navigating => "navigating",
            RobotStatus::Cleaning => "cleaning",
            RobotStatus::Returning => "returning",
            RobotStatus::Charging => "charging",
        }
    }

    /// True while the robot is following a route or a sweep.
    pub fn is_moving(&self) -> bool {
        matches!(
            self,
            RobotStatus::Navigating | RobotStatus::Cleaning | RobotStatus::Returning
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Robot {
    pub id: String,
    pub name: String,
    pub status: RobotStatus,
    /// 0 - 100
    pub battery: f32,
    pub position: Point,
    /// Facing angle in radians, `atan2(dx, dz)` of the current heading.
    pub rotation: f32,
    pub target_court_id: Option<String>,
    pub current_job_id: Option<String>,
    /// 0 - 100 through the current sweep.
    pub cleaning_progress: f32,
    pub jobs_completed: u32,
    /// Meters driven since the robot was created.
    pub distance_travelled: f32,
}

impl Robot {
    pub fn new(id: impl Into<String>, name: impl Into<String>, position: Point) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: RobotStatus::Idle,
            battery: 100.0,
            position,
            rotation: 0.0,
            target_court_id: None,
            current_job_id: None,
            cleaning_progress: 0.0,
            jobs_completed: 0,
            distance_travelled: 0.0,
        }
    }

    /// Change battery by `delta`, keeping it within 0 - 100.
    pub fn adjust_battery(&mut self, delta: f32) {
        self.battery = (self.battery + delta).clamp(0.0, 100.0);
    }
}

/// Per-robot path-following state. Created together with the `Robot` and
/// reused for its whole life; path buffers are refilled, never reallocated
/// once they have grown to fit the longest route.
#[derive(Debug, Clone, Default)]
pub struct RobotRuntime {
    pub follower: PathFollower,
    /// Route to a court entrance or to the dock.
    pub nav_path: Vec<Point>,
    /// Sweep of the target court.
    pub cleaning_path: Vec<Point>,
    pub cleaning_length: f32,
    pub cleaned_distance: f32,
}

impl RobotRuntime {
    pub fn new(position: Point) -> Self {
        Self {
            follower: PathFollower::new(position),
            nav_path: Vec::with_capacity(8),
            cleaning_path: Vec::with_capacity(64),
            cleaning_length: 0.0,
            cleaned_distance: 0.0,
        }
    }

    /// Drop any route and stand at `position`.
    pub fn reset(&mut self, position: Point) {
        self.follower.position = position;
        self.follower.restart();
        self.nav_path.clear();
        self.cleaning_path.clear();
        self.cleaning_length = 0.0;
        self.cleaned_distance = 0.0;
    }
}
