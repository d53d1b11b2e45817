//! Simulation configuration.
//!
//! Every struct has a `Default` built from `courtsim_logic::constants` and
//! deserializes with missing fields filled from those defaults, so a JSON
//! config only needs to name what it changes.

use rand::Rng;
use serde::{Deserialize, Serialize};

use courtsim_logic::constants::{self, lifecycle, robot};
use courtsim_logic::{CleaningPattern, FacilityLayout, LayoutError, Point};

use crate::error::SimError;

/// Court grid and dock placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityConfig {
    pub columns_per_row: Vec<u32>,
    pub spacing: f32,
    pub dock: Point,
}

impl Default for FacilityConfig {
    fn default() -> Self {
        Self {
            columns_per_row: vec![4, 4],
            spacing: constants::DEFAULT_SPACING,
            dock: Point::new(constants::DEFAULT_DOCK_X, constants::DEFAULT_DOCK_Z),
        }
    }
}

impl FacilityConfig {
    pub fn build_layout(&self) -> Result<FacilityLayout, LayoutError> {
        FacilityLayout::new(self.columns_per_row.clone(), self.spacing, self.dock)
    }
}

/// Robot speeds, battery model and cleaning rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotTuning {
    pub navigation_speed: f32,
    pub cleaning_speed: f32,
    pub battery_drain_per_meter: f32,
    pub battery_drain_per_court: f32,
    pub recharge_rate_per_minute: f32,
    pub low_battery_threshold: f32,
    pub charge_resume_threshold: f32,
    pub cleanliness_time_constant_secs: f32,
}

impl Default for RobotTuning {
    fn default() -> Self {
        Self {
            navigation_speed: robot::NAVIGATION_SPEED,
            cleaning_speed: robot::CLEANING_SPEED,
            battery_drain_per_meter: robot::BATTERY_DRAIN_PER_METER,
            battery_drain_per_court: robot::BATTERY_DRAIN_PER_COURT,
            recharge_rate_per_minute: robot::RECHARGE_RATE_PER_MINUTE,
            low_battery_threshold: robot::LOW_BATTERY_THRESHOLD,
            charge_resume_threshold: robot::CHARGE_RESUME_THRESHOLD,
            cleanliness_time_constant_secs: robot::CLEANLINESS_TIME_CONSTANT_SECS,
        }
    }
}

/// Inclusive range a random amount is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropRange {
    pub min: f32,
    pub max: f32,
}

impl DropRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// A degenerate range always yields `min` without touching the RNG.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.max <= self.min {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }
}

/// Court wear and return-to-service rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleTuning {
    pub session_end_drop: DropRange,
    pub early_end_drop: DropRange,
    pub dirty_threshold: f32,
}

impl Default for LifecycleTuning {
    fn default() -> Self {
        Self {
            session_end_drop: DropRange::new(
                lifecycle::SESSION_END_DROP_MIN,
                lifecycle::SESSION_END_DROP_MAX,
            ),
            early_end_drop: DropRange::new(
                lifecycle::EARLY_END_DROP_MIN,
                lifecycle::EARLY_END_DROP_MAX,
            ),
            dirty_threshold: lifecycle::DIRTY_THRESHOLD,
        }
    }
}

/// Parameters for generated daily schedules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// First bookable minute of the day.
    pub open_minute: u32,
    /// No booking may end after this minute.
    pub close_minute: u32,
    /// Session lengths to choose from, minutes.
    pub session_minutes: Vec<u32>,
    /// Minimum gap left between consecutive bookings on a court, minutes.
    pub turnaround_minutes: u32,
    /// Chance (0-1) that a free slot gets booked.
    pub occupancy: f32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            open_minute: 7 * 60,
            close_minute: 22 * 60,
            session_minutes: vec![60, 90],
            turnaround_minutes: 15,
            occupancy: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub facility: FacilityConfig,
    pub robots: RobotTuning,
    pub cleaning: CleaningPattern,
    pub lifecycle: LifecycleTuning,
    pub schedule: ScheduleConfig,
    pub robot_count: u32,
    /// Seed for every random draw in the simulation.
    pub seed: u64,
    /// Virtual minute the clock starts at.
    pub start_minute: f64,
    /// Simulated seconds per real second for `advance`.
    pub time_scale: f32,
    /// Simulated seconds between lifecycle ticks dispatched by `advance`.
    pub lifecycle_interval_secs: f32,
    /// Simulated seconds between job assignment passes (0 = every update).
    pub assignment_interval_secs: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            facility: FacilityConfig::default(),
            robots: RobotTuning::default(),
            cleaning: CleaningPattern::default(),
            lifecycle: LifecycleTuning::default(),
            schedule: ScheduleConfig::default(),
            robot_count: 2,
            seed: 42,
            start_minute: 0.0,
            time_scale: 1.0,
            lifecycle_interval_secs: 1.0,
            assignment_interval_secs: 0.25,
        }
    }
}

impl SimConfig {
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let config: SimConfig =
            serde_json::from_str(json).map_err(|e| SimError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the simulation meaningless. Layout shape
    /// is checked separately when the layout is built.
    pub fn validate(&self) -> Result<(), SimError> {
        fn invalid(reason: String) -> Result<(), SimError> {
            Err(SimError::InvalidConfig(reason))
        }

        let r = &self.robots;
        if !(r.navigation_speed > 0.0) || !(r.cleaning_speed > 0.0) {
            return invalid("robot speeds must be positive".into());
        }
        if r.battery_drain_per_meter < 0.0
            || r.battery_drain_per_court < 0.0
            || !(r.recharge_rate_per_minute > 0.0)
        {
            return invalid("battery rates must be non-negative and recharge positive".into());
        }
        if !(0.0..=100.0).contains(&r.low_battery_threshold)
            || !(0.0..=100.0).contains(&r.charge_resume_threshold)
            || r.charge_resume_threshold <= r.low_battery_threshold
        {
            return invalid(format!(
                "battery thresholds out of order: low {} resume {}",
                r.low_battery_threshold, r.charge_resume_threshold
            ));
        }
        if !(r.cleanliness_time_constant_secs > 0.0) {
            return invalid("cleanliness time constant must be positive".into());
        }
        if !(self.cleaning.stripe_width > 0.0) || self.cleaning.net_clearance < 0.0 {
            return invalid("stripe width must be positive and net clearance non-negative".into());
        }
        for (name, range) in [
            ("session_end_drop", self.lifecycle.session_end_drop),
            ("early_end_drop", self.lifecycle.early_end_drop),
        ] {
            if range.min < 0.0 || range.max < range.min || range.max > 100.0 {
                return invalid(format!("{} range {}..{} is invalid", name, range.min, range.max));
            }
        }
        let s = &self.schedule;
        if s.close_minute <= s.open_minute || s.close_minute as f64 > constants::MINUTES_PER_DAY {
            return invalid("schedule must open before it closes, within one day".into());
        }
        if s.session_minutes.is_empty() || s.session_minutes.contains(&0) {
            return invalid("session lengths must be non-empty and positive".into());
        }
        let open_hours = s.close_minute - s.open_minute;
        if s.session_minutes.iter().any(|&m| m > open_hours)
            || s.turnaround_minutes > open_hours
        {
            return invalid(format!(
                "sessions and turnaround must fit in the {} minutes the facility is open",
                open_hours
            ));
        }
        if !(0.0..=1.0).contains(&s.occupancy) {
            return invalid("occupancy must be within 0..1".into());
        }
        if !(self.time_scale >= 0.0) || !(self.lifecycle_interval_secs >= 0.0) {
            return invalid("time scale and tick interval must be non-negative".into());
        }
        if !(self.assignment_interval_secs >= 0.0) {
            return invalid("assignment interval must be non-negative".into());
        }
        if !self.start_minute.is_finite() || self.start_minute < 0.0 {
            return invalid("start minute must be a non-negative number".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
        assert!(SimConfig::default().facility.build_layout().is_ok());
    }

    #[test]
    fn test_partial_json() {
        let config = SimConfig::from_json(
            r#"{ "facility": { "columns_per_row": [2] }, "robot_count": 3, "seed": 7 }"#,
        )
        .unwrap();
        assert_eq!(config.facility.columns_per_row, vec![2]);
        assert_eq!(config.facility.spacing, constants::DEFAULT_SPACING);
        assert_eq!(config.robot_count, 3);
        assert_eq!(config.robots, RobotTuning::default());
    }

    #[test]
    fn test_rejects_inverted_range() {
        let mut config = SimConfig::default();
        config.lifecycle.session_end_drop = DropRange::new(60.0, 30.0);
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_bad_thresholds() {
        let mut config = SimConfig::default();
        config.robots.low_battery_threshold = 96.0;
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.robots.navigation_speed = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_oversized_sessions() {
        let mut config = SimConfig::default();
        config.schedule.session_minutes = vec![60, u32::MAX];
        assert!(matches!(config.validate(), Err(SimError::InvalidConfig(_))));

        let mut config = SimConfig::default();
        config.schedule.turnaround_minutes = u32::MAX;
        assert!(config.validate().is_err());

        // A session filling the whole day is fine
        let mut config = SimConfig::default();
        let whole_day = config.schedule.close_minute - config.schedule.open_minute;
        config.schedule.session_minutes = vec![whole_day];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            SimConfig::from_json("{ not json"),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_drop_range_sampling() {
        let mut rng = StdRng::seed_from_u64(1);
        let fixed = DropRange::new(40.0, 40.0);
        assert_eq!(fixed.sample(&mut rng), 40.0);

        let range = DropRange::new(30.0, 60.0);
        for _ in 0..100 {
            let v = range.sample(&mut rng);
            assert!((30.0..=60.0).contains(&v));
        }

        let mut a = StdRng::seed_from_u64(9);
        let mut b = StdRng::seed_from_u64(9);
        assert_eq!(range.sample(&mut a), range.sample(&mut b));
    }
}
