//! Virtual clock.
//!
//! Time is kept in minutes since the start of day zero. Hosts either tick the
//! clock directly in minutes, or feed real seconds through `advance`, which
//! scales them and batches lifecycle ticks every `lifecycle_interval_secs` of
//! simulated time.

use serde::{Deserialize, Serialize};

use courtsim_logic::constants::MINUTES_PER_DAY;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationClock {
    time_minutes: f64,
    time_scale: f32,
    lifecycle_interval_secs: f32,
    /// Simulated seconds accrued since the last batched tick.
    pending_secs: f32,
}

impl SimulationClock {
    pub fn new(start_minute: f64, time_scale: f32, lifecycle_interval_secs: f32) -> Self {
        Self {
            time_minutes: start_minute,
            time_scale: time_scale.max(0.0),
            lifecycle_interval_secs: lifecycle_interval_secs.max(0.0),
            pending_secs: 0.0,
        }
    }

    /// Current virtual minute.
    pub fn now(&self) -> f64 {
        self.time_minutes
    }

    /// Jump to `minutes` without firing anything in between.
    pub fn set_time(&mut self, minutes: f64) {
        if minutes.is_finite() {
            self.time_minutes = minutes;
            self.pending_secs = 0.0;
        }
    }

    /// Move forward by `delta` minutes and return the `(prev, now)` interval
    /// the lifecycle must process. Negative or non-finite deltas are ignored.
    pub fn advance_minutes(&mut self, delta: f64) -> Option<(f64, f64)> {
        if !delta.is_finite() || delta < 0.0 {
            return None;
        }
        let prev = self.time_minutes;
        self.time_minutes += delta;
        Some((prev, self.time_minutes))
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// 1.0 = real time, 60.0 = a minute per second. Negative or NaN stops
    /// the clock.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = if scale.is_nan() { 0.0 } else { scale.max(0.0) };
    }

    pub fn lifecycle_interval_secs(&self) -> f32 {
        self.lifecycle_interval_secs
    }

    /// Real seconds → simulated seconds.
    pub fn scale(&self, real_seconds: f32) -> f32 {
        if real_seconds > 0.0 {
            real_seconds * self.time_scale
        } else {
            0.0
        }
    }

    /// Accrue simulated seconds. Returns the minutes to tick once at least
    /// one lifecycle interval has built up.
    pub fn accumulate(&mut self, sim_seconds: f32) -> Option<f64> {
        if !(sim_seconds > 0.0) {
            return None;
        }
        self.pending_secs += sim_seconds;
        if self.pending_secs >= self.lifecycle_interval_secs {
            let minutes = self.pending_secs as f64 / 60.0;
            self.pending_secs = 0.0;
            Some(minutes)
        } else {
            None
        }
    }

    /// Minute within the current day, 0 - 1440.
    pub fn time_of_day(&self) -> f64 {
        self.time_minutes.rem_euclid(MINUTES_PER_DAY)
    }

    pub fn day(&self) -> u32 {
        (self.time_minutes / MINUTES_PER_DAY).floor().max(0.0) as u32
    }

    /// "HH:MM" of the current time of day.
    pub fn format_time(&self) -> String {
        let minute = self.time_of_day() as u32;
        format!("{:02}:{:02}", minute / 60, minute % 60)
    }
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new(0.0, 1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_minutes() {
        let mut clock = SimulationClock::new(90.0, 1.0, 1.0);
        assert_eq!(clock.advance_minutes(15.0), Some((90.0, 105.0)));
        assert_eq!(clock.advance_minutes(0.0), Some((105.0, 105.0)));
        assert_eq!(clock.advance_minutes(-5.0), None);
        assert_eq!(clock.advance_minutes(f64::NAN), None);
        assert_eq!(clock.now(), 105.0);
    }

    #[test]
    fn test_accumulate_batches_ticks() {
        let mut clock = SimulationClock::new(0.0, 1.0, 1.0);
        assert_eq!(clock.accumulate(0.25), None);
        assert_eq!(clock.accumulate(0.25), None);
        assert_eq!(clock.accumulate(0.25), None);
        let minutes = clock.accumulate(0.25).unwrap();
        assert!((minutes - 1.0 / 60.0).abs() < 1e-9);
        assert_eq!(clock.accumulate(0.0), None);
    }

    #[test]
    fn test_zero_interval_ticks_every_time() {
        let mut clock = SimulationClock::new(0.0, 1.0, 0.0);
        assert!(clock.accumulate(0.01).is_some());
        assert!(clock.accumulate(0.01).is_some());
    }

    #[test]
    fn test_time_scale() {
        let mut clock = SimulationClock::default();
        clock.set_time_scale(60.0);
        assert_eq!(clock.scale(2.0), 120.0);
        assert_eq!(clock.scale(-1.0), 0.0);
        clock.set_time_scale(-3.0);
        assert_eq!(clock.time_scale(), 0.0);
        clock.set_time_scale(f32::NAN);
        assert_eq!(clock.time_scale(), 0.0);
    }

    #[test]
    fn test_time_of_day() {
        let clock = SimulationClock::new(MINUTES_PER_DAY + 7.0 * 60.0 + 30.0, 1.0, 1.0);
        assert!((clock.time_of_day() - 450.0).abs() < 1e-9);
        assert_eq!(clock.day(), 1);
        assert_eq!(clock.format_time(), "07:30");
    }
}
