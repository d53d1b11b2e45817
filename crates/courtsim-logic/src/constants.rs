//! Facility constants: court dimensions and default tuning.
//!
//! Plain values with no runtime dependency. The engine crate uses these as
//! `Default` values for its configuration structs.

/// Regulation pickleball court width (20 ft), meters.
pub const COURT_WIDTH: f32 = 6.10;
/// Regulation pickleball court length (44 ft), meters.
pub const COURT_LENGTH: f32 = 13.41;

/// Gap between neighbouring courts, meters.
pub const DEFAULT_SPACING: f32 = 3.0;
/// Widest gap a layout accepts, meters.
pub const MAX_SPACING: f32 = 50.0;
/// Dock sits in the front-left corner aisle.
pub const DEFAULT_DOCK_X: f32 = -2.0;
pub const DEFAULT_DOCK_Z: f32 = -2.0;

/// Width covered by one lawnmower stripe, meters.
pub const DEFAULT_STRIPE_WIDTH: f32 = 0.6;
/// Distance kept from the net (and from the net posts when crossing), meters.
pub const DEFAULT_NET_CLEARANCE: f32 = 0.5;

pub mod robot {
    /// Meters per second while routing between courts and the dock.
    pub const NAVIGATION_SPEED: f32 = 1.5;
    /// Meters per second while sweeping.
    pub const CLEANING_SPEED: f32 = 0.8;
    pub const BATTERY_DRAIN_PER_METER: f32 = 0.02;
    pub const BATTERY_DRAIN_PER_COURT: f32 = 5.0;
    pub const RECHARGE_RATE_PER_MINUTE: f32 = 2.0;
    /// At or below this charge an idle robot heads home instead of taking work.
    pub const LOW_BATTERY_THRESHOLD: f32 = 20.0;
    /// Charging ends once the battery reaches this level.
    pub const CHARGE_RESUME_THRESHOLD: f32 = 95.0;
    /// Time constant of the cleanliness smoothing while a court is swept, seconds.
    pub const CLEANLINESS_TIME_CONSTANT_SECS: f32 = 30.0;
    /// How close to the dock counts as docked, meters.
    pub const DOCK_TOLERANCE: f32 = 0.05;
}

pub mod lifecycle {
    /// Cleanliness lost when a booking ends normally.
    pub const SESSION_END_DROP_MIN: f32 = 30.0;
    pub const SESSION_END_DROP_MAX: f32 = 60.0;
    /// Cleanliness lost when a session is ended early by an operator.
    pub const EARLY_END_DROP_MIN: f32 = 10.0;
    pub const EARLY_END_DROP_MAX: f32 = 25.0;
    /// A court coming back into service below this level needs a sweep first.
    pub const DIRTY_THRESHOLD: f32 = 70.0;
    pub const MAX_CLEANLINESS: f32 = 100.0;
}

/// Minutes in a day; booking times are minutes since midnight.
pub const MINUTES_PER_DAY: f64 = 1440.0;
