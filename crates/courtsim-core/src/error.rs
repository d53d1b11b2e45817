//! Errors surfaced to callers of the engine.
//!
//! Only genuine caller mistakes become errors: unknown ids, malformed
//! bookings and bad configuration. Guarded transitions that simply do not
//! apply (cleaning a court that is in use, enqueuing a duplicate job) are
//! reported as `Ok(false)` / `None` instead.

use courtsim_logic::LayoutError;

#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    CourtNotFound(String),
    RobotNotFound(String),
    JobNotFound(String),
    BookingNotFound(String),
    InvalidBooking(String),
    BookingOverlap { booking_id: String, existing_id: String },
    InvalidConfig(String),
    Layout(LayoutError),
}

impl From<LayoutError> for SimError {
    fn from(e: LayoutError) -> Self {
        SimError::Layout(e)
    }
}

impl std::fmt::Display for SimError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimError::CourtNotFound(id) => write!(f, "court not found: {}", id),
            SimError::RobotNotFound(id) => write!(f, "robot not found: {}", id),
            SimError::JobNotFound(id) => write!(f, "cleaning job not found: {}", id),
            SimError::BookingNotFound(id) => write!(f, "booking not found: {}", id),
            SimError::InvalidBooking(reason) => write!(f, "invalid booking: {}", reason),
            SimError::BookingOverlap {
                booking_id,
                existing_id,
            } => write!(
                f,
                "booking {} overlaps existing booking {}",
                booking_id, existing_id
            ),
            SimError::InvalidConfig(reason) => write!(f, "invalid configuration: {}", reason),
            SimError::Layout(e) => write!(f, "invalid layout: {}", e),
        }
    }
}

impl std::error::Error for SimError {}
