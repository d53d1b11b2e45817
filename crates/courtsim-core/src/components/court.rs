//! Courts and the bookings that occupy them.

use serde::{Deserialize, Serialize};

use courtsim_logic::constants::lifecycle::MAX_CLEANLINESS;
use courtsim_logic::court_id;

/// Where a court is in its use/clean cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CourtStatus {
    AvailableClean,
    InUse,
    NeedsCleaning,
    Cleaning,
    OutOfService,
}

impl CourtStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CourtStatus::AvailableClean => "available",
            CourtStatus::InUse => "in use",
            CourtStatus::NeedsCleaning => "needs cleaning",
            CourtStatus::Cleaning => "cleaning",
            CourtStatus::OutOfService => "out of service",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Court {
    pub id: String,
    pub row: u32,
    pub col: u32,
    pub status: CourtStatus,
    /// 0 - 100
    pub cleanliness: f32,
    pub active_booking_id: Option<String>,
    /// Virtual minute the last session ended.
    pub last_used_at: Option<f64>,
    /// Virtual minute the last sweep (or forced clean) finished.
    pub last_cleaned_at: Option<f64>,
}

impl Court {
    pub fn new(row: u32, col: u32) -> Self {
        Self {
            id: court_id(row, col),
            row,
            col,
            status: CourtStatus::AvailableClean,
            cleanliness: MAX_CLEANLINESS,
            active_booking_id: None,
            last_used_at: None,
            last_cleaned_at: None,
        }
    }

    pub fn is_in_use(&self) -> bool {
        self.status == CourtStatus::InUse
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingKind {
    OpenPlay,
    Reservation,
    Lesson,
    League,
}

impl BookingKind {
    pub const ALL: [BookingKind; 4] = [
        BookingKind::OpenPlay,
        BookingKind::Reservation,
        BookingKind::Lesson,
        BookingKind::League,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub court_id: String,
    /// Minutes since midnight.
    pub start_time: f64,
    /// Minutes since midnight, exclusive.
    pub end_time: f64,
    pub kind: BookingKind,
    pub player_count: u8,
}

impl Booking {
    /// Two bookings overlap if they share a court and their half-open
    /// intervals intersect. Back-to-back bookings do not overlap.
    pub fn overlaps(&self, other: &Booking) -> bool {
        self.court_id == other.court_id
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}
