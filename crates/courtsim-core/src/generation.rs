//! Booking schedule generation
//!
//! Fills each court's opening hours with sessions: walk the day from opening,
//! and at each slot either book a session (chance = occupancy) or skip ahead.
//! Consecutive bookings on a court are separated by the turnaround gap, so a
//! generated schedule never overlaps.

use rand::seq::SliceRandom;
use rand::Rng;

use courtsim_logic::{court_id, FacilityLayout};

use crate::components::{Booking, BookingKind};
use crate::config::ScheduleConfig;

/// How far an unbooked slot moves the cursor, minutes.
const FREE_SLOT_MINUTES: u32 = 30;

/// Generate one day of bookings starting at virtual minute `day_start`.
/// Booking ids are left empty; the court store numbers them on insert.
pub fn generate_schedule<R: Rng + ?Sized>(
    layout: &FacilityLayout,
    config: &ScheduleConfig,
    day_start: f64,
    rng: &mut R,
) -> Vec<Booking> {
    let mut bookings = Vec::new();

    for (row, col) in layout.courts() {
        let court = court_id(row, col);
        let mut t = config.open_minute;

        while t < config.close_minute {
            let Some(&length) = config.session_minutes.choose(rng) else {
                break;
            };
            let fits = length > 0 && t.saturating_add(length) <= config.close_minute;

            if fits && rng.gen::<f32>() < config.occupancy {
                let (kind, player_count) = pick_kind(rng);
                bookings.push(Booking {
                    id: String::new(),
                    court_id: court.clone(),
                    start_time: day_start + t as f64,
                    end_time: day_start + (t + length) as f64,
                    kind,
                    player_count,
                });
                t = t
                    .saturating_add(length)
                    .saturating_add(config.turnaround_minutes);
            } else {
                t = t.saturating_add(FREE_SLOT_MINUTES);
            }
        }
    }

    log::info!(
        "Generated {} bookings across {} courts",
        bookings.len(),
        layout.court_count()
    );
    bookings
}

fn pick_kind<R: Rng + ?Sized>(rng: &mut R) -> (BookingKind, u8) {
    match rng.gen_range(0..100) {
        0..=49 => (BookingKind::OpenPlay, 4),
        50..=74 => (BookingKind::Reservation, if rng.gen_bool(0.5) { 2 } else { 4 }),
        75..=89 => (BookingKind::Lesson, rng.gen_range(1..=4)),
        _ => (BookingKind::League, 4),
    }
}
