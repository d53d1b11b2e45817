//! Court lifecycle - bookings move courts through use, wear and cleaning
//!
//! `CourtStore` owns every court and booking. Courts only change through the
//! methods here: clock ticks fire booking start/end edges, operators force
//! cleans or early ends, and the fleet reports sweep progress. A guard that
//! does not hold (cleaning a court that is in use, say) is a silent no-op.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use courtsim_logic::constants::lifecycle::MAX_CLEANLINESS;
use courtsim_logic::{parse_court_id, FacilityLayout};

use crate::components::{Booking, BookingKind, Court, CourtStatus, JobPriority};
use crate::config::LifecycleTuning;
use crate::error::SimError;
use crate::events::{EventLog, SimEvent};
use crate::systems::JobQueue;

/// Snapshot of how the facility is doing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacilityStats {
    pub available: usize,
    pub in_use: usize,
    pub needs_cleaning: usize,
    pub cleaning: usize,
    pub out_of_service: usize,
    pub mean_cleanliness: f32,
    pub bookings: usize,
    pub queued_jobs: usize,
    pub completed_jobs: u64,
}

/// Booking edges sort ends first so a court freed at minute t is processed
/// before a booking starting at t.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Edge {
    End,
    Start,
}

#[derive(Debug, Clone, Copy)]
struct PendingEdge {
    at: f64,
    edge: Edge,
    booking: usize,
}

pub struct CourtStore {
    /// Row-major, same order as `FacilityLayout::courts`.
    courts: Vec<Court>,
    index: HashMap<String, usize>,
    bookings: Vec<Booking>,
    next_booking_id: u64,
    tuning: LifecycleTuning,
    /// Reused between ticks.
    pending: Vec<PendingEdge>,
}

fn transition(court: &mut Court, to: CourtStatus, at: f64, events: &mut EventLog) {
    if court.status == to {
        return;
    }
    let from = court.status;
    court.status = to;
    log::info!(
        "Court {}: {} -> {} (minute {:.1})",
        court.id,
        from.label(),
        to.label(),
        at
    );
    events.push(SimEvent::CourtStatusChanged {
        court_id: court.id.clone(),
        from,
        to,
        at,
    });
}

fn enqueue_job(
    queue: &mut JobQueue,
    court_id: &str,
    priority: JobPriority,
    now: f64,
    events: &mut EventLog,
) -> bool {
    match queue.enqueue(court_id, priority, now) {
        Some(job) => {
            events.push(SimEvent::JobEnqueued {
                job_id: job.id.clone(),
                court_id: job.court_id.clone(),
                priority,
            });
            true
        }
        None => false,
    }
}

fn cancel_job(queue: &mut JobQueue, court_id: &str, events: &mut EventLog) {
    if let Some(job) = queue.remove_for_court(court_id) {
        log::info!("Cancelled {} for court {}", job.id, court_id);
        events.push(SimEvent::JobCancelled {
            job_id: job.id,
            court_id: job.court_id,
        });
    }
}

/// Close the court's session: wear it, mark it dirty and queue a sweep.
fn end_session(
    court: &mut Court,
    wear: f32,
    at: f64,
    queue: &mut JobQueue,
    events: &mut EventLog,
) {
    court.active_booking_id = None;
    court.cleanliness = (court.cleanliness - wear).max(0.0);
    court.last_used_at = Some(at);
    transition(court, CourtStatus::NeedsCleaning, at, events);
    enqueue_job(queue, &court.id, JobPriority::Normal, at, events);
}

fn check_times(start_time: f64, end_time: f64) -> Result<(), SimError> {
    if !start_time.is_finite() || !end_time.is_finite() || start_time < 0.0 {
        return Err(SimError::InvalidBooking(format!(
            "times must be non-negative numbers, got {}..{}",
            start_time, end_time
        )));
    }
    if end_time <= start_time {
        return Err(SimError::InvalidBooking(format!(
            "booking must end after it starts, got {}..{}",
            start_time, end_time
        )));
    }
    Ok(())
}

impl CourtStore {
    /// One clean, available court per layout slot.
    pub fn new(layout: &FacilityLayout, tuning: LifecycleTuning) -> Self {
        let courts: Vec<Court> = layout.courts().map(|(r, c)| Court::new(r, c)).collect();
        let index = courts
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();
        Self {
            courts,
            index,
            bookings: Vec::new(),
            next_booking_id: 0,
            tuning,
            pending: Vec::new(),
        }
    }

    /// Rebuild from saved courts and bookings. Every layout slot must be
    /// present exactly once. Courts saved mid-sweep go back to needing a
    /// clean, since no robot is carrying their sweep any more.
    pub fn restore(
        layout: &FacilityLayout,
        tuning: LifecycleTuning,
        courts: Vec<Court>,
        bookings: Vec<Booking>,
        next_booking_id: u64,
    ) -> Result<Self, SimError> {
        let mut store = Self::new(layout, tuning);
        let mut seen = HashSet::new();

        for mut court in courts {
            let idx = match parse_court_id(&court.id) {
                Some((row, col)) if layout.contains(row, col) => store.index[&court.id],
                _ => return Err(SimError::CourtNotFound(court.id)),
            };
            if !seen.insert(idx) {
                return Err(SimError::InvalidConfig(format!(
                    "court {} saved twice",
                    court.id
                )));
            }
            if court.status == CourtStatus::Cleaning {
                court.status = CourtStatus::NeedsCleaning;
            }
            court.cleanliness = court.cleanliness.clamp(0.0, MAX_CLEANLINESS);
            store.courts[idx] = court;
        }
        if seen.len() != store.courts.len() {
            return Err(SimError::InvalidConfig(format!(
                "saved state has {} of {} courts",
                seen.len(),
                store.courts.len()
            )));
        }

        for (i, booking) in bookings.iter().enumerate() {
            if !store.index.contains_key(&booking.court_id) {
                return Err(SimError::CourtNotFound(booking.court_id.clone()));
            }
            check_times(booking.start_time, booking.end_time)?;
            if let Some(existing) = bookings[..i].iter().find(|b| b.overlaps(booking)) {
                return Err(SimError::BookingOverlap {
                    booking_id: booking.id.clone(),
                    existing_id: existing.id.clone(),
                });
            }
        }

        // A running session must point at one of its own court's bookings,
        // otherwise no end edge would ever release the court
        for court in &store.courts {
            match (&court.active_booking_id, court.status) {
                (Some(id), _) => {
                    if !bookings.iter().any(|b| &b.id == id && b.court_id == court.id) {
                        return Err(SimError::BookingNotFound(id.clone()));
                    }
                }
                (None, CourtStatus::InUse) => {
                    return Err(SimError::InvalidConfig(format!(
                        "court {} is in use without a booking",
                        court.id
                    )));
                }
                (None, _) => {}
            }
        }
        let highest = bookings
            .iter()
            .filter_map(|b| b.id.strip_prefix("booking-")?.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        store.bookings = bookings;
        store.next_booking_id = next_booking_id.max(highest);
        Ok(store)
    }

    pub fn tuning(&self) -> LifecycleTuning {
        self.tuning
    }

    pub fn set_tuning(&mut self, tuning: LifecycleTuning) {
        self.tuning = tuning;
    }

    fn index_of(&self, court_id: &str) -> Result<usize, SimError> {
        self.index
            .get(court_id)
            .copied()
            .ok_or_else(|| SimError::CourtNotFound(court_id.to_string()))
    }

    pub fn court(&self, court_id: &str) -> Result<&Court, SimError> {
        Ok(&self.courts[self.index_of(court_id)?])
    }

    pub fn courts(&self) -> &[Court] {
        &self.courts
    }

    pub fn status(&self, court_id: &str) -> Option<CourtStatus> {
        self.index.get(court_id).map(|&i| self.courts[i].status)
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    pub fn booking(&self, booking_id: &str) -> Result<&Booking, SimError> {
        self.bookings
            .iter()
            .find(|b| b.id == booking_id)
            .ok_or_else(|| SimError::BookingNotFound(booking_id.to_string()))
    }

    pub fn bookings_for<'a>(&'a self, court_id: &'a str) -> impl Iterator<Item = &'a Booking> {
        self.bookings.iter().filter(move |b| b.court_id == court_id)
    }

    pub fn next_booking_id(&self) -> u64 {
        self.next_booking_id
    }

    /// Add a booking. Overlapping an existing booking on the same court is
    /// rejected, so a court never has two sessions competing for it.
    pub fn add_booking(
        &mut self,
        court_id: &str,
        start_time: f64,
        end_time: f64,
        kind: BookingKind,
        player_count: u8,
    ) -> Result<String, SimError> {
        self.index_of(court_id)?;
        check_times(start_time, end_time)?;

        let booking = Booking {
            id: format!("booking-{}", self.next_booking_id + 1),
            court_id: court_id.to_string(),
            start_time,
            end_time,
            kind,
            player_count,
        };
        if let Some(existing) = self.bookings.iter().find(|b| b.overlaps(&booking)) {
            return Err(SimError::BookingOverlap {
                booking_id: booking.id,
                existing_id: existing.id.clone(),
            });
        }

        self.next_booking_id += 1;
        let id = booking.id.clone();
        self.bookings.push(booking);
        Ok(id)
    }

    /// Remove a booking. If it is the court's running session the session
    /// ends now, as with `force_end_session`.
    pub fn remove_booking<R: Rng + ?Sized>(
        &mut self,
        booking_id: &str,
        now: f64,
        queue: &mut JobQueue,
        rng: &mut R,
        events: &mut EventLog,
    ) -> Result<Booking, SimError> {
        let pos = self
            .bookings
            .iter()
            .position(|b| b.id == booking_id)
            .ok_or_else(|| SimError::BookingNotFound(booking_id.to_string()))?;
        let booking = self.bookings.remove(pos);

        let idx = self.index_of(&booking.court_id)?;
        let court = &mut self.courts[idx];
        if court.active_booking_id.as_deref() == Some(booking_id) {
            let wear = self.tuning.early_end_drop.sample(rng);
            end_session(court, wear, now, queue, events);
        }
        Ok(booking)
    }

    /// Swap in a regenerated schedule. Sessions already running keep their
    /// booking; new bookings that would overlap them, or that name unknown
    /// courts, are dropped. Returns the number of bookings added.
    pub fn replace_bookings(&mut self, bookings: Vec<Booking>) -> usize {
        let running: HashSet<String> = self
            .courts
            .iter()
            .filter_map(|c| c.active_booking_id.clone())
            .collect();
        self.bookings.retain(|b| running.contains(&b.id));

        let mut added = 0;
        for mut booking in bookings {
            if !self.index.contains_key(&booking.court_id)
                || !(booking.end_time > booking.start_time)
                || self.bookings.iter().any(|b| b.overlaps(&booking))
            {
                log::debug!(
                    "Skipping generated booking on {} at {:.0}",
                    booking.court_id,
                    booking.start_time
                );
                continue;
            }
            self.next_booking_id += 1;
            booking.id = format!("booking-{}", self.next_booking_id);
            self.bookings.push(booking);
            added += 1;
        }
        added
    }

    /// Fire every booking edge in `(prev, now]`. Ticking the same interval
    /// again, or a zero-length interval, fires nothing.
    pub fn process_tick<R: Rng + ?Sized>(
        &mut self,
        prev: f64,
        now: f64,
        queue: &mut JobQueue,
        rng: &mut R,
        events: &mut EventLog,
    ) {
        if !(now > prev) {
            return;
        }

        self.pending.clear();
        for (i, b) in self.bookings.iter().enumerate() {
            if prev < b.start_time && b.start_time <= now {
                self.pending.push(PendingEdge {
                    at: b.start_time,
                    edge: Edge::Start,
                    booking: i,
                });
            }
            if prev < b.end_time && b.end_time <= now {
                self.pending.push(PendingEdge {
                    at: b.end_time,
                    edge: Edge::End,
                    booking: i,
                });
            }
        }
        self.pending.sort_by(|a, b| {
            a.at.total_cmp(&b.at)
                .then(a.edge.cmp(&b.edge))
                .then(a.booking.cmp(&b.booking))
        });

        for pending in &self.pending {
            let booking = &self.bookings[pending.booking];
            let Some(&idx) = self.index.get(&booking.court_id) else {
                continue;
            };
            let court = &mut self.courts[idx];

            match pending.edge {
                Edge::Start => {
                    if court.status == CourtStatus::AvailableClean {
                        court.active_booking_id = Some(booking.id.clone());
                        transition(court, CourtStatus::InUse, pending.at, events);
                    } else {
                        log::debug!(
                            "Booking {} could not start: court {} is {}",
                            booking.id,
                            court.id,
                            court.status.label()
                        );
                    }
                }
                Edge::End => {
                    let ours = court.active_booking_id.as_deref() == Some(booking.id.as_str());
                    if court.status == CourtStatus::InUse && ours {
                        let wear = self.tuning.session_end_drop.sample(rng);
                        end_session(court, wear, pending.at, queue, events);
                    }
                }
            }
        }
    }

    /// Mark a court clean right away and cancel its job. Refused while the
    /// court is in use.
    pub fn force_clean(
        &mut self,
        court_id: &str,
        now: f64,
        queue: &mut JobQueue,
        events: &mut EventLog,
    ) -> Result<bool, SimError> {
        let idx = self.index_of(court_id)?;
        let court = &mut self.courts[idx];
        if court.is_in_use() {
            log::warn!("Refusing to force-clean court {}: in use", court_id);
            return Ok(false);
        }
        cancel_job(queue, court_id, events);
        court.cleanliness = MAX_CLEANLINESS;
        court.last_cleaned_at = Some(now);
        transition(court, CourtStatus::AvailableClean, now, events);
        Ok(true)
    }

    /// End a running session early. Early ends wear the court less.
    pub fn force_end_session<R: Rng + ?Sized>(
        &mut self,
        court_id: &str,
        now: f64,
        queue: &mut JobQueue,
        rng: &mut R,
        events: &mut EventLog,
    ) -> Result<bool, SimError> {
        let idx = self.index_of(court_id)?;
        let court = &mut self.courts[idx];
        if !court.is_in_use() {
            log::warn!("No session to end on court {}", court_id);
            return Ok(false);
        }
        let wear = self.tuning.early_end_drop.sample(rng);
        end_session(court, wear, now, queue, events);
        Ok(true)
    }

    /// Take a court out of service (cancelling its job) or bring it back.
    /// A returning court needs a sweep first if it is below the dirty
    /// threshold. Refused while the court is in use.
    pub fn set_out_of_service(
        &mut self,
        court_id: &str,
        out_of_service: bool,
        now: f64,
        queue: &mut JobQueue,
        events: &mut EventLog,
    ) -> Result<bool, SimError> {
        let idx = self.index_of(court_id)?;
        let court = &mut self.courts[idx];
        if court.is_in_use() {
            log::warn!("Refusing to change service state of court {}: in use", court_id);
            return Ok(false);
        }

        let currently_out = court.status == CourtStatus::OutOfService;
        if out_of_service == currently_out {
            return Ok(false);
        }

        if out_of_service {
            cancel_job(queue, court_id, events);
            transition(court, CourtStatus::OutOfService, now, events);
        } else if court.cleanliness >= self.tuning.dirty_threshold {
            transition(court, CourtStatus::AvailableClean, now, events);
        } else {
            transition(court, CourtStatus::NeedsCleaning, now, events);
            enqueue_job(queue, court_id, JobPriority::Normal, now, events);
        }
        Ok(true)
    }

    /// Ask for a sweep outside the booking cycle. A clean court is marked
    /// dirty; a court already waiting has its job raised to `priority`.
    pub fn request_cleaning(
        &mut self,
        court_id: &str,
        priority: JobPriority,
        now: f64,
        queue: &mut JobQueue,
        events: &mut EventLog,
    ) -> Result<bool, SimError> {
        let idx = self.index_of(court_id)?;
        let court = &mut self.courts[idx];
        match court.status {
            CourtStatus::InUse | CourtStatus::OutOfService => Ok(false),
            CourtStatus::AvailableClean => {
                transition(court, CourtStatus::NeedsCleaning, now, events);
                Ok(enqueue_job(queue, court_id, priority, now, events))
            }
            CourtStatus::NeedsCleaning | CourtStatus::Cleaning => {
                if queue.job_for_court(court_id).is_some() {
                    Ok(priority == JobPriority::High && queue.escalate(court_id))
                } else {
                    Ok(enqueue_job(queue, court_id, priority, now, events))
                }
            }
        }
    }

    /// A robot has arrived and starts sweeping.
    pub fn begin_cleaning(&mut self, court_id: &str, now: f64, events: &mut EventLog) -> bool {
        let Some(&idx) = self.index.get(court_id) else {
            return false;
        };
        let court = &mut self.courts[idx];
        match court.status {
            CourtStatus::NeedsCleaning => {
                transition(court, CourtStatus::Cleaning, now, events);
                true
            }
            CourtStatus::Cleaning => true,
            _ => false,
        }
    }

    /// Move cleanliness toward 100 by `fraction` of the remaining gap.
    pub fn apply_cleaning(&mut self, court_id: &str, fraction: f32) {
        if let Some(&idx) = self.index.get(court_id) {
            let court = &mut self.courts[idx];
            if court.status == CourtStatus::Cleaning {
                let fraction = fraction.clamp(0.0, 1.0);
                court.cleanliness += (MAX_CLEANLINESS - court.cleanliness) * fraction;
            }
        }
    }

    pub fn finish_cleaning(&mut self, court_id: &str, now: f64, events: &mut EventLog) -> bool {
        let Some(&idx) = self.index.get(court_id) else {
            return false;
        };
        let court = &mut self.courts[idx];
        if court.status != CourtStatus::Cleaning {
            return false;
        }
        court.cleanliness = MAX_CLEANLINESS;
        court.last_cleaned_at = Some(now);
        transition(court, CourtStatus::AvailableClean, now, events);
        true
    }

    /// The sweeping robot gave up; the court waits for another one.
    pub fn abort_cleaning(&mut self, court_id: &str, now: f64, events: &mut EventLog) -> bool {
        let Some(&idx) = self.index.get(court_id) else {
            return false;
        };
        let court = &mut self.courts[idx];
        if court.status != CourtStatus::Cleaning {
            return false;
        }
        transition(court, CourtStatus::NeedsCleaning, now, events);
        true
    }

    pub fn stats(&self) -> FacilityStats {
        let mut stats = FacilityStats {
            bookings: self.bookings.len(),
            ..Default::default()
        };
        let mut total = 0.0;
        for court in &self.courts {
            match court.status {
                CourtStatus::AvailableClean => stats.available += 1,
                CourtStatus::InUse => stats.in_use += 1,
                CourtStatus::NeedsCleaning => stats.needs_cleaning += 1,
                CourtStatus::Cleaning => stats.cleaning += 1,
                CourtStatus::OutOfService => stats.out_of_service += 1,
            }
            total += court.cleanliness;
        }
        if !self.courts.is_empty() {
            stats.mean_cleanliness = total / self.courts.len() as f32;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DropRange;
    use courtsim_logic::Point;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Fixture {
        store: CourtStore,
        queue: JobQueue,
        rng: StdRng,
        events: EventLog,
    }

    fn fixture() -> Fixture {
        let layout = FacilityLayout::grid(1, 2, 3.0, Point::new(-2.0, -2.0)).unwrap();
        let tuning = LifecycleTuning {
            session_end_drop: DropRange::new(40.0, 40.0),
            early_end_drop: DropRange::new(10.0, 10.0),
            ..Default::default()
        };
        Fixture {
            store: CourtStore::new(&layout, tuning),
            queue: JobQueue::new(),
            rng: StdRng::seed_from_u64(1),
            events: EventLog::new(),
        }
    }

    impl Fixture {
        fn tick(&mut self, prev: f64, now: f64) {
            self.store
                .process_tick(prev, now, &mut self.queue, &mut self.rng, &mut self.events);
        }

        fn status(&self, id: &str) -> CourtStatus {
            self.store.status(id).unwrap()
        }

        fn starts(&self) -> usize {
            self.events
                .pending()
                .filter(|e| {
                    matches!(e, SimEvent::CourtStatusChanged { to: CourtStatus::InUse, .. })
                })
                .count()
        }
    }

    #[test]
    fn test_booking_cycle() {
        let mut f = fixture();
        let id = f
            .store
            .add_booking("0-0", 60.0, 90.0, BookingKind::OpenPlay, 4)
            .unwrap();

        f.tick(0.0, 59.0);
        assert_eq!(f.status("0-0"), CourtStatus::AvailableClean);

        f.tick(59.0, 60.0);
        assert_eq!(f.status("0-0"), CourtStatus::InUse);
        assert_eq!(f.store.court("0-0").unwrap().active_booking_id, Some(id));

        f.tick(60.0, 90.0);
        let court = f.store.court("0-0").unwrap();
        assert_eq!(court.status, CourtStatus::NeedsCleaning);
        assert_eq!(court.active_booking_id, None);
        assert_eq!(court.cleanliness, 60.0);
        assert_eq!(court.last_used_at, Some(90.0));
        assert_eq!(f.queue.len(), 1);
        assert_eq!(f.status("0-1"), CourtStatus::AvailableClean);
    }

    #[test]
    fn test_no_double_fire() {
        let mut f = fixture();
        f.store
            .add_booking("0-0", 100.0, 130.0, BookingKind::Lesson, 2)
            .unwrap();

        f.tick(90.0, 105.0);
        f.tick(105.0, 105.0);
        assert_eq!(f.starts(), 1);
        assert_eq!(f.status("0-0"), CourtStatus::InUse);
    }

    #[test]
    fn test_single_tick_spans_whole_booking() {
        let mut f = fixture();
        f.store
            .add_booking("0-1", 10.0, 20.0, BookingKind::League, 4)
            .unwrap();
        f.tick(0.0, 500.0);
        assert_eq!(f.status("0-1"), CourtStatus::NeedsCleaning);
        assert_eq!(f.starts(), 1);
    }

    #[test]
    fn test_booking_skipped_on_dirty_court() {
        let mut f = fixture();
        f.store
            .add_booking("0-0", 10.0, 20.0, BookingKind::OpenPlay, 4)
            .unwrap();
        f.store
            .add_booking("0-0", 20.0, 30.0, BookingKind::OpenPlay, 4)
            .unwrap();
        f.tick(0.0, 25.0);
        // Second session could not start on a court still waiting for a sweep
        assert_eq!(f.status("0-0"), CourtStatus::NeedsCleaning);
        assert_eq!(f.starts(), 1);
        f.tick(25.0, 40.0);
        assert_eq!(f.queue.len(), 1);
    }

    #[test]
    fn test_overlap_rejected() {
        let mut f = fixture();
        let first = f
            .store
            .add_booking("0-0", 60.0, 120.0, BookingKind::OpenPlay, 4)
            .unwrap();
        let err = f
            .store
            .add_booking("0-0", 90.0, 150.0, BookingKind::OpenPlay, 4)
            .unwrap_err();
        assert!(matches!(err, SimError::BookingOverlap { existing_id, .. } if existing_id == first));

        // Back-to-back and other courts are fine
        assert!(f.store.add_booking("0-0", 120.0, 150.0, BookingKind::Lesson, 2).is_ok());
        assert!(f.store.add_booking("0-1", 90.0, 150.0, BookingKind::Lesson, 2).is_ok());
    }

    #[test]
    fn test_invalid_bookings() {
        let mut f = fixture();
        assert!(matches!(
            f.store.add_booking("9-9", 0.0, 10.0, BookingKind::OpenPlay, 4),
            Err(SimError::CourtNotFound(_))
        ));
        assert!(matches!(
            f.store.add_booking("0-0", 50.0, 50.0, BookingKind::OpenPlay, 4),
            Err(SimError::InvalidBooking(_))
        ));
        assert!(matches!(
            f.store.add_booking("0-0", f64::NAN, 50.0, BookingKind::OpenPlay, 4),
            Err(SimError::InvalidBooking(_))
        ));
    }

    #[test]
    fn test_force_clean_rejected_in_use() {
        let mut f = fixture();
        f.store
            .add_booking("0-0", 0.5, 90.0, BookingKind::OpenPlay, 4)
            .unwrap();
        f.tick(0.0, 1.0);
        f.store.courts[0].cleanliness = 80.0;

        let applied = f
            .store
            .force_clean("0-0", 1.0, &mut f.queue, &mut f.events)
            .unwrap();
        assert!(!applied);
        let court = f.store.court("0-0").unwrap();
        assert_eq!(court.status, CourtStatus::InUse);
        assert_eq!(court.cleanliness, 80.0);
    }

    #[test]
    fn test_force_clean_cancels_job() {
        let mut f = fixture();
        f.store
            .add_booking("0-0", 10.0, 20.0, BookingKind::OpenPlay, 4)
            .unwrap();
        f.tick(0.0, 30.0);
        assert_eq!(f.queue.len(), 1);

        assert!(f
            .store
            .force_clean("0-0", 31.0, &mut f.queue, &mut f.events)
            .unwrap());
        let court = f.store.court("0-0").unwrap();
        assert_eq!(court.status, CourtStatus::AvailableClean);
        assert_eq!(court.cleanliness, 100.0);
        assert_eq!(court.last_cleaned_at, Some(31.0));
        assert!(f.queue.is_empty());
    }

    #[test]
    fn test_force_end_session() {
        let mut f = fixture();
        f.store
            .add_booking("0-1", 10.0, 100.0, BookingKind::Reservation, 2)
            .unwrap();
        assert!(!f
            .store
            .force_end_session("0-1", 5.0, &mut f.queue, &mut f.rng, &mut f.events)
            .unwrap());

        f.tick(0.0, 30.0);
        assert!(f
            .store
            .force_end_session("0-1", 30.0, &mut f.queue, &mut f.rng, &mut f.events)
            .unwrap());
        let court = f.store.court("0-1").unwrap();
        assert_eq!(court.status, CourtStatus::NeedsCleaning);
        assert_eq!(court.cleanliness, 90.0);
        assert_eq!(f.queue.len(), 1);

        // The booking's own end edge no longer applies
        f.tick(30.0, 120.0);
        assert_eq!(f.store.court("0-1").unwrap().cleanliness, 90.0);
    }

    #[test]
    fn test_out_of_service() {
        let mut f = fixture();
        f.store
            .add_booking("0-0", 10.0, 20.0, BookingKind::OpenPlay, 4)
            .unwrap();
        f.tick(0.0, 30.0);
        assert_eq!(f.queue.len(), 1);

        assert!(f
            .store
            .set_out_of_service("0-0", true, 31.0, &mut f.queue, &mut f.events)
            .unwrap());
        assert_eq!(f.status("0-0"), CourtStatus::OutOfService);
        assert!(f.queue.is_empty());
        assert!(!f
            .store
            .set_out_of_service("0-0", true, 31.0, &mut f.queue, &mut f.events)
            .unwrap());

        // Still dirty (60) so it comes back needing a sweep
        assert!(f
            .store
            .set_out_of_service("0-0", false, 40.0, &mut f.queue, &mut f.events)
            .unwrap());
        assert_eq!(f.status("0-0"), CourtStatus::NeedsCleaning);
        assert_eq!(f.queue.len(), 1);

        // A clean court comes straight back
        f.store
            .set_out_of_service("0-1", true, 41.0, &mut f.queue, &mut f.events)
            .unwrap();
        f.store
            .set_out_of_service("0-1", false, 42.0, &mut f.queue, &mut f.events)
            .unwrap();
        assert_eq!(f.status("0-1"), CourtStatus::AvailableClean);
    }

    #[test]
    fn test_out_of_service_refused_in_use() {
        let mut f = fixture();
        f.store
            .add_booking("0-0", 1.0, 20.0, BookingKind::OpenPlay, 4)
            .unwrap();
        f.tick(0.0, 2.0);
        assert!(!f
            .store
            .set_out_of_service("0-0", true, 2.0, &mut f.queue, &mut f.events)
            .unwrap());
        assert_eq!(f.status("0-0"), CourtStatus::InUse);
    }

    #[test]
    fn test_request_cleaning() {
        let mut f = fixture();
        assert!(f
            .store
            .request_cleaning("0-1", JobPriority::High, 5.0, &mut f.queue, &mut f.events)
            .unwrap());
        assert_eq!(f.status("0-1"), CourtStatus::NeedsCleaning);
        assert_eq!(f.queue.iter().next().unwrap().priority, JobPriority::High);

        f.store
            .add_booking("0-0", 10.0, 20.0, BookingKind::OpenPlay, 4)
            .unwrap();
        f.tick(5.0, 30.0);
        // Normal job from the session end, escalated on request
        assert!(f
            .store
            .request_cleaning("0-0", JobPriority::High, 31.0, &mut f.queue, &mut f.events)
            .unwrap());
        assert!(f.queue.iter().all(|j| j.priority == JobPriority::High));
    }

    #[test]
    fn test_cleaning_transitions() {
        let mut f = fixture();
        assert!(!f.store.begin_cleaning("0-0", 0.0, &mut f.events));

        f.store
            .add_booking("0-0", 10.0, 20.0, BookingKind::OpenPlay, 4)
            .unwrap();
        f.tick(0.0, 30.0);
        assert!(f.store.begin_cleaning("0-0", 31.0, &mut f.events));

        f.store.apply_cleaning("0-0", 0.5);
        assert!((f.store.court("0-0").unwrap().cleanliness - 80.0).abs() < 1e-4);

        assert!(f.store.abort_cleaning("0-0", 32.0, &mut f.events));
        assert_eq!(f.status("0-0"), CourtStatus::NeedsCleaning);

        assert!(f.store.begin_cleaning("0-0", 33.0, &mut f.events));
        assert!(f.store.finish_cleaning("0-0", 40.0, &mut f.events));
        let court = f.store.court("0-0").unwrap();
        assert_eq!(court.status, CourtStatus::AvailableClean);
        assert_eq!(court.cleanliness, 100.0);
        assert_eq!(court.last_cleaned_at, Some(40.0));
    }

    #[test]
    fn test_remove_running_booking_ends_session() {
        let mut f = fixture();
        let id = f
            .store
            .add_booking("0-0", 10.0, 60.0, BookingKind::OpenPlay, 4)
            .unwrap();
        f.tick(0.0, 15.0);
        let removed = f
            .store
            .remove_booking(&id, 15.0, &mut f.queue, &mut f.rng, &mut f.events)
            .unwrap();
        assert_eq!(removed.id, id);
        assert_eq!(f.status("0-0"), CourtStatus::NeedsCleaning);
        assert!(f.store.bookings().is_empty());
        assert!(matches!(
            f.store.remove_booking(&id, 15.0, &mut f.queue, &mut f.rng, &mut f.events),
            Err(SimError::BookingNotFound(_))
        ));
    }

    #[test]
    fn test_replace_keeps_running_session() {
        let mut f = fixture();
        let running = f
            .store
            .add_booking("0-0", 10.0, 60.0, BookingKind::OpenPlay, 4)
            .unwrap();
        f.store
            .add_booking("0-1", 100.0, 160.0, BookingKind::OpenPlay, 4)
            .unwrap();
        f.tick(0.0, 15.0);

        let generated = vec![
            Booking {
                id: String::new(),
                court_id: "0-0".into(),
                start_time: 30.0,
                end_time: 90.0,
                kind: BookingKind::League,
                player_count: 4,
            },
            Booking {
                id: String::new(),
                court_id: "0-0".into(),
                start_time: 60.0,
                end_time: 120.0,
                kind: BookingKind::League,
                player_count: 4,
            },
            Booking {
                id: String::new(),
                court_id: "7-7".into(),
                start_time: 0.0,
                end_time: 10.0,
                kind: BookingKind::League,
                player_count: 4,
            },
        ];
        assert_eq!(f.store.replace_bookings(generated), 1);
        let ids: Vec<_> = f.store.bookings().iter().map(|b| b.id.clone()).collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], running);
        assert_ne!(ids[1], running);
    }

    #[test]
    fn test_stats() {
        let mut f = fixture();
        f.store
            .add_booking("0-0", 1.0, 20.0, BookingKind::OpenPlay, 4)
            .unwrap();
        f.tick(0.0, 2.0);
        let stats = f.store.stats();
        assert_eq!(stats.in_use, 1);
        assert_eq!(stats.available, 1);
        assert_eq!(stats.bookings, 1);
        assert!((stats.mean_cleanliness - 100.0).abs() < 1e-4);
    }

    #[test]
    fn test_restore_validates_courts() {
        let layout = FacilityLayout::grid(1, 2, 3.0, Point::ZERO).unwrap();
        let mut courts = vec![Court::new(0, 0), Court::new(0, 1)];
        courts[1].status = CourtStatus::Cleaning;

        let store = CourtStore::restore(
            &layout,
            LifecycleTuning::default(),
            courts.clone(),
            Vec::new(),
            0,
        )
        .unwrap();
        assert_eq!(store.status("0-1"), Some(CourtStatus::NeedsCleaning));

        let missing = CourtStore::restore(
            &layout,
            LifecycleTuning::default(),
            courts[..1].to_vec(),
            Vec::new(),
            0,
        );
        assert!(matches!(missing, Err(SimError::InvalidConfig(_))));

        let mut stray = courts.clone();
        stray.push(Court::new(3, 3));
        assert!(matches!(
            CourtStore::restore(&layout, LifecycleTuning::default(), stray, Vec::new(), 0),
            Err(SimError::CourtNotFound(_))
        ));
    }

    #[test]
    fn test_restore_validates_bookings() {
        let layout = FacilityLayout::grid(1, 2, 3.0, Point::ZERO).unwrap();
        let courts = vec![Court::new(0, 0), Court::new(0, 1)];
        let booking = |id: &str, court: &str, start: f64, end: f64| Booking {
            id: id.to_string(),
            court_id: court.to_string(),
            start_time: start,
            end_time: end,
            kind: BookingKind::OpenPlay,
            player_count: 4,
        };
        let restore = |courts: Vec<Court>, bookings: Vec<Booking>| {
            CourtStore::restore(&layout, LifecycleTuning::default(), courts, bookings, 0)
        };

        let overlapping = vec![
            booking("booking-1", "0-0", 10.0, 60.0),
            booking("booking-2", "0-0", 30.0, 90.0),
        ];
        assert!(matches!(
            restore(courts.clone(), overlapping),
            Err(SimError::BookingOverlap { .. })
        ));

        // Same times on different courts, and back to back, are fine
        let side_by_side = vec![
            booking("booking-1", "0-0", 10.0, 60.0),
            booking("booking-2", "0-1", 10.0, 60.0),
            booking("booking-3", "0-0", 60.0, 90.0),
        ];
        assert!(restore(courts.clone(), side_by_side).is_ok());

        let backwards = vec![booking("booking-1", "0-0", 60.0, 60.0)];
        assert!(matches!(
            restore(courts.clone(), backwards),
            Err(SimError::InvalidBooking(_))
        ));

        let mut playing = courts.clone();
        playing[0].status = CourtStatus::InUse;
        playing[0].active_booking_id = Some("booking-1".into());
        assert!(matches!(
            restore(playing.clone(), Vec::new()),
            Err(SimError::BookingNotFound(_))
        ));
        assert!(matches!(
            restore(playing.clone(), vec![booking("booking-1", "0-1", 0.0, 30.0)]),
            Err(SimError::BookingNotFound(_))
        ));
        let store = restore(
            playing.clone(),
            vec![booking("booking-1", "0-0", 0.0, 30.0)],
        )
        .unwrap();
        assert_eq!(store.status("0-0"), Some(CourtStatus::InUse));

        playing[0].active_booking_id = None;
        assert!(matches!(
            restore(playing, Vec::new()),
            Err(SimError::InvalidConfig(_))
        ));
    }
}
