//! Simulation event log.
//!
//! Every state transition is appended here so a presentation layer can
//! subscribe by draining the log instead of diffing snapshots. Events are
//! only produced on transitions, never on plain movement updates.
//!
//! The log holds at most `capacity` events; when a host stops draining, the
//! oldest are dropped first.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::components::{CourtStatus, JobPriority, RobotStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimEvent {
    CourtStatusChanged {
        court_id: String,
        from: CourtStatus,
        to: CourtStatus,
        /// Virtual minute of the transition.
        at: f64,
    },
    JobEnqueued {
        job_id: String,
        court_id: String,
        priority: JobPriority,
    },
    JobAssigned {
        job_id: String,
        robot_id: String,
    },
    JobCompleted {
        job_id: String,
        court_id: String,
        robot_id: String,
    },
    JobCancelled {
        job_id: String,
        court_id: String,
    },
    RobotStatusChanged {
        robot_id: String,
        from: RobotStatus,
        to: RobotStatus,
    },
}

/// Default cap on undrained events.
pub const DEFAULT_EVENT_CAPACITY: usize = 10_000;

#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<SimEvent>,
    capacity: usize,
    dropped: u64,
    enabled: bool,
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity,
            dropped: 0,
            enabled: true,
        }
    }

    pub fn push(&mut self, event: SimEvent) {
        if !self.enabled || self.capacity == 0 {
            return;
        }
        if self.events.len() == self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
    }

    /// Turn recording off for hosts that never drain the log.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.events.clear();
        }
    }

    /// Change the cap, dropping the oldest events if already over it.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        while self.events.len() > capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Events lost to the cap since the log was created.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn drain(&mut self) -> std::collections::vec_deque::Drain<'_, SimEvent> {
        self.events.drain(..)
    }

    pub fn pending(&self) -> impl Iterator<Item = &SimEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
