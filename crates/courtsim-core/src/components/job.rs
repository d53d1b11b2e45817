//! Cleaning jobs waiting for (or assigned to) a robot.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// High-priority jobs always run before normal ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum JobPriority {
    Normal,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningJob {
    pub id: String,
    pub court_id: String,
    pub priority: JobPriority,
    /// Virtual minute the job was created.
    pub created_at: f64,
    /// Arrival counter, breaks ties between jobs created in the same minute.
    pub seq: u64,
    pub assigned_robot_id: Option<String>,
}

impl CleaningJob {
    pub fn new(seq: u64, court_id: &str, priority: JobPriority, created_at: f64) -> Self {
        Self {
            id: format!("job-{}", seq),
            court_id: court_id.to_string(),
            priority,
            created_at,
            seq,
            assigned_robot_id: None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.assigned_robot_id.is_some()
    }

    /// Queue order: priority descending, then creation time, then arrival.
    pub fn queue_order(&self, other: &CleaningJob) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then(self.created_at.total_cmp(&other.created_at))
            .then(self.seq.cmp(&other.seq))
    }
}
