//! Cleaning job queue - at most one job per court, high priority first

use serde::{Deserialize, Serialize};

use crate::components::{CleaningJob, JobPriority};
use crate::error::SimError;

/// Pending and in-progress cleaning jobs, kept sorted in queue order
/// (priority descending, then creation time, then arrival).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobQueue {
    jobs: Vec<CleaningJob>,
    next_seq: u64,
    completed: u64,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a job for `court_id` unless one already exists. Returns the new
    /// job, or `None` when the court already had one.
    pub fn enqueue(
        &mut self,
        court_id: &str,
        priority: JobPriority,
        now: f64,
    ) -> Option<&CleaningJob> {
        if self.job_for_court(court_id).is_some() {
            return None;
        }
        self.next_seq += 1;
        let job = CleaningJob::new(self.next_seq, court_id, priority, now);
        let index = self.insert_sorted(job);
        Some(&self.jobs[index])
    }

    fn insert_sorted(&mut self, job: CleaningJob) -> usize {
        let index = self
            .jobs
            .iter()
            .position(|existing| job.queue_order(existing).is_lt())
            .unwrap_or(self.jobs.len());
        self.jobs.insert(index, job);
        index
    }

    /// Remove a job by id.
    pub fn dequeue(&mut self, job_id: &str) -> Result<CleaningJob, SimError> {
        let index = self
            .jobs
            .iter()
            .position(|j| j.id == job_id)
            .ok_or_else(|| SimError::JobNotFound(job_id.to_string()))?;
        Ok(self.jobs.remove(index))
    }

    /// Remove a job that a robot finished, counting it as completed.
    pub fn complete(&mut self, job_id: &str) -> Result<CleaningJob, SimError> {
        let job = self.dequeue(job_id)?;
        self.completed += 1;
        Ok(job)
    }

    /// Give `job_id` to `robot_id`. Already-assigned jobs are left alone.
    pub fn assign(&mut self, job_id: &str, robot_id: &str) -> Result<bool, SimError> {
        let job = self
            .jobs
            .iter_mut()
            .find(|j| j.id == job_id)
            .ok_or_else(|| SimError::JobNotFound(job_id.to_string()))?;
        if job.is_assigned() {
            return Ok(false);
        }
        job.assigned_robot_id = Some(robot_id.to_string());
        Ok(true)
    }

    /// Put a job back up for grabs. Returns false if it was not assigned.
    pub fn unassign(&mut self, job_id: &str) -> bool {
        match self.jobs.iter_mut().find(|j| j.id == job_id) {
            Some(job) if job.is_assigned() => {
                job.assigned_robot_id = None;
                true
            }
            _ => false,
        }
    }

    pub fn unassign_all(&mut self) {
        for job in &mut self.jobs {
            job.assigned_robot_id = None;
        }
    }

    /// Drop whatever job exists for `court_id`.
    pub fn remove_for_court(&mut self, court_id: &str) -> Option<CleaningJob> {
        let index = self.jobs.iter().position(|j| j.court_id == court_id)?;
        Some(self.jobs.remove(index))
    }

    /// Raise the court's job to high priority and move it ahead of every
    /// normal job. Returns false if the court has no job or it is already high.
    pub fn escalate(&mut self, court_id: &str) -> bool {
        let Some(index) = self.jobs.iter().position(|j| j.court_id == court_id) else {
            return false;
        };
        if self.jobs[index].priority == JobPriority::High {
            return false;
        }
        let mut job = self.jobs.remove(index);
        job.priority = JobPriority::High;
        self.insert_sorted(job);
        true
    }

    pub fn get(&self, job_id: &str) -> Option<&CleaningJob> {
        self.jobs.iter().find(|j| j.id == job_id)
    }

    pub fn job_for_court(&self, court_id: &str) -> Option<&CleaningJob> {
        self.jobs.iter().find(|j| j.court_id == court_id)
    }

    /// First unassigned job in queue order that `accept` agrees to.
    pub fn next_unassigned<F>(&self, mut accept: F) -> Option<&CleaningJob>
    where
        F: FnMut(&CleaningJob) -> bool,
    {
        self.jobs
            .iter()
            .find(|j| !j.is_assigned() && accept(j))
    }

    /// True if `job_id` is still queued and held by `robot_id`.
    pub fn is_held_by(&self, job_id: &str, robot_id: &str) -> bool {
        self.get(job_id)
            .and_then(|j| j.assigned_robot_id.as_deref())
            .map(|holder| holder == robot_id)
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CleaningJob> {
        self.jobs.iter()
    }

    pub fn as_slice(&self) -> &[CleaningJob] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn completed_count(&self) -> u64 {
        self.completed
    }

    /// Rebuild from saved jobs, re-sorting and dropping duplicate courts.
    pub fn restore(jobs: Vec<CleaningJob>, next_seq: u64, completed: u64) -> Self {
        let mut queue = Self {
            jobs: Vec::with_capacity(jobs.len()),
            next_seq,
            completed,
        };
        for job in jobs {
            if queue.job_for_court(&job.court_id).is_none() {
                queue.next_seq = queue.next_seq.max(job.seq);
                queue.insert_sorted(job);
            }
        }
        queue
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }
}
