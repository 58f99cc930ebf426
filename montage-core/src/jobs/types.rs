//! Job queue types

use crate::errors::CoordError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use strum::{Display, EnumString};

/// The body of a job. Runs once on the queue's worker thread.
pub type JobWork = Box<dyn FnOnce() -> Result<Value, String> + Send + 'static>;

/// Kind of heavy work a job performs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum JobCategory {
    Render,
    Export,
    Transcode,
    Voice,
    #[strum(default)]
    Other(String),
}

/// Lifecycle of the queue's worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobQueueState {
    /// No worker thread alive
    Idle,
    /// Worker alive; the queue may be momentarily empty
    Running,
    /// Shutdown requested, worker finishes its current job then exits
    Draining,
}

/// A job waiting in (or taken from) the priority queue
pub struct Job {
    /// Lower is more urgent
    pub priority: i32,
    /// Insertion sequence, breaks ties so equal priorities stay FIFO
    pub(crate) seq: u64,
    pub id: String,
    pub category: JobCategory,
    pub(crate) work: JobWork,
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("priority", &self.priority)
            .field("seq", &self.seq)
            .field("id", &self.id)
            .field("category", &self.category)
            .finish()
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for Job {}

impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Job {
    // BinaryHeap is a max-heap: the "greatest" job is the lowest (priority, seq)
    fn cmp(&self, other: &Self) -> Ordering {
        (other.priority, other.seq).cmp(&(self.priority, self.seq))
    }
}

/// Outcome of a job, delivered to listeners on the owning thread
#[derive(Debug, Clone)]
pub struct JobResult {
    pub id: String,
    pub category: JobCategory,
    pub outcome: Result<Value, CoordError>,
    pub finished_at: DateTime<Utc>,
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn value(&self) -> Option<&Value> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&CoordError> {
        self.outcome.as_ref().err()
    }
}

/// Receives job completions. Always invoked on the owning thread.
pub trait JobListener: Send + Sync {
    fn on_task_finished(&self, id: &str, result: Option<&Value>, error: Option<&CoordError>);
}

impl<F> JobListener for F
where
    F: Fn(&str, Option<&Value>, Option<&CoordError>) + Send + Sync,
{
    fn on_task_finished(&self, id: &str, result: Option<&Value>, error: Option<&CoordError>) {
        self(id, result, error)
    }
}
