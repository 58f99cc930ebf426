//! Background job queue for heavy batch work (render, export, transcode, voice)

pub mod queue;
pub mod types;

pub use queue::JobQueue;
pub use types::{Job, JobCategory, JobListener, JobQueueState, JobResult, JobWork};
