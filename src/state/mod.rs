//! State module for tracking scan jobs
//!
//! # Components
//!
//! - `JobStatus`: lifecycle status of a job (queued, running, done, failed)
//! - `ScanPhase`: pipeline phase reported through progress updates
//! - `JobState`: the queryable snapshot of one job

mod job_state;
mod phase;

// Re-export main types
pub use job_state::{JobState, JobStatus};
pub use phase::ScanPhase;
