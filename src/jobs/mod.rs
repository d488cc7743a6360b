//! Asynchronous scan jobs
//!
//! A [`JobManager`] owns the worker pool; job snapshots live in a
//! [`JobRepository`].

mod manager;
mod repository;

pub use manager::JobManager;
pub use repository::{InMemoryJobRepository, JobRepository};

use crate::RequestError;
use thiserror::Error;

/// Errors returned synchronously by [`JobManager::start`]
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Invalid scan request: {0}")]
    Request(#[from] RequestError),

    #[error("Scan queue is full, try again later")]
    QueueFull,

    #[error("Job manager is shut down")]
    Closed,
}
