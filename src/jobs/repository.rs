//! Job registry storage

use crate::state::JobState;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Registry of job snapshots
///
/// Every mutation goes through [`JobRepository::update`], which applies the
/// change under the registry's lock.
pub trait JobRepository: Send + Sync {
    /// Records a new job
    fn insert(&self, state: JobState);

    /// Returns a snapshot of a job
    fn get(&self, job_id: &str) -> Option<JobState>;

    /// Applies `apply` to a job under the lock; returns false if the job is unknown
    fn update(&self, job_id: &str, apply: &mut dyn FnMut(&mut JobState)) -> bool;

    /// Returns snapshots of every job, oldest first
    fn list(&self) -> Vec<JobState>;
}

/// Process-local job registry
#[derive(Debug, Default)]
pub struct InMemoryJobRepository {
    jobs: Mutex<HashMap<String, JobState>>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<String, JobState>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JobRepository for InMemoryJobRepository {
    fn insert(&self, state: JobState) {
        self.jobs().insert(state.job_id.clone(), state);
    }

    fn get(&self, job_id: &str) -> Option<JobState> {
        self.jobs().get(job_id).cloned()
    }

    fn update(&self, job_id: &str, apply: &mut dyn FnMut(&mut JobState)) -> bool {
        match self.jobs().get_mut(job_id) {
            Some(state) => {
                apply(state);
                true
            }
            None => false,
        }
    }

    fn list(&self) -> Vec<JobState> {
        let mut jobs: Vec<JobState> = self.jobs().values().cloned().collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.job_id.cmp(&b.job_id)));
        jobs
    }
}
