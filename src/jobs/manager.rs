//! Job manager - runs scans on a fixed worker pool
//!
//! `start` validates the request, records a queued entry and hands the job to
//! a bounded queue. Workers pull jobs one at a time and drive them through
//! the orchestrator, recording progress in the job repository.

use crate::jobs::{JobError, JobRepository};
use crate::scanner::{ScanOrchestrator, ScanRequest, ValidatedRequest};
use crate::state::{JobState, ScanPhase};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

type CancelRegistry = Arc<Mutex<HashMap<String, CancellationToken>>>;

struct QueuedJob {
    job_id: String,
    scan_id: String,
    request: ValidatedRequest,
    cancel: CancellationToken,
}

/// Accepts scan requests and tracks their jobs
pub struct JobManager {
    repository: Arc<dyn JobRepository>,
    sender: mpsc::Sender<QueuedJob>,
    cancels: CancelRegistry,
}

impl JobManager {
    /// Creates the manager and spawns its workers
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Arguments
    ///
    /// * `orchestrator` - Runs each scan
    /// * `repository` - Job registry
    /// * `workers` - Number of scans that may run at once
    /// * `queue_capacity` - Jobs that may wait for a worker before `start` rejects
    pub fn new(
        orchestrator: Arc<ScanOrchestrator>,
        repository: Arc<dyn JobRepository>,
        workers: usize,
        queue_capacity: usize,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(queue_capacity.max(1));
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let cancels: CancelRegistry = Arc::default();

        for worker_id in 0..workers.max(1) {
            tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&receiver),
                Arc::clone(&orchestrator),
                Arc::clone(&repository),
                Arc::clone(&cancels),
            ));
        }

        Self {
            repository,
            sender,
            cancels,
        }
    }

    /// Validates and enqueues a scan
    ///
    /// # Returns
    ///
    /// * `Ok(job_id)` - The job is queued
    /// * `Err(JobError::Request)` - The request is invalid; nothing was recorded
    /// * `Err(JobError::QueueFull)` - Every queue slot is taken; nothing was recorded
    pub fn start(&self, request: &ScanRequest) -> Result<String, JobError> {
        let validated = request.validate()?;

        let permit = self.sender.try_reserve().map_err(|e| match e {
            TrySendError::Full(()) => JobError::QueueFull,
            TrySendError::Closed(()) => JobError::Closed,
        })?;

        let job_id = Uuid::new_v4().simple().to_string();
        let scan_id = Uuid::new_v4().simple().to_string();
        let cancel = CancellationToken::new();

        self.repository.insert(JobState::queued(
            job_id.clone(),
            scan_id.clone(),
            &validated.request.base_url,
        ));
        self.cancels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job_id.clone(), cancel.clone());

        tracing::info!("Queued job {} for {}", job_id, validated.request.base_url);

        permit.send(QueuedJob {
            job_id: job_id.clone(),
            scan_id,
            request: validated,
            cancel,
        });

        Ok(job_id)
    }

    /// Returns a snapshot of a job
    pub fn get(&self, job_id: &str) -> Option<JobState> {
        self.repository.get(job_id)
    }

    /// Returns snapshots of every job, oldest first
    pub fn list(&self) -> Vec<JobState> {
        self.repository.list()
    }

    /// Requests cancellation of a queued or running job
    ///
    /// Returns false if the job is unknown or already finished.
    pub fn cancel(&self, job_id: &str) -> bool {
        let cancels = self.cancels.lock().unwrap_or_else(PoisonError::into_inner);
        match cancels.get(job_id) {
            Some(token) => {
                tracing::info!("Cancelling job {}", job_id);
                token.cancel();
                true
            }
            None => false,
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<QueuedJob>>>,
    orchestrator: Arc<ScanOrchestrator>,
    repository: Arc<dyn JobRepository>,
    cancels: CancelRegistry,
) {
    loop {
        let next = receiver.lock().await.recv().await;
        let Some(job) = next else {
            tracing::debug!("Worker {} stopping", worker_id);
            break;
        };

        let job_id = job.job_id.clone();
        tracing::debug!("Worker {} picked up job {}", worker_id, job_id);

        let handle = tokio::spawn(run_job(
            job,
            Arc::clone(&orchestrator),
            Arc::clone(&repository),
        ));
        if let Err(e) = handle.await {
            tracing::error!("Job {} aborted: {}", job_id, e);
            repository.update(&job_id, &mut |state| {
                state.mark_failed(format!("Scan task aborted: {}", e))
            });
        }

        cancels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&job_id);
    }
}

async fn run_job(
    job: QueuedJob,
    orchestrator: Arc<ScanOrchestrator>,
    repository: Arc<dyn JobRepository>,
) {
    let QueuedJob {
        job_id,
        scan_id,
        request,
        cancel,
    } = job;

    repository.update(&job_id, &mut |state| state.mark_running());

    let progress = {
        let repository = Arc::clone(&repository);
        let job_id = job_id.clone();
        move |phase: ScanPhase, pct: i32, message: &str| {
            repository.update(&job_id, &mut |state| {
                state.apply_progress(phase, pct, message)
            });
        }
    };

    match orchestrator
        .run_scan(&scan_id, &request, &progress, &cancel)
        .await
    {
        Ok(outcome) => {
            tracing::info!("Job {} done", job_id);
            let mut outcome = Some(outcome);
            repository.update(&job_id, &mut |state| {
                if let Some(outcome) = outcome.take() {
                    state.mark_done(
                        outcome.site_url,
                        outcome.summary,
                        outcome.stage_durations,
                    );
                }
            });
        }
        Err(e) => {
            tracing::warn!("Job {} failed: {}", job_id, e);
            let message = e.to_string();
            repository.update(&job_id, &mut |state| state.mark_failed(message.clone()));
        }
    }
}
