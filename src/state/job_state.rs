//! Job state definitions for tracking scan progress
//!
//! A job moves `queued → running → {done | failed}`. Terminal states are final.
use crate::state::ScanPhase;
use crate::scanner::PhaseTimings;
use crate::storage::ScanSummary;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Lifecycle status of a scan job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted and waiting for a worker
    Queued,

    /// A worker is running the scan
    Running,

    /// The scan finished and its results are stored
    Done,

    /// The scan failed or was cancelled
    Failed,
}

impl JobStatus {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Converts the status to its string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from its string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "done" => Some(Self::Done),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// Snapshot of one scan job
#[derive(Debug, Clone, Serialize)]
pub struct JobState {
    pub job_id: String,
    pub scan_id: String,
    pub status: JobStatus,
    pub phase: ScanPhase,
    /// Always within 0..=100
    pub progress_pct: u8,
    pub message: String,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Requested base URL until the scan finishes, then the normalized site origin
    pub site_url: Option<String>,
    pub summary: Option<ScanSummary>,
    /// Per-phase durations of a finished scan
    pub stage_durations: Option<PhaseTimings>,
}

impl JobState {
    /// Creates the entry of a freshly accepted job
    pub fn queued(job_id: String, scan_id: String, base_url: &str) -> Self {
        Self {
            job_id,
            scan_id,
            status: JobStatus::Queued,
            phase: ScanPhase::Queued,
            progress_pct: 0,
            message: "Waiting for a worker".to_string(),
            error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            site_url: Some(base_url.to_string()),
            summary: None,
            stage_durations: None,
        }
    }

    /// Marks the job as picked up by a worker
    pub fn mark_running(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Running;
        self.phase = ScanPhase::Validate;
        self.started_at = Some(Utc::now());
        self.message = "Scan started".to_string();
    }

    /// Applies a progress report, clamping the percentage into 0..=100
    ///
    /// Reports arriving after the job reached a terminal status are ignored.
    pub fn apply_progress(&mut self, phase: ScanPhase, pct: i32, message: &str) {
        if self.status.is_terminal() {
            return;
        }
        self.phase = phase;
        self.progress_pct = pct.clamp(0, 100) as u8;
        self.message = message.to_string();
    }

    /// Marks the job as successfully finished
    pub fn mark_done(
        &mut self,
        site_url: String,
        summary: ScanSummary,
        stage_durations: PhaseTimings,
    ) {
        self.status = JobStatus::Done;
        self.phase = ScanPhase::Done;
        self.progress_pct = 100;
        self.message = "Scan completed".to_string();
        self.finished_at = Some(Utc::now());
        self.site_url = Some(site_url);
        self.summary = Some(summary);
        self.stage_durations = Some(stage_durations);
    }

    /// Marks the job as failed with a human-readable error
    pub fn mark_failed(&mut self, error: String) {
        self.status = JobStatus::Failed;
        self.phase = ScanPhase::Failed;
        self.message = "Scan failed".to_string();
        self.error = Some(error);
        self.finished_at = Some(Utc::now());
        self.summary = None;
    }
}
