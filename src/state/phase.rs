use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a scan as reported through progress updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanPhase {
    Queued,
    Validate,
    Crawl,
    Extract,
    Probe,
    Db,
    Done,
    Failed,
}

impl ScanPhase {
    /// Progress percentage reported on entering this phase
    pub fn progress_pct(&self) -> i32 {
        match self {
            Self::Queued => 0,
            Self::Validate => 5,
            Self::Crawl => 15,
            Self::Extract => 45,
            Self::Probe => 70,
            Self::Db => 90,
            Self::Done => 100,
            Self::Failed => 100,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Validate => "validate",
            Self::Crawl => "crawl",
            Self::Extract => "extract",
            Self::Probe => "probe",
            Self::Db => "db",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
