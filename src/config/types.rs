use serde::Deserialize;
use std::path::PathBuf;

/// Process-wide settings for res-scan
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub output: OutputConfig,
    pub tools: ToolsConfig,
    pub jobs: JobsConfig,
}

/// Where scan artifacts and the asset database live
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory holding one run directory per scan
    #[serde(rename = "output-dir")]
    pub output_dir: PathBuf,

    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("out"),
            database_path: PathBuf::from("out/assets.sqlite"),
        }
    }
}

/// External tool locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Explicit path to the katana crawler binary
    #[serde(rename = "katana-path")]
    pub katana_path: Option<String>,

    /// Explicit path to the httpx probe binary
    #[serde(rename = "httpx-path")]
    pub httpx_path: Option<String>,

    /// How long a `-version` probe may run before the candidate is rejected
    #[serde(rename = "version-timeout-secs")]
    pub version_timeout_secs: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            katana_path: None,
            httpx_path: None,
            version_timeout_secs: 15,
        }
    }
}

/// Background job execution
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Number of scans that may run at the same time
    pub workers: usize,

    /// Maximum number of scans waiting for a worker
    #[serde(rename = "queue-capacity")]
    pub queue_capacity: usize,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 16,
        }
    }
}
