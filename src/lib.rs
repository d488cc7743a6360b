//! res-scan: static resource inventory for crawled sites
//!
//! This crate discovers the scripts, stylesheets, images, fonts, media and
//! documents referenced by the HTML of a crawled site, gives every DOM
//! occurrence a stable identity, deduplicates them, and enriches each unique
//! resource with live HTTP metadata from an external probe tool.

pub mod config;
pub mod dedup;
pub mod extract;
pub mod identity;
pub mod jobs;
pub mod output;
pub mod robots;
pub mod scanner;
pub mod state;
pub mod storage;
pub mod tools;

use thiserror::Error;

/// Main error type for a scan run
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Invalid scan request: {0}")]
    Request(#[from] RequestError),

    #[error(transparent)]
    Tool(#[from] tools::ToolError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Unable to normalize base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Extraction task failed: {0}")]
    Task(String),

    #[error("Scan cancelled")]
    Cancelled,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Errors raised while validating a scan request before a job is created
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("base_url must start with http:// or https://")]
    InvalidScheme,

    #[error("base_url must include a host")]
    MissingHost,

    #[error("base_url is not a valid URL: {0}")]
    MalformedUrl(String),

    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        min: u32,
        max: u32,
        value: u32,
    },

    #[error("Invalid {field} pattern: {source}")]
    Pattern {
        field: &'static str,
        source: regex::Error,
    },
}

/// Result type alias for scan operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Settings;
pub use extract::{extract_asset_instances, AssetInstance, ResourceType};
pub use identity::{normalize_identity_url, normalize_site_origin};
pub use jobs::JobManager;
pub use scanner::{ScanOrchestrator, ScanRequest};
pub use state::{JobState, JobStatus};
