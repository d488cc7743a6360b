//! External tool discovery and execution
//!
//! The crawl and probe stages shell out to ProjectDiscovery's `katana` and
//! `httpx`. This module finds and validates those binaries and runs them.

mod resolver;
mod runner;

pub use resolver::{candidate_paths, extract_version, ProjectDiscoveryResolver};
pub use runner::{httpx_args, katana_args, run_tool, ToolOutput};

use async_trait::async_trait;
use std::path::PathBuf;
use thiserror::Error;

/// Logical name of the crawl tool
pub const KATANA: &str = "katana";

/// Logical name of the probe tool
pub const HTTPX: &str = "httpx";

/// Errors raised while resolving or running an external tool
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unable to validate '{name}'. Tried:\n{details}")]
    Resolution { name: String, details: String },

    #[error("Failed to execute {label}: {source}")]
    Spawn {
        label: String,
        source: std::io::Error,
    },

    #[error("{label} timed out after {secs}s")]
    Timeout { label: String, secs: u64 },

    #[error("{label} failed with exit {code}\nstdout:\n{stdout}\nstderr:\n{stderr}")]
    Failed {
        label: String,
        code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("{label} was cancelled")]
    Cancelled { label: String },
}

/// A validated tool binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTool {
    pub name: String,
    pub path: PathBuf,
    pub version: String,
}

/// Finds and validates a tool binary by logical name
#[async_trait]
pub trait ToolResolver: Send + Sync {
    /// Resolves `name`, trying `configured_path` first when given
    async fn resolve(
        &self,
        name: &str,
        configured_path: Option<&str>,
    ) -> Result<ResolvedTool, ToolError>;
}
