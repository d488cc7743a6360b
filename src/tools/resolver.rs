//! ProjectDiscovery binary resolution
//!
//! Candidates are tried in order: the configured path, `~/go/bin/<name>`, then
//! every `PATH` entry. The first one whose `-version` output identifies it as a
//! ProjectDiscovery tool wins.

use super::{ResolvedTool, ToolError, ToolResolver};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;

const VENDOR_MARKER: &str = "projectdiscovery.io";

/// Resolver for ProjectDiscovery tools such as katana and httpx
#[derive(Debug, Clone)]
pub struct ProjectDiscoveryResolver {
    version_timeout: Duration,
}

impl ProjectDiscoveryResolver {
    /// Creates a resolver that gives each `-version` probe `version_timeout`
    pub fn new(version_timeout: Duration) -> Self {
        Self { version_timeout }
    }
}

impl Default for ProjectDiscoveryResolver {
    fn default() -> Self {
        Self::new(Duration::from_secs(15))
    }
}

#[async_trait]
impl ToolResolver for ProjectDiscoveryResolver {
    async fn resolve(
        &self,
        name: &str,
        configured_path: Option<&str>,
    ) -> Result<ResolvedTool, ToolError> {
        let mut errors = Vec::new();

        for path in candidate_paths(name, configured_path) {
            let output = match probe_version(&path, self.version_timeout).await {
                Ok(output) => output,
                Err(e) => {
                    tracing::debug!("Rejected candidate {}: {}", path.display(), e);
                    errors.push(format!("{}: {}", path.display(), e));
                    continue;
                }
            };

            if !output.to_lowercase().contains(VENDOR_MARKER) {
                errors.push(format!("{}: non-ProjectDiscovery binary", path.display()));
                continue;
            }

            let version = extract_version(&output);
            tracing::debug!("Resolved {} {} at {}", name, version, path.display());
            return Ok(ResolvedTool {
                name: name.to_string(),
                path,
                version,
            });
        }

        let details = if errors.is_empty() {
            "No executable candidates found.".to_string()
        } else {
            errors.join("\n")
        };

        Err(ToolError::Resolution {
            name: name.to_string(),
            details,
        })
    }
}

/// Lists existing candidate binaries for a tool, in resolution order
///
/// Paths are canonicalized and de-duplicated; paths that do not exist are dropped.
pub fn candidate_paths(name: &str, configured_path: Option<&str>) -> Vec<PathBuf> {
    let exe_name = format!("{}{}", name, std::env::consts::EXE_SUFFIX);
    let mut raw: Vec<PathBuf> = Vec::new();

    if let Some(configured) = configured_path.map(str::trim).filter(|p| !p.is_empty()) {
        raw.push(PathBuf::from(configured));
    }

    if let Some(home) = dirs::home_dir() {
        raw.push(home.join("go").join("bin").join(&exe_name));
    }

    if let Some(path_var) = std::env::var_os("PATH") {
        raw.extend(std::env::split_paths(&path_var).map(|dir| dir.join(&exe_name)));
    }

    let mut seen = HashSet::new();
    raw.into_iter()
        .filter_map(|path| std::fs::canonicalize(path).ok())
        .filter(|path| path.is_file())
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

/// Extracts the version from `-version` output, or `unknown`
pub fn extract_version(output: &str) -> String {
    static VERSION_RE: OnceLock<Option<Regex>> = OnceLock::new();

    VERSION_RE
        .get_or_init(|| Regex::new(r"(?:Current\s+Version|Current\s+version):\s*(\S+)").ok())
        .as_ref()
        .and_then(|re| re.captures(output))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Runs `<path> -version` and returns stdout followed by stderr
async fn probe_version(path: &Path, limit: Duration) -> Result<String, ToolError> {
    let label = format!("{} -version", path.display());

    let mut command = Command::new(path);
    command.arg("-version").kill_on_drop(true);

    let output = tokio::time::timeout(limit, command.output())
        .await
        .map_err(|_| ToolError::Timeout {
            label: label.clone(),
            secs: limit.as_secs(),
        })?
        .map_err(|source| ToolError::Spawn {
            label: label.clone(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        return Err(ToolError::Failed {
            label,
            code: output.status.code().unwrap_or(-1),
            stdout,
            stderr,
        });
    }

    Ok(format!("{}{}", stdout, stderr))
}
