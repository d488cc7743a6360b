//! Probe tool output parsing

use crate::identity::normalize_identity_url;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// HTTP metadata of one asset URL
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub content_length: Option<i64>,
}

impl ProbeResult {
    fn from_record(record: &Value) -> Self {
        Self {
            status_code: record
                .get("status_code")
                .and_then(Value::as_u64)
                .and_then(|code| u16::try_from(code).ok()),
            content_type: record
                .get("content_type")
                .and_then(Value::as_str)
                .map(str::to_string),
            content_length: record.get("content_length").and_then(Value::as_i64),
        }
    }
}

/// Probe results keyed by normalized asset URL
pub type ProbeMap = HashMap<String, ProbeResult>;

/// Parses probe output into a map keyed by normalized URL
///
/// Both the `input` and `url` fields of a record are mapped, so an asset
/// that redirected can be found under either URL. Blank and malformed lines
/// are skipped; later records win.
pub fn parse_probe_output(bytes: &[u8]) -> ProbeMap {
    let mut probe_map = ProbeMap::new();

    for raw in bytes.split(|b| *b == b'\n') {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let record: Value = match serde_json::from_str(line) {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!("Skipping malformed probe record: {}", e);
                continue;
            }
        };

        let result = ProbeResult::from_record(&record);
        for key in ["input", "url"] {
            if let Some(url) = record
                .get(key)
                .and_then(Value::as_str)
                .and_then(normalize_identity_url)
            {
                probe_map.insert(url, result.clone());
            }
        }
    }

    probe_map
}

/// Loads the probe output file; a missing file yields an empty map
pub async fn load_probe_map(path: &Path) -> std::io::Result<ProbeMap> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(parse_probe_output(&bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ProbeMap::new()),
        Err(e) => Err(e),
    }
}
