//! Streaming extraction over the crawl tool's JSON-lines output
//!
//! Each line is one crawled page. Lines that are blank, malformed, off-site,
//! disallowed by robots.txt or not HTML are skipped; none of them abort the scan.

use crate::extract::{extract_asset_instances, AssetFilter, AssetInstance};
use crate::identity::{extract_host, normalize_identity_url};
use crate::robots::RobotsGate;
use crate::ScanError;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Everything page extraction needs, owned so it can move to a blocking thread
#[derive(Debug, Clone)]
pub struct ExtractionContext {
    pub site_url: String,
    pub site_host: String,
    pub max_pages: u32,
    pub filter: AssetFilter,
    pub robots: RobotsGate,
}

/// Result of one pass over the crawl output
#[derive(Debug, Default)]
pub struct ExtractionReport {
    /// Instances in arrival order, unique within each page
    pub instances: Vec<AssetInstance>,
    /// Distinct on-site page URLs encountered
    pub pages_seen: usize,
    /// Pages whose HTML was extracted
    pub pages_extracted: usize,
    /// Lines that were blank or not valid JSON
    pub skipped_lines: usize,
    /// True if the page cap stopped the pass early
    pub truncated: bool,
}

/// Streams the crawl output file and extracts asset instances page by page
///
/// Runs synchronously; call it from a blocking task. The page cap counts
/// distinct page URLs and the pass stops once that count exceeds the cap.
///
/// # Arguments
///
/// * `path` - The crawl tool's JSON-lines output
/// * `ctx` - Site identity, page cap, asset filter and robots gate
/// * `cancel` - Checked before every line
///
/// # Returns
///
/// * `Ok(ExtractionReport)` - The instances found plus pass statistics
/// * `Err(ScanError)` - The file could not be read or the scan was cancelled
pub fn extract_from_crawl_output(
    path: &Path,
    ctx: &ExtractionContext,
    cancel: &CancellationToken,
) -> Result<ExtractionReport, ScanError> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut report = ExtractionReport::default();
    let mut seen_pages: HashSet<String> = HashSet::new();
    let mut page_keys: HashMap<String, HashSet<String>> = HashMap::new();
    let mut buf = Vec::new();

    loop {
        if cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }

        let line = String::from_utf8_lossy(&buf);
        let line = line.trim();
        if line.is_empty() {
            report.skipped_lines += 1;
            continue;
        }

        let entry: Value = match serde_json::from_str(line) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Skipping malformed crawl record: {}", e);
                report.skipped_lines += 1;
                continue;
            }
        };

        let Some(page_url) = extract_page_url(&entry).and_then(normalize_identity_url) else {
            continue;
        };
        if extract_host(&page_url).as_deref() != Some(ctx.site_host.as_str()) {
            continue;
        }

        if !seen_pages.contains(&page_url) {
            seen_pages.insert(page_url.clone());
            if seen_pages.len() > ctx.max_pages as usize {
                tracing::info!("Page cap of {} reached, stopping extraction", ctx.max_pages);
                report.truncated = true;
                break;
            }
        }

        if !ctx.robots.is_allowed(&page_url) {
            tracing::debug!("Robots policy disallows {}", page_url);
            continue;
        }

        let response = entry.get("response").unwrap_or(&Value::Null);
        let Some(body) = response.get("body").and_then(Value::as_str) else {
            continue;
        };
        if body.trim().is_empty() || !is_html_response(response, body) {
            continue;
        }

        let instances = extract_asset_instances(&ctx.site_url, &page_url, body, &ctx.filter);
        report.pages_extracted += 1;

        let keys = page_keys.entry(page_url).or_default();
        for instance in instances {
            if keys.insert(instance.instance_key.clone()) {
                report.instances.push(instance);
            }
        }
    }

    report.pages_seen = seen_pages.len().min(ctx.max_pages as usize);
    Ok(report)
}

/// Effective page URL of a crawl record
///
/// `request.endpoint` wins; the top-level `url` is the fallback.
pub fn extract_page_url(entry: &Value) -> Option<&str> {
    entry
        .get("request")
        .and_then(|request| request.get("endpoint"))
        .and_then(Value::as_str)
        .filter(|endpoint| !endpoint.is_empty())
        .or_else(|| {
            entry
                .get("url")
                .and_then(Value::as_str)
                .filter(|url| !url.is_empty())
        })
}

/// Returns true if a crawled response looks like an HTML document
///
/// The Content-Type header (any key casing) is checked first, then the body
/// is sniffed for an `<html` tag or an HTML doctype.
pub fn is_html_response(response: &Value, body: &str) -> bool {
    let content_type = response
        .get("headers")
        .and_then(Value::as_object)
        .and_then(|headers| {
            headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case("content-type"))
        })
        .map(|(_, value)| match value {
            Value::String(s) => s.to_lowercase(),
            other => other.to_string().to_lowercase(),
        })
        .unwrap_or_default();

    if content_type.contains("text/html") || content_type.contains("application/xhtml+xml") {
        return true;
    }

    let lower = body.to_lowercase();
    lower.contains("<html") || lower.contains("<!doctype html")
}
