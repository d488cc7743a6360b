//! Scan coordinator - sequences one scan from tool resolution to persistence
//!
//! Phases run strictly in order:
//! - validate: resolve both tools and normalize the site origin
//! - crawl: run katana into `katana.jsonl`
//! - extract: stream the crawl output through the robots gate and the extractor
//! - probe: run httpx over the unique asset URLs (skipped when there are none)
//! - db: replace the site's rows and compute the summary

use crate::config::Settings;
use crate::dedup::{dedupe_instances_by_key, unique_asset_urls};
use crate::extract::AssetInstance;
use crate::identity::{extract_host, normalize_site_origin};
use crate::robots::RobotsGate;
use crate::scanner::crawl_output::{extract_from_crawl_output, ExtractionContext};
use crate::scanner::probe::{load_probe_map, ProbeMap};
use crate::scanner::timings::PhaseTimings;
use crate::scanner::ValidatedRequest;
use crate::state::ScanPhase;
use crate::storage::{
    format_timestamp, AssetRecord, AssetStore, ScanStamp, ScanSummary, StorageError,
};
use crate::tools::{httpx_args, katana_args, run_tool, ToolError, ToolResolver, HTTPX, KATANA};
use crate::ScanError;
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;

/// Progress callback: phase, percentage, message
pub type ProgressFn = dyn Fn(ScanPhase, i32, &str) + Send + Sync;

/// Shared asset store
pub type SharedStore = Arc<Mutex<dyn AssetStore + Send>>;

/// Result of a successful scan
#[derive(Debug, Clone, Serialize)]
pub struct ScanOutcome {
    pub scan_id: String,
    pub site_url: String,
    pub summary: ScanSummary,
    pub run_dir: PathBuf,
    pub instance_count: usize,
    pub unique_assets: usize,
    pub pages_seen: usize,
    pub stage_durations: PhaseTimings,
}

/// Per-site async locks serializing the persistence phase
#[derive(Debug, Default)]
pub struct SiteLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SiteLocks {
    /// Waits for and takes the lock of one site
    pub async fn lock(&self, site_url: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(site_url.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

/// Builds the HTTP client used for robots.txt fetches
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(concat!("res-scan/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(20))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Runs scans against a shared store
pub struct ScanOrchestrator {
    settings: Arc<Settings>,
    resolver: Arc<dyn ToolResolver>,
    store: SharedStore,
    client: Client,
    site_locks: SiteLocks,
}

impl ScanOrchestrator {
    /// Creates a new orchestrator
    ///
    /// # Arguments
    ///
    /// * `settings` - Output locations and tool paths
    /// * `resolver` - Finds and validates the crawl and probe tools
    /// * `store` - Destination of scan results
    pub fn new(
        settings: Arc<Settings>,
        resolver: Arc<dyn ToolResolver>,
        store: SharedStore,
    ) -> Result<Self, ScanError> {
        Ok(Self {
            settings,
            resolver,
            store,
            client: build_http_client()?,
            site_locks: SiteLocks::default(),
        })
    }

    /// Returns the shared store
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Runs one scan
    ///
    /// # Arguments
    ///
    /// * `scan_id` - Identifier of this scan; also names the run directory
    /// * `validated` - The validated request
    /// * `progress` - Receives (phase, percentage, message) on every phase change
    /// * `cancel` - Checked at every phase boundary and while tools run
    ///
    /// # Returns
    ///
    /// * `Ok(ScanOutcome)` - Results are stored and summarized
    /// * `Err(ScanError)` - The scan failed; the store is unchanged
    pub async fn run_scan(
        &self,
        scan_id: &str,
        validated: &ValidatedRequest,
        progress: &ProgressFn,
        cancel: &CancellationToken,
    ) -> Result<ScanOutcome, ScanError> {
        let request = &validated.request;
        let started_at = Utc::now();
        let overall = Instant::now();
        let mut timings = PhaseTimings::default();

        let run_dir = self.settings.output.output_dir.join(scan_id);
        tokio::fs::create_dir_all(&run_dir).await?;
        let katana_jsonl = run_dir.join("katana.jsonl");
        let instances_jsonl = run_dir.join("instances.jsonl");
        let asset_urls_txt = run_dir.join("asset_urls.txt");
        let httpx_jsonl = run_dir.join("httpx.jsonl");

        // validate
        check_cancelled(cancel)?;
        report(progress, ScanPhase::Validate, "Resolving scanner binaries");
        let stage = Instant::now();
        let tools = &self.settings.tools;
        let katana = self
            .resolver
            .resolve(KATANA, tools.katana_path.as_deref())
            .await?;
        let httpx = self
            .resolver
            .resolve(HTTPX, tools.httpx_path.as_deref())
            .await?;

        let site_url = normalize_site_origin(&request.base_url)
            .ok_or_else(|| ScanError::InvalidBaseUrl(request.base_url.clone()))?;
        let site_host = extract_host(&site_url)
            .ok_or_else(|| ScanError::InvalidBaseUrl(request.base_url.clone()))?;
        let robots = RobotsGate::new(&site_url, request.respect_robots, &self.client).await;
        timings.record("validate", stage.elapsed());

        tracing::info!(
            "Scan {} of {} using katana {} and httpx {}",
            scan_id,
            site_url,
            katana.version,
            httpx.version
        );

        // crawl
        check_cancelled(cancel)?;
        report(progress, ScanPhase::Crawl, "Running katana crawl");
        let stage = Instant::now();
        run_tool(
            KATANA,
            &katana.path,
            &katana_args(request, &katana_jsonl),
            cancel,
        )
        .await
        .map_err(tool_failure)?;
        timings.record("crawl", stage.elapsed());

        // extract
        check_cancelled(cancel)?;
        report(
            progress,
            ScanPhase::Extract,
            "Extracting asset instances from crawled pages",
        );
        let stage = Instant::now();
        let ctx = ExtractionContext {
            site_url: site_url.clone(),
            site_host,
            max_pages: request.max_pages,
            filter: validated.filter.clone(),
            robots,
        };
        let extraction = {
            let path = katana_jsonl.clone();
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || extract_from_crawl_output(&path, &ctx, &cancel))
                .await
                .map_err(|e| ScanError::Task(e.to_string()))??
        };
        let pages_seen = extraction.pages_seen;
        let deduped = dedupe_instances_by_key(extraction.instances);
        let unique = unique_asset_urls(&deduped);
        write_instances(&instances_jsonl, &deduped).await?;
        tokio::fs::write(&asset_urls_txt, unique.join("\n")).await?;
        timings.record("extract", stage.elapsed());

        tracing::info!(
            "Extracted {} instances of {} unique assets from {} pages",
            deduped.len(),
            unique.len(),
            pages_seen
        );

        // probe
        check_cancelled(cancel)?;
        let stage = Instant::now();
        let probe_map = if unique.is_empty() {
            tokio::fs::write(&httpx_jsonl, "").await?;
            ProbeMap::new()
        } else {
            report(progress, ScanPhase::Probe, "Probing assets with httpx");
            run_tool(
                HTTPX,
                &httpx.path,
                &httpx_args(request, &asset_urls_txt, &httpx_jsonl),
                cancel,
            )
            .await
            .map_err(tool_failure)?;
            load_probe_map(&httpx_jsonl).await?
        };
        timings.record("probe", stage.elapsed());

        let discovered_at = format_timestamp(started_at);
        let records = merge_probe_results(&deduped, &probe_map, scan_id, &discovered_at);

        // db
        check_cancelled(cancel)?;
        report(progress, ScanPhase::Db, "Writing results to SQLite");
        let stage = Instant::now();
        let summary = {
            let _site_guard = self.site_locks.lock(&site_url).await;
            let store = Arc::clone(&self.store);
            let site = site_url.clone();
            let stamp = ScanStamp::new(scan_id, started_at);
            tokio::task::spawn_blocking(move || -> Result<ScanSummary, StorageError> {
                let mut store = store.lock().unwrap_or_else(PoisonError::into_inner);
                store.replace_site_assets(&site, &stamp, &records)?;
                store.summary_for_site(&site)
            })
            .await
            .map_err(|e| ScanError::Task(e.to_string()))??
        };
        timings.record("db", stage.elapsed());
        timings.record("total", overall.elapsed());

        report(progress, ScanPhase::Done, "Scan completed");
        tracing::info!(
            "Scan {} of {} completed: {} instances, {} unique assets, {} pages, artifacts in {}",
            scan_id,
            site_url,
            deduped.len(),
            unique.len(),
            pages_seen,
            run_dir.display()
        );
        tracing::info!("Scan {} timings: {}", scan_id, timings);

        Ok(ScanOutcome {
            scan_id: scan_id.to_string(),
            site_url,
            summary,
            run_dir,
            instance_count: deduped.len(),
            unique_assets: unique.len(),
            pages_seen,
            stage_durations: timings,
        })
    }
}

/// Merges probe metadata onto instances, producing the rows to persist
///
/// Instances without a probe result get null metadata.
pub fn merge_probe_results(
    instances: &[AssetInstance],
    probe_map: &ProbeMap,
    scan_id: &str,
    discovered_at: &str,
) -> Vec<AssetRecord> {
    instances
        .iter()
        .map(|instance| {
            let probe = probe_map.get(&instance.asset_url);
            AssetRecord {
                instance_key: instance.instance_key.clone(),
                site_url: instance.site_url.clone(),
                page_url: instance.page_url.clone(),
                asset_url: instance.asset_url.clone(),
                dom_path: instance.dom_path.clone(),
                asset_attr: instance.asset_attr.clone(),
                attr_occurrence: instance.attr_occurrence,
                resource_type: instance.resource_type,
                status_code: probe.and_then(|p| p.status_code),
                content_type: probe.and_then(|p| p.content_type.clone()),
                content_length: probe.and_then(|p| p.content_length),
                scan_id: scan_id.to_string(),
                discovered_at: discovered_at.to_string(),
            }
        })
        .collect()
}

fn report(progress: &ProgressFn, phase: ScanPhase, message: &str) {
    tracing::info!("[{}] {}", phase, message);
    progress(phase, phase.progress_pct(), message);
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), ScanError> {
    if cancel.is_cancelled() {
        return Err(ScanError::Cancelled);
    }
    Ok(())
}

fn tool_failure(err: ToolError) -> ScanError {
    match err {
        ToolError::Cancelled { .. } => ScanError::Cancelled,
        other => ScanError::Tool(other),
    }
}

async fn write_instances(path: &Path, instances: &[AssetInstance]) -> Result<(), ScanError> {
    let mut out = String::new();
    for instance in instances {
        out.push_str(&serde_json::to_string(instance)?);
        out.push('\n');
    }
    tokio::fs::write(path, out).await?;
    Ok(())
}
