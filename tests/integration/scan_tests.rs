//! Integration tests for the scan pipeline
//!
//! The crawl and probe tools are replaced by small shell scripts that copy a
//! canned JSON-lines file to their `-o` argument. robots.txt is served by
//! wiremock.

#![cfg(unix)]

use async_trait::async_trait;
use res_scan::config::Settings;
use res_scan::jobs::{InMemoryJobRepository, JobError, JobManager};
use res_scan::scanner::{ScanOrchestrator, ScanRequest, SharedStore};
use res_scan::state::{JobStatus, ScanPhase};
use res_scan::storage::{AssetStore, SqliteStorage};
use res_scan::tools::{ResolvedTool, ToolError, ToolResolver};
use res_scan::{ResourceType, ScanError};
use serde_json::json;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Resolves tool names to fixed script paths
struct FakeResolver {
    katana: PathBuf,
    httpx: PathBuf,
}

#[async_trait]
impl ToolResolver for FakeResolver {
    async fn resolve(
        &self,
        name: &str,
        _configured_path: Option<&str>,
    ) -> Result<ResolvedTool, ToolError> {
        let path = match name {
            "katana" => self.katana.clone(),
            "httpx" => self.httpx.clone(),
            other => {
                return Err(ToolError::Resolution {
                    name: other.to_string(),
                    details: "unknown tool".to_string(),
                })
            }
        };
        Ok(ResolvedTool {
            name: name.to_string(),
            path,
            version: "test".to_string(),
        })
    }
}

/// Resolver that never finds anything
struct MissingResolver;

#[async_trait]
impl ToolResolver for MissingResolver {
    async fn resolve(
        &self,
        name: &str,
        _configured_path: Option<&str>,
    ) -> Result<ResolvedTool, ToolError> {
        Err(ToolError::Resolution {
            name: name.to_string(),
            details: "No executable candidates found.".to_string(),
        })
    }
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let script = dir.join(name);
    std::fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
    let mut perms = std::fs::metadata(&script).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&script, perms).unwrap();
    script
}

/// A tool stand-in that copies `fixture` to the path following `-o`
fn copying_tool(dir: &Path, name: &str, fixture_lines: &[String]) -> PathBuf {
    let fixture = dir.join(format!("{}.fixture", name));
    std::fs::write(&fixture, fixture_lines.join("\n")).unwrap();
    let body = format!(
        r#"out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; shift; fi
  shift
done
cat "{}" > "$out""#,
        fixture.display()
    );
    write_script(dir, name, &body)
}

fn failing_tool(dir: &Path, name: &str) -> PathBuf {
    write_script(dir, name, "echo crawl output\necho boom 1>&2\nexit 2")
}

fn page(url: &str, body: &str) -> String {
    json!({
        "request": {"method": "GET", "endpoint": url},
        "response": {
            "status_code": 200,
            "headers": {"Content-Type": "text/html; charset=utf-8"},
            "body": body
        }
    })
    .to_string()
}

struct Harness {
    dir: TempDir,
    store: SharedStore,
    orchestrator: Arc<ScanOrchestrator>,
}

impl Harness {
    fn new(katana: PathBuf, httpx: PathBuf, dir: TempDir) -> Self {
        Self::with_resolver(Arc::new(FakeResolver { katana, httpx }), dir)
    }

    fn with_resolver(resolver: Arc<dyn ToolResolver>, dir: TempDir) -> Self {
        let mut settings = Settings::default();
        settings.output.output_dir = dir.path().join("out");
        settings.output.database_path = dir.path().join("assets.sqlite");

        let storage = SqliteStorage::new(&settings.output.database_path).unwrap();
        let store: SharedStore = Arc::new(Mutex::new(storage));
        let orchestrator = Arc::new(
            ScanOrchestrator::new(Arc::new(settings), resolver, Arc::clone(&store)).unwrap(),
        );

        Self {
            dir,
            store,
            orchestrator,
        }
    }

    fn run_dir(&self, scan_id: &str) -> PathBuf {
        self.dir.path().join("out").join(scan_id)
    }
}

const HOME_BODY: &str = r#"<!doctype html><html><head><link rel="stylesheet" href="/b.css"></head>
<body><script src="/a.js"></script><div><script src="/a.js"></script></div></body></html>"#;

fn probe_line() -> String {
    json!({
        "input": "https://example.com/b.css",
        "url": "https://example.com/b.css",
        "status_code": 200,
        "content_type": "text/css",
        "content_length": 1234
    })
    .to_string()
}

#[tokio::test]
async fn test_end_to_end_scan_merges_probe_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let katana = copying_tool(
        dir.path(),
        "katana",
        &[
            page("https://example.com/", HOME_BODY),
            "this line is not json".to_string(),
            page(
                "https://example.com/about",
                r#"<html><body><img src="/logo.png"></body></html>"#,
            ),
        ],
    );
    let httpx = copying_tool(dir.path(), "httpx", &[probe_line()]);
    let harness = Harness::new(katana, httpx, dir);

    let mut request = ScanRequest::new("https://example.com/");
    request.respect_robots = false;
    let validated = request.validate().unwrap();

    let phases: Arc<Mutex<Vec<(ScanPhase, i32)>>> = Arc::default();
    let recorder = {
        let phases = Arc::clone(&phases);
        move |phase: ScanPhase, pct: i32, _message: &str| {
            phases.lock().unwrap().push((phase, pct));
        }
    };

    let outcome = harness
        .orchestrator
        .run_scan("scan-e2e", &validated, &recorder, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.site_url, "https://example.com");
    assert_eq!(outcome.instance_count, 4);
    assert_eq!(outcome.unique_assets, 3);
    assert!(outcome.stage_durations.get("total").is_some());

    let rows = harness
        .store
        .lock()
        .unwrap()
        .assets_for_site("https://example.com")
        .unwrap();
    let home: Vec<_> = rows
        .iter()
        .filter(|r| r.page_url == "https://example.com/")
        .collect();
    assert_eq!(home.len(), 3);

    let css: Vec<_> = home
        .iter()
        .filter(|r| r.resource_type == Some(ResourceType::Css))
        .collect();
    assert_eq!(css.len(), 1);
    assert_eq!(css[0].status_code, Some(200));
    assert_eq!(css[0].content_type.as_deref(), Some("text/css"));
    assert_eq!(css[0].content_length, Some(1234));

    let js: Vec<_> = home
        .iter()
        .filter(|r| r.resource_type == Some(ResourceType::Js))
        .collect();
    assert_eq!(js.len(), 2);
    assert!(js.iter().all(|r| r.status_code.is_none()
        && r.content_type.is_none()
        && r.content_length.is_none()));
    let mut ordinals: Vec<_> = js.iter().map(|r| r.attr_occurrence).collect();
    ordinals.sort();
    assert_eq!(ordinals, vec![1, 2]);
    assert_ne!(js[0].instance_key, js[1].instance_key);
    assert_ne!(js[0].dom_path, js[1].dom_path);

    // The line after the malformed one was still processed
    assert!(rows.iter().any(|r| r.asset_url == "https://example.com/logo.png"));

    let summary = &outcome.summary;
    assert_eq!(summary.by_type[0].resource_type, "css");
    assert_eq!(summary.totals.instance_count, 4);
    assert_eq!(summary.totals.unique_assets, 3);
    assert_eq!(summary.totals.total_bytes, 1234);

    let run_dir = harness.run_dir("scan-e2e");
    let asset_urls = std::fs::read_to_string(run_dir.join("asset_urls.txt")).unwrap();
    assert_eq!(
        asset_urls.lines().collect::<Vec<_>>(),
        vec![
            "https://example.com/a.js",
            "https://example.com/b.css",
            "https://example.com/logo.png"
        ]
    );
    let instances = std::fs::read_to_string(run_dir.join("instances.jsonl")).unwrap();
    assert_eq!(instances.lines().count(), 4);
    assert!(run_dir.join("katana.jsonl").exists());
    assert!(run_dir.join("httpx.jsonl").exists());

    let recorded = phases.lock().unwrap().clone();
    assert_eq!(
        recorded,
        vec![
            (ScanPhase::Validate, 5),
            (ScanPhase::Crawl, 15),
            (ScanPhase::Extract, 45),
            (ScanPhase::Probe, 70),
            (ScanPhase::Db, 90),
            (ScanPhase::Done, 100),
        ]
    );
}

#[tokio::test]
async fn test_no_assets_skips_probe_tool() {
    let dir = tempfile::tempdir().unwrap();
    let katana = copying_tool(
        dir.path(),
        "katana",
        &[page("https://example.com/", "<html><body><p>No assets</p></body></html>")],
    );
    // Would fail the scan if it were invoked
    let httpx = failing_tool(dir.path(), "httpx");
    let harness = Harness::new(katana, httpx, dir);

    let mut request = ScanRequest::new("https://example.com");
    request.respect_robots = false;
    let validated = request.validate().unwrap();

    let phases: Arc<Mutex<Vec<ScanPhase>>> = Arc::default();
    let recorder = {
        let phases = Arc::clone(&phases);
        move |phase: ScanPhase, _pct: i32, _message: &str| {
            phases.lock().unwrap().push(phase);
        }
    };

    let outcome = harness
        .orchestrator
        .run_scan("scan-empty", &validated, &recorder, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.instance_count, 0);
    assert!(!phases.lock().unwrap().contains(&ScanPhase::Probe));
    let httpx_out = harness.run_dir("scan-empty").join("httpx.jsonl");
    assert_eq!(std::fs::read_to_string(httpx_out).unwrap(), "");
    assert_eq!(outcome.summary.totals.instance_count, 0);
}

#[tokio::test]
async fn test_rescan_replaces_previous_rows() {
    let dir = tempfile::tempdir().unwrap();
    let first = copying_tool(
        dir.path(),
        "katana-first",
        &[page("https://example.com/", HOME_BODY)],
    );
    let second = copying_tool(
        dir.path(),
        "katana-second",
        &[page(
            "https://example.com/",
            r#"<html><body><img src="/only.png"></body></html>"#,
        )],
    );
    let httpx = copying_tool(dir.path(), "httpx", &[probe_line()]);

    let mut request = ScanRequest::new("https://example.com");
    request.respect_robots = false;
    let validated = request.validate().unwrap();
    let noop = |_: ScanPhase, _: i32, _: &str| {};

    let harness = Harness::new(first, httpx.clone(), dir);
    harness
        .orchestrator
        .run_scan("scan-1", &validated, &noop, &CancellationToken::new())
        .await
        .unwrap();

    let rescan = ScanOrchestrator::new(
        Arc::new({
            let mut settings = Settings::default();
            settings.output.output_dir = harness.dir.path().join("out");
            settings.output.database_path = harness.dir.path().join("assets.sqlite");
            settings
        }),
        Arc::new(FakeResolver {
            katana: second,
            httpx,
        }),
        Arc::clone(&harness.store),
    )
    .unwrap();
    rescan
        .run_scan("scan-2", &validated, &noop, &CancellationToken::new())
        .await
        .unwrap();

    let store = harness.store.lock().unwrap();
    let rows = store.assets_for_site("https://example.com").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].asset_url, "https://example.com/only.png");
    assert_eq!(rows[0].scan_id, "scan-2");
    let meta = store.scan_meta("https://example.com").unwrap().unwrap();
    assert_eq!(meta.last_scan_id, "scan-2");
    assert_eq!(meta.table_version, res_scan::extract::tables::TABLE_VERSION);
}

async fn robots_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private"),
        )
        .mount(&server)
        .await;
    server
}

async fn scan_with_robots(respect_robots: bool) -> Vec<String> {
    let server = robots_server().await;
    let base = server.uri();
    let body = r#"<html><body><script src="/app.js"></script></body></html>"#;

    let dir = tempfile::tempdir().unwrap();
    let katana = copying_tool(
        dir.path(),
        "katana",
        &[
            page(&format!("{}/private/page", base), body),
            page(&format!("{}/public", base), body),
        ],
    );
    let httpx = copying_tool(dir.path(), "httpx", &[]);
    let harness = Harness::new(katana, httpx, dir);

    let mut request = ScanRequest::new(base.clone());
    request.respect_robots = respect_robots;
    let validated = request.validate().unwrap();

    let outcome = harness
        .orchestrator
        .run_scan(
            "scan-robots",
            &validated,
            &|_: ScanPhase, _: i32, _: &str| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let mut pages: Vec<String> = harness
        .store
        .lock()
        .unwrap()
        .assets_for_site(&outcome.site_url)
        .unwrap()
        .into_iter()
        .map(|r| r.page_url)
        .collect();
    pages.sort();
    pages.dedup();
    pages
        .into_iter()
        .map(|p| p.trim_start_matches(&base).to_string())
        .collect()
}

#[tokio::test]
async fn test_robots_gate_enabled_skips_disallowed_pages() {
    assert_eq!(scan_with_robots(true).await, vec!["/public"]);
}

#[tokio::test]
async fn test_robots_gate_disabled_allows_disallowed_pages() {
    assert_eq!(
        scan_with_robots(false).await,
        vec!["/private/page", "/public"]
    );
}

#[tokio::test]
async fn test_robots_fetch_failure_allows_all() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let base = server.uri();

    let dir = tempfile::tempdir().unwrap();
    let katana = copying_tool(
        dir.path(),
        "katana",
        &[page(
            &format!("{}/private/page", base),
            r#"<html><body><script src="/app.js"></script></body></html>"#,
        )],
    );
    let httpx = copying_tool(dir.path(), "httpx", &[]);
    let harness = Harness::new(katana, httpx, dir);

    let validated = ScanRequest::new(base).validate().unwrap();
    let outcome = harness
        .orchestrator
        .run_scan(
            "scan-robots-500",
            &validated,
            &|_: ScanPhase, _: i32, _: &str| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.instance_count, 1);
}

#[tokio::test]
async fn test_crawl_tool_failure_leaves_store_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let katana = failing_tool(dir.path(), "katana");
    let httpx = copying_tool(dir.path(), "httpx", &[]);
    let harness = Harness::new(katana, httpx, dir);

    let mut request = ScanRequest::new("https://example.com");
    request.respect_robots = false;
    let validated = request.validate().unwrap();

    let err = harness
        .orchestrator
        .run_scan(
            "scan-fail",
            &validated,
            &|_: ScanPhase, _: i32, _: &str| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    match err {
        ScanError::Tool(ToolError::Failed {
            label,
            code,
            stdout,
            stderr,
        }) => {
            assert_eq!(label, "katana");
            assert_eq!(code, 2);
            assert!(stdout.contains("crawl output"));
            assert!(stderr.contains("boom"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let store = harness.store.lock().unwrap();
    assert!(store.list_scanned_sites().unwrap().is_empty());
    assert!(store.scan_meta("https://example.com").unwrap().is_none());
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let dir = tempfile::tempdir().unwrap();
    let katana = copying_tool(dir.path(), "katana", &[]);
    let httpx = copying_tool(dir.path(), "httpx", &[]);
    let harness = Harness::new(katana, httpx, dir);

    let validated = ScanRequest::new("https://example.com").validate().unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = harness
        .orchestrator
        .run_scan("scan-cancel", &validated, &|_: ScanPhase, _: i32, _: &str| {}, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, ScanError::Cancelled));
}

async fn wait_for_terminal(manager: &JobManager, job_id: &str) -> res_scan::JobState {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(20);
    loop {
        let state = manager.get(job_id).expect("job should exist");
        if state.status.is_terminal() {
            return state;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job did not finish in time"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

#[tokio::test]
async fn test_job_manager_runs_scan_to_done() {
    let dir = tempfile::tempdir().unwrap();
    let katana = copying_tool(
        dir.path(),
        "katana",
        &[page("https://example.com/", HOME_BODY)],
    );
    let httpx = copying_tool(dir.path(), "httpx", &[probe_line()]);
    let harness = Harness::new(katana, httpx, dir);

    let manager = JobManager::new(
        Arc::clone(&harness.orchestrator),
        Arc::new(InMemoryJobRepository::new()),
        1,
        4,
    );

    let mut request = ScanRequest::new("https://example.com/");
    request.respect_robots = false;
    let job_id = manager.start(&request).unwrap();
    assert_eq!(job_id.len(), 32);

    let state = wait_for_terminal(&manager, &job_id).await;
    assert_eq!(state.status, JobStatus::Done);
    assert_eq!(state.phase, ScanPhase::Done);
    assert_eq!(state.progress_pct, 100);
    assert_eq!(state.site_url.as_deref(), Some("https://example.com"));
    assert_eq!(state.summary.unwrap().totals.instance_count, 3);
    let timings = state.stage_durations.expect("finished job keeps its timings");
    assert!(timings.get("crawl").is_some());
    assert!(timings.get("total").is_some());
    assert!(state.started_at.is_some());
    assert!(state.finished_at.is_some());
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_job_manager_records_failure() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::with_resolver(Arc::new(MissingResolver), dir);

    let manager = JobManager::new(
        Arc::clone(&harness.orchestrator),
        Arc::new(InMemoryJobRepository::new()),
        1,
        4,
    );

    let job_id = manager.start(&ScanRequest::new("https://example.com")).unwrap();
    let state = wait_for_terminal(&manager, &job_id).await;

    assert_eq!(state.status, JobStatus::Failed);
    assert!(state.summary.is_none());
    let error = state.error.unwrap();
    assert!(error.contains("Unable to validate 'katana'"));
}

#[tokio::test]
async fn test_job_manager_rejects_invalid_request_without_entry() {
    let dir = tempfile::tempdir().unwrap();
    let harness = Harness::with_resolver(Arc::new(MissingResolver), dir);
    let manager = JobManager::new(
        Arc::clone(&harness.orchestrator),
        Arc::new(InMemoryJobRepository::new()),
        1,
        4,
    );

    let mut request = ScanRequest::new("https://example.com");
    request.depth = 0;
    assert!(manager.start(&request).is_err());
    assert!(manager.start(&ScanRequest::new("ftp://example.com")).is_err());
    assert!(manager.list().is_empty());
}

#[tokio::test]
async fn test_job_manager_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let katana = write_script(dir.path(), "katana", "sleep 10");
    let httpx = copying_tool(dir.path(), "httpx", &[]);
    let harness = Harness::new(katana, httpx, dir);

    let manager = JobManager::new(
        Arc::clone(&harness.orchestrator),
        Arc::new(InMemoryJobRepository::new()),
        1,
        4,
    );

    let mut request = ScanRequest::new("https://example.com");
    request.respect_robots = false;
    let job_id = manager.start(&request).unwrap();

    // Wait until the crawl tool is running
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while manager.get(&job_id).unwrap().phase != ScanPhase::Crawl {
        assert!(tokio::time::Instant::now() < deadline, "crawl never started");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert!(manager.cancel(&job_id));
    let state = wait_for_terminal(&manager, &job_id).await;
    assert_eq!(state.status, JobStatus::Failed);
    assert_eq!(state.error.as_deref(), Some("Scan cancelled"));
    assert!(!manager.cancel("unknown-job"));
}

#[tokio::test]
async fn test_job_manager_rejects_when_queue_is_full() {
    let dir = tempfile::tempdir().unwrap();
    let katana = write_script(dir.path(), "katana", "sleep 10");
    let httpx = copying_tool(dir.path(), "httpx", &[]);
    let harness = Harness::new(katana, httpx, dir);

    let manager = JobManager::new(
        Arc::clone(&harness.orchestrator),
        Arc::new(InMemoryJobRepository::new()),
        1,
        1,
    );

    let mut request = ScanRequest::new("https://example.com");
    request.respect_robots = false;

    // The only worker is busy crawling the first job
    let running = manager.start(&request).unwrap();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while manager.get(&running).unwrap().phase != ScanPhase::Crawl {
        assert!(tokio::time::Instant::now() < deadline, "crawl never started");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    // The second job takes the single queue slot
    let waiting = manager.start(&request).unwrap();
    assert_eq!(manager.get(&waiting).unwrap().status, JobStatus::Queued);

    let rejected = manager.start(&request);
    assert!(matches!(rejected, Err(JobError::QueueFull)));
    assert_eq!(manager.list().len(), 2);

    assert!(manager.cancel(&running));
    assert!(manager.cancel(&waiting));
    assert_eq!(
        wait_for_terminal(&manager, &waiting).await.status,
        JobStatus::Failed
    );
}
