//! res-scan main entry point
//!
//! This is the command-line interface for the res-scan static resource inventory.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use res_scan::config::{load_settings, Settings};
use res_scan::jobs::{InMemoryJobRepository, JobManager};
use res_scan::output::{print_assets, print_job_state, print_sites, print_summary};
use res_scan::scanner::{ScanOrchestrator, ScanRequest, SharedStore};
use res_scan::storage::{open_storage, AssetStore, SqliteStorage};
use res_scan::tools::{ProjectDiscoveryResolver, ToolResolver, HTTPX, KATANA};
use res_scan::{normalize_site_origin, JobStatus, ResourceType};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// res-scan: inventory the static resources a site references
///
/// Crawls a site with katana, extracts every script, stylesheet, image, font,
/// media and document reference from its HTML, probes each unique resource
/// with httpx and stores the result in SQLite.
#[derive(Parser, Debug)]
#[command(name = "res-scan")]
#[command(version)]
#[command(about = "Static resource inventory for crawled sites", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a site and store its asset inventory
    Scan(ScanArgs),

    /// List scanned sites
    Sites,

    /// Show stored asset rows of a site
    Assets {
        /// Site origin, e.g. https://example.com
        site_url: String,

        #[arg(long, default_value_t = 50)]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Delete every stored row of a site
    Delete {
        /// Site origin, e.g. https://example.com
        site_url: String,
    },

    /// Check that katana and httpx can be found and validated
    Tools,
}

#[derive(clap::Args, Debug)]
struct ScanArgs {
    /// Start URL of the crawl
    base_url: String,

    /// Only record these resource types (repeatable)
    #[arg(long = "type", value_name = "TYPE")]
    types: Vec<ResourceType>,

    /// Crawl depth (1-12)
    #[arg(long, default_value_t = 4)]
    depth: u32,

    /// Only record asset URLs matching this regex
    #[arg(long)]
    include: Option<String>,

    /// Skip asset URLs matching this regex
    #[arg(long)]
    exclude: Option<String>,

    /// Maximum number of distinct pages to extract (1-200000)
    #[arg(long, default_value_t = 5000)]
    max_pages: u32,

    /// Per-request timeout of the external tools in seconds (1-180)
    #[arg(long, default_value_t = 20)]
    timeout: u32,

    /// Do not follow redirects while crawling or probing
    #[arg(long)]
    no_follow_redirects: bool,

    /// Process pages even when robots.txt disallows them
    #[arg(long)]
    ignore_robots: bool,

    /// Print the final job state as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let settings = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            load_settings(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?
        }
        None => Settings::default(),
    };

    match cli.command {
        Command::Scan(args) => handle_scan(settings, args).await,
        Command::Sites => handle_sites(&settings),
        Command::Assets {
            site_url,
            limit,
            offset,
        } => handle_assets(&settings, &site_url, limit, offset),
        Command::Delete { site_url } => handle_delete(&settings, &site_url),
        Command::Tools => handle_tools(&settings).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("res_scan=info,warn"),
            1 => EnvFilter::new("res_scan=debug,info"),
            2 => EnvFilter::new("res_scan=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

fn open_store(settings: &Settings) -> anyhow::Result<SqliteStorage> {
    open_storage(&settings.output.database_path).with_context(|| {
        format!(
            "Failed to open database {}",
            settings.output.database_path.display()
        )
    })
}

/// Site arguments are normalized the same way scans normalize their origin
fn site_key(site_url: &str) -> String {
    normalize_site_origin(site_url).unwrap_or_else(|| site_url.trim().to_string())
}

/// Handles the scan subcommand: runs one job and waits for it
async fn handle_scan(settings: Settings, args: ScanArgs) -> anyhow::Result<()> {
    let request = ScanRequest {
        base_url: args.base_url,
        resource_types: (!args.types.is_empty()).then_some(args.types),
        depth: args.depth,
        include_regex: args.include,
        exclude_regex: args.exclude,
        max_pages: args.max_pages,
        timeout_seconds: args.timeout,
        follow_redirects: !args.no_follow_redirects,
        respect_robots: !args.ignore_robots,
    };

    let settings = Arc::new(settings);
    let store: SharedStore = Arc::new(Mutex::new(open_store(&settings)?));
    let resolver = Arc::new(ProjectDiscoveryResolver::new(Duration::from_secs(
        settings.tools.version_timeout_secs,
    )));
    let orchestrator = Arc::new(ScanOrchestrator::new(
        Arc::clone(&settings),
        resolver,
        store,
    )?);
    let manager = JobManager::new(
        orchestrator,
        Arc::new(InMemoryJobRepository::new()),
        settings.jobs.workers,
        settings.jobs.queue_capacity,
    );

    let job_id = manager.start(&request)?;
    tracing::info!("Started job {}", job_id);

    let mut interval = tokio::time::interval(Duration::from_millis(250));
    let mut cancel_requested = false;
    let state = loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c(), if !cancel_requested => {
                tracing::warn!("Interrupt received, cancelling scan");
                manager.cancel(&job_id);
                cancel_requested = true;
            }
        }

        let Some(state) = manager.get(&job_id) else {
            bail!("Job {} disappeared", job_id);
        };
        if state.status.is_terminal() {
            break state;
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        print_job_state(&state);
        if let (Some(site_url), Some(summary)) = (&state.site_url, &state.summary) {
            println!();
            print_summary(site_url, summary);
        }
    }

    if state.status == JobStatus::Failed {
        bail!(
            "Scan failed: {}",
            state.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}

/// Handles the sites subcommand
fn handle_sites(settings: &Settings) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    print_sites(&store.list_scanned_sites()?);
    Ok(())
}

/// Handles the assets subcommand
fn handle_assets(settings: &Settings, site_url: &str, limit: u32, offset: u32) -> anyhow::Result<()> {
    let store = open_store(settings)?;
    let site = site_key(site_url);
    let (rows, total) = store.preview_assets(&site, limit, offset)?;
    if total == 0 {
        bail!("No stored assets for {}", site);
    }
    print_assets(&rows, total, offset);
    Ok(())
}

/// Handles the delete subcommand
fn handle_delete(settings: &Settings, site_url: &str) -> anyhow::Result<()> {
    let mut store = open_store(settings)?;
    let site = site_key(site_url);
    let removed = store.delete_site_data(&site)?;

    if removed.is_empty() {
        bail!("No data stored for {}", site);
    }

    println!(
        "Removed {} asset rows for {}{}",
        removed.removed_assets,
        site,
        if removed.removed_meta {
            " and its scan metadata"
        } else {
            ""
        }
    );
    Ok(())
}

/// Handles the tools subcommand
async fn handle_tools(settings: &Settings) -> anyhow::Result<()> {
    let resolver =
        ProjectDiscoveryResolver::new(Duration::from_secs(settings.tools.version_timeout_secs));
    let mut failures = 0;

    for (name, configured) in [
        (KATANA, settings.tools.katana_path.as_deref()),
        (HTTPX, settings.tools.httpx_path.as_deref()),
    ] {
        match resolver.resolve(name, configured).await {
            Ok(tool) => println!("✓ {} {} at {}", tool.name, tool.version, tool.path.display()),
            Err(e) => {
                failures += 1;
                println!("✗ {}", e);
            }
        }
    }

    if failures > 0 {
        bail!("{} tool(s) could not be validated", failures);
    }
    Ok(())
}
