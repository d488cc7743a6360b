//! Scan pipeline
//!
//! This module contains:
//! - Scan request validation
//! - Streaming extraction over crawl output
//! - Probe output parsing and merging
//! - The orchestrator that runs one scan end to end

mod coordinator;
mod crawl_output;
mod probe;
mod request;
mod timings;

pub use coordinator::{
    build_http_client, merge_probe_results, ProgressFn, ScanOrchestrator, ScanOutcome,
    SharedStore, SiteLocks,
};
pub use crawl_output::{
    extract_from_crawl_output, extract_page_url, is_html_response, ExtractionContext,
    ExtractionReport,
};
pub use probe::{load_probe_map, parse_probe_output, ProbeMap, ProbeResult};
pub use request::{ScanRequest, ValidatedRequest};
pub use timings::PhaseTimings;
