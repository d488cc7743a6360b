//! Output module for presenting scan results on the terminal
//!
//! This module handles:
//! - Per-type summaries of a scanned site
//! - Scanned-site listings and asset previews
//! - Job status lines

mod report;

pub use report::{
    format_bytes, print_assets, print_job_state, print_sites, print_summary, render_assets,
    render_job_state, render_sites, render_summary,
};
