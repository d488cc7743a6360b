//! Plain-text rendering of scan results

use crate::state::JobState;
use crate::storage::{AssetRecord, ScanSummary, SiteRow};
use std::fmt::Write;

/// Formats a byte count with a binary unit
///
/// # Example
///
/// ```
/// use res_scan::output::format_bytes;
///
/// assert_eq!(format_bytes(512), "512 B");
/// assert_eq!(format_bytes(1536), "1.5 KiB");
/// ```
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Renders the per-type summary of a site
pub fn render_summary(site_url: &str, summary: &ScanSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Asset Summary: {} ===\n", site_url);

    if summary.by_type.is_empty() {
        let _ = writeln!(out, "No assets recorded.");
        return out;
    }

    let _ = writeln!(out, "{:<10} {:>10} {:>12}", "Type", "Instances", "Bytes");
    for row in &summary.by_type {
        let _ = writeln!(
            out,
            "{:<10} {:>10} {:>12}",
            row.resource_type,
            row.instance_count,
            format_bytes(row.total_bytes)
        );
    }

    let totals = &summary.totals;
    let _ = writeln!(
        out,
        "\nTotal: {} instances of {} unique assets, {}",
        totals.instance_count,
        totals.unique_assets,
        format_bytes(totals.total_bytes)
    );
    out
}

/// Renders the scanned-site listing
pub fn render_sites(sites: &[SiteRow]) -> String {
    let mut out = String::new();
    if sites.is_empty() {
        let _ = writeln!(out, "No scanned sites.");
        return out;
    }

    let _ = writeln!(out, "Scanned Sites ({}):", sites.len());
    for site in sites {
        let _ = writeln!(
            out,
            "  - {} ({}): {} rows, last discovered {}",
            site.site_name,
            site.site_url,
            site.resource_rows,
            site.scanned_at.as_deref().unwrap_or("-")
        );
    }
    out
}

/// Renders one page of asset rows
pub fn render_assets(rows: &[AssetRecord], total: u64, offset: u32) -> String {
    let mut out = String::new();
    let first = if rows.is_empty() { 0 } else { offset as u64 + 1 };
    let _ = writeln!(
        out,
        "Showing {}-{} of {} rows",
        first,
        offset as u64 + rows.len() as u64,
        total
    );

    for row in rows {
        let status = row
            .status_code
            .map(|code| code.to_string())
            .unwrap_or_else(|| "-".to_string());
        let size = row
            .content_length
            .map(|len| format_bytes(len.max(0) as u64))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "[{}] {} {} {}",
            row.resource_type.map_or("unknown", |t| t.as_str()),
            status,
            size,
            row.asset_url
        );
        let _ = writeln!(
            out,
            "    on {} at {} @{}#{}",
            row.page_url, row.dom_path, row.asset_attr, row.attr_occurrence
        );
    }
    out
}

/// Renders a one-line job status
pub fn render_job_state(state: &JobState) -> String {
    let mut line = format!(
        "[{}] {} {:>3}% {}",
        state.status, state.phase, state.progress_pct, state.message
    );
    if let Some(error) = &state.error {
        let _ = write!(line, ": {}", error);
    }
    if let Some(timings) = &state.stage_durations {
        let _ = write!(line, "\n  timings: {}", timings);
    }
    line
}

pub fn print_summary(site_url: &str, summary: &ScanSummary) {
    print!("{}", render_summary(site_url, summary));
}

pub fn print_sites(sites: &[SiteRow]) {
    print!("{}", render_sites(sites));
}

pub fn print_assets(rows: &[AssetRecord], total: u64, offset: u32) {
    print!("{}", render_assets(rows, total, offset));
}

pub fn print_job_state(state: &JobState) {
    println!("{}", render_job_state(state));
}
