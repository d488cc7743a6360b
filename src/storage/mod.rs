//! Storage module for persisting scan results
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Wholesale replacement of a site's asset rows per scan
//! - Preview, listing, summary and deletion queries

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{AssetStore, StorageError, StorageResult};

use crate::extract::ResourceType;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file; parent directories are created
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Formats a timestamp the way every stored timestamp is formatted
///
/// A fixed precision keeps lexical and chronological order identical.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Represents a persisted asset instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRecord {
    pub instance_key: String,
    pub site_url: String,
    pub page_url: String,
    pub asset_url: String,
    pub dom_path: String,
    pub asset_attr: String,
    pub attr_occurrence: u32,
    pub resource_type: Option<ResourceType>,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub content_length: Option<i64>,
    pub scan_id: String,
    pub discovered_at: String,
}

/// Identifies the scan performing a write
#[derive(Debug, Clone)]
pub struct ScanStamp {
    pub scan_id: String,
    pub started_at: DateTime<Utc>,
}

impl ScanStamp {
    pub fn new(scan_id: impl Into<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            scan_id: scan_id.into(),
            started_at,
        }
    }
}

/// Represents the latest scan of a site
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanMeta {
    pub site_url: String,
    pub last_scan_id: String,
    pub last_scan_started_at: String,
    pub last_scanned_at: String,
    pub last_status: String,
    /// Extraction table revision the stored rows were produced with
    pub table_version: u32,
}

/// One entry of the scanned-site listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteRow {
    pub site_url: String,
    /// Host plus any explicit port
    pub site_name: String,
    pub resource_rows: u64,
    pub scanned_at: Option<String>,
}

/// What a site deletion removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SiteDeletion {
    pub removed_assets: u64,
    pub removed_meta: bool,
}

impl SiteDeletion {
    /// Returns true if the site was unknown to the store
    pub fn is_empty(&self) -> bool {
        self.removed_assets == 0 && !self.removed_meta
    }
}

/// Aggregates for one resource type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeSummary {
    /// Resource type name, or `unknown` for rows without one
    pub resource_type: String,
    pub instance_count: u64,
    pub total_bytes: u64,
}

/// Aggregates over all of a site's rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SummaryTotals {
    pub instance_count: u64,
    pub unique_assets: u64,
    pub total_bytes: u64,
}

/// Per-type and overall aggregates of a site's rows
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ScanSummary {
    /// Ordered by total bytes, then instance count, both descending
    pub by_type: Vec<TypeSummary>,
    pub totals: SummaryTotals,
}
