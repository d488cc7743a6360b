//! Storage traits and error types

use crate::storage::{AssetRecord, ScanMeta, ScanStamp, ScanSummary, SiteDeletion, SiteRow};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Scan {scan_id} for {site_url} is older than the site's latest recorded scan")]
    StaleScan { site_url: String, scan_id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for asset store implementations
///
/// Writes take `&mut self`; callers share one store behind a mutex.
pub trait AssetStore {
    /// Replaces every asset row of a site and records the scan in scan_meta
    ///
    /// Runs in one transaction: on any failure the site's previous rows are
    /// left untouched. A scan that started before the site's latest recorded
    /// scan is rejected with [`StorageError::StaleScan`].
    ///
    /// # Returns
    ///
    /// The number of rows written
    fn replace_site_assets(
        &mut self,
        site_url: &str,
        stamp: &ScanStamp,
        rows: &[AssetRecord],
    ) -> StorageResult<usize>;

    /// Returns one page of a site's rows plus the site's total row count
    ///
    /// Rows are ordered by page URL, DOM path, attribute and occurrence.
    fn preview_assets(
        &self,
        site_url: &str,
        limit: u32,
        offset: u32,
    ) -> StorageResult<(Vec<AssetRecord>, u64)>;

    /// Returns every row of a site in preview order
    fn assets_for_site(&self, site_url: &str) -> StorageResult<Vec<AssetRecord>>;

    /// Computes per-type and overall aggregates for a site
    fn summary_for_site(&self, site_url: &str) -> StorageResult<ScanSummary>;

    /// Lists every site with stored rows, most recently discovered first
    fn list_scanned_sites(&self) -> StorageResult<Vec<SiteRow>>;

    /// Removes a site's rows and its scan_meta entry
    fn delete_site_data(&mut self, site_url: &str) -> StorageResult<SiteDeletion>;

    /// Gets the scan_meta entry of a site
    fn scan_meta(&self, site_url: &str) -> StorageResult<Option<ScanMeta>>;
}
