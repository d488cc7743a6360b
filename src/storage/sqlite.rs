//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the AssetStore trait.

use crate::extract::tables::TABLE_VERSION;
use crate::extract::ResourceType;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{AssetStore, StorageError, StorageResult};
use crate::storage::{
    format_timestamp, AssetRecord, ScanMeta, ScanStamp, ScanSummary, SiteDeletion, SiteRow,
    SummaryTotals, TypeSummary,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use url::Url;

const ASSET_COLUMNS: &str = "instance_key, site_url, page_url, asset_url, dom_path, asset_attr, \
     attr_occurrence, resource_type, status_code, content_type, content_length, scan_id, \
     discovered_at";

const PREVIEW_ORDER: &str = "ORDER BY page_url, dom_path, asset_attr, attr_occurrence";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn count_site_rows(&self, site_url: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM assets WHERE site_url = ?1",
            params![site_url],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl AssetStore for SqliteStorage {
    fn replace_site_assets(
        &mut self,
        site_url: &str,
        stamp: &ScanStamp,
        rows: &[AssetRecord],
    ) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;

        let recorded: Option<String> = tx
            .query_row(
                "SELECT last_scan_started_at FROM scan_meta WHERE site_url = ?1",
                params![site_url],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(recorded) = recorded {
            let recorded = parse_timestamp(&recorded)?;
            if recorded > stamp.started_at {
                return Err(StorageError::StaleScan {
                    site_url: site_url.to_string(),
                    scan_id: stamp.scan_id.clone(),
                });
            }
        }

        tx.execute("DELETE FROM assets WHERE site_url = ?1", params![site_url])?;

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO assets ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                ASSET_COLUMNS
            ))?;

            for row in rows {
                stmt.execute(params![
                    row.instance_key,
                    row.site_url,
                    row.page_url,
                    row.asset_url,
                    row.dom_path,
                    row.asset_attr,
                    row.attr_occurrence,
                    row.resource_type.map(|t| t.as_str()),
                    row.status_code,
                    row.content_type,
                    row.content_length,
                    stamp.scan_id,
                    row.discovered_at,
                ])?;
            }
        }

        let now = format_timestamp(Utc::now());
        tx.execute(
            "INSERT INTO scan_meta (site_url, last_scan_id, last_scan_started_at, last_scanned_at, last_status, table_version)
             VALUES (?1, ?2, ?3, ?4, 'done', ?5)
             ON CONFLICT(site_url) DO UPDATE SET
                last_scan_id = excluded.last_scan_id,
                last_scan_started_at = excluded.last_scan_started_at,
                last_scanned_at = excluded.last_scanned_at,
                last_status = excluded.last_status,
                table_version = excluded.table_version",
            params![
                site_url,
                stamp.scan_id,
                format_timestamp(stamp.started_at),
                now,
                TABLE_VERSION
            ],
        )?;

        tx.commit()?;

        tracing::debug!("Stored {} rows for {}", rows.len(), site_url);
        Ok(rows.len())
    }

    fn preview_assets(
        &self,
        site_url: &str,
        limit: u32,
        offset: u32,
    ) -> StorageResult<(Vec<AssetRecord>, u64)> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM assets WHERE site_url = ?1 {} LIMIT ?2 OFFSET ?3",
            ASSET_COLUMNS, PREVIEW_ORDER
        ))?;

        let rows = stmt
            .query_map(params![site_url, limit, offset], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        let total = self.count_site_rows(site_url)?;
        Ok((rows, total))
    }

    fn assets_for_site(&self, site_url: &str) -> StorageResult<Vec<AssetRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM assets WHERE site_url = ?1 {}",
            ASSET_COLUMNS, PREVIEW_ORDER
        ))?;

        let rows = stmt
            .query_map(params![site_url], row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn summary_for_site(&self, site_url: &str) -> StorageResult<ScanSummary> {
        let mut stmt = self.conn.prepare(
            "SELECT
                COALESCE(resource_type, 'unknown') AS rtype,
                COUNT(*) AS instance_count,
                SUM(COALESCE(content_length, 0)) AS total_bytes
             FROM assets
             WHERE site_url = ?1
             GROUP BY rtype
             ORDER BY total_bytes DESC, instance_count DESC, rtype ASC",
        )?;

        let by_type = stmt
            .query_map(params![site_url], |row| {
                Ok(TypeSummary {
                    resource_type: row.get(0)?,
                    instance_count: row.get::<_, i64>(1)? as u64,
                    total_bytes: row.get::<_, Option<i64>>(2)?.unwrap_or(0).max(0) as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let totals = self.conn.query_row(
            "SELECT
                COUNT(*),
                COUNT(DISTINCT asset_url),
                SUM(COALESCE(content_length, 0))
             FROM assets
             WHERE site_url = ?1",
            params![site_url],
            |row| {
                Ok(SummaryTotals {
                    instance_count: row.get::<_, i64>(0)? as u64,
                    unique_assets: row.get::<_, i64>(1)? as u64,
                    total_bytes: row.get::<_, Option<i64>>(2)?.unwrap_or(0).max(0) as u64,
                })
            },
        )?;

        Ok(ScanSummary { by_type, totals })
    }

    fn list_scanned_sites(&self) -> StorageResult<Vec<SiteRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT site_url, COUNT(*) AS resource_rows, MAX(discovered_at) AS scanned_at
             FROM assets
             GROUP BY site_url
             ORDER BY scanned_at DESC, site_url ASC",
        )?;

        let sites = stmt
            .query_map([], |row| {
                let site_url: String = row.get(0)?;
                Ok(SiteRow {
                    site_name: site_name(&site_url),
                    site_url,
                    resource_rows: row.get::<_, i64>(1)? as u64,
                    scanned_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sites)
    }

    fn delete_site_data(&mut self, site_url: &str) -> StorageResult<SiteDeletion> {
        let tx = self.conn.transaction()?;
        let removed_assets =
            tx.execute("DELETE FROM assets WHERE site_url = ?1", params![site_url])?;
        let removed_meta =
            tx.execute("DELETE FROM scan_meta WHERE site_url = ?1", params![site_url])?;
        tx.commit()?;

        Ok(SiteDeletion {
            removed_assets: removed_assets as u64,
            removed_meta: removed_meta > 0,
        })
    }

    fn scan_meta(&self, site_url: &str) -> StorageResult<Option<ScanMeta>> {
        let meta = self
            .conn
            .query_row(
                "SELECT site_url, last_scan_id, last_scan_started_at, last_scanned_at, last_status,
                        table_version
                 FROM scan_meta WHERE site_url = ?1",
                params![site_url],
                |row| {
                    Ok(ScanMeta {
                        site_url: row.get(0)?,
                        last_scan_id: row.get(1)?,
                        last_scan_started_at: row.get(2)?,
                        last_scanned_at: row.get(3)?,
                        last_status: row.get(4)?,
                        table_version: row.get(5)?,
                    })
                },
            )
            .optional()?;

        Ok(meta)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<AssetRecord> {
    let resource_type: Option<String> = row.get(7)?;
    Ok(AssetRecord {
        instance_key: row.get(0)?,
        site_url: row.get(1)?,
        page_url: row.get(2)?,
        asset_url: row.get(3)?,
        dom_path: row.get(4)?,
        asset_attr: row.get(5)?,
        attr_occurrence: row.get(6)?,
        resource_type: resource_type.as_deref().and_then(ResourceType::from_db_string),
        status_code: row.get(8)?,
        content_type: row.get(9)?,
        content_length: row.get(10)?,
        scan_id: row.get(11)?,
        discovered_at: row.get(12)?,
    })
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::Database(format!("invalid timestamp {:?}: {}", value, e)))
}

/// Host plus any explicit port, or the URL itself when it has no host
fn site_name(site_url: &str) -> String {
    match Url::parse(site_url) {
        Ok(url) => match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            _ => site_url.to_string(),
        },
        Err(_) => site_url.to_string(),
    }
}
