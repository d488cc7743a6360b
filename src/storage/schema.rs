//! Database schema definitions
//!
//! This module contains the SQL schema for the asset inventory database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per surviving asset instance of the latest scan of each site
CREATE TABLE IF NOT EXISTS assets (
    instance_key TEXT PRIMARY KEY,
    site_url TEXT NOT NULL,
    page_url TEXT NOT NULL,
    asset_url TEXT NOT NULL,
    dom_path TEXT NOT NULL,
    asset_attr TEXT NOT NULL,
    attr_occurrence INTEGER NOT NULL,
    resource_type TEXT,
    status_code INTEGER,
    content_type TEXT,
    content_length INTEGER,
    scan_id TEXT NOT NULL,
    discovered_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_assets_site ON assets(site_url);
CREATE INDEX IF NOT EXISTS idx_assets_site_page ON assets(site_url, page_url);

-- Latest scan per site
CREATE TABLE IF NOT EXISTS scan_meta (
    site_url TEXT PRIMARY KEY,
    last_scan_id TEXT NOT NULL,
    last_scan_started_at TEXT NOT NULL,
    last_scanned_at TEXT NOT NULL,
    last_status TEXT NOT NULL,
    table_version INTEGER NOT NULL
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
