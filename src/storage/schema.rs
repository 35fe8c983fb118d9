//! Database schema definitions for the job state store

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per job: where to resume and when it last ran
CREATE TABLE IF NOT EXISTS jobs_state (
    job TEXT PRIMARY KEY,
    last_cursor TEXT,
    last_run TEXT
);

-- Extracted items keyed by caller-supplied id
CREATE TABLE IF NOT EXISTS items (
    job TEXT NOT NULL,
    id TEXT NOT NULL,
    payload_json TEXT NOT NULL,
    first_seen TEXT NOT NULL,
    last_seen TEXT NOT NULL,
    PRIMARY KEY (job, id)
);

CREATE INDEX IF NOT EXISTS idx_items_job ON items(job);

-- URLs that failed to fetch, with attempt counts
CREATE TABLE IF NOT EXISTS failed_urls (
    job TEXT NOT NULL,
    url TEXT NOT NULL,
    error_message TEXT NOT NULL,
    retry_count INTEGER NOT NULL DEFAULT 1,
    last_attempt TEXT NOT NULL,
    PRIMARY KEY (job, url)
);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
