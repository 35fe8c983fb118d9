//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the StateStore trait.

use crate::extract::Record;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{FailedUrl, JobState, StateStore, StorageError, StorageResult, StoredItem};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite state store backend
pub struct SqliteStateStore {
    conn: Connection,
}

impl SqliteStateStore {
    /// Opens or creates the store at `path`, creating parent directories
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStateStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
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
}

fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::Serialization(format!("Bad timestamp '{}': {}", raw, e)))
}

impl StateStore for SqliteStateStore {
    // ===== Items =====

    fn upsert_items(&mut self, job: &str, records: &[Record]) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;
        let mut inserted = 0;
        let mut skipped = 0;

        {
            let mut insert = tx.prepare(
                "INSERT INTO items (job, id, payload_json, first_seen, last_seen)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(job, id) DO NOTHING",
            )?;
            let mut update = tx.prepare(
                "UPDATE items SET payload_json = ?3, last_seen = ?4 WHERE job = ?1 AND id = ?2",
            )?;

            for record in records {
                let Some(id) = record.id() else {
                    skipped += 1;
                    continue;
                };
                let payload = serde_json::to_string(&record.fields)?;

                if insert.execute(params![job, id, payload, now])? == 1 {
                    inserted += 1;
                } else {
                    update.execute(params![job, id, payload, now])?;
                }
            }
        }

        tx.commit()?;

        if skipped > 0 {
            tracing::debug!("Job '{}': skipped {} records without an id", job, skipped);
        }
        Ok(inserted)
    }

    fn get_item(&self, job: &str, id: &str) -> StorageResult<Option<StoredItem>> {
        let row = self
            .conn
            .query_row(
                "SELECT payload_json, first_seen, last_seen FROM items WHERE job = ?1 AND id = ?2",
                params![job, id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((payload, first_seen, last_seen)) = row else {
            return Ok(None);
        };

        Ok(Some(StoredItem {
            job: job.to_string(),
            id: id.to_string(),
            payload: serde_json::from_str(&payload)?,
            first_seen: parse_timestamp(&first_seen)?,
            last_seen: parse_timestamp(&last_seen)?,
        }))
    }

    fn count_items(&self, job: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM items WHERE job = ?1",
            params![job],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Failures =====

    fn record_failed_url(&mut self, job: &str, url: &str, error: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO failed_urls (job, url, error_message, retry_count, last_attempt)
             VALUES (?1, ?2, ?3, 1, ?4)
             ON CONFLICT(job, url) DO UPDATE SET
                error_message = excluded.error_message,
                retry_count = failed_urls.retry_count + 1,
                last_attempt = excluded.last_attempt",
            params![job, url, error, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn failed_urls(&self, job: &str) -> StorageResult<Vec<FailedUrl>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, error_message, retry_count, last_attempt FROM failed_urls
             WHERE job = ?1 ORDER BY last_attempt DESC, url",
        )?;

        let rows = stmt
            .query_map(params![job], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(url, error_message, retry_count, last_attempt)| {
                Ok(FailedUrl {
                    job: job.to_string(),
                    url,
                    error_message,
                    retry_count,
                    last_attempt: parse_timestamp(&last_attempt)?,
                })
            })
            .collect()
    }

    fn clear_failed_url(&mut self, job: &str, url: &str) -> StorageResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM failed_urls WHERE job = ?1 AND url = ?2",
            params![job, url],
        )?;
        Ok(removed > 0)
    }

    // ===== Cursor =====

    fn save_cursor(&mut self, job: &str, cursor: Option<&str>) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO jobs_state (job, last_cursor, last_run) VALUES (?1, ?2, ?3)
             ON CONFLICT(job) DO UPDATE SET
                last_cursor = excluded.last_cursor,
                last_run = excluded.last_run",
            params![job, cursor, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn load_cursor(&self, job: &str) -> StorageResult<Option<String>> {
        Ok(self.job_state(job)?.and_then(|state| state.last_cursor))
    }

    fn job_state(&self, job: &str) -> StorageResult<Option<JobState>> {
        let row = self
            .conn
            .query_row(
                "SELECT last_cursor, last_run FROM jobs_state WHERE job = ?1",
                params![job],
                |row| Ok((row.get::<_, Option<String>>(0)?, row.get::<_, Option<String>>(1)?)),
            )
            .optional()?;

        let Some((last_cursor, last_run)) = row else {
            return Ok(None);
        };

        Ok(Some(JobState {
            job: job.to_string(),
            last_cursor,
            last_run: last_run.as_deref().map(parse_timestamp).transpose()?,
        }))
    }
}
