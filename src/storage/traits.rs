use crate::extract::Record;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Storage-specific errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("State store lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persisted per-job progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobState {
    pub job: String,
    /// Where the next run resumes; `None` once a job finished naturally
    pub last_cursor: Option<String>,
    pub last_run: Option<DateTime<Utc>>,
}

/// A URL that failed for a job, with how often it has failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUrl {
    pub job: String,
    pub url: String,
    pub error_message: String,
    pub retry_count: u32,
    pub last_attempt: DateTime<Utc>,
}

/// A stored item with its sighting timestamps
#[derive(Debug, Clone, PartialEq)]
pub struct StoredItem {
    pub job: String,
    pub id: String,
    pub payload: serde_json::Value,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Trait for job state backends
///
/// Writes take `&mut self`; share a store across tasks behind
/// `Arc<std::sync::Mutex<_>>`.
pub trait StateStore {
    // ===== Items =====

    /// Inserts new items and refreshes existing ones in one transaction
    ///
    /// Records without an `id` field are skipped.
    ///
    /// # Returns
    ///
    /// The number of items that were not stored before
    fn upsert_items(&mut self, job: &str, records: &[Record]) -> StorageResult<usize>;

    fn get_item(&self, job: &str, id: &str) -> StorageResult<Option<StoredItem>>;

    fn count_items(&self, job: &str) -> StorageResult<u64>;

    // ===== Failures =====

    /// Records a failure, incrementing the count for a repeated (job, url)
    fn record_failed_url(&mut self, job: &str, url: &str, error: &str) -> StorageResult<()>;

    /// Failures for `job`, most recent attempt first
    fn failed_urls(&self, job: &str) -> StorageResult<Vec<FailedUrl>>;

    fn clear_failed_url(&mut self, job: &str, url: &str) -> StorageResult<bool>;

    // ===== Cursor =====

    /// Stores (or clears, with `None`) the resume cursor and stamps `last_run`
    fn save_cursor(&mut self, job: &str, cursor: Option<&str>) -> StorageResult<()>;

    fn load_cursor(&self, job: &str) -> StorageResult<Option<String>>;

    fn job_state(&self, job: &str) -> StorageResult<Option<JobState>>;
}
