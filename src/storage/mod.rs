//! Storage module for persisting job state
//!
//! This module handles all database operations for crawl jobs, including:
//! - SQLite database initialization and schema management
//! - Item upserts keyed by caller-supplied ids
//! - Failed-URL bookkeeping with retry counts
//! - Resume cursors per job

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStateStore;
pub use traits::{FailedUrl, JobState, StateStore, StorageError, StorageResult, StoredItem};
