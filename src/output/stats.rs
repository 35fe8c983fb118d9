//! Run and job statistics
//!
//! This module summarizes a finished run and the persisted state of a job.
//! Summaries go to stderr so stdout stays a clean record stream.

use crate::crawler::{CrawlStats, StopReason};
use crate::storage::{FailedUrl, StateStore, StorageResult};
use chrono::{DateTime, Utc};

/// What happened during one run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub schema: String,
    pub job: Option<String>,
    pub crawl: CrawlStats,

    /// Records dropped as in-stream duplicates
    pub duplicates: u64,

    /// Records the state store had not seen before
    pub new_items: Option<usize>,

    /// Records written to the output stream
    pub written: usize,
}

/// Persisted state of one job
#[derive(Debug, Clone)]
pub struct JobStatistics {
    pub job: String,
    pub total_items: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub cursor: Option<String>,
    pub failed_urls: Vec<FailedUrl>,
}

/// Loads statistics for `job` from a state store
///
/// # Arguments
///
/// * `store` - The state store to query
/// * `job` - Job name
pub fn load_job_statistics(store: &dyn StateStore, job: &str) -> StorageResult<JobStatistics> {
    let state = store.job_state(job)?;
    Ok(JobStatistics {
        job: job.to_string(),
        total_items: store.count_items(job)?,
        last_run: state.as_ref().and_then(|s| s.last_run),
        cursor: state.and_then(|s| s.last_cursor),
        failed_urls: store.failed_urls(job)?,
    })
}

pub fn format_run_summary(summary: &RunSummary) -> String {
    let mut out = String::new();
    out.push_str("=== Run Summary ===\n");
    out.push_str(&format!("  Schema: {}\n", summary.schema));
    if let Some(job) = &summary.job {
        out.push_str(&format!("  Job: {}\n", job));
    }
    out.push_str(&format!("  Pages fetched: {}\n", summary.crawl.urls_fetched));
    out.push_str(&format!("  Records extracted: {}\n", summary.crawl.items_extracted));
    out.push_str(&format!("  Duplicates dropped: {}\n", summary.duplicates));
    out.push_str(&format!("  Records written: {}\n", summary.written));
    if let Some(new_items) = summary.new_items {
        out.push_str(&format!("  New items stored: {}\n", new_items));
    }
    out.push_str(&format!("  Errors: {}\n", summary.crawl.errors));
    let stop = summary
        .crawl
        .stop_reason
        .map(|r: StopReason| r.to_string())
        .unwrap_or_else(|| "single page".to_string());
    out.push_str(&format!("  Stopped: {}\n", stop));
    out
}

pub fn print_run_summary(summary: &RunSummary) {
    eprint!("{}", format_run_summary(summary));
}

pub fn format_job_statistics(stats: &JobStatistics) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== Job '{}' ===\n", stats.job));
    out.push_str(&format!("  Stored items: {}\n", stats.total_items));
    match stats.last_run {
        Some(last_run) => out.push_str(&format!("  Last run: {}\n", last_run.to_rfc3339())),
        None => out.push_str("  Last run: never\n"),
    }
    if let Some(cursor) = &stats.cursor {
        out.push_str(&format!("  Resume cursor: {}\n", cursor));
    }

    if !stats.failed_urls.is_empty() {
        out.push_str(&format!("  Failed URLs ({}):\n", stats.failed_urls.len()));
        for failed in &stats.failed_urls {
            out.push_str(&format!(
                "    - {} [{}x] {}\n",
                failed.url, failed.retry_count, failed.error_message
            ));
        }
    }
    out
}

pub fn print_job_statistics(stats: &JobStatistics) {
    eprint!("{}", format_job_statistics(stats));
}
