//! Output module for record streams and run summaries
//!
//! This module handles:
//! - Writing records as newline-delimited JSON
//! - Summarizing runs and persisted job state

mod jsonl;
pub mod stats;

pub use jsonl::{append_jsonl, write_jsonl, JsonlWriter};
pub use stats::{
    format_job_statistics, format_run_summary, load_job_statistics, print_job_statistics,
    print_run_summary, JobStatistics, RunSummary,
};
