//! Crawler module for polite page fetching and pagination
//!
//! This module contains the core crawling logic, including:
//! - Per-domain rate limiting
//! - Browser-like request headers
//! - HTTP fetching with retry and backoff
//! - Pagination orchestration with a cycle guard

pub mod backoff;
mod coordinator;
mod fetcher;
pub mod headers;
mod limiter;

pub use coordinator::{Coordinator, CrawlStats, StopReason};
pub use fetcher::{detect_blocking_vendor, FetchError, HttpFetcher, PageSource};
pub use limiter::RateLimiter;
