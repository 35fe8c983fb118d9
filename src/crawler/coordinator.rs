//! Crawler coordinator - pagination orchestration
//!
//! This module contains the page loop that coordinates one extraction job:
//! - Fetching pages through a [`PageSource`]
//! - Applying the schema to each page
//! - Following next-page links with a cycle guard
//! - Persisting the resume cursor, failures, and items per job

use crate::crawler::fetcher::{FetchError, PageSource};
use crate::extract::{Record, RecordMeta, SchemaParser};
use crate::schema::ExtractionSchema;
use crate::selector::SelectorChain;
use crate::storage::{SqliteStateStore, StateStore, StorageError, StorageResult};
use crate::url::{resolve_link, visit_key};
use chrono::Utc;
use scraper::Html;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Why a paginated run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    NoNextLink,
    MaxPages,
    /// The next link pointed at a page already visited in this run
    Cycle,
    Cancelled,
    /// A page after the first could not be fetched
    FetchFailed,
}

impl StopReason {
    /// Natural completion clears the job's resume cursor
    fn is_complete(self) -> bool {
        matches!(self, StopReason::NoNextLink | StopReason::Cycle)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StopReason::NoNextLink => "no next link",
            StopReason::MaxPages => "max pages reached",
            StopReason::Cycle => "pagination cycle",
            StopReason::Cancelled => "cancelled",
            StopReason::FetchFailed => "fetch failed",
        };
        f.write_str(s)
    }
}

/// Counters for one coordinator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    pub urls_fetched: u64,
    pub items_extracted: u64,
    pub errors: u64,
    pub stop_reason: Option<StopReason>,
}

/// One parsed page: its records and the resolved next-page link
struct PageOutcome {
    records: Vec<Record>,
    next: Option<Url>,
}

/// Drives one extraction job over a [`PageSource`]
pub struct Coordinator<F: PageSource> {
    source: F,
    parser: SchemaParser,
    schema: Arc<ExtractionSchema>,
    next_link: Option<SelectorChain>,
    job: Option<String>,
    store: Option<Arc<Mutex<SqliteStateStore>>>,
    stats: CrawlStats,
    cancel: CancellationToken,
}

impl<F: PageSource> Coordinator<F> {
    /// Creates a coordinator with no job state attached
    pub fn new(source: F, schema: Arc<ExtractionSchema>) -> Self {
        let next_link = schema
            .pagination
            .as_ref()
            .map(|p| SelectorChain::new([p.next_selector.as_str()]));

        Self {
            source,
            parser: SchemaParser::new(Arc::clone(&schema)),
            schema,
            next_link,
            job: None,
            store: None,
            stats: CrawlStats::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Attaches a job name and state store for cursor, failure, and item persistence
    pub fn with_job(mut self, job: impl Into<String>, store: Arc<Mutex<SqliteStateStore>>) -> Self {
        self.job = Some(job.into());
        self.store = Some(store);
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn schema(&self) -> &ExtractionSchema {
        &self.schema
    }

    pub fn job(&self) -> Option<&str> {
        self.job.as_deref()
    }

    pub fn get_stats(&self) -> &CrawlStats {
        &self.stats
    }

    /// Fetches and parses a single page
    ///
    /// # Arguments
    ///
    /// * `url` - The page to fetch
    /// * `include_metadata` - Stamp `_meta` (url, fetch time, schema) on each record
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<Record>)` - Records extracted from the page, possibly none
    /// * `Err(GleanError::Fetch)` - The page could not be fetched
    pub async fn fetch_url(&mut self, url: &str, include_metadata: bool) -> crate::Result<Vec<Record>> {
        let html = self.fetch_html(url).await?;
        let stamp = include_metadata.then_some(None);
        let outcome = self.extract_page(&html, url, stamp);
        Ok(outcome.records)
    }

    /// Follows next-page links from `start_url` until a stop condition
    ///
    /// # Stop Conditions
    ///
    /// | Condition | `StopReason` |
    /// |-----------|--------------|
    /// | No next link on the page | `NoNextLink` |
    /// | `max_pages` pages fetched | `MaxPages` |
    /// | Next link already visited | `Cycle` |
    /// | Cancellation token fired | `Cancelled` |
    /// | A later page failed to fetch | `FetchFailed` |
    ///
    /// A failure on the first page is returned as an error instead.
    ///
    /// # Arguments
    ///
    /// * `start_url` - First page
    /// * `max_pages` - Page cap; overrides the schema's, `None` falls back to it
    /// * `include_metadata` - Stamp `_meta` including the 1-based page number
    pub async fn fetch_with_pagination(
        &mut self,
        start_url: &str,
        max_pages: Option<u32>,
        include_metadata: bool,
    ) -> crate::Result<Vec<Record>> {
        let pagination = self.schema.pagination.clone();
        let max_pages = max_pages.or_else(|| pagination.as_ref().and_then(|p| p.max_pages));
        let wait = pagination
            .as_ref()
            .and_then(|p| p.wait_seconds)
            .filter(|w| *w > 0.0)
            .map(Duration::from_secs_f64);

        let mut current = Url::parse(start_url)?;
        let mut visited = HashSet::from([visit_key(&current)]);
        let mut records = Vec::new();
        let mut page: u32 = 1;

        let reason = loop {
            if self.cancel.is_cancelled() {
                break StopReason::Cancelled;
            }

            let html = match self.fetch_html(current.as_str()).await {
                Ok(html) => html,
                Err(e) if page == 1 => return Err(e.into()),
                Err(FetchError::Cancelled) => break StopReason::Cancelled,
                Err(e) => {
                    tracing::warn!("Stopping at page {} ({}): {}", page, current, e);
                    break StopReason::FetchFailed;
                }
            };

            let stamp = include_metadata.then_some(Some(page));
            let outcome = self.extract_page(&html, current.as_str(), stamp);
            tracing::info!(
                "Page {} ({}): {} records",
                page,
                current,
                outcome.records.len()
            );
            records.extend(outcome.records);

            self.save_cursor(outcome.next.as_ref().map(Url::as_str))?;

            let next = match outcome.next {
                Some(next) => next,
                None => break StopReason::NoNextLink,
            };
            if max_pages.is_some_and(|max| page >= max) {
                break StopReason::MaxPages;
            }
            if !visited.insert(visit_key(&next)) {
                tracing::info!("Next link {} was already visited; stopping", next);
                break StopReason::Cycle;
            }

            if let Some(wait) = wait {
                let cancelled = tokio::select! {
                    _ = self.cancel.cancelled() => true,
                    _ = tokio::time::sleep(wait) => false,
                };
                if cancelled {
                    break StopReason::Cancelled;
                }
            }

            current = next;
            page += 1;
        };

        if reason.is_complete() {
            self.save_cursor(None)?;
        }
        self.stats.stop_reason = Some(reason);

        tracing::info!(
            "Schema '{}': {} pages, {} records, stopped: {}",
            self.schema.name,
            page,
            records.len(),
            reason
        );
        Ok(records)
    }

    /// Like [`fetch_with_pagination`](Self::fetch_with_pagination), starting
    /// from the job's saved cursor when there is one
    pub async fn resume_with_pagination(
        &mut self,
        default_start: &str,
        max_pages: Option<u32>,
        include_metadata: bool,
    ) -> crate::Result<Vec<Record>> {
        let cursor = self.with_store(|store, job| store.load_cursor(job))?.flatten();
        let start = match cursor {
            Some(cursor) => {
                tracing::info!("Resuming from saved cursor {}", cursor);
                cursor
            }
            None => default_start.to_string(),
        };
        self.fetch_with_pagination(&start, max_pages, include_metadata)
            .await
    }

    /// Upserts `records` into the job's state store
    ///
    /// # Returns
    ///
    /// The number of records not seen before; 0 without an attached job
    pub fn persist_items(&self, records: &[Record]) -> crate::Result<usize> {
        match self.with_store(|store, job| store.upsert_items(job, records))? {
            Some(inserted) => {
                tracing::info!("Persisted {} records ({} new)", records.len(), inserted);
                Ok(inserted)
            }
            None => {
                tracing::debug!("No job attached; {} records not persisted", records.len());
                Ok(0)
            }
        }
    }

    async fn fetch_html(&mut self, url: &str) -> Result<String, FetchError> {
        match self.source.fetch(url).await {
            Ok(html) => {
                self.stats.urls_fetched += 1;
                Ok(html)
            }
            Err(e) => {
                self.stats.errors += 1;
                if e != FetchError::Cancelled {
                    let message = e.to_string();
                    if let Err(store_err) =
                        self.with_store(|store, job| store.record_failed_url(job, url, &message))
                    {
                        tracing::warn!("Could not record failure for {}: {}", url, store_err);
                    }
                }
                Err(e)
            }
        }
    }

    /// Parses one page; `stamp` is `Some(page)` when `_meta` is requested
    fn extract_page(&mut self, html: &str, url: &str, stamp: Option<Option<u32>>) -> PageOutcome {
        let document = Html::parse_document(html);
        let mut records = self.parser.parse_document(&document);

        if records.is_empty() {
            let report = self.parser.diagnose(html);
            tracing::warn!(
                "No records on {} (item selector matched {})",
                url,
                report.count
            );
            for warning in &report.warnings {
                tracing::warn!("  {}", warning);
            }
        }

        if let Some(page) = stamp {
            let fetched_at = Utc::now();
            records = records
                .into_iter()
                .map(|record| {
                    record.with_meta(RecordMeta {
                        url: url.to_string(),
                        fetched_at,
                        schema: self.schema.name.clone(),
                        page,
                    })
                })
                .collect();
        }
        self.stats.items_extracted += records.len() as u64;

        let next = self.next_link.as_ref().and_then(|chain| {
            let base = Url::parse(url).ok()?;
            let href = chain.select_one_in(&document)?.value().attr("href")?;
            resolve_link(href, &base)
        });

        PageOutcome { records, next }
    }

    fn save_cursor(&self, cursor: Option<&str>) -> crate::Result<()> {
        self.with_store(|store, job| store.save_cursor(job, cursor))?;
        Ok(())
    }

    /// Runs `op` against the attached store; `Ok(None)` without a job
    fn with_store<T>(
        &self,
        op: impl FnOnce(&mut SqliteStateStore, &str) -> StorageResult<T>,
    ) -> StorageResult<Option<T>> {
        let (Some(job), Some(store)) = (self.job.as_deref(), self.store.as_ref()) else {
            return Ok(None);
        };
        let mut store = store.lock().map_err(|_| StorageError::LockPoisoned)?;
        op(&mut store, job).map(Some)
    }
}
