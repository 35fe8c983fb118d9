//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Robots.txt checks and `Crawl-delay` propagation to the rate limiter
//! - Per-attempt admission through the shared [`RateLimiter`]
//! - Browser-like request headers
//! - Retry with exponential backoff for transient failures
//! - Bot-mitigation detection on 403 responses

use crate::config::Config;
use crate::crawler::backoff::{random_jitter, retry_wait};
use crate::crawler::headers::build_browser_headers;
use crate::crawler::limiter::RateLimiter;
use crate::robots::RobotsPolicy;
use crate::url::extract_domain;
use reqwest::header::{HeaderMap, SERVER, SET_COOKIE};
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Why a page could not be fetched
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Disallowed by robots.txt: {0}")]
    RobotsDisallowed(String),

    #[error("Blocked by {vendor} (HTTP {status})")]
    Blocked { vendor: String, status: u16 },

    #[error("HTTP {status}")]
    Http { status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Network errors, 408, 429 and 5xx are worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Network(_) => true,
            FetchError::Http { status } => matches!(status, 408 | 429 | 500..=599),
            _ => false,
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Blocked { status, .. } | FetchError::Http { status } => Some(*status),
            _ => None,
        }
    }
}

/// Anything that can turn a URL into an HTML body
pub trait PageSource: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Names the bot-mitigation vendor behind a 403, from its response headers
pub fn detect_blocking_vendor(headers: &HeaderMap) -> Option<&'static str> {
    let server = headers
        .get(SERVER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();
    let cookies = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect::<Vec<_>>()
        .join("; ")
        .to_ascii_lowercase();

    if server.contains("cloudflare") || headers.contains_key("cf-ray") {
        Some("cloudflare")
    } else if server.contains("akamai") || headers.contains_key("x-akamai-transformed") {
        Some("akamai")
    } else if headers.contains_key("x-iinfo") || cookies.contains("incap_ses") {
        Some("imperva")
    } else if server.contains("sucuri") || headers.contains_key("x-sucuri-id") {
        Some("sucuri")
    } else if server.contains("ddos-guard") {
        Some("ddos-guard")
    } else if cookies.contains("_px") || headers.contains_key("x-px-block") {
        Some("perimeterx")
    } else if headers.contains_key("x-datadome") || cookies.contains("datadome") {
        Some("datadome")
    } else {
        None
    }
}

fn classify_reqwest_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Network(format!("Request timeout: {}", e))
    } else if e.is_connect() {
        FetchError::Network(format!("Connection failed: {}", e))
    } else {
        FetchError::Network(e.to_string())
    }
}

/// Polite HTTP fetcher shared by every page of a job
pub struct HttpFetcher {
    client: Client,
    limiter: Arc<RateLimiter>,
    robots: Arc<RobotsPolicy>,
    robots_agent: String,
    user_agent: Option<String>,
    max_attempts: u32,
    backoff_scale: f64,
    cancel: CancellationToken,
}

impl HttpFetcher {
    /// Builds a fetcher with a 30 second timeout and three attempts per URL
    pub fn new(limiter: Arc<RateLimiter>, robots: Arc<RobotsPolicy>) -> crate::Result<Self> {
        Self::with_timeout(limiter, robots, Duration::from_secs(30))
    }

    pub fn with_timeout(
        limiter: Arc<RateLimiter>,
        robots: Arc<RobotsPolicy>,
        timeout: Duration,
    ) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            limiter,
            robots,
            robots_agent: "gleaner".to_string(),
            user_agent: None,
            max_attempts: 3,
            backoff_scale: 1.0,
            cancel: CancellationToken::new(),
        })
    }

    /// Builds the fetcher described by the `[http]` and `[politeness]` tables
    pub fn from_config(
        config: &Config,
        limiter: Arc<RateLimiter>,
        robots: Arc<RobotsPolicy>,
    ) -> crate::Result<Self> {
        Ok(
            Self::with_timeout(limiter, robots, Duration::from_secs(config.http.timeout_secs))?
                .with_robots_agent(&config.politeness.robots_user_agent)
                .with_user_agent(config.http.user_agent.clone())
                .with_max_attempts(config.http.max_attempts),
        )
    }

    /// Agent token matched against robots.txt groups
    pub fn with_robots_agent(mut self, agent: &str) -> Self {
        self.robots_agent = agent.to_string();
        self
    }

    /// Fixed User-Agent header; `None` rotates through the browser pool
    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Multiplies every retry wait by `scale`
    pub fn with_backoff_scale(mut self, scale: f64) -> Self {
        if scale.is_finite() && scale >= 0.0 {
            self.backoff_scale = scale;
        }
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Fetches `url`, retrying transient failures
    ///
    /// # Request Flow
    ///
    /// 1. Validate the URL (http/https with a host)
    /// 2. Check robots.txt; a `Crawl-delay` slows the domain's bucket
    /// 3. Per attempt: wait for a rate-limit token, send with browser headers
    /// 4. On a retryable failure sleep `retry_wait` (cancellable) and retry
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Network error / timeout | Retry |
    /// | HTTP 408, 5xx | Retry |
    /// | HTTP 429, 503 | Retry, triple wait |
    /// | HTTP 403 from a bot-mitigation vendor | `Blocked`, no retry |
    /// | Other 4xx | `Http`, no retry |
    pub async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let parsed =
            Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(FetchError::InvalidUrl(format!(
                "{}: scheme '{}' is not fetchable",
                url,
                parsed.scheme()
            )));
        }
        let domain = extract_domain(&parsed)
            .ok_or_else(|| FetchError::InvalidUrl(format!("{}: no host", url)))?;

        if !self.robots.is_allowed(parsed.as_str(), &self.robots_agent).await {
            tracing::info!("Skipping {} (disallowed by robots.txt)", url);
            return Err(FetchError::RobotsDisallowed(url.to_string()));
        }
        if let Some(delay) = self.robots.crawl_delay(parsed.as_str(), &self.robots_agent).await {
            if delay > 0.0 {
                self.limiter.set_rate(&domain, 1.0 / delay).await;
            }
        }

        let mut attempt = 0;
        loop {
            if self.cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = self.limiter.acquire(&domain) => {}
            }

            match self.send(parsed.as_str()).await {
                Err(e) if e.is_retryable() && attempt + 1 < self.max_attempts => {
                    let wait = retry_wait(attempt, e.status(), random_jitter())
                        .mul_f64(self.backoff_scale);
                    tracing::warn!(
                        "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                        attempt + 1,
                        self.max_attempts,
                        url,
                        e,
                        wait
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => return Err(FetchError::Cancelled),
                        _ = tokio::time::sleep(wait) => {}
                    }
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!("Giving up on {} after {} attempt(s): {}", url, attempt + 1, e);
                    return Err(e);
                }
                Ok(body) => return Ok(body),
            }
        }
    }

    async fn send(&self, url: &str) -> Result<String, FetchError> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .headers(build_browser_headers(self.user_agent.as_deref()))
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if status.is_success() {
            return response.text().await.map_err(classify_reqwest_error);
        }

        if status == StatusCode::FORBIDDEN {
            if let Some(vendor) = detect_blocking_vendor(response.headers()) {
                return Err(FetchError::Blocked {
                    vendor: vendor.to_string(),
                    status: status.as_u16(),
                });
            }
        }

        Err(FetchError::Http {
            status: status.as_u16(),
        })
    }
}

impl PageSource for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.fetch_page(url).await
    }
}
