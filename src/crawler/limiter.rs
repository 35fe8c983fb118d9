//! Per-domain request admission
//!
//! Every outgoing request passes through [`RateLimiter::acquire`], which
//! holds the caller until the domain's token bucket has a token.

use crate::config::PolitenessConfig;
use crate::state::DomainState;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Shared token-bucket limiter keyed by domain
///
/// Construct one per process and share it behind an `Arc`; concurrent jobs
/// hitting the same domain then serialize through the same bucket.
#[derive(Debug)]
pub struct RateLimiter {
    default_rate: f64,
    capacity: u32,
    domains: Mutex<HashMap<String, DomainState>>,
}

impl RateLimiter {
    /// Creates a limiter admitting `requests_per_second` per domain
    ///
    /// # Arguments
    ///
    /// * `requests_per_second` - Default refill rate for every domain
    /// * `burst` - Bucket capacity; 1 means strictly spaced requests
    pub fn new(requests_per_second: f64, burst: u32) -> Self {
        Self {
            default_rate: requests_per_second,
            capacity: burst.max(1),
            domains: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &PolitenessConfig) -> Self {
        Self::new(config.requests_per_second, config.burst)
    }

    pub fn default_rate(&self) -> f64 {
        self.default_rate
    }

    /// Waits until a request to `domain` is allowed, then takes the token
    ///
    /// The map lock is released while sleeping so other domains proceed.
    ///
    /// # Returns
    ///
    /// The total time spent waiting
    pub async fn acquire(&self, domain: &str) -> Duration {
        let mut waited = Duration::ZERO;
        loop {
            let wait = {
                let mut domains = self.domains.lock().await;
                let state = domains
                    .entry(domain.to_string())
                    .or_insert_with(|| DomainState::new(self.default_rate));
                match state.try_acquire(Instant::now(), self.capacity) {
                    Ok(()) => return waited,
                    Err(wait) => wait,
                }
            };

            tracing::debug!("Rate limiting {}: waiting {:?}", domain, wait);
            tokio::time::sleep(wait).await;
            waited = waited.saturating_add(wait);
        }
    }

    /// Applies a per-domain rate, never faster than the configured default
    ///
    /// Non-positive or non-finite rates are ignored.
    pub async fn set_rate(&self, domain: &str, requests_per_second: f64) {
        if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
            tracing::warn!("Ignoring invalid rate {} for {}", requests_per_second, domain);
            return;
        }
        let rate = requests_per_second.min(self.default_rate);

        let mut domains = self.domains.lock().await;
        let state = domains
            .entry(domain.to_string())
            .or_insert_with(|| DomainState::new(self.default_rate));
        if (state.rate() - rate).abs() > f64::EPSILON {
            tracing::info!("Rate for {} set to {:.3} req/s", domain, rate);
            state.set_rate(rate, Instant::now(), self.capacity);
        }
    }

    /// Current refill rate for `domain`
    pub async fn rate_for(&self, domain: &str) -> f64 {
        self.domains
            .lock()
            .await
            .get(domain)
            .map(DomainState::rate)
            .unwrap_or(self.default_rate)
    }

    /// Requests admitted so far for `domain`
    pub async fn request_count(&self, domain: &str) -> u32 {
        self.domains
            .lock()
            .await
            .get(domain)
            .map(|s| s.request_count)
            .unwrap_or(0)
    }
}
