use crate::config::{PolitenessConfig, StorageConfig, MAX_ROBOTS_TTL_SECS};
use crate::robots::cache::{RobotsCacheStore, RobotsEntry, RobotsStatus};
use crate::url::origin_of;
use crate::Result;
use reqwest::Client;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;

/// Per-origin robots.txt policy shared by every fetch in the process
///
/// Each origin's robots.txt is fetched at most once (unless a TTL is set),
/// kept in memory, and mirrored to an optional SQLite cache file.
pub struct RobotsPolicy {
    client: Client,
    ttl: Option<chrono::Duration>,
    ignore: bool,
    entries: Mutex<HashMap<String, RobotsEntry>>,
    /// One lock per origin, held while that origin's robots.txt is loaded
    loading: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    store: Option<StdMutex<RobotsCacheStore>>,
}

impl RobotsPolicy {
    /// Builds a policy whose robots.txt requests identify as `user_agent`
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            ttl: None,
            ignore: false,
            entries: Mutex::new(HashMap::new()),
            loading: Mutex::new(HashMap::new()),
            store: None,
        }
    }

    /// Builds the policy described by configuration, opening the cache file
    pub fn from_config(politeness: &PolitenessConfig, storage: &StorageConfig) -> Result<Self> {
        let mut policy = Self::new(&politeness.robots_user_agent)?
            .with_ttl(politeness.robots_ttl_secs.map(ttl_from_secs))
            .ignoring(politeness.ignore_robots);
        if !politeness.ignore_robots {
            let store = RobotsCacheStore::open(Path::new(&storage.robots_cache_path))?;
            policy = policy.with_store(store);
        }
        Ok(policy)
    }

    pub fn with_ttl(mut self, ttl: Option<chrono::Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_store(mut self, store: RobotsCacheStore) -> Self {
        self.store = Some(StdMutex::new(store));
        self
    }

    /// When set, every URL is allowed and robots.txt is never fetched
    pub fn ignoring(mut self, ignore: bool) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn is_ignoring(&self) -> bool {
        self.ignore
    }

    /// Checks `url` against its origin's robots.txt for `agent`
    pub async fn is_allowed(&self, url: &str, agent: &str) -> bool {
        if self.ignore {
            return true;
        }
        match self.entry_for(url).await {
            Some(entry) => entry.is_allowed(url, agent),
            None => true,
        }
    }

    /// `Crawl-delay` in seconds for `agent` on the origin of `url`
    pub async fn crawl_delay(&self, url: &str, agent: &str) -> Option<f64> {
        if self.ignore {
            return None;
        }
        self.entry_for(url).await?.crawl_delay(agent)
    }

    /// Status of the cached entry for the origin of `url`, if any
    pub async fn cached_status(&self, url: &str) -> Option<RobotsStatus> {
        let origin = origin_of(url)?;
        self.entries.lock().await.get(&origin).map(|e| e.status)
    }

    async fn entry_for(&self, url: &str) -> Option<RobotsEntry> {
        let origin = match origin_of(url) {
            Some(origin) => origin,
            None => {
                tracing::debug!("No origin for {}; robots check skipped", url);
                return None;
            }
        };

        if let Some(entry) = self.fresh_entry(&origin).await {
            return Some(entry);
        }

        let origin_lock = Arc::clone(self.loading.lock().await.entry(origin.clone()).or_default());
        let _loading = origin_lock.lock().await;

        // another task may have loaded it while we waited
        if let Some(entry) = self.fresh_entry(&origin).await {
            return Some(entry);
        }

        if let Some(entry) = self.load_persisted(&origin) {
            self.entries.lock().await.insert(origin, entry.clone());
            return Some(entry);
        }

        let entry = self.fetch(&origin).await;
        self.persist(&origin, &entry);
        self.entries.lock().await.insert(origin, entry.clone());
        Some(entry)
    }

    async fn fresh_entry(&self, origin: &str) -> Option<RobotsEntry> {
        self.entries
            .lock()
            .await
            .get(origin)
            .filter(|entry| !entry.is_stale(self.ttl))
            .cloned()
    }

    fn load_persisted(&self, origin: &str) -> Option<RobotsEntry> {
        let store = self.store.as_ref()?.lock().ok()?;
        match store.load(origin) {
            Ok(Some(entry)) if !entry.is_stale(self.ttl) => {
                tracing::debug!("Using cached robots.txt for {}", origin);
                Some(entry)
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Failed to read robots cache for {}: {}", origin, e);
                None
            }
        }
    }

    fn persist(&self, origin: &str, entry: &RobotsEntry) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        match store.lock() {
            Ok(store) => {
                if let Err(e) = store.save(origin, entry) {
                    tracing::warn!("Failed to write robots cache for {}: {}", origin, e);
                }
            }
            Err(_) => tracing::warn!("Robots cache lock poisoned; {} not persisted", origin),
        }
    }

    async fn fetch(&self, origin: &str) -> RobotsEntry {
        let robots_url = format!("{}/robots.txt", origin);
        tracing::debug!("Fetching {}", robots_url);

        let response = match self.client.get(&robots_url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("robots.txt fetch failed for {}: {}; allowing all", origin, e);
                return RobotsEntry::failed();
            }
        };

        let status = response.status();
        if status.is_success() {
            match response.text().await {
                Ok(body) => {
                    tracing::info!("Fetched robots.txt for {} ({} bytes)", origin, body.len());
                    RobotsEntry::fetched(&body)
                }
                Err(e) => {
                    tracing::warn!("robots.txt body unreadable for {}: {}; allowing all", origin, e);
                    RobotsEntry::failed()
                }
            }
        } else if status.is_client_error() {
            tracing::debug!("No robots.txt for {} (HTTP {})", origin, status.as_u16());
            RobotsEntry::missing()
        } else {
            tracing::warn!(
                "robots.txt for {} returned HTTP {}; allowing all",
                origin,
                status.as_u16()
            );
            RobotsEntry::failed()
        }
    }
}

/// Seconds to a cache TTL, clamped to the validated maximum
fn ttl_from_secs(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(secs.min(MAX_ROBOTS_TTL_SECS) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn policy() -> RobotsPolicy {
        RobotsPolicy::new("gleaner").unwrap()
    }

    #[tokio::test]
    async fn test_disallow_and_crawl_delay() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("User-agent: *\nDisallow: /private\nCrawl-delay: 2"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let policy = policy().await;
        let base = server.uri();
        assert!(policy.is_allowed(&format!("{}/public", base), "gleaner").await);
        assert!(!policy.is_allowed(&format!("{}/private/x", base), "gleaner").await);
        assert_eq!(policy.crawl_delay(&format!("{}/", base), "gleaner").await, Some(2.0));
        assert_eq!(policy.cached_status(&base).await, Some(RobotsStatus::Fetched));
    }

    #[tokio::test]
    async fn test_concurrent_first_requests_fetch_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("User-agent: *\nDisallow: /private")
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let policy = Arc::new(policy().await);
        let mut handles = Vec::new();
        for i in 0..5 {
            let policy = Arc::clone(&policy);
            let url = format!("{}/page/{}", server.uri(), i);
            handles.push(tokio::spawn(async move { policy.is_allowed(&url, "gleaner").await }));
        }
        for handle in handles {
            assert!(handle.await.unwrap());
        }
    }

    #[tokio::test]
    async fn test_missing_robots_allows_all() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let policy = policy().await;
        assert!(policy.is_allowed(&format!("{}/anything", server.uri()), "gleaner").await);
        assert_eq!(policy.cached_status(&server.uri()).await, Some(RobotsStatus::Missing));
    }

    #[tokio::test]
    async fn test_server_error_caches_failed_sentinel() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;

        let policy = policy().await;
        for page in ["/a", "/b", "/c"] {
            assert!(policy.is_allowed(&format!("{}{}", server.uri(), page), "gleaner").await);
        }
        assert_eq!(policy.cached_status(&server.uri()).await, Some(RobotsStatus::Failed));
    }

    #[tokio::test]
    async fn test_ignoring_never_fetches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /"))
            .expect(0)
            .mount(&server)
            .await;

        let policy = policy().await.ignoring(true);
        assert!(policy.is_allowed(&format!("{}/x", server.uri()), "gleaner").await);
        assert_eq!(policy.crawl_delay(&server.uri(), "gleaner").await, None);
    }

    #[tokio::test]
    async fn test_persisted_entry_is_reused() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /x"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("robots.sqlite");
        let url = format!("{}/x", server.uri());

        let first = policy().await.with_store(RobotsCacheStore::open(&db).unwrap());
        assert!(!first.is_allowed(&url, "gleaner").await);

        // a second process reads the mirrored entry instead of refetching
        let second = policy().await.with_store(RobotsCacheStore::open(&db).unwrap());
        assert!(!second.is_allowed(&url, "gleaner").await);
    }

    #[test]
    fn test_huge_ttl_is_clamped() {
        let ttl = ttl_from_secs(u64::MAX);
        assert_eq!(ttl, chrono::Duration::seconds(MAX_ROBOTS_TTL_SECS as i64));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_failed_sentinel() {
        let policy = policy().await;
        assert!(policy.is_allowed("http://127.0.0.1:9/page", "gleaner").await);
        assert_eq!(
            policy.cached_status("http://127.0.0.1:9/").await,
            Some(RobotsStatus::Failed)
        );
    }
}
