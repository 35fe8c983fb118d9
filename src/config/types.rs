use serde::Deserialize;

/// Main configuration structure for Gleaner
///
/// Every table is optional; a missing table or key falls back to the
/// defaults below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub politeness: PolitenessConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Rate limiting and robots.txt behavior
#[derive(Debug, Clone, Deserialize)]
pub struct PolitenessConfig {
    /// Default token refill rate for every domain
    #[serde(rename = "requests-per-second", default = "default_rps")]
    pub requests_per_second: f64,

    /// Token bucket capacity per domain
    #[serde(default = "default_burst")]
    pub burst: u32,

    /// Skip robots.txt checks entirely
    #[serde(rename = "ignore-robots", default)]
    pub ignore_robots: bool,

    /// Agent token matched against robots.txt groups
    #[serde(rename = "robots-user-agent", default = "default_robots_agent")]
    pub robots_user_agent: String,

    /// Seconds before a cached robots.txt is refetched (unset = never)
    #[serde(rename = "robots-ttl-secs", default)]
    pub robots_ttl_secs: Option<u64>,
}

/// HTTP client behavior
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout")]
    pub timeout_secs: u64,

    /// Total attempts per URL, including the first
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed User-Agent; when unset a browser agent is rotated per request
    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,
}

/// On-disk state locations
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the job state SQLite file
    #[serde(rename = "state-path", default = "default_state_path")]
    pub state_path: String,

    /// Path to the robots.txt cache SQLite file
    #[serde(rename = "robots-cache-path", default = "default_robots_cache_path")]
    pub robots_cache_path: String,
}

fn default_rps() -> f64 {
    1.0
}

fn default_burst() -> u32 {
    1
}

fn default_robots_agent() -> String {
    "gleaner".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_state_path() -> String {
    "data/cache/state.sqlite".to_string()
}

fn default_robots_cache_path() -> String {
    "data/cache/robots.sqlite".to_string()
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            requests_per_second: default_rps(),
            burst: default_burst(),
            ignore_robots: false,
            robots_user_agent: default_robots_agent(),
            robots_ttl_secs: None,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_attempts: default_max_attempts(),
            user_agent: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            robots_cache_path: default_robots_cache_path(),
        }
    }
}
